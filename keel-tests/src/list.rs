use keel::{Executor, QueryOptions, Record, is_not_found};
use std::sync::LazyLock;
use tokio::sync::Mutex;

#[derive(Debug, Default, Clone, PartialEq, Record)]
#[keel(table = "list_items")]
struct Item {
    #[sql("primary_key,where")]
    id: i64,
    #[sql("size=16,index")]
    category: String,
    price: f64,
}

fn ids(items: &[Item]) -> Vec<i64> {
    let mut result = items.iter().map(|v| v.id).collect::<Vec<_>>();
    result.sort();
    result
}

pub async fn list<E: Executor>(executor: &mut E) {
    static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    let _lock = MUTEX.lock().await;

    // Setup
    Item::drop_table(executor, true)
        .await
        .expect("Failed to drop the items table");
    Item::auto_migrate(executor)
        .await
        .expect("Failed to create the items table");
    for id in 1..=25 {
        let mut item = Item {
            id,
            category: if id % 2 == 0 { "even" } else { "odd" }.into(),
            price: id as f64 * 1.5,
        };
        item.insert(executor, QueryOptions::new())
            .await
            .expect("Failed to insert an item");
    }

    // Everything
    let items = Item::list(executor, QueryOptions::new())
        .await
        .expect("Failed to list the items");
    assert_eq!(items.len(), 25);
    assert_eq!(ids(&items), (1..=25).collect::<Vec<_>>());

    // Page with total
    let mut total = 0;
    let items = Item::list(
        executor,
        QueryOptions::new()
            .selector("category=even")
            .limit(0, 5)
            .total(&mut total),
    )
    .await
    .expect("Failed to list the first page");
    assert_eq!(items.len(), 5);
    assert!(items.iter().all(|v| v.id % 2 == 0));
    assert_eq!(total, 12);

    // Last page
    let mut total = 0;
    let items = Item::list(
        executor,
        QueryOptions::new()
            .selector("category=even")
            .limit(10, 5)
            .total(&mut total),
    )
    .await
    .expect("Failed to list the last page");
    assert_eq!(items.len(), 2);
    assert_eq!(total, 12);

    // Row cap
    let items = Item::list(executor, QueryOptions::new().max_rows(3))
        .await
        .expect("Failed to list with a row cap");
    assert_eq!(items.len(), 3);

    // Projection
    let items = Item::list(
        executor,
        QueryOptions::new().cols(["id"]).selector("id>20"),
    )
    .await
    .expect("Failed to list the projected items");
    assert_eq!(ids(&items), vec![21, 22, 23, 24, 25]);
    assert!(items.iter().all(|v| v.category.is_empty() && v.price == 0.0));

    // No match
    let error = Item::list(executor, QueryOptions::new().selector("category=none"))
        .await
        .expect_err("An empty list must fail");
    assert!(is_not_found(&error));
    let mut total = 100;
    let items = Item::list(
        executor,
        QueryOptions::new()
            .selector("category=none")
            .total(&mut total)
            .ignore_not_found(),
    )
    .await
    .expect("An empty list with ignore_not_found must succeed");
    assert!(items.is_empty());
    assert_eq!(total, 0);

    // Explicit table
    let items = Item::list(
        executor,
        QueryOptions::new().table("list_items").selector("id<3"),
    )
    .await
    .expect("Failed to list from the explicit table");
    assert_eq!(ids(&items), vec![1, 2]);
}
