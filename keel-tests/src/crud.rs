use keel::{Executor, QueryOptions, Record, is_not_found};
use std::sync::LazyLock;
use time::OffsetDateTime;
use tokio::sync::Mutex;

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct Person {
    #[sql("primary_key,auto_increment,where")]
    id: i64,
    #[sql("size=64,unique,not_null")]
    name: String,
    age: Option<u32>,
    #[sql("size=128,default='unknown'")]
    city: String,
    created_at: Option<OffsetDateTime>,
}

#[derive(Debug, Default, Record)]
struct Unkeyed {
    #[sql("size=32")]
    name: String,
}

pub async fn crud<E: Executor>(executor: &mut E) {
    static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    let _lock = MUTEX.lock().await;

    // Setup
    Person::drop_table(executor, true)
        .await
        .expect("Failed to drop the person table");
    Person::create_table(executor, true)
        .await
        .expect("Failed to create the person table");

    // Insert assigns the generated key
    let mut ann = Person {
        name: "ann".into(),
        age: Some(30),
        city: "Turin".into(),
        ..Default::default()
    };
    let result = ann
        .insert(executor, QueryOptions::new())
        .await
        .expect("Failed to insert ann");
    assert_eq!(result.rows_affected, 1);
    assert!(ann.id > 0);
    let mut bob = Person {
        name: "bob".into(),
        age: Some(40),
        city: "Oslo".into(),
        ..Default::default()
    };
    bob.insert(executor, QueryOptions::new())
        .await
        .expect("Failed to insert bob");
    assert_eq!(bob.id, ann.id + 1);

    // Get
    let loaded = Person::get(executor, QueryOptions::new().selector("name=ann"))
        .await
        .expect("Failed to get ann");
    assert_eq!(loaded.id, ann.id);
    assert_eq!(loaded.age, Some(30));
    assert_eq!(loaded.city, "Turin");
    assert!(loaded.created_at.is_some(), "created_at must be filled on insert");
    let created_at = loaded.created_at;

    // Update through the key field
    ann.age = Some(31);
    let result = ann
        .update(executor, QueryOptions::new())
        .await
        .expect("Failed to update ann");
    assert_eq!(result.rows_affected, 1);
    let loaded = Person::get(executor, QueryOptions::new().selector(format!("id={}", ann.id)))
        .await
        .expect("Failed to get ann after the update");
    assert_eq!(loaded.age, Some(31));
    assert_eq!(loaded.created_at, created_at);

    // Same values still match the row
    let result = ann
        .update(executor, QueryOptions::new())
        .await
        .expect("Failed to update ann with identical values");
    assert_eq!(result.rows_affected, 1);

    // Restricted to some columns
    let changed = Person {
        name: "ann".into(),
        age: Some(99),
        city: "Paris".into(),
        ..ann.clone()
    };
    changed
        .update(executor, QueryOptions::new().cols(["city"]))
        .await
        .expect("Failed to update the city of ann");
    let loaded = Person::get(executor, QueryOptions::new().selector("name=ann"))
        .await
        .expect("Failed to get ann after the partial update");
    assert_eq!(loaded.city, "Paris");
    assert_eq!(loaded.age, Some(31));

    // Update without a matching row
    let ghost = Person {
        id: 9999,
        name: "ghost".into(),
        ..Default::default()
    };
    let error = ghost
        .update(executor, QueryOptions::new())
        .await
        .expect_err("Updating a missing row must fail");
    assert!(is_not_found(&error));

    // Update without key fields is rejected before reaching the database
    let unkeyed = Unkeyed { name: "x".into() };
    let error = unkeyed
        .update(executor, QueryOptions::new())
        .await
        .expect_err("Updating without a where field must fail");
    assert!(!is_not_found(&error));

    // Get without match
    let error = Person::get(executor, QueryOptions::new().selector("name=carl"))
        .await
        .expect_err("Getting a missing row must fail");
    assert!(is_not_found(&error));
    let empty = Person::get(
        executor,
        QueryOptions::new().selector("name=carl").ignore_not_found(),
    )
    .await
    .expect("Getting a missing row with ignore_not_found must succeed");
    assert_eq!(empty, Person::default());

    // Delete
    let result = Person::delete(executor, QueryOptions::new().selector("name=bob"))
        .await
        .expect("Failed to delete bob");
    assert_eq!(result.rows_affected, 1);
    let error = Person::delete(executor, QueryOptions::new().selector("name=bob"))
        .await
        .expect_err("Deleting bob twice must fail");
    assert!(is_not_found(&error));
    Person::delete(executor, QueryOptions::new())
        .await
        .expect_err("Deleting without a selector must fail");
    let remaining = Person::list(executor, QueryOptions::new())
        .await
        .expect("Failed to list the people");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "ann");

    // Cleanup
    Person::drop_table(executor, true)
        .await
        .expect("Failed to drop the person table");
}
