use keel::{Executor, QueryOptions, Record, Selector};
use std::sync::LazyLock;
use tokio::sync::Mutex;

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct Animal {
    #[sql("primary_key,auto_increment,where")]
    id: u32,
    #[sql("size=32")]
    name: String,
    #[sql("size=32")]
    species: String,
    legs: Option<i32>,
}

async fn names<E: Executor>(executor: &mut E, selector: &str) -> Vec<String> {
    let mut result = Animal::list(
        executor,
        QueryOptions::new().selector(selector).ignore_not_found(),
    )
    .await
    .unwrap_or_else(|e| panic!("Failed to list the animals matching `{}`: {:#}", selector, e))
    .into_iter()
    .map(|v| v.name)
    .collect::<Vec<_>>();
    result.sort();
    result
}

pub async fn selector<E: Executor>(executor: &mut E) {
    static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    let _lock = MUTEX.lock().await;

    // Setup
    Animal::drop_table(executor, true)
        .await
        .expect("Failed to drop the animal table");
    Animal::create_table(executor, true)
        .await
        .expect("Failed to create the animal table");
    for (name, species, legs) in [
        ("tom", "cat", Some(4)),
        ("jerry", "mouse", Some(4)),
        ("tweety", "bird", Some(2)),
        ("nemo", "fish", None),
        ("garfield", "cat", Some(4)),
    ] {
        let mut animal = Animal {
            name: name.into(),
            species: species.into(),
            legs,
            ..Default::default()
        };
        animal
            .insert(executor, QueryOptions::new())
            .await
            .expect("Failed to insert an animal");
    }

    assert_eq!(names(executor, "species=cat").await, ["garfield", "tom"]);
    assert_eq!(names(executor, "species==cat,legs=4").await, ["garfield", "tom"]);
    assert_eq!(
        names(executor, "species!=cat").await,
        ["jerry", "nemo", "tweety"]
    );
    assert_eq!(
        names(executor, "name in (tom,jerry)").await,
        ["jerry", "tom"]
    );
    assert_eq!(
        names(executor, "species notin (cat,mouse)").await,
        ["nemo", "tweety"]
    );
    assert_eq!(names(executor, "name in ()").await, Vec::<String>::new());
    assert_eq!(names(executor, "name notin ()").await.len(), 5);
    assert_eq!(names(executor, "legs<4").await, ["tweety"]);
    assert_eq!(names(executor, "legs>2,species!=cat").await, ["jerry"]);
    assert_eq!(names(executor, "name~r").await, ["garfield", "jerry"]);
    assert_eq!(names(executor, "name!~e").await, ["tom"]);
    assert_eq!(names(executor, "name=~t").await, ["tom", "tweety"]);
    assert_eq!(names(executor, "name~=y").await, ["jerry", "tweety"]);
    assert_eq!(names(executor, "!legs").await, ["nemo"]);
    assert_eq!(names(executor, "legs,species=cat").await, ["garfield", "tom"]);

    // Built selector
    let selector = Selector::parse("species in (cat,fish)").expect("Failed to parse the selector");
    let animals = Animal::list(executor, QueryOptions::new().with_selector(selector))
        .await
        .expect("Failed to list with a built selector");
    assert_eq!(animals.len(), 3);

    // Invalid selector
    Animal::list(executor, QueryOptions::new().selector("name in (tom"))
        .await
        .expect_err("A malformed selector must fail");
    Animal::list(executor, QueryOptions::new().selector("-bad=x"))
        .await
        .expect_err("An invalid key must fail");
}
