use keel::{Driver, Executor, QueryOptions, Record};
use std::sync::LazyLock;
use tokio::sync::Mutex;

mod before {
    use keel::Record;

    #[derive(Debug, Default, Clone, PartialEq, Record)]
    #[keel(table = "migrated")]
    pub struct Migrated {
        #[sql("primary_key,where")]
        pub id: i64,
        #[sql("size=16")]
        pub name: String,
        pub score: Option<i32>,
    }
}

mod after {
    use keel::Record;

    #[derive(Debug, Default, Clone, PartialEq, Record)]
    #[keel(table = "migrated")]
    pub struct Migrated {
        #[sql("primary_key,where")]
        pub id: i64,
        #[sql("size=64")]
        pub name: String,
        pub score: Option<i32>,
        #[sql("size=128,index")]
        pub email: Option<String>,
        #[sql("size=16,index=idx_migrated_pair")]
        pub first: Option<String>,
        #[sql("size=16,index=idx_migrated_pair")]
        pub second: Option<String>,
    }
}

pub async fn migrate<E: Executor>(executor: &mut E) {
    static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    let _lock = MUTEX.lock().await;
    let driver = executor.driver().clone();

    // Setup
    before::Migrated::drop_table(executor, true)
        .await
        .expect("Failed to drop the migrated table");
    assert!(
        !driver
            .has_table(executor, "migrated")
            .await
            .expect("Failed to check the table")
    );

    // Creation
    before::Migrated::auto_migrate(executor)
        .await
        .expect("Failed to create the table through the migration");
    assert!(
        driver
            .has_table(executor, "migrated")
            .await
            .expect("Failed to check the table")
    );
    let columns = driver
        .column_types(executor, "migrated")
        .await
        .expect("Failed to read the columns");
    assert_eq!(
        columns.iter().map(|v| v.name.as_str()).collect::<Vec<_>>(),
        ["id", "name", "score"]
    );
    assert_eq!(
        columns.iter().find(|v| v.name == "name").and_then(|v| v.length),
        Some(16)
    );
    let mut row = before::Migrated {
        id: 1,
        name: "kept".into(),
        score: Some(12),
    };
    row.insert(executor, QueryOptions::new())
        .await
        .expect("Failed to insert the row");

    // Additive migration
    after::Migrated::auto_migrate(executor)
        .await
        .expect("Failed to migrate the table");
    let columns = driver
        .column_types(executor, "migrated")
        .await
        .expect("Failed to read the migrated columns");
    assert_eq!(columns.len(), 6);
    assert_eq!(
        columns.iter().find(|v| v.name == "name").and_then(|v| v.length),
        Some(64)
    );
    assert!(
        driver
            .has_column(executor, "migrated", "email")
            .await
            .expect("Failed to check the column")
    );
    assert!(
        driver
            .has_index(executor, "migrated", "idx_migrated_email")
            .await
            .expect("Failed to check the index")
    );
    assert!(
        driver
            .has_index(executor, "migrated", "idx_migrated_pair")
            .await
            .expect("Failed to check the composite index")
    );
    let tables = driver
        .list_tables(executor)
        .await
        .expect("Failed to list the tables");
    assert!(tables.iter().any(|v| v == "migrated"));

    // Existing data survives
    let loaded = after::Migrated::get(executor, QueryOptions::new().selector("id=1"))
        .await
        .expect("Failed to get the migrated row");
    assert_eq!(loaded.name, "kept");
    assert_eq!(loaded.score, Some(12));
    assert_eq!(loaded.email, None);

    // Wider values fit now
    let mut wide = after::Migrated {
        id: 2,
        name: "a name longer than sixteen characters".into(),
        email: Some("someone@example.com".into()),
        ..Default::default()
    };
    wide.insert(executor, QueryOptions::new())
        .await
        .expect("Failed to insert the wide row");
    let loaded = after::Migrated::get(executor, QueryOptions::new().selector("id=2"))
        .await
        .expect("Failed to get the wide row");
    assert_eq!(loaded, wide);

    // Running it again changes nothing
    after::Migrated::auto_migrate(executor)
        .await
        .expect("Failed to migrate the table a second time");
    let again = driver
        .column_types(executor, "migrated")
        .await
        .expect("Failed to read the columns again");
    assert_eq!(again, columns);

    // Explicit column and index operations
    driver
        .drop_index(executor, "migrated", "idx_migrated_email")
        .await
        .expect("Failed to drop the index");
    assert!(
        !driver
            .has_index(executor, "migrated", "idx_migrated_email")
            .await
            .expect("Failed to check the dropped index")
    );
    driver
        .drop_column(executor, "migrated", "email")
        .await
        .expect("Failed to drop the column");
    assert!(
        !driver
            .has_column(executor, "migrated", "email")
            .await
            .expect("Failed to check the dropped column")
    );
    let loaded = before::Migrated::get(executor, QueryOptions::new().selector("id=1"))
        .await
        .expect("Failed to get the row after dropping a column");
    assert_eq!(loaded.name, "kept");
}
