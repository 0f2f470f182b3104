#[cfg(test)]
mod tests {
    use keel::{Driver, Executor, QueryOptions, Record};
    use keel_sqlite::SqliteDriver;
    use keel_tests::{execute_tests, init_logs};
    use std::{path::Path, sync::Mutex};
    use tokio::fs;

    static MUTEX: Mutex<()> = Mutex::new(());

    #[derive(Debug, Default, Clone, PartialEq, Record)]
    #[keel(table = "tickets")]
    struct Ticket {
        #[sql("primary_key,auto_increment=100,where")]
        id: i64,
        #[sql("size=32,not_null,index")]
        title: String,
        #[sql("size=8")]
        priority: Option<String>,
    }

    #[tokio::test]
    async fn sqlite() {
        init_logs();
        const DB_PATH: &'static str = "../target/debug/tests.sqlite";
        let _guard = MUTEX.lock().unwrap();
        if Path::new(DB_PATH).exists() {
            fs::remove_file(DB_PATH).await.expect(
                format!("Failed to remove existing test database file {}", DB_PATH).as_str(),
            );
        }
        assert!(
            !Path::new(DB_PATH).exists(),
            "Database file should not exist before test"
        );
        let driver = SqliteDriver::new();
        let connection = driver
            .connect(&format!("sqlite://{}?mode=rwc", DB_PATH))
            .await
            .expect("Could not open the database");
        assert!(
            Path::new(DB_PATH).exists(),
            "Database file should be created after connection"
        );
        execute_tests(connection).await;
    }

    #[tokio::test]
    async fn rebuild_table() {
        init_logs();
        let driver = SqliteDriver::new();
        let mut connection = driver
            .connect("sqlite://:memory:")
            .await
            .expect("Could not open the in memory database");
        Ticket::auto_migrate(&mut connection)
            .await
            .expect("Failed to create the tickets table");
        let writer = connection.driver().sql_writer();
        let mut priority = Ticket::columns(writer.as_ref())
            .get("priority")
            .cloned()
            .expect("Missing priority column");

        // Rebuilding the empty table keeps the declared sequence start
        priority.size = Some(12);
        priority.sql_type = writer.column_type(&priority);
        driver
            .alter_column(&mut connection, "tickets", &priority)
            .await
            .expect("Failed to alter the column of the empty table");
        let mut first = Ticket {
            title: "first".into(),
            priority: Some("low".into()),
            ..Default::default()
        };
        first
            .insert(&mut connection, QueryOptions::new())
            .await
            .expect("Failed to insert the first ticket");
        assert_eq!(first.id, 100);

        // Altering a column copies the data into the new definition
        priority.size = Some(16);
        priority.sql_type = writer.column_type(&priority);
        driver
            .alter_column(&mut connection, "tickets", &priority)
            .await
            .expect("Failed to alter the column");
        let columns = driver
            .column_types(&mut connection, "tickets")
            .await
            .expect("Failed to read the columns");
        assert_eq!(
            columns
                .iter()
                .find(|v| v.name == "priority")
                .and_then(|v| v.length),
            Some(16)
        );
        assert!(
            driver
                .has_index(&mut connection, "tickets", "idx_tickets_title")
                .await
                .expect("Failed to check the index"),
            "Indexes must survive the rebuild"
        );
        let loaded = Ticket::get(&mut connection, QueryOptions::new().selector("id=100"))
            .await
            .expect("Failed to get the ticket after the rebuild");
        assert_eq!(loaded, first);

        // The sequence survives the rebuild as well
        let mut second = Ticket {
            title: "second".into(),
            ..Default::default()
        };
        second
            .insert(&mut connection, QueryOptions::new())
            .await
            .expect("Failed to insert the second ticket");
        assert_eq!(second.id, 101);

        // Dropping a column keeps the remaining ones
        driver
            .drop_column(&mut connection, "tickets", "priority")
            .await
            .expect("Failed to drop the column");
        let names = driver
            .column_types(&mut connection, "tickets")
            .await
            .expect("Failed to read the columns")
            .into_iter()
            .map(|v| v.name)
            .collect::<Vec<_>>();
        assert_eq!(names, ["id", "title"]);
        let tickets = Ticket::list(&mut connection, QueryOptions::new())
            .await
            .expect("Failed to list the tickets");
        assert_eq!(tickets.len(), 2);
        assert!(tickets.iter().all(|v| v.priority.is_none()));
        assert!(
            driver
                .drop_column(&mut connection, "tickets", "missing")
                .await
                .is_err()
        );
    }
}
