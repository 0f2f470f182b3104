#[cfg(test)]
mod tests {
    use keel_core::{Connection, Executor, Query, QueryResult, Value, stream::TryStreamExt};
    use keel_sqlite::SqliteConnection;
    use keel_tests::{init_logs, silent_logs};
    use std::{path::Path, sync::Mutex};
    use tokio::fs;

    static MUTEX: Mutex<()> = Mutex::new(());

    #[tokio::test]
    async fn create_database() {
        init_logs();
        const DB_PATH: &'static str = "../target/debug/creation.sqlite";
        let _guard = MUTEX.lock().unwrap();
        if Path::new(DB_PATH).exists() {
            fs::remove_file(DB_PATH)
                .await
                .expect(format!("Failed to remove test database file {}", DB_PATH).as_str());
        }
        assert!(
            !Path::new(DB_PATH).exists(),
            "Database file should not exist before test"
        );
        SqliteConnection::connect(&format!("sqlite://{}?mode=rwc", DB_PATH))
            .await
            .expect("Could not open the database");
        assert!(
            Path::new(DB_PATH).exists(),
            "Database file should be created after connection"
        );
        SqliteConnection::connect(&format!("sqlite://{}?mode=ro", DB_PATH))
            .await
            .expect("Could not open the database");
        fs::remove_file(DB_PATH)
            .await
            .expect(format!("Failed to remove existing test database file {}", DB_PATH).as_str());
        silent_logs! {
            assert!(
                SqliteConnection::connect(&format!("sqlite://{}?mode=ro", DB_PATH))
                    .await
                    .is_err(),
                "Should not be able to open in read only unexisting database"
            );
        }
    }

    #[tokio::test]
    async fn wrong_url() {
        silent_logs! {
            assert!(
                SqliteConnection::connect("mysql://some_value")
                    .await
                    .is_err()
            );
        };
    }

    #[tokio::test]
    async fn raw_statements() {
        init_logs();
        let mut connection = SqliteConnection::connect("sqlite://:memory:")
            .await
            .expect("Could not open the in memory database");
        let results = connection
            .run(Query::Raw(
                "CREATE TABLE t (a INTEGER); INSERT INTO t VALUES (1), (2); SELECT a FROM t ORDER BY a;"
                    .into(),
            ))
            .try_collect::<Vec<_>>()
            .await
            .expect("Failed to run the statements");
        let rows = results
            .iter()
            .filter_map(|v| match v {
                QueryResult::Row(v) => Some(v.values[0].clone()),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(rows, [Value::Int(Some(1)), Value::Int(Some(2))]);
        let affected = results
            .iter()
            .filter_map(|v| match v {
                QueryResult::Affected(v) => Some(v.rows_affected),
                _ => None,
            })
            .sum::<u64>();
        assert_eq!(affected, 2);

        let mut query = connection
            .prepare("SELECT a FROM t WHERE a > ?".into())
            .await
            .expect("Failed to prepare the query");
        query.bind(1).expect("Failed to bind the parameter");
        let rows = connection
            .fetch(query)
            .try_collect::<Vec<_>>()
            .await
            .expect("Failed to fetch the prepared query");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].names(), ["a"]);

        silent_logs! {
            assert!(
                connection
                    .prepare("SELECT 1; SELECT 2".into())
                    .await
                    .is_err(),
                "A prepared query holds a single statement"
            );
        }
    }
}
