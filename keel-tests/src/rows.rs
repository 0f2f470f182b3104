use keel::{Executor, QueryOptions, Record, Rows};
use std::sync::LazyLock;
use tokio::sync::Mutex;

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct Reading {
    #[sql("primary_key,where")]
    sequence: u32,
    value: f64,
    #[sql("size=8")]
    unit: Option<String>,
}

pub async fn rows<E: Executor>(executor: &mut E) {
    static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    let _lock = MUTEX.lock().await;

    // Setup
    Reading::drop_table(executor, true)
        .await
        .expect("Failed to drop the reading table");
    Reading::create_table(executor, true)
        .await
        .expect("Failed to create the reading table");
    for sequence in 1..=10 {
        let mut reading = Reading {
            sequence,
            value: sequence as f64 / 4.0,
            unit: (sequence % 3 == 0).then(|| "kPa".to_string()),
        };
        reading
            .insert(executor, QueryOptions::new())
            .await
            .expect("Failed to insert a reading");
    }

    // Cursor over every row
    {
        let mut rows: Rows<Reading> = Reading::rows(executor, QueryOptions::new())
            .await
            .expect("Failed to open the cursor");
        let mut sequences = Vec::new();
        while rows.next().await.expect("Failed to advance the cursor") {
            let reading = rows.row().expect("Failed to bind the reading");
            assert_eq!(reading.value, reading.sequence as f64 / 4.0);
            assert_eq!(reading.unit.is_some(), reading.sequence % 3 == 0);
            sequences.push(reading.sequence);
        }
        sequences.sort();
        assert_eq!(sequences, (1..=10).collect::<Vec<_>>());
        assert!(!rows.next().await.expect("A finished cursor stays finished"));
        assert!(rows.row().is_err());
    }

    // Closed early
    {
        let mut rows = Reading::rows(executor, QueryOptions::new().selector("unit"))
            .await
            .expect("Failed to open the cursor");
        assert!(rows.next().await.expect("Failed to advance the cursor"));
        let reading = rows.row().expect("Failed to bind the reading");
        assert_eq!(reading.unit.as_deref(), Some("kPa"));
        rows.close();
        assert!(!rows.next().await.expect("A closed cursor stays closed"));
    }

    // The connection is usable again once the cursor is gone
    let reading = Reading::get(executor, QueryOptions::new().selector("sequence=7"))
        .await
        .expect("Failed to get a reading after the cursors");
    assert_eq!(reading.value, 1.75);
}
