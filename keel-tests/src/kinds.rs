use keel::{Executor, QueryOptions, Record};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use time::{OffsetDateTime, macros::datetime};
use tokio::sync::Mutex;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Dimensions {
    width: u32,
    height: u32,
}

#[derive(Debug, Clone, PartialEq, Record)]
#[keel(table = "kinds")]
struct Kinds {
    #[sql("primary_key,where")]
    id: i64,
    flag: bool,
    tiny: i8,
    small: u16,
    big: u64,
    ratio: f64,
    single: f32,
    #[sql("size=64")]
    label: String,
    stamp: OffsetDateTime,
    payload: Vec<u8>,
    tags: Vec<String>,
    dimensions: Dimensions,
    maybe_int: Option<i32>,
    maybe_text: Option<String>,
    maybe_time: Option<OffsetDateTime>,
    maybe_bytes: Option<Vec<u8>>,
    maybe_tags: Option<Vec<String>>,
    #[sql("-")]
    transient: u32,
}

impl Default for Kinds {
    fn default() -> Self {
        Self {
            id: 0,
            flag: false,
            tiny: 0,
            small: 0,
            big: 0,
            ratio: 0.0,
            single: 0.0,
            label: String::new(),
            stamp: OffsetDateTime::UNIX_EPOCH,
            payload: Vec::new(),
            tags: Vec::new(),
            dimensions: Dimensions::default(),
            maybe_int: None,
            maybe_text: None,
            maybe_time: None,
            maybe_bytes: None,
            maybe_tags: None,
            transient: 0,
        }
    }
}

pub async fn kinds<E: Executor>(executor: &mut E) {
    static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    let _lock = MUTEX.lock().await;

    // Setup
    Kinds::drop_table(executor, true)
        .await
        .expect("Failed to drop the kinds table");
    Kinds::create_table(executor, false)
        .await
        .expect("Failed to create the kinds table");

    // Every field holding a value
    let mut full = Kinds {
        id: 1,
        flag: true,
        tiny: -100,
        small: 65535,
        big: 9_000_000_000,
        ratio: 0.25,
        single: 1.5,
        label: "Hello world!".into(),
        stamp: datetime!(2024-03-15 10:20:30.125 UTC),
        payload: vec![0, 1, 2, 254, 255],
        tags: vec!["red".into(), "green".into()],
        dimensions: Dimensions {
            width: 640,
            height: 480,
        },
        maybe_int: Some(-7),
        maybe_text: Some("it's here".into()),
        maybe_time: Some(datetime!(1999-12-31 23:59:59 UTC)),
        maybe_bytes: Some(vec![42]),
        maybe_tags: Some(vec![]),
        transient: 99,
    };
    full.insert(executor, QueryOptions::new())
        .await
        .expect("Failed to insert the full row");
    let loaded = Kinds::get(executor, QueryOptions::new().selector("id=1"))
        .await
        .expect("Failed to get the full row");
    full.transient = 0;
    assert_eq!(loaded, full);

    // Zero values and nulls
    let mut empty = Kinds {
        id: 2,
        ..Default::default()
    };
    empty
        .insert(executor, QueryOptions::new())
        .await
        .expect("Failed to insert the empty row");
    let loaded = Kinds::get(executor, QueryOptions::new().selector("id=2"))
        .await
        .expect("Failed to get the empty row");
    assert_eq!(loaded, empty);
    assert_eq!(loaded.maybe_text, None);
    assert_eq!(loaded.maybe_tags, None);

    // Projection leaves the other fields at their default
    let loaded = Kinds::get(
        executor,
        QueryOptions::new().cols(["id", "label"]).selector("id=1"),
    )
    .await
    .expect("Failed to get the projected row");
    assert_eq!(loaded.label, "Hello world!");
    assert_eq!(loaded.big, 0);
    assert_eq!(loaded.maybe_int, None);
}
