#[cfg(test)]
mod tests {
    use keel::{
        ColumnCache, ColumnSet, DataKind, GenericSqlWriter, IndexDef, Record, TimeEncoding, Value,
    };
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;
    use time::OffsetDateTime;

    #[derive(Debug, Default, Clone, PartialEq, Record)]
    struct Audit {
        created_at: Option<OffsetDateTime>,
        #[sql("auto_update_time=milli")]
        touched: i64,
        #[sql("size=32")]
        note: String,
    }

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Settings {
        theme: String,
        volume: u8,
    }

    #[derive(Debug, Default, Clone, PartialEq, Record)]
    #[keel(table = "accounts")]
    struct UserAccount {
        #[sql("primary_key,auto_increment=1000,where")]
        id: u64,
        #[sql("user_name,size=64,unique,not_null")]
        name: String,
        #[sql("name=mail,size=128,index")]
        email: Option<String>,
        #[sql("precision=10,scale=2,default=0")]
        balance: f64,
        settings: Settings,
        tags: Vec<String>,
        avatar: Option<Vec<u8>>,
        #[sql("inline")]
        audit: Audit,
        #[sql("-")]
        session: Option<String>,
        #[sql("note,size=16")]
        remark: String,
    }

    #[derive(Debug, Default, Record)]
    struct OrderLine {
        quantity: u32,
    }

    #[test]
    fn column_names() {
        let columns = ColumnSet::extract::<UserAccount>(&GenericSqlWriter);
        assert_eq!(
            columns.iter().map(|v| v.name.as_str()).collect::<Vec<_>>(),
            [
                "id",
                "user_name",
                "mail",
                "balance",
                "settings",
                "tags",
                "avatar",
                "note",
                "created_at",
                "touched",
            ]
        );
        assert!(columns.get("session").is_none());
        assert_eq!(columns.position("USER_NAME"), Some(1));
        // The top level field shadows the inline one
        assert_eq!(columns.get("note").map(|v| v.field), Some("remark"));
        assert_eq!(columns.get("note").and_then(|v| v.size), Some(16));
    }

    #[test]
    fn modifiers() {
        let columns = ColumnSet::extract::<UserAccount>(&GenericSqlWriter);

        let id = columns.get("id").unwrap();
        assert!(id.primary_key && id.auto_increment && id.is_where);
        assert_eq!(id.auto_increment_start, Some(1000));
        assert_eq!(id.kind, DataKind::Uint);
        assert_eq!(id.bits, 64);
        assert!(!id.nullable);
        assert_eq!(columns.primary_key().count(), 1);
        assert_eq!(columns.auto_increment().map(|v| v.field), Some("id"));

        let name = columns.get("user_name").unwrap();
        assert!(name.unique && name.not_null && name.is_key());
        assert_eq!(name.size, Some(64));
        assert_eq!(name.kind, DataKind::String);

        let mail = columns.get("mail").unwrap();
        assert!(mail.nullable);
        assert_eq!(mail.index, Some(IndexDef::default()));
        let indexes = columns.indexes("accounts");
        assert_eq!(indexes.len(), 1);
        assert_eq!(indexes[0].0, "idx_accounts_mail");
        assert!(!indexes[0].1);

        let balance = columns.get("balance").unwrap();
        assert_eq!((balance.precision, balance.scale), (Some(10), Some(2)));
        assert_eq!(balance.default.as_deref(), Some("0"));
        assert_eq!(balance.default_value, Some(Value::Float(Some(0.0))));
    }

    #[test]
    fn data_kinds() {
        let columns = ColumnSet::extract::<UserAccount>(&GenericSqlWriter);
        let settings = columns.get("settings").unwrap();
        assert!(settings.json && !settings.nullable);
        assert_eq!(settings.kind, DataKind::Bytes);
        assert!(columns.get("tags").unwrap().json);
        let avatar = columns.get("avatar").unwrap();
        assert!(!avatar.json && avatar.nullable);
        assert_eq!(avatar.kind, DataKind::Bytes);
    }

    #[test]
    fn inline_and_auto_time() {
        let columns = ColumnSet::extract::<UserAccount>(&GenericSqlWriter);
        let created_at = columns.get("created_at").unwrap();
        assert_eq!(created_at.path, vec![7, 0]);
        assert_eq!(created_at.kind, DataKind::Time);
        assert_eq!(created_at.auto_create_time, Some(TimeEncoding::Native));
        assert!(!created_at.is_unix_time());

        let touched = columns.get("touched").unwrap();
        assert_eq!(touched.path, vec![7, 1]);
        assert_eq!(touched.auto_update_time, Some(TimeEncoding::UnixMilli));
        assert_eq!(touched.kind, DataKind::Int);

        let mut account = UserAccount::default();
        account
            .set_column_value(&created_at.path, Value::Time(Some(OffsetDateTime::UNIX_EPOCH)))
            .unwrap();
        account
            .set_column_value(&touched.path, Value::Int(Some(42)))
            .unwrap();
        assert_eq!(account.audit.created_at, Some(OffsetDateTime::UNIX_EPOCH));
        assert_eq!(account.audit.touched, 42);
        assert_eq!(
            account.column_value(&touched.path).unwrap(),
            Value::Int(Some(42))
        );
        assert!(account.column_value(&[42]).is_err());
    }

    #[test]
    fn table_names() {
        assert_eq!(UserAccount::table_name(), "accounts");
        assert_eq!(OrderLine::table_name(), "order_line");
        assert_eq!(UserAccount::shape().name, "UserAccount");
    }

    #[test]
    fn cache() {
        let cache = ColumnCache::new();
        assert!(cache.is_empty());
        let first = cache.get::<UserAccount>(&GenericSqlWriter);
        let second = cache.get::<UserAccount>(&GenericSqlWriter);
        assert!(Arc::ptr_eq(&first, &second));
        cache.get::<OrderLine>(&GenericSqlWriter);
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[derive(Debug, Default, Record)]
    struct Left {
        x: i32,
        l: i32,
    }

    #[derive(Debug, Default, Record)]
    struct Right {
        x: i32,
        r: i32,
    }

    #[derive(Debug, Default, Record)]
    struct Both {
        id: i32,
        #[sql("inline")]
        left: Left,
        #[sql("inline")]
        right: Right,
    }

    #[test]
    fn ambiguous_inline_column_is_excluded() {
        let columns = ColumnSet::extract::<Both>(&GenericSqlWriter);
        assert_eq!(
            columns.iter().map(|v| v.name.as_str()).collect::<Vec<_>>(),
            ["id", "l", "r"]
        );
    }

    #[derive(Debug, Default, Record)]
    struct Duplicated {
        first: i32,
        #[sql("first")]
        second: i32,
    }

    #[test]
    #[should_panic(expected = "Duplicate column `first`")]
    fn duplicate_column() {
        ColumnSet::extract::<Duplicated>(&GenericSqlWriter);
    }
}
