#[cfg(test)]
mod tests {
    use indoc::indoc;
    use keel::{
        ColumnDef, DataKind, GenericSqlWriter, QueryOptions, Record, SqlWriter, Value,
        gen_delete_sql, gen_get_sql, gen_insert_sql, gen_list_sql, gen_update_sql,
    };

    const WRITER: GenericSqlWriter = GenericSqlWriter;

    #[derive(Debug, Default, Clone, PartialEq, Record)]
    struct Person {
        #[sql("primary_key,auto_increment,where")]
        id: i64,
        #[sql("size=64")]
        name: String,
        age: Option<u32>,
        #[sql("auto_create_time=second")]
        created_at: i64,
        #[sql("auto_update_time=second")]
        updated_at: i64,
    }

    #[derive(Debug, Default, Record)]
    struct Note {
        #[sql("auto_increment")]
        id: i64,
        text: Option<String>,
    }

    struct Typed;

    impl SqlWriter for Typed {
        fn name(&self) -> &'static str {
            "typed"
        }

        fn write_column_type(&self, out: &mut String, column: &ColumnDef) {
            match column.kind {
                DataKind::String => {
                    out.push_str(&format!("VARCHAR({})", column.size.unwrap_or(255)))
                }
                _ => out.push_str("BIGINT"),
            }
        }
    }

    fn is_now(value: &Value) -> bool {
        matches!(value, Value::Int(Some(v)) if *v > 1_600_000_000)
    }

    #[test]
    fn create_table() {
        let writer = Typed;
        let columns = Person::columns(&writer);
        let mut sql = String::new();
        writer.write_create_table(&mut sql, &Person::table_name(), &columns, true);
        assert_eq!(
            sql,
            indoc! {"
                CREATE TABLE IF NOT EXISTS `person` (
                    `id` BIGINT NOT NULL,
                    `name` VARCHAR(64),
                    `age` BIGINT,
                    `created_at` BIGINT,
                    `updated_at` BIGINT,
                    PRIMARY KEY (`id`)
                );
            "}
            .trim()
        );
        let mut sql = String::new();
        writer.write_create_table(&mut sql, "notes", &Note::columns(&writer), false);
        assert_eq!(
            sql,
            indoc! {"
                CREATE TABLE `notes` (
                    `id` BIGINT,
                    `text` VARCHAR(255)
                );
            "}
            .trim()
        );
    }

    #[test]
    fn insert() {
        let person = Person {
            name: "ann".into(),
            ..Default::default()
        };
        let statement = gen_insert_sql(&person, &WRITER, &QueryOptions::new()).unwrap();
        assert_eq!(
            statement.sql,
            "INSERT INTO `person` (`name`, `created_at`, `updated_at`) VALUES (?, ?, ?)"
        );
        assert_eq!(statement.args[0], Value::Varchar(Some("ann".into())));
        assert!(is_now(&statement.args[1]));
        assert!(is_now(&statement.args[2]));

        let person = Person {
            id: 7,
            name: "ann".into(),
            age: Some(30),
            created_at: 100,
            updated_at: 0,
        };
        let statement =
            gen_insert_sql(&person, &WRITER, &QueryOptions::new().table("people")).unwrap();
        assert_eq!(
            statement.sql,
            "INSERT INTO `people` (`id`, `name`, `age`, `created_at`, `updated_at`) VALUES (?, ?, ?, ?, ?)"
        );
        assert_eq!(
            statement.args[..4],
            [
                Value::Int(Some(7)),
                Value::Varchar(Some("ann".into())),
                Value::UInt(Some(30)),
                Value::Int(Some(100)),
            ]
        );
    }

    #[test]
    fn insert_without_values() {
        let error = gen_insert_sql(&Note::default(), &WRITER, &QueryOptions::new())
            .expect_err("Nothing to insert");
        assert!(error.to_string().contains("without any value"));
    }

    #[test]
    fn update() {
        let person = Person {
            id: 7,
            name: "ann".into(),
            age: Some(31),
            created_at: 100,
            updated_at: 5,
        };
        let statement = gen_update_sql(&person, &WRITER, &QueryOptions::new()).unwrap();
        assert_eq!(
            statement.sql,
            "UPDATE `person` SET `name` = ?, `age` = ?, `created_at` = ?, `updated_at` = ? WHERE `id` = ?"
        );
        assert_eq!(statement.args.len(), 5);
        assert_eq!(statement.args[1], Value::UInt(Some(31)));
        assert!(is_now(&statement.args[3]));
        assert_eq!(statement.args[4], Value::Int(Some(7)));

        // A zero creation time is never written back
        let person = Person {
            created_at: 0,
            ..person
        };
        let statement = gen_update_sql(&person, &WRITER, &QueryOptions::new()).unwrap();
        assert_eq!(
            statement.sql,
            "UPDATE `person` SET `name` = ?, `age` = ?, `updated_at` = ? WHERE `id` = ?"
        );

        let statement =
            gen_update_sql(&person, &WRITER, &QueryOptions::new().cols(["AGE"])).unwrap();
        assert_eq!(statement.sql, "UPDATE `person` SET `age` = ? WHERE `id` = ?");
        assert_eq!(
            statement.args,
            vec![Value::UInt(Some(31)), Value::Int(Some(7))]
        );
    }

    #[test]
    fn update_errors() {
        let person = Person {
            id: 7,
            ..Default::default()
        };
        let error = gen_update_sql(&person, &WRITER, &QueryOptions::new().cols(["age"]))
            .expect_err("Nothing to set");
        assert!(error.to_string().contains("without any value to set"));

        let note = Note {
            id: 1,
            text: Some("x".into()),
        };
        let error =
            gen_update_sql(&note, &WRITER, &QueryOptions::new()).expect_err("No where field");
        assert!(error.to_string().contains("unscoped updates are rejected"));
    }

    #[test]
    fn get() {
        let statement = gen_get_sql::<Person>(
            &WRITER,
            &QueryOptions::new().selector("name=ann,age>3"),
        )
        .unwrap();
        assert_eq!(
            statement.sql,
            "SELECT * FROM `person` WHERE `name` = ? and `age` > ? LIMIT ?"
        );
        assert_eq!(
            statement.args,
            vec![
                Value::Varchar(Some("ann".into())),
                Value::Varchar(Some("3".into())),
                Value::Int(Some(1)),
            ]
        );

        let statement = gen_get_sql::<Person>(
            &WRITER,
            &QueryOptions::new().cols(["id", "name"]).limit(5, 2),
        )
        .unwrap();
        assert_eq!(
            statement.sql,
            "SELECT `id`, `name` FROM `person` LIMIT ? OFFSET ?"
        );
        assert_eq!(
            statement.args,
            vec![Value::Int(Some(2)), Value::Int(Some(5))]
        );
    }

    #[test]
    fn list_and_count() {
        let mut total = 0;
        let options = QueryOptions::new()
            .selector("age>3")
            .limit(10, 5)
            .total(&mut total);
        let (statement, count) = gen_list_sql::<Person>(&WRITER, &options).unwrap();
        assert_eq!(
            statement.sql,
            "SELECT * FROM `person` WHERE `age` > ? LIMIT ? OFFSET ?"
        );
        assert_eq!(statement.args.len(), 3);
        let count = count.expect("A total was requested");
        assert_eq!(count.sql, "SELECT COUNT(*) FROM `person` WHERE `age` > ?");
        assert_eq!(count.args, vec![Value::Varchar(Some("3".into()))]);

        let (statement, count) =
            gen_list_sql::<Person>(&WRITER, &QueryOptions::new().table("people")).unwrap();
        assert_eq!(statement.sql, "SELECT * FROM `people`");
        assert!(statement.args.is_empty());
        assert!(count.is_none());
    }

    #[test]
    fn delete() {
        let statement =
            gen_delete_sql::<Person>(&WRITER, &QueryOptions::new().selector("id in (1,2)"))
                .unwrap();
        assert_eq!(statement.sql, "DELETE FROM `person` WHERE `id` in (?,?)");
        assert_eq!(statement.args.len(), 2);

        for options in [QueryOptions::new(), QueryOptions::new().selector("  ")] {
            let error = gen_delete_sql::<Person>(&WRITER, &options).expect_err("Unscoped delete");
            assert!(error.to_string().contains("unscoped deletes are rejected"));
        }
        assert!(
            gen_delete_sql::<Person>(&WRITER, &QueryOptions::new().selector("id in (1"))
                .is_err()
        );
    }
}
