use crate::{
    ColumnDef, Error, QueryOptions, Record, Result, SqlWriter, Statement, Value, separated_by,
};
use regex::Regex;
use std::sync::LazyLock;

static SELECT_FROM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^\s*select\s+.+?\s+from\s+").unwrap());

fn write_table<R: Record>(out: &mut String, writer: &dyn SqlWriter, options: &QueryOptions) {
    writer.write_identifier_quoted(out, &options.table_or::<R>());
}

/// `WHERE <selector>` when the options carry a non empty selector.
fn write_selector(
    out: &mut String,
    args: &mut Vec<Value>,
    writer: &dyn SqlWriter,
    options: &QueryOptions,
) -> Result<bool> {
    let Some(selector) = options.parsed_selector()? else {
        return Ok(false);
    };
    if selector.is_empty() {
        return Ok(false);
    }
    let (sql, selector_args) = selector.sql_with(writer);
    out.push_str(" WHERE ");
    out.push_str(&sql);
    args.extend(selector_args);
    Ok(true)
}

fn write_limit(out: &mut String, args: &mut Vec<Value>, offset: Option<u64>, limit: Option<u64>) {
    if let Some(limit) = limit {
        out.push_str(" LIMIT ?");
        args.push(Value::Int(Some(limit.min(i64::MAX as u64) as i64)));
        if let Some(offset) = offset.filter(|v| *v > 0) {
            out.push_str(" OFFSET ?");
            args.push(Value::Int(Some(offset.min(i64::MAX as u64) as i64)));
        }
    }
}

/// Value of `column` ready to be bound: auto timestamps holding a zero
/// value are replaced with the current time.
fn stored_value<R: Record>(record: &R, column: &ColumnDef) -> Result<Value> {
    let value = record.column_value(&column.path)?;
    if column.is_auto_time() && value.is_zero() {
        return Ok(column.now());
    }
    Ok(column.encode(value))
}

/// `INSERT INTO <table> (cols) VALUES (?, ...)` for every column holding a
/// value. `None` fields and zero auto increment keys are left out.
pub fn gen_insert_sql<R: Record>(
    record: &R,
    writer: &dyn SqlWriter,
    options: &QueryOptions,
) -> Result<Statement> {
    let columns = R::columns(writer);
    let mut names = Vec::new();
    let mut args = Vec::new();
    for column in columns.iter() {
        let value = stored_value(record, column)?;
        if value.is_null() || (column.auto_increment && value.is_zero()) {
            continue;
        }
        names.push(column.name.as_str());
        args.push(value);
    }
    if names.is_empty() {
        return Err(Error::msg(format!(
            "Cannot insert a `{}` without any value",
            R::shape().name
        )));
    }
    let mut sql = String::with_capacity(128);
    sql.push_str("INSERT INTO ");
    write_table::<R>(&mut sql, writer, options);
    sql.push_str(" (");
    separated_by(
        &mut sql,
        &names,
        |out, v| writer.write_identifier_quoted(out, v),
        ", ",
    );
    sql.push_str(") VALUES (");
    separated_by(&mut sql, &names, |out, _| out.push('?'), ", ");
    sql.push(')');
    Ok(Statement { sql, args })
}

/// `UPDATE <table> SET ... WHERE ...`: key (`where`) columns go in the
/// WHERE clause, the other columns holding a value in the SET clause.
/// Either clause being empty is an error.
pub fn gen_update_sql<R: Record>(
    record: &R,
    writer: &dyn SqlWriter,
    options: &QueryOptions,
) -> Result<Statement> {
    let columns = R::columns(writer);
    let only = options.columns();
    let mut set = Vec::new();
    let mut set_args = Vec::new();
    let mut keys = Vec::new();
    let mut key_args = Vec::new();
    for column in columns.iter() {
        if column.is_where {
            let value = column.encode(record.column_value(&column.path)?);
            let is_null = value.is_null();
            if !is_null {
                key_args.push(value);
            }
            keys.push((column.name.as_str(), is_null));
            continue;
        }
        if column.auto_increment
            || (!only.is_empty() && !only.iter().any(|v| v.eq_ignore_ascii_case(&column.name)))
        {
            continue;
        }
        let value = if column.auto_update_time.is_some() {
            column.now()
        } else {
            let value = column.encode(record.column_value(&column.path)?);
            if column.auto_create_time.is_some() && value.is_zero() {
                continue;
            }
            value
        };
        if value.is_null() {
            continue;
        }
        set.push(column.name.as_str());
        set_args.push(value);
    }
    if set.is_empty() {
        return Err(Error::msg(format!(
            "Cannot update a `{}` without any value to set",
            R::shape().name
        )));
    }
    if keys.is_empty() {
        return Err(Error::msg(format!(
            "Cannot update a `{}` without a `where` field, unscoped updates are rejected",
            R::shape().name
        )));
    }
    let mut sql = String::with_capacity(128);
    sql.push_str("UPDATE ");
    write_table::<R>(&mut sql, writer, options);
    sql.push_str(" SET ");
    separated_by(
        &mut sql,
        &set,
        |out, v| {
            writer.write_identifier_quoted(out, v);
            out.push_str(" = ?");
        },
        ", ",
    );
    sql.push_str(" WHERE ");
    separated_by(
        &mut sql,
        &keys,
        |out, (name, is_null)| {
            writer.write_identifier_quoted(out, name);
            out.push_str(if *is_null { " IS NULL" } else { " = ?" });
        },
        " AND ",
    );
    set_args.extend(key_args);
    Ok(Statement {
        sql,
        args: set_args,
    })
}

fn gen_select<R: Record>(writer: &dyn SqlWriter, options: &QueryOptions) -> Result<Statement> {
    let mut sql = String::with_capacity(128);
    let mut args = Vec::new();
    sql.push_str("SELECT ");
    if options.columns().is_empty() {
        sql.push('*');
    } else {
        separated_by(
            &mut sql,
            options.columns(),
            |out, v| writer.write_identifier_quoted(out, v),
            ", ",
        );
    }
    sql.push_str(" FROM ");
    write_table::<R>(&mut sql, writer, options);
    write_selector(&mut sql, &mut args, writer, options)?;
    Ok(Statement { sql, args })
}

/// Single row read, limited to one row unless the options set a limit.
pub fn gen_get_sql<R: Record>(writer: &dyn SqlWriter, options: &QueryOptions) -> Result<Statement> {
    let mut statement = gen_select::<R>(writer, options)?;
    let (offset, limit) = options.offset_limit();
    write_limit(
        &mut statement.sql,
        &mut statement.args,
        offset,
        Some(limit.unwrap_or(1)),
    );
    Ok(statement)
}

/// Multi row read, with the count companion when the options ask for a total.
pub fn gen_list_sql<R: Record>(
    writer: &dyn SqlWriter,
    options: &QueryOptions,
) -> Result<(Statement, Option<Statement>)> {
    let mut statement = gen_select::<R>(writer, options)?;
    let count = if options.wants_total() {
        Some(gen_count_sql(&statement)?)
    } else {
        None
    };
    let (offset, limit) = options.offset_limit();
    write_limit(&mut statement.sql, &mut statement.args, offset, limit);
    Ok((statement, count))
}

/// Swaps the column list of a `SELECT ... FROM` query with `COUNT(*)`.
pub fn gen_count_sql(statement: &Statement) -> Result<Statement> {
    if !SELECT_FROM.is_match(&statement.sql) {
        return Err(Error::msg(format!(
            "Cannot derive a count query from `{}`, expected a `SELECT ... FROM` query",
            statement
        )));
    }
    Ok(Statement {
        sql: SELECT_FROM
            .replace(&statement.sql, "SELECT COUNT(*) FROM ")
            .into_owned(),
        args: statement.args.clone(),
    })
}

/// `DELETE FROM <table> WHERE <selector>`, a missing selector is rejected.
pub fn gen_delete_sql<R: Record>(
    writer: &dyn SqlWriter,
    options: &QueryOptions,
) -> Result<Statement> {
    let mut sql = String::with_capacity(64);
    let mut args = Vec::new();
    sql.push_str("DELETE FROM ");
    write_table::<R>(&mut sql, writer, options);
    if !write_selector(&mut sql, &mut args, writer, options)? {
        return Err(Error::msg(format!(
            "Cannot delete from `{}` without a selector, unscoped deletes are rejected",
            options.table_or::<R>()
        )));
    }
    Ok(Statement { sql, args })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count() {
        let statement = Statement::with_args(
            "SELECT `a`, `b` FROM `t` WHERE `a` = ?",
            [Value::Int(Some(1))],
        );
        let count = gen_count_sql(&statement).unwrap();
        assert_eq!(count.sql, "SELECT COUNT(*) FROM `t` WHERE `a` = ?");
        assert_eq!(count.args, statement.args);

        let count = gen_count_sql(&Statement::new("  select *\nfrom t")).unwrap();
        assert_eq!(count.sql, "SELECT COUNT(*) FROM t");

        assert!(gen_count_sql(&Statement::new("DELETE FROM t")).is_err());
    }

    #[test]
    fn limit() {
        let mut sql = String::new();
        let mut args = Vec::new();
        write_limit(&mut sql, &mut args, Some(20), Some(10));
        assert_eq!(sql, " LIMIT ? OFFSET ?");
        assert_eq!(args, vec![Value::Int(Some(10)), Value::Int(Some(20))]);
        let mut sql = String::new();
        write_limit(&mut sql, &mut Vec::new(), Some(0), Some(5));
        assert_eq!(sql, " LIMIT ?");
    }
}
