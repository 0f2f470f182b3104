use crate::{
    AsValue, DataKind, Record, Result, Shape, SqlWriter, Tag, Value, parse_time, snake_case,
};
use std::{
    any::TypeId,
    collections::{HashMap, VecDeque},
    sync::{Arc, LazyLock, PoisonError, RwLock},
};
use time::OffsetDateTime;

/// How an auto timestamp column stores the current time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeEncoding {
    /// Native time column.
    #[default]
    Native,
    UnixSecond,
    UnixMilli,
    UnixNano,
}

impl TimeEncoding {
    pub fn is_unix(&self) -> bool {
        *self != TimeEncoding::Native
    }

    /// Integer representation of `time` in this encoding (seconds for `Native`).
    pub fn encode(&self, time: OffsetDateTime) -> i64 {
        match self {
            TimeEncoding::Native | TimeEncoding::UnixSecond => time.unix_timestamp(),
            TimeEncoding::UnixMilli => (time.unix_timestamp_nanos() / 1_000_000) as i64,
            TimeEncoding::UnixNano => time.unix_timestamp_nanos() as i64,
        }
    }

    pub fn decode(&self, value: i64) -> Result<OffsetDateTime> {
        let nanos = match self {
            TimeEncoding::Native | TimeEncoding::UnixSecond => value as i128 * 1_000_000_000,
            TimeEncoding::UnixMilli => value as i128 * 1_000_000,
            TimeEncoding::UnixNano => value as i128,
        };
        Ok(OffsetDateTime::from_unix_timestamp_nanos(nanos)?)
    }
}

/// Index membership of a column. Columns sharing the same index name form a
/// composite index, an empty name means `idx_<table>_<column>`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct IndexDef {
    pub name: String,
    pub unique: bool,
}

/// Persistence metadata of one record field.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ColumnDef {
    /// Logical column name, lower case.
    pub name: String,
    /// Rust identifier of the field.
    pub field: &'static str,
    /// Index path through the inline fields down to the field.
    pub path: Vec<usize>,
    pub kind: DataKind,
    /// Stored as a JSON document.
    pub json: bool,
    pub nullable: bool,
    pub not_null: bool,
    pub unique: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub auto_increment_start: Option<u64>,
    /// Raw default as written in the annotation.
    pub default: Option<String>,
    /// Parsed default, absent for function calls, `null` and unparsable defaults.
    pub default_value: Option<Value>,
    pub size: Option<u64>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    /// Bit width of the Rust numeric type, zero otherwise.
    pub bits: u8,
    /// Key field, rendered in the WHERE clause of an update.
    pub is_where: bool,
    pub index: Option<IndexDef>,
    pub comment: Option<String>,
    pub type_override: Option<String>,
    pub auto_create_time: Option<TimeEncoding>,
    pub auto_update_time: Option<TimeEncoding>,
    /// Physical type resolved by the dialect.
    pub sql_type: String,
}

impl ColumnDef {
    /// Declared `NOT NULL` in the table definition.
    pub fn is_not_null(&self) -> bool {
        self.not_null || self.primary_key
    }

    /// Used as a key: part of the primary key, unique or indexed.
    pub fn is_key(&self) -> bool {
        self.primary_key || self.unique || self.index.is_some()
    }

    pub fn time_encoding(&self) -> TimeEncoding {
        self.auto_create_time
            .or(self.auto_update_time)
            .unwrap_or_default()
    }

    /// Time field stored as an integer.
    pub fn is_unix_time(&self) -> bool {
        self.kind == DataKind::Time && self.time_encoding().is_unix()
    }

    pub fn is_auto_time(&self) -> bool {
        self.auto_create_time.is_some() || self.auto_update_time.is_some()
    }

    /// Converts a field value into the representation stored in the database.
    pub fn encode(&self, value: Value) -> Value {
        match value {
            Value::Time(v) if self.is_unix_time() => {
                Value::Int(v.map(|v| self.time_encoding().encode(v)))
            }
            v => v,
        }
    }

    /// Converts a database cell into the representation expected by the field.
    pub fn decode(&self, value: Value) -> Result<Value> {
        if self.kind != DataKind::Time {
            return Ok(value);
        }
        Ok(match value {
            Value::Int(Some(v)) => Value::Time(Some(self.time_encoding().decode(v)?)),
            Value::UInt(Some(v)) => Value::Time(Some(
                self.time_encoding().decode(i64::try_from_value(Value::UInt(Some(v)))?)?,
            )),
            Value::Float(Some(v)) => Value::Time(Some(self.time_encoding().decode(v as i64)?)),
            v => v,
        })
    }

    /// Current time in the representation of this column.
    pub fn now(&self) -> Value {
        let now = OffsetDateTime::now_utc();
        let encoding = self.time_encoding();
        match self.kind {
            DataKind::Time if !encoding.is_unix() => Value::Time(Some(now)),
            DataKind::Uint => Value::UInt(Some(encoding.encode(now) as u64)),
            _ => Value::Int(Some(encoding.encode(now))),
        }
    }
}

/// Ordered column descriptors of a record, for one dialect.
#[derive(Debug, Default, Clone)]
pub struct ColumnSet {
    pub columns: Vec<ColumnDef>,
    by_name: HashMap<String, usize>,
}

impl ColumnSet {
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        let by_name = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.to_lowercase(), i))
            .collect();
        Self { columns, by_name }
    }

    /// Resolves the columns of `R` for the dialect `writer`.
    ///
    /// # Panics
    /// On duplicate column names declared by the same struct and on
    /// malformed numeric modifiers.
    pub fn extract<R: Record>(writer: &dyn SqlWriter) -> ColumnSet {
        Self::from_shape(R::shape(), writer)
    }

    pub fn from_shape(shape: &'static Shape, writer: &dyn SqlWriter) -> ColumnSet {
        struct Claim {
            depth: usize,
            origin: usize,
            column: Option<usize>,
        }
        let mut columns: Vec<Option<ColumnDef>> = Vec::new();
        let mut claims: HashMap<String, Claim> = HashMap::new();
        let mut queue = VecDeque::from([(shape, 0, Vec::<usize>::new(), 0)]);
        let mut origins = 1;
        while let Some((shape, depth, prefix, origin)) = queue.pop_front() {
            for (i, field) in shape.fields.iter().enumerate() {
                let tag = Tag::parse(field.ident, field.tag);
                if tag.skip {
                    continue;
                }
                let mut path = prefix.clone();
                path.push(i);
                if let Some(inline) = field.inline {
                    queue.push_back((inline(), depth + 1, path, origins));
                    origins += 1;
                    continue;
                }
                let column = build_column(field, tag, path, writer);
                match claims.get_mut(&column.name) {
                    None => {
                        claims.insert(
                            column.name.clone(),
                            Claim {
                                depth,
                                origin,
                                column: Some(columns.len()),
                            },
                        );
                        columns.push(Some(column));
                    }
                    Some(claim) if claim.origin == origin => {
                        panic!(
                            "Duplicate column `{}` in `{}` (field `{}`)",
                            column.name, shape.name, field.ident
                        );
                    }
                    Some(claim) if claim.depth < depth => {
                        log::debug!(
                            "Column `{}` from `{}.{}` is shadowed by a shallower field",
                            column.name,
                            shape.name,
                            field.ident
                        );
                    }
                    Some(claim) => {
                        log::warn!(
                            "Column `{}` is declared by more than one inline struct at the same depth, it will be excluded (last seen in `{}.{}`)",
                            column.name,
                            shape.name,
                            field.ident
                        );
                        if let Some(i) = claim.column.take() {
                            columns[i] = None;
                        }
                    }
                }
            }
        }
        ColumnSet::new(columns.into_iter().flatten().collect())
    }

    /// Position of the column named `name`, case insensitive.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.by_name.get(&name.to_lowercase()).copied()
    }

    pub fn get(&self, name: &str) -> Option<&ColumnDef> {
        self.position(name).map(|i| &self.columns[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn primary_key(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.primary_key)
    }

    pub fn auto_increment(&self) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.auto_increment)
    }

    /// Declared indexes in order of first appearance, default names resolved
    /// against `table`.
    pub fn indexes(&self, table: &str) -> Vec<(String, bool, Vec<&ColumnDef>)> {
        let mut result: Vec<(String, bool, Vec<&ColumnDef>)> = Vec::new();
        for column in &self.columns {
            let Some(index) = &column.index else {
                continue;
            };
            let name = if index.name.is_empty() {
                format!("idx_{}_{}", table, column.name)
            } else {
                index.name.clone()
            };
            match result.iter_mut().find(|(n, ..)| *n == name) {
                Some((_, unique, columns)) => {
                    *unique = *unique && index.unique;
                    columns.push(column);
                }
                None => result.push((name, index.unique, vec![column])),
            }
        }
        result
    }
}

fn build_column(
    field: &'static crate::FieldDef,
    tag: Tag,
    path: Vec<usize>,
    writer: &dyn SqlWriter,
) -> ColumnDef {
    let name = tag
        .name
        .clone()
        .unwrap_or_else(|| snake_case(field.ident))
        .to_lowercase();
    let mut column = ColumnDef {
        nullable: field.nullable && !tag.not_null && !tag.primary_key,
        name,
        field: field.ident,
        path,
        kind: field.kind,
        json: field.json,
        not_null: tag.not_null,
        unique: tag.unique,
        primary_key: tag.primary_key,
        auto_increment: tag.auto_increment,
        auto_increment_start: tag.auto_increment_start,
        default_value: None,
        default: tag.default,
        size: tag.size,
        precision: tag.precision,
        scale: tag.scale,
        bits: field.bits,
        is_where: tag.is_where,
        index: tag.index,
        comment: tag.comment,
        type_override: tag.type_override,
        auto_create_time: tag.auto_create_time,
        auto_update_time: tag.auto_update_time,
        sql_type: String::new(),
    };
    resolve_auto_time(&mut column);
    column.default_value = parse_default(&column);
    column.sql_type = writer.column_type(&column);
    column
}

fn resolve_auto_time(column: &mut ColumnDef) {
    let accepts_time = matches!(column.kind, DataKind::Time | DataKind::Int | DataKind::Uint);
    if column.auto_create_time.is_none() && column.name == "created_at" && accepts_time {
        column.auto_create_time = Some(TimeEncoding::Native);
    }
    if column.auto_update_time.is_none() && column.name == "updated_at" && accepts_time {
        column.auto_update_time = Some(TimeEncoding::Native);
    }
    if !accepts_time && column.is_auto_time() {
        log::warn!(
            "Column `{}` of kind {} cannot hold an automatic timestamp, the modifier is ignored",
            column.name,
            column.kind
        );
        column.auto_create_time = None;
        column.auto_update_time = None;
        return;
    }
    if column.kind != DataKind::Time {
        for encoding in [&mut column.auto_create_time, &mut column.auto_update_time] {
            if *encoding == Some(TimeEncoding::Native) {
                *encoding = Some(TimeEncoding::UnixSecond);
            }
        }
    }
}

fn parse_default(column: &ColumnDef) -> Option<Value> {
    let raw = column.default.as_deref()?.trim();
    if raw.is_empty() || raw.contains('(') || raw.eq_ignore_ascii_case("null") {
        return None;
    }
    let text = raw
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .unwrap_or(raw);
    let parsed = match column.kind {
        DataKind::Bool => bool::try_from_value(text.into()).map(|v| v.as_value()),
        DataKind::Int => i64::try_from_value(text.into()).map(|v| v.as_value()),
        DataKind::Uint => u64::try_from_value(text.into()).map(|v| v.as_value()),
        DataKind::Float => f64::try_from_value(text.into()).map(|v| v.as_value()),
        DataKind::String => Ok(Value::Varchar(Some(text.into()))),
        DataKind::Time => parse_time(text).map(|v| column.encode(v.as_value())),
        DataKind::Bytes => Ok(Value::Blob(Some(text.as_bytes().into()))),
    };
    match parsed {
        Ok(v) => Some(v),
        Err(e) => {
            log::warn!(
                "The default `{}` of column `{}` is not a valid {}, it is kept as raw text: {:#}",
                raw,
                column.name,
                column.kind,
                e
            );
            None
        }
    }
}

/// Process wide cache of resolved column sets, keyed by record type and
/// dialect name. Entries are written once and never replaced.
#[derive(Debug, Default)]
pub struct ColumnCache {
    entries: RwLock<HashMap<(TypeId, &'static str), Arc<ColumnSet>>>,
}

static GLOBAL_CACHE: LazyLock<ColumnCache> = LazyLock::new(ColumnCache::new);

impl ColumnCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> &'static ColumnCache {
        &GLOBAL_CACHE
    }

    pub fn get<R: Record>(&self, writer: &dyn SqlWriter) -> Arc<ColumnSet> {
        let key = (TypeId::of::<R>(), writer.name());
        if let Some(v) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return v.clone();
        }
        let columns = Arc::new(ColumnSet::extract::<R>(writer));
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert(columns)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
