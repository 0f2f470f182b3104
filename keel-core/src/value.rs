use std::fmt::{self, Display};
use time::OffsetDateTime;

/// Abstract data kind of a persisted column.
///
/// The kind is what the dialect maps to a physical column type and what the
/// binder dispatches on when a cell is written back into a record.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    Bool,
    Int,
    Uint,
    Float,
    #[default]
    String,
    Time,
    Bytes,
}

impl Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataKind::Bool => "bool",
            DataKind::Int => "int",
            DataKind::Uint => "uint",
            DataKind::Float => "float",
            DataKind::String => "string",
            DataKind::Time => "time",
            DataKind::Bytes => "bytes",
        })
    }
}

/// Dynamically typed cell exchanged with the drivers.
///
/// Every variant carries an `Option` so that a typed `NULL` can be bound as
/// a query parameter. `Null` is the untyped absence of a value, it is what
/// drivers produce when reading a `NULL` cell.
#[derive(Default, Debug, Clone)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int(Option<i64>),
    UInt(Option<u64>),
    Float(Option<f64>),
    Varchar(Option<String>),
    Time(Option<OffsetDateTime>),
    Blob(Option<Box<[u8]>>),
}

impl Value {
    pub fn kind(&self) -> Option<DataKind> {
        Some(match self {
            Value::Null => return None,
            Value::Boolean(..) => DataKind::Bool,
            Value::Int(..) => DataKind::Int,
            Value::UInt(..) => DataKind::Uint,
            Value::Float(..) => DataKind::Float,
            Value::Varchar(..) => DataKind::String,
            Value::Time(..) => DataKind::Time,
            Value::Blob(..) => DataKind::Bytes,
        })
    }

    /// Empty value of the given kind.
    pub fn empty(kind: DataKind) -> Value {
        match kind {
            DataKind::Bool => Value::Boolean(None),
            DataKind::Int => Value::Int(None),
            DataKind::Uint => Value::UInt(None),
            DataKind::Float => Value::Float(None),
            DataKind::String => Value::Varchar(None),
            DataKind::Time => Value::Time(None),
            DataKind::Bytes => Value::Blob(None),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(
            self,
            Value::Null
                | Value::Boolean(None)
                | Value::Int(None)
                | Value::UInt(None)
                | Value::Float(None)
                | Value::Varchar(None)
                | Value::Time(None)
                | Value::Blob(None)
        )
    }

    /// True for `NULL` and for the zero value of the kind (`0`, `false`,
    /// empty string, the unix epoch, empty bytes).
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Boolean(Some(v)) => !v,
            Value::Int(Some(v)) => *v == 0,
            Value::UInt(Some(v)) => *v == 0,
            Value::Float(Some(v)) => *v == 0.0,
            Value::Varchar(Some(v)) => v.is_empty(),
            Value::Time(Some(v)) => *v == OffsetDateTime::UNIX_EPOCH,
            Value::Blob(Some(v)) => v.is_empty(),
            _ => true,
        }
    }

    pub fn same_type(&self, other: &Self) -> bool {
        self.kind() == other.kind()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(l), Self::Boolean(r)) => l == r,
            (Self::Int(l), Self::Int(r)) => l == r,
            (Self::UInt(l), Self::UInt(r)) => l == r,
            (Self::Float(l), Self::Float(r)) => l == r,
            (Self::Varchar(l), Self::Varchar(r)) => l == r,
            (Self::Time(l), Self::Time(r)) => l == r,
            (Self::Blob(l), Self::Blob(r)) => l == r,
            (Self::Null, Self::Null) => true,
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            v if v.is_null() => f.write_str("NULL"),
            Value::Boolean(Some(v)) => write!(f, "{v}"),
            Value::Int(Some(v)) => write!(f, "{v}"),
            Value::UInt(Some(v)) => write!(f, "{v}"),
            Value::Float(Some(v)) => write!(f, "{v}"),
            Value::Varchar(Some(v)) => write!(f, "{v:?}"),
            Value::Time(Some(v)) => write!(f, "{v}"),
            Value::Blob(Some(v)) => write!(f, "<{} bytes>", v.len()),
            _ => unreachable!(),
        }
    }
}
