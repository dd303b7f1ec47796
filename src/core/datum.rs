use std::fmt::Display;

use chrono::{DateTime, Utc};
use enum_as_inner::EnumAsInner;

/// A single value decoded from a result set, or bound as a parameter.
#[derive(Debug, Clone, EnumAsInner)]
pub enum Datum {
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    /// Payload of a type the decoder has no mapping for.
    Bytes(Vec<u8>),

    Null,
}

impl Display for Datum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Datum::Int(v) => write!(f, "{}", v),
            Datum::Float(v) => write!(f, "{}", v),
            Datum::String(v) => write!(f, "{}", v),
            Datum::Boolean(v) => write!(f, "{}", if *v { "TRUE" } else { "FALSE" }),
            Datum::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            Datum::Bytes(v) => {
                write!(f, "\\x")?;
                for byte in v {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Datum::Null => write!(f, "NULL"),
        }
    }
}

impl Datum {
    pub fn type_name(&self) -> &'static str {
        match self {
            Datum::Int(_) => "int",
            Datum::Float(_) => "float",
            Datum::String(_) => "string",
            Datum::Boolean(_) => "boolean",
            Datum::Timestamp(_) => "timestamp",
            Datum::Bytes(_) => "bytes",
            Datum::Null => "null",
        }
    }
}

impl From<i64> for Datum {
    fn from(v: i64) -> Self {
        Datum::Int(v)
    }
}

impl From<i32> for Datum {
    fn from(v: i32) -> Self {
        Datum::Int(v as i64)
    }
}

impl From<f64> for Datum {
    fn from(v: f64) -> Self {
        Datum::Float(v)
    }
}

impl From<bool> for Datum {
    fn from(v: bool) -> Self {
        Datum::Boolean(v)
    }
}

impl From<&str> for Datum {
    fn from(v: &str) -> Self {
        Datum::String(v.to_string())
    }
}

impl From<String> for Datum {
    fn from(v: String) -> Self {
        Datum::String(v)
    }
}

impl From<DateTime<Utc>> for Datum {
    fn from(v: DateTime<Utc>) -> Self {
        Datum::Timestamp(v)
    }
}

impl<T: Into<Datum>> From<Option<T>> for Datum {
    fn from(v: Option<T>) -> Self {
        v.map_or(Datum::Null, Into::into)
    }
}

impl PartialEq for Datum {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(l0), Self::Int(r0)) => l0 == r0,
            (Self::Float(l0), Self::Float(r0)) => l0.to_bits() == r0.to_bits(),
            (Self::String(l0), Self::String(r0)) => l0 == r0,
            (Self::Boolean(l0), Self::Boolean(r0)) => l0 == r0,
            (Self::Timestamp(l0), Self::Timestamp(r0)) => l0 == r0,
            (Self::Bytes(l0), Self::Bytes(r0)) => l0 == r0,
            (Self::Null, Self::Null) => true,
            _ => false,
        }
    }
}

impl Eq for Datum {}
