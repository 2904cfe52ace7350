use rust_decimal::Decimal;
use std::fmt::{self, Display};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Dynamically typed, nullable cell exchanged between records and drivers.
///
/// Each variant carries the Rust type it maps to, `None` meaning SQL `NULL` of
/// that type. `Null` is the untyped null produced by drivers that cannot tell
/// the declared type of a column.
#[derive(Default, Debug, Clone)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int8(Option<i8>),
    Int16(Option<i16>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    UInt8(Option<u8>),
    UInt16(Option<u16>),
    UInt32(Option<u32>),
    UInt64(Option<u64>),
    Float32(Option<f32>),
    Float64(Option<f64>),
    Decimal(Option<Decimal>, /* precision: */ u8, /* scale: */ u8),
    Char(Option<char>),
    Varchar(Option<String>),
    Blob(Option<Box<[u8]>>),
    Date(Option<Date>),
    Time(Option<Time>),
    Timestamp(Option<PrimitiveDateTime>),
    TimestampWithTimezone(Option<OffsetDateTime>),
    Uuid(Option<Uuid>),
}

/// Wide type families used to look a column up in the database type catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCategory {
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Decimal,
    Char,
    Varchar,
    Binary,
    Date,
    Time,
    Timestamp,
    TimestampWithTimezone,
    Uuid,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(l), Self::Boolean(r)) => l == r,
            (Self::Int8(l), Self::Int8(r)) => l == r,
            (Self::Int16(l), Self::Int16(r)) => l == r,
            (Self::Int32(l), Self::Int32(r)) => l == r,
            (Self::Int64(l), Self::Int64(r)) => l == r,
            (Self::UInt8(l), Self::UInt8(r)) => l == r,
            (Self::UInt16(l), Self::UInt16(r)) => l == r,
            (Self::UInt32(l), Self::UInt32(r)) => l == r,
            (Self::UInt64(l), Self::UInt64(r)) => l == r,
            (Self::Float32(l), Self::Float32(r)) => l == r,
            (Self::Float64(l), Self::Float64(r)) => l == r,
            // Scale is presentation only, 1.50 equals 1.5
            (Self::Decimal(l, ..), Self::Decimal(r, ..)) => l == r,
            (Self::Char(l), Self::Char(r)) => l == r,
            (Self::Varchar(l), Self::Varchar(r)) => l == r,
            (Self::Blob(l), Self::Blob(r)) => l == r,
            (Self::Date(l), Self::Date(r)) => l == r,
            (Self::Time(l), Self::Time(r)) => l == r,
            (Self::Timestamp(l), Self::Timestamp(r)) => l == r,
            (Self::TimestampWithTimezone(l), Self::TimestampWithTimezone(r)) => l == r,
            (Self::Uuid(l), Self::Uuid(r)) => l == r,
            _ => self.is_null() && other.is_null(),
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null
            | Value::Boolean(None)
            | Value::Int8(None)
            | Value::Int16(None)
            | Value::Int32(None)
            | Value::Int64(None)
            | Value::UInt8(None)
            | Value::UInt16(None)
            | Value::UInt32(None)
            | Value::UInt64(None)
            | Value::Float32(None)
            | Value::Float64(None)
            | Value::Decimal(None, ..)
            | Value::Char(None)
            | Value::Varchar(None)
            | Value::Blob(None)
            | Value::Date(None)
            | Value::Time(None)
            | Value::Timestamp(None)
            | Value::TimestampWithTimezone(None)
            | Value::Uuid(None) => true,
            _ => false,
        }
    }

    pub fn same_type(&self, other: &Self) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }

    /// The same variant holding `None`.
    pub fn as_null(&self) -> Value {
        match self {
            Value::Null => Value::Null,
            Value::Boolean(..) => Value::Boolean(None),
            Value::Int8(..) => Value::Int8(None),
            Value::Int16(..) => Value::Int16(None),
            Value::Int32(..) => Value::Int32(None),
            Value::Int64(..) => Value::Int64(None),
            Value::UInt8(..) => Value::UInt8(None),
            Value::UInt16(..) => Value::UInt16(None),
            Value::UInt32(..) => Value::UInt32(None),
            Value::UInt64(..) => Value::UInt64(None),
            Value::Float32(..) => Value::Float32(None),
            Value::Float64(..) => Value::Float64(None),
            Value::Decimal(_, precision, scale) => Value::Decimal(None, *precision, *scale),
            Value::Char(..) => Value::Char(None),
            Value::Varchar(..) => Value::Varchar(None),
            Value::Blob(..) => Value::Blob(None),
            Value::Date(..) => Value::Date(None),
            Value::Time(..) => Value::Time(None),
            Value::Timestamp(..) => Value::Timestamp(None),
            Value::TimestampWithTimezone(..) => Value::TimestampWithTimezone(None),
            Value::Uuid(..) => Value::Uuid(None),
        }
    }

    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            Value::Int8(..)
                | Value::Int16(..)
                | Value::Int32(..)
                | Value::Int64(..)
                | Value::UInt8(..)
                | Value::UInt16(..)
                | Value::UInt32(..)
                | Value::UInt64(..)
        )
    }

    /// Character length of textual values, `None` for everything else.
    pub fn text_len(&self) -> Option<usize> {
        match self {
            Value::Varchar(Some(v)) => Some(v.chars().count()),
            Value::Char(Some(..)) => Some(1),
            _ => None,
        }
    }

    pub fn category(&self) -> Option<TypeCategory> {
        Some(match self {
            Value::Null => return None,
            Value::Boolean(..) => TypeCategory::Boolean,
            Value::Int8(..) | Value::UInt8(..) => TypeCategory::TinyInt,
            Value::Int16(..) | Value::UInt16(..) => TypeCategory::SmallInt,
            Value::Int32(..) | Value::UInt32(..) => TypeCategory::Integer,
            Value::Int64(..) | Value::UInt64(..) => TypeCategory::BigInt,
            Value::Float32(..) => TypeCategory::Real,
            Value::Float64(..) => TypeCategory::Double,
            Value::Decimal(..) => TypeCategory::Decimal,
            Value::Char(..) => TypeCategory::Char,
            Value::Varchar(..) => TypeCategory::Varchar,
            Value::Blob(..) => TypeCategory::Binary,
            Value::Date(..) => TypeCategory::Date,
            Value::Time(..) => TypeCategory::Time,
            Value::Timestamp(..) => TypeCategory::Timestamp,
            Value::TimestampWithTimezone(..) => TypeCategory::TimestampWithTimezone,
            Value::Uuid(..) => TypeCategory::Uuid,
        })
    }
}

impl Display for Value {
    /// Plain rendering used in messages and record labels, not a SQL literal.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            v if v.is_null() => f.write_str("null"),
            Value::Boolean(Some(v)) => v.fmt(f),
            Value::Int8(Some(v)) => v.fmt(f),
            Value::Int16(Some(v)) => v.fmt(f),
            Value::Int32(Some(v)) => v.fmt(f),
            Value::Int64(Some(v)) => v.fmt(f),
            Value::UInt8(Some(v)) => v.fmt(f),
            Value::UInt16(Some(v)) => v.fmt(f),
            Value::UInt32(Some(v)) => v.fmt(f),
            Value::UInt64(Some(v)) => v.fmt(f),
            Value::Float32(Some(v)) => v.fmt(f),
            Value::Float64(Some(v)) => v.fmt(f),
            Value::Decimal(Some(v), ..) => v.fmt(f),
            Value::Char(Some(v)) => v.fmt(f),
            Value::Varchar(Some(v)) => v.fmt(f),
            Value::Blob(Some(v)) => {
                for b in v.iter() {
                    write!(f, "{:02X}", b)?;
                }
                Ok(())
            }
            Value::Date(Some(v)) => v.fmt(f),
            Value::Time(Some(v)) => v.fmt(f),
            Value::Timestamp(Some(v)) => v.fmt(f),
            Value::TimestampWithTimezone(Some(v)) => v.fmt(f),
            Value::Uuid(Some(v)) => v.fmt(f),
            _ => f.write_str("null"),
        }
    }
}
