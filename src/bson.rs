//! The BSON value model.

use std::fmt::{self, Display};

use base64::prelude::{Engine, BASE64_STANDARD};

use crate::binary::Binary;
use crate::datetime::DateTime;
use crate::decimal::Decimal128;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::oid::ObjectId;
use crate::spec::ElementType;

/// Possible BSON value types.
#[derive(Clone, Debug, PartialEq)]
pub enum Bson {
    /// 64-bit binary floating point
    Double(f64),
    /// UTF-8 string
    String(String),
    /// Array
    Array(Array),
    /// Embedded document
    Document(Document),
    /// Boolean value
    Boolean(bool),
    /// Null value
    Null,
    /// Regular expression
    RegularExpression(Regex),
    /// JavaScript code
    JavaScriptCode(String),
    /// JavaScript code w/ scope
    JavaScriptCodeWithScope(JavaScriptCodeWithScope),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// Timestamp
    Timestamp(Timestamp),
    /// Binary data
    Binary(Binary),
    /// ObjectId
    ObjectId(ObjectId),
    /// UTC datetime
    DateTime(DateTime),
    /// Symbol (deprecated)
    Symbol(String),
    /// High-precision decimal. Has no dedicated wire type; its encoding is
    /// chosen by [`RepresentationOptions`](crate::RepresentationOptions).
    Decimal128(Decimal128),
    /// Undefined value (deprecated)
    Undefined,
    /// Max key
    MaxKey,
    /// Min key
    MinKey,
    /// DBPointer (deprecated)
    DbPointer(DbPointer),
}

/// Alias for `Vec<Bson>`.
pub type Array = Vec<Bson>;

/// A BSON regular expression.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Regex {
    /// The regex pattern.
    pub pattern: String,

    /// The regex options, stored in ascending alphabetical order.
    pub options: String,
}

/// A BSON timestamp: an opaque (time, increment) pair used internally by the
/// server's replication.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    /// Seconds since the Unix epoch.
    pub time: u32,

    /// An incrementing ordinal for operations within a given second.
    pub increment: u32,
}

impl Timestamp {
    pub(crate) fn from_le_u64(val: u64) -> Self {
        Timestamp {
            time: (val >> 32) as u32,
            increment: val as u32,
        }
    }

    pub(crate) fn to_le_u64(self) -> u64 {
        ((self.time as u64) << 32) | self.increment as u64
    }
}

/// JavaScript code paired with its scope document.
#[derive(Clone, Debug, PartialEq)]
pub struct JavaScriptCodeWithScope {
    pub code: String,
    pub scope: Document,
}

/// A deprecated DBPointer value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DbPointer {
    pub namespace: String,
    pub id: ObjectId,
}

impl Default for Bson {
    fn default() -> Self {
        Bson::Null
    }
}

impl Display for Bson {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Bson::Double(f) => write!(fmt, "{}", f),
            Bson::String(ref s) => write!(fmt, "\"{}\"", s),
            Bson::Array(ref vec) => {
                fmt.write_str("[")?;
                let mut first = true;
                for bson in vec {
                    if !first {
                        fmt.write_str(", ")?;
                    }
                    write!(fmt, "{}", bson)?;
                    first = false;
                }
                fmt.write_str("]")
            }
            Bson::Document(ref doc) => write!(fmt, "{}", doc),
            Bson::Boolean(b) => write!(fmt, "{}", b),
            Bson::Null => write!(fmt, "null"),
            Bson::RegularExpression(Regex {
                ref pattern,
                ref options,
            }) => write!(fmt, "/{}/{}", pattern, options),
            Bson::JavaScriptCode(ref code)
            | Bson::JavaScriptCodeWithScope(JavaScriptCodeWithScope { ref code, .. }) => {
                fmt.write_str(code)
            }
            Bson::Int32(i) => write!(fmt, "{}", i),
            Bson::Int64(i) => write!(fmt, "{}", i),
            Bson::Timestamp(Timestamp { time, increment }) => {
                write!(fmt, "Timestamp({}, {})", time, increment)
            }
            Bson::Binary(Binary { subtype, ref bytes }) => write!(
                fmt,
                "BinData({:#x}, {})",
                u8::from(subtype),
                BASE64_STANDARD.encode(bytes)
            ),
            Bson::ObjectId(ref id) => write!(fmt, "ObjectId(\"{}\")", id),
            Bson::DateTime(date_time) => write!(fmt, "Date(\"{}\")", date_time),
            Bson::Symbol(ref sym) => write!(fmt, "Symbol(\"{}\")", sym),
            Bson::Decimal128(ref d) => write!(fmt, "{}", d),
            Bson::Undefined => write!(fmt, "undefined"),
            Bson::MinKey => write!(fmt, "MinKey"),
            Bson::MaxKey => write!(fmt, "MaxKey"),
            Bson::DbPointer(DbPointer {
                ref namespace,
                ref id,
            }) => write!(fmt, "DBPointer({}, {})", namespace, id),
        }
    }
}

impl From<f32> for Bson {
    fn from(a: f32) -> Bson {
        Bson::Double(a as f64)
    }
}

impl From<f64> for Bson {
    fn from(a: f64) -> Bson {
        Bson::Double(a)
    }
}

impl From<&str> for Bson {
    fn from(s: &str) -> Bson {
        Bson::String(s.to_owned())
    }
}

impl From<String> for Bson {
    fn from(a: String) -> Bson {
        Bson::String(a)
    }
}

impl From<bool> for Bson {
    fn from(a: bool) -> Bson {
        Bson::Boolean(a)
    }
}

impl From<i32> for Bson {
    fn from(a: i32) -> Bson {
        Bson::Int32(a)
    }
}

impl From<i64> for Bson {
    fn from(a: i64) -> Bson {
        Bson::Int64(a)
    }
}

impl From<u32> for Bson {
    fn from(a: u32) -> Bson {
        Bson::Int64(a as i64)
    }
}

impl From<Document> for Bson {
    fn from(a: Document) -> Bson {
        Bson::Document(a)
    }
}

impl From<Binary> for Bson {
    fn from(binary: Binary) -> Bson {
        Bson::Binary(binary)
    }
}

impl From<Regex> for Bson {
    fn from(regex: Regex) -> Bson {
        Bson::RegularExpression(regex)
    }
}

impl From<JavaScriptCodeWithScope> for Bson {
    fn from(code_with_scope: JavaScriptCodeWithScope) -> Bson {
        Bson::JavaScriptCodeWithScope(code_with_scope)
    }
}

impl From<Timestamp> for Bson {
    fn from(ts: Timestamp) -> Bson {
        Bson::Timestamp(ts)
    }
}

impl From<ObjectId> for Bson {
    fn from(id: ObjectId) -> Bson {
        Bson::ObjectId(id)
    }
}

impl From<DateTime> for Bson {
    fn from(dt: DateTime) -> Bson {
        Bson::DateTime(dt)
    }
}

impl From<Decimal128> for Bson {
    fn from(d: Decimal128) -> Bson {
        Bson::Decimal128(d)
    }
}

impl From<DbPointer> for Bson {
    fn from(p: DbPointer) -> Bson {
        Bson::DbPointer(p)
    }
}

impl<T> From<&T> for Bson
where
    T: Clone + Into<Bson>,
{
    fn from(t: &T) -> Bson {
        t.clone().into()
    }
}

impl<T> From<Vec<T>> for Bson
where
    T: Into<Bson>,
{
    fn from(v: Vec<T>) -> Bson {
        Bson::Array(v.into_iter().map(|val| val.into()).collect())
    }
}

impl<T> From<Option<T>> for Bson
where
    T: Into<Bson>,
{
    fn from(v: Option<T>) -> Bson {
        match v {
            Some(v) => v.into(),
            None => Bson::Null,
        }
    }
}

impl<T: Into<Bson>> FromIterator<T> for Bson {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Bson::Array(iter.into_iter().map(Into::into).collect())
    }
}

impl Bson {
    /// The element type of this value, or `None` for
    /// [`Bson::Decimal128`], whose wire type depends on the configured
    /// representation.
    pub fn element_type(&self) -> Option<ElementType> {
        Some(match self {
            Bson::Double(..) => ElementType::Double,
            Bson::String(..) => ElementType::String,
            Bson::Array(..) => ElementType::Array,
            Bson::Document(..) => ElementType::EmbeddedDocument,
            Bson::Boolean(..) => ElementType::Boolean,
            Bson::Null => ElementType::Null,
            Bson::RegularExpression(..) => ElementType::RegularExpression,
            Bson::JavaScriptCode(..) => ElementType::JavaScriptCode,
            Bson::JavaScriptCodeWithScope(..) => ElementType::JavaScriptCodeWithScope,
            Bson::Int32(..) => ElementType::Int32,
            Bson::Int64(..) => ElementType::Int64,
            Bson::Timestamp(..) => ElementType::Timestamp,
            Bson::Binary(..) => ElementType::Binary,
            Bson::ObjectId(..) => ElementType::ObjectId,
            Bson::DateTime(..) => ElementType::DateTime,
            Bson::Symbol(..) => ElementType::Symbol,
            Bson::Decimal128(..) => return None,
            Bson::Undefined => ElementType::Undefined,
            Bson::MaxKey => ElementType::MaxKey,
            Bson::MinKey => ElementType::MinKey,
            Bson::DbPointer(..) => ElementType::DbPointer,
        })
    }

    /// The name of this value's variant, for use in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Bson::Double(..) => "double",
            Bson::String(..) => "string",
            Bson::Array(..) => "array",
            Bson::Document(..) => "document",
            Bson::Boolean(..) => "bool",
            Bson::Null => "null",
            Bson::RegularExpression(..) => "regex",
            Bson::JavaScriptCode(..) => "javascript",
            Bson::JavaScriptCodeWithScope(..) => "javascriptWithScope",
            Bson::Int32(..) => "int",
            Bson::Int64(..) => "long",
            Bson::Timestamp(..) => "timestamp",
            Bson::Binary(..) => "binary",
            Bson::ObjectId(..) => "objectId",
            Bson::DateTime(..) => "date",
            Bson::Symbol(..) => "symbol",
            Bson::Decimal128(..) => "decimal",
            Bson::Undefined => "undefined",
            Bson::MaxKey => "maxKey",
            Bson::MinKey => "minKey",
            Bson::DbPointer(..) => "dbPointer",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Bson::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Bson::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Bson::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Bson::Document(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Bson::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Bson::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Bson::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_null(&self) -> Option<()> {
        match self {
            Bson::Null => Some(()),
            _ => None,
        }
    }

    /// Convert a numeric value to an `i32`, failing rather than truncating
    /// when the value does not fit or has a fractional part.
    pub fn to_int32(&self) -> Result<i32> {
        match *self {
            Bson::Int32(v) => Ok(v),
            Bson::Int64(v) => i32::try_from(v)
                .map_err(|_| Error::argument(format!("{v} does not fit in an i32"))),
            Bson::Double(v) => {
                let converted = v as i32;
                if converted as f64 != v {
                    return Err(Error::argument(format!(
                        "{v} cannot be converted to an i32 without loss"
                    )));
                }
                Ok(converted)
            }
            ref other => Err(Error::unexpected_type(other.type_name(), "int")),
        }
    }

    /// Convert a numeric value to an `i64`, failing rather than truncating
    /// when the value does not fit or has a fractional part.
    pub fn to_int64(&self) -> Result<i64> {
        match *self {
            Bson::Int32(v) => Ok(v as i64),
            Bson::Int64(v) => Ok(v),
            Bson::Double(v) => {
                // 2^63 saturates to i64::MAX, which rounds back to 2^63 as an
                // f64, so the round-trip check below cannot catch it.
                if !(-9_223_372_036_854_775_808.0..9_223_372_036_854_775_808.0).contains(&v) {
                    return Err(Error::argument(format!("{v} does not fit in an i64")));
                }
                let converted = v as i64;
                if converted as f64 != v {
                    return Err(Error::argument(format!(
                        "{v} cannot be converted to an i64 without loss"
                    )));
                }
                Ok(converted)
            }
            ref other => Err(Error::unexpected_type(other.type_name(), "long")),
        }
    }

    /// Convert a numeric value to an `f64`, failing when an integer is too
    /// wide to be represented exactly.
    pub fn to_double(&self) -> Result<f64> {
        match *self {
            Bson::Double(v) => Ok(v),
            Bson::Int32(v) => Ok(v as f64),
            Bson::Int64(v) => {
                let converted = v as f64;
                if converted as i64 != v {
                    return Err(Error::argument(format!(
                        "{v} cannot be represented exactly as a double"
                    )));
                }
                Ok(converted)
            }
            ref other => Err(Error::unexpected_type(other.type_name(), "double")),
        }
    }
}

#[cfg(test)]
mod test {
    use super::Bson;

    #[test]
    fn checked_conversions_refuse_loss() {
        assert_eq!(Bson::Int64(7).to_int32().unwrap(), 7);
        assert!(Bson::Int64(i32::MAX as i64 + 1).to_int32().is_err());

        assert_eq!(Bson::Double(3.0).to_int64().unwrap(), 3);
        assert!(Bson::Double(3.5).to_int64().is_err());
        assert!(Bson::Double(1e19).to_int64().is_err());

        assert_eq!(Bson::Int64(1 << 53).to_double().unwrap(), 9007199254740992.0);
        assert!(Bson::Int64((1 << 53) + 1).to_double().is_err());

        assert!(Bson::String("5".into()).to_int32().is_err());
    }

    #[test]
    fn to_int64_is_exact_at_the_i64_boundary() {
        // 2^63 itself is out of range even though casting saturates it to a
        // value that round-trips through f64.
        assert!(Bson::Double(9_223_372_036_854_775_808.0).to_int64().is_err());

        // The nearest representable f64 below 2^63, and -2^63 exactly.
        assert_eq!(
            Bson::Double(9_223_372_036_854_774_784.0).to_int64().unwrap(),
            9_223_372_036_854_774_784
        );
        assert_eq!(
            Bson::Double(-9_223_372_036_854_775_808.0).to_int64().unwrap(),
            i64::MIN
        );

        assert!(Bson::Double(f64::NAN).to_int64().is_err());
        assert!(Bson::Double(f64::INFINITY).to_int64().is_err());
    }
}
