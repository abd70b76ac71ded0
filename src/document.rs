//! An ordered mapping of keys to BSON values, the unit of wire framing.

use std::fmt::{self, Debug, Display, Formatter};
use std::io::{Read, Write};

use crate::binary::Binary;
use crate::bson::{Array, Bson, Timestamp};
use crate::datetime::DateTime;
use crate::de;
use crate::decimal::Decimal128;
use crate::error::{Error, Result};
use crate::oid::ObjectId;
use crate::options::RepresentationOptions;
use crate::ser;

/// A BSON document: an ordered sequence of key/value pairs.
///
/// Insertion order is significant and preserved exactly through encode/decode
/// round-trips. Duplicate keys are legal on the wire and are kept verbatim;
/// reads by name return the last-seen value for the key.
#[derive(Clone, PartialEq, Default)]
pub struct Document {
    entries: Vec<(String, Bson)>,
}

impl Display for Document {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        fmt.write_str("{")?;

        let mut first = true;
        for (k, v) in self {
            if first {
                first = false;
                fmt.write_str(" ")?;
            } else {
                fmt.write_str(", ")?;
            }

            write!(fmt, "\"{}\": {}", k, v)?;
        }

        write!(fmt, "{}}}", if !first { " " } else { "" })
    }
}

impl Debug for Document {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        write!(fmt, "Document(")?;
        fmt.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v)))
            .finish()?;
        write!(fmt, ")")
    }
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Document {
        Document::default()
    }

    /// Append a key/value pair. An existing entry under the same key is kept;
    /// the new entry shadows it for reads by name.
    pub fn insert(&mut self, key: impl Into<String>, val: impl Into<Bson>) {
        self.entries.push((key.into(), val.into()));
    }

    /// Get the value for `key`, if any. With duplicate keys, the last-inserted
    /// value wins.
    pub fn get(&self, key: &str) -> Option<&Bson> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove all entries for `key`, returning the last-seen value if any
    /// entry existed.
    pub fn remove(&mut self, key: &str) -> Option<Bson> {
        let mut removed = None;
        let mut i = 0;
        while i < self.entries.len() {
            if self.entries[i].0 == key {
                removed = Some(self.entries.remove(i).1);
            } else {
                i += 1;
            }
        }
        removed
    }

    /// The number of entries, counting duplicates.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Bson)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Bson> {
        self.entries.iter().map(|(_, v)| v)
    }

    fn get_with<'a, T>(
        &'a self,
        key: &str,
        expected: &'static str,
        f: impl FnOnce(&'a Bson) -> Option<T>,
    ) -> Result<T> {
        let value = self
            .get(key)
            .ok_or_else(|| Error::format("key not present").with_key(key))?;
        f(value)
            .ok_or_else(|| Error::unexpected_type(value.type_name(), expected).with_key(key))
    }

    /// Get a floating point value for this key.
    pub fn get_f64(&self, key: &str) -> Result<f64> {
        self.get_with(key, "double", Bson::as_f64)
    }

    /// Get a string slice for this key.
    pub fn get_str(&self, key: &str) -> Result<&str> {
        self.get_with(key, "string", Bson::as_str)
    }

    /// Get an array reference for this key.
    pub fn get_array(&self, key: &str) -> Result<&Array> {
        self.get_with(key, "array", Bson::as_array)
    }

    /// Get an embedded document reference for this key.
    pub fn get_document(&self, key: &str) -> Result<&Document> {
        self.get_with(key, "document", Bson::as_document)
    }

    /// Get a boolean value for this key.
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get_with(key, "bool", Bson::as_bool)
    }

    /// Get an i32 value for this key.
    pub fn get_i32(&self, key: &str) -> Result<i32> {
        self.get_with(key, "int", Bson::as_i32)
    }

    /// Get an i64 value for this key.
    pub fn get_i64(&self, key: &str) -> Result<i64> {
        self.get_with(key, "long", Bson::as_i64)
    }

    /// Get a binary value for this key.
    pub fn get_binary(&self, key: &str) -> Result<&Binary> {
        self.get_with(key, "binary", |b| match b {
            Bson::Binary(bin) => Some(bin),
            _ => None,
        })
    }

    /// Get an ObjectId for this key.
    pub fn get_object_id(&self, key: &str) -> Result<ObjectId> {
        self.get_with(key, "objectId", |b| match b {
            Bson::ObjectId(id) => Some(*id),
            _ => None,
        })
    }

    /// Get a datetime for this key.
    pub fn get_datetime(&self, key: &str) -> Result<DateTime> {
        self.get_with(key, "date", |b| match b {
            Bson::DateTime(dt) => Some(*dt),
            _ => None,
        })
    }

    /// Get a timestamp for this key.
    pub fn get_timestamp(&self, key: &str) -> Result<Timestamp> {
        self.get_with(key, "timestamp", |b| match b {
            Bson::Timestamp(ts) => Some(*ts),
            _ => None,
        })
    }

    /// Decode a decimal for this key from whichever of its wire
    /// representations was actually stored.
    pub fn get_decimal128(&self, key: &str, options: &RepresentationOptions) -> Result<Decimal128> {
        let value = self
            .get(key)
            .ok_or_else(|| Error::format("key not present").with_key(key))?;
        Decimal128::from_bson(value, options).map_err(|e| e.with_key(key))
    }

    /// Encode this document to a writer using default representation options.
    pub fn to_writer<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.to_writer_with(writer, &RepresentationOptions::default())
    }

    /// Encode this document to a writer.
    pub fn to_writer_with<W: Write>(
        &self,
        writer: &mut W,
        options: &RepresentationOptions,
    ) -> Result<()> {
        ser::serialize_document(writer, self, options)
    }

    /// Encode this document to a byte vector using default representation
    /// options.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.to_writer(&mut buf)?;
        Ok(buf)
    }

    /// Encode this document to a byte vector.
    pub fn to_vec_with(&self, options: &RepresentationOptions) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.to_writer_with(&mut buf, options)?;
        Ok(buf)
    }

    /// Decode a document from a reader, verifying the declared total length
    /// against the bytes actually consumed.
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Document> {
        de::deserialize_document(reader)
    }

    /// Decode a document from a byte slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Document> {
        let mut reader = bytes;
        let doc = de::deserialize_document(&mut reader)?;
        if !reader.is_empty() {
            return Err(Error::format(format!(
                "{} trailing bytes after document",
                reader.len()
            )));
        }
        Ok(doc)
    }
}

/// An owning iterator over document entries.
pub struct IntoIter {
    inner: std::vec::IntoIter<(String, Bson)>,
}

impl Iterator for IntoIter {
    type Item = (String, Bson);

    fn next(&mut self) -> Option<(String, Bson)> {
        self.inner.next()
    }
}

impl IntoIterator for Document {
    type Item = (String, Bson);
    type IntoIter = IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.entries.into_iter(),
        }
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Bson);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, Bson)>,
        fn(&'a (String, Bson)) -> (&'a String, &'a Bson),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

impl<K: Into<String>, V: Into<Bson>> FromIterator<(K, V)> for Document {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.insert(k, v);
        }
        doc
    }
}

impl<K: Into<String>, V: Into<Bson>> Extend<(K, V)> for Document {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}
