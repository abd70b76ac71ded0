//! Decoding of BSON bytes into the value model.

use std::io::Read;
use std::str;

use crate::bson::{Bson, DbPointer, JavaScriptCodeWithScope, Regex, Timestamp};
use crate::datetime::DateTime;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::oid::ObjectId;
use crate::binary::Binary;
use crate::ser::MAX_BSON_SIZE;
use crate::spec::{BinarySubtype, ElementType};

pub(crate) const MIN_BSON_SIZE: i32 = 4 + 1;

fn read_i32<R: Read + ?Sized>(reader: &mut R) -> Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_u8(reader: &mut &[u8]) -> Result<u8> {
    match reader.split_first() {
        Some((byte, rest)) => {
            *reader = rest;
            Ok(*byte)
        }
        None => Err(Error::format("unexpected end of document")),
    }
}

fn read_bytes<'a>(reader: &mut &'a [u8], count: usize) -> Result<&'a [u8]> {
    if count > reader.len() {
        return Err(Error::format("unexpected end of document"));
    }
    let (bytes, rest) = reader.split_at(count);
    *reader = rest;
    Ok(bytes)
}

fn read_i64(reader: &mut &[u8]) -> Result<i64> {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(read_bytes(reader, 8)?);
    Ok(i64::from_le_bytes(buf))
}

fn read_f64(reader: &mut &[u8]) -> Result<f64> {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(read_bytes(reader, 8)?);
    Ok(f64::from_le_bytes(buf))
}

/// Read a length-prefixed, NUL-terminated string.
fn read_string(reader: &mut &[u8]) -> Result<String> {
    let len = read_i32(reader)?;
    if len < 1 || len as usize > reader.len() {
        return Err(Error::format(format!("invalid string length {len}")));
    }

    let bytes = read_bytes(reader, len as usize)?;
    if bytes[len as usize - 1] != 0 {
        return Err(Error::format("string is missing its NUL terminator"));
    }

    str::from_utf8(&bytes[..len as usize - 1])
        .map(str::to_owned)
        .map_err(|e| Error::format(format!("invalid UTF-8 string: {e}")))
}

fn read_cstring(reader: &mut &[u8]) -> Result<String> {
    let pos = reader
        .iter()
        .position(|byte| *byte == 0)
        .ok_or_else(|| Error::format("unterminated cstring"))?;
    let bytes = read_bytes(reader, pos)?;
    let _terminator = read_u8(reader)?;

    str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|e| Error::format(format!("invalid UTF-8 cstring: {e}")))
}

fn read_object_id(reader: &mut &[u8]) -> Result<ObjectId> {
    let mut buf = [0u8; 12];
    buf.copy_from_slice(read_bytes(reader, 12)?);
    Ok(ObjectId::from_bytes(buf))
}

/// Decode one document, verifying its declared length against the bytes
/// actually present.
pub(crate) fn deserialize_document<R: Read + ?Sized>(reader: &mut R) -> Result<Document> {
    let length = read_i32(reader)?;
    if !(MIN_BSON_SIZE..=MAX_BSON_SIZE).contains(&length) {
        return Err(Error::format(format!("invalid document length {length}")));
    }

    let mut buf = vec![0u8; length as usize - 4];
    reader
        .read_exact(&mut buf)
        .map_err(|_| Error::format(format!("document truncated short of {length} bytes")))?;

    let mut body: &[u8] = &buf;
    let mut doc = Document::new();
    loop {
        let tag = read_u8(&mut body)?;
        if tag == 0 {
            if !body.is_empty() {
                return Err(Error::format(format!(
                    "{} bytes left over after the document terminator",
                    body.len()
                )));
            }
            return Ok(doc);
        }

        let key = read_cstring(&mut body)?;
        let value = deserialize_bson(&mut body, tag).map_err(|e| match e.key {
            Some(_) => e,
            None => e.with_key(&key),
        })?;
        doc.insert(key, value);
    }
}

fn deserialize_array(reader: &mut &[u8]) -> Result<Vec<Bson>> {
    // Arrays share the document framing; index keys carry no information.
    let doc = deserialize_document(reader)?;
    Ok(doc.into_iter().map(|(_, v)| v).collect())
}

fn deserialize_binary(reader: &mut &[u8]) -> Result<Binary> {
    let mut len = read_i32(reader)?;
    if !(0..=MAX_BSON_SIZE).contains(&len) {
        return Err(Error::format(format!("invalid binary length {len}")));
    }

    let subtype = BinarySubtype::from(read_u8(reader)?);
    if let BinarySubtype::BinaryOld = subtype {
        let inner_len = read_i32(reader)?;
        if inner_len != len - 4 {
            return Err(Error::format(format!(
                "old binary subtype has wrapped length {inner_len}, expected {}",
                len - 4
            )));
        }
        len -= 4;
    }

    Ok(Binary {
        subtype,
        bytes: read_bytes(reader, len as usize)?.to_vec(),
    })
}

fn deserialize_code_with_scope(reader: &mut &[u8]) -> Result<JavaScriptCodeWithScope> {
    let length = read_i32(reader)?;

    // 4 length bytes, a minimal string, a minimal document.
    const MIN_CODE_WITH_SCOPE_SIZE: i32 = 4 + (4 + 1) + MIN_BSON_SIZE;
    if length < MIN_CODE_WITH_SCOPE_SIZE || length as usize - 4 > reader.len() {
        return Err(Error::format(format!(
            "invalid code-with-scope length {length}"
        )));
    }

    let mut body = read_bytes(reader, length as usize - 4)?;
    let code = read_string(&mut body)?;
    let scope = deserialize_document(&mut body)?;
    if !body.is_empty() {
        return Err(Error::format(format!(
            "{} bytes left over after code-with-scope",
            body.len()
        )));
    }

    Ok(JavaScriptCodeWithScope { code, scope })
}

fn deserialize_bson(reader: &mut &[u8], tag: u8) -> Result<Bson> {
    let Some(element_type) = ElementType::from_tag(tag) else {
        return Err(Error::format(format!("invalid element type tag {tag:#04x}")));
    };

    Ok(match element_type {
        ElementType::Double => Bson::Double(read_f64(reader)?),
        ElementType::String => Bson::String(read_string(reader)?),
        ElementType::EmbeddedDocument => Bson::Document(deserialize_document(reader)?),
        ElementType::Array => Bson::Array(deserialize_array(reader)?),
        ElementType::Binary => Bson::Binary(deserialize_binary(reader)?),
        ElementType::Undefined => Bson::Undefined,
        ElementType::ObjectId => Bson::ObjectId(read_object_id(reader)?),
        ElementType::Boolean => match read_u8(reader)? {
            0 => Bson::Boolean(false),
            1 => Bson::Boolean(true),
            b => return Err(Error::format(format!("invalid boolean value {b:#04x}"))),
        },
        ElementType::DateTime => Bson::DateTime(DateTime::from_millis(read_i64(reader)?)),
        ElementType::Null => Bson::Null,
        ElementType::RegularExpression => Bson::RegularExpression(Regex {
            pattern: read_cstring(reader)?,
            options: read_cstring(reader)?,
        }),
        ElementType::DbPointer => Bson::DbPointer(DbPointer {
            namespace: read_string(reader)?,
            id: read_object_id(reader)?,
        }),
        ElementType::JavaScriptCode => Bson::JavaScriptCode(read_string(reader)?),
        ElementType::Symbol => Bson::Symbol(read_string(reader)?),
        ElementType::JavaScriptCodeWithScope => {
            Bson::JavaScriptCodeWithScope(deserialize_code_with_scope(reader)?)
        }
        ElementType::Int32 => Bson::Int32(read_i32(reader)?),
        ElementType::Timestamp => Bson::Timestamp(Timestamp::from_le_u64(read_i64(reader)? as u64)),
        ElementType::Int64 => Bson::Int64(read_i64(reader)?),
        ElementType::MinKey => Bson::MinKey,
        ElementType::MaxKey => Bson::MaxKey,
    })
}

#[cfg(test)]
mod test {
    use super::deserialize_document;
    use crate::error::ErrorKind;
    use crate::{doc, Document};

    fn decode(bytes: &[u8]) -> crate::error::Result<Document> {
        let mut reader = bytes;
        deserialize_document(&mut reader)
    }

    #[test]
    fn declared_length_must_match_the_terminator() {
        let mut bytes = doc! { "a": 1 }.to_vec().unwrap();

        // Grow the declared length past the terminator.
        bytes[0] += 1;
        bytes.push(0);
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Format { .. }));

        // Shrink it so the terminator lands past the declared end.
        let mut bytes = doc! { "a": 1 }.to_vec().unwrap();
        bytes[0] -= 1;
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn truncated_input_is_a_format_error() {
        let bytes = doc! { "a": "hello" }.to_vec().unwrap();
        for end in 1..bytes.len() {
            assert!(decode(&bytes[..end]).is_err(), "prefix of {end} bytes");
        }
    }

    #[test]
    fn unknown_tag_is_rejected_with_the_tag_value() {
        // {"a": <tag 0x13>}
        let bytes = [10, 0, 0, 0, 0x13, b'a', 0, 0, 0, 0];
        let err = decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("0x13"), "{err}");
    }

    #[test]
    fn interior_document_lengths_are_verified() {
        let mut bytes = doc! { "outer": { "inner": 7 } }.to_vec().unwrap();

        // Corrupt the embedded document's length prefix.
        let inner_offset = 4 + 1 + "outer".len() + 1;
        bytes[inner_offset] += 1;
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn invalid_boolean_byte_is_rejected() {
        let bytes = [9, 0, 0, 0, 0x08, b'b', 0, 2, 0];
        assert!(decode(&bytes).is_err());
    }
}
