//! Encoding of the value model into BSON bytes.

use std::io::Write;
use std::mem;

use crate::bson::{Bson, JavaScriptCodeWithScope, Regex};
use crate::document::Document;
use crate::error::{Error, Result};
use crate::options::RepresentationOptions;
use crate::spec::BinarySubtype;

pub(crate) const MAX_BSON_SIZE: i32 = 16 * 1024 * 1024;

fn write_string<W: Write + ?Sized>(writer: &mut W, s: &str) -> Result<()> {
    writer.write_all(&(s.len() as i32 + 1).to_le_bytes())?;
    writer.write_all(s.as_bytes())?;
    writer.write_all(b"\0")?;
    Ok(())
}

fn write_cstring<W: Write + ?Sized>(writer: &mut W, s: &str) -> Result<()> {
    if s.contains('\0') {
        return Err(Error::argument(format!(
            "cstring \"{s}\" contains an interior NUL byte"
        )));
    }
    writer.write_all(s.as_bytes())?;
    writer.write_all(b"\0")?;
    Ok(())
}

#[inline]
pub(crate) fn write_i32<W: Write + ?Sized>(writer: &mut W, val: i32) -> Result<()> {
    writer.write_all(&val.to_le_bytes()).map_err(From::from)
}

#[inline]
fn write_i64<W: Write + ?Sized>(writer: &mut W, val: i64) -> Result<()> {
    writer.write_all(&val.to_le_bytes()).map_err(From::from)
}

#[inline]
fn write_f64<W: Write + ?Sized>(writer: &mut W, val: f64) -> Result<()> {
    writer.write_all(&val.to_le_bytes()).map_err(From::from)
}

fn write_binary<W: Write + ?Sized>(
    writer: &mut W,
    bytes: &[u8],
    subtype: BinarySubtype,
) -> Result<()> {
    // The deprecated BinaryOld subtype wraps the payload in a redundant
    // length prefix that counts toward the outer length.
    let len = if let BinarySubtype::BinaryOld = subtype {
        bytes.len() + 4
    } else {
        bytes.len()
    };

    if len > MAX_BSON_SIZE as usize {
        return Err(Error::serialization(format!(
            "binary length {} exceeds maximum size",
            bytes.len()
        )));
    }

    write_i32(writer, len as i32)?;
    writer.write_all(&[subtype.into()])?;

    if let BinarySubtype::BinaryOld = subtype {
        write_i32(writer, len as i32 - 4)?;
    }

    writer.write_all(bytes).map_err(From::from)
}

fn serialize_array<W: Write + ?Sized>(
    writer: &mut W,
    arr: &[Bson],
    options: &RepresentationOptions,
) -> Result<()> {
    let mut buf = Vec::new();
    for (index, val) in arr.iter().enumerate() {
        serialize_element(&mut buf, &index.to_string(), val, options)?;
    }

    write_i32(
        writer,
        (buf.len() + mem::size_of::<i32>() + mem::size_of::<u8>()) as i32,
    )?;
    writer.write_all(&buf)?;
    writer.write_all(b"\0")?;
    Ok(())
}

pub(crate) fn serialize_document<W: Write + ?Sized>(
    writer: &mut W,
    doc: &Document,
    options: &RepresentationOptions,
) -> Result<()> {
    let mut buf = Vec::new();
    for (key, val) in doc.iter() {
        serialize_element(&mut buf, key, val, options).map_err(|e| match e.key {
            Some(_) => e,
            None => e.with_key(key),
        })?;
    }

    write_i32(
        writer,
        (buf.len() + mem::size_of::<i32>() + mem::size_of::<u8>()) as i32,
    )?;
    writer.write_all(&buf)?;
    writer.write_all(b"\0")?;
    Ok(())
}

pub(crate) fn serialize_element<W: Write + ?Sized>(
    writer: &mut W,
    key: &str,
    val: &Bson,
    options: &RepresentationOptions,
) -> Result<()> {
    // A decimal has no wire tag of its own; resolve it to the configured
    // representation before anything is written.
    if let Bson::Decimal128(d) = val {
        let resolved = d.to_bson(options)?;
        return serialize_element(writer, key, &resolved, options);
    }

    let element_type = val.element_type().ok_or_else(|| {
        Error::serialization(format!("{} has no wire element type", val.type_name()))
    })?;
    writer.write_all(&[element_type as u8])?;
    write_cstring(writer, key)?;

    match *val {
        Bson::Double(v) => write_f64(writer, v),
        Bson::String(ref v) => write_string(writer, v),
        Bson::Array(ref v) => serialize_array(writer, v, options),
        Bson::Document(ref v) => serialize_document(writer, v, options),
        Bson::Boolean(v) => writer.write_all(&[v as u8]).map_err(From::from),
        Bson::Null | Bson::Undefined | Bson::MinKey | Bson::MaxKey => Ok(()),
        Bson::RegularExpression(Regex {
            ref pattern,
            ref options,
        }) => {
            write_cstring(writer, pattern)?;

            let mut chars: Vec<char> = options.chars().collect();
            chars.sort_unstable();

            write_cstring(writer, String::from_iter(chars).as_str())
        }
        Bson::JavaScriptCode(ref code) => write_string(writer, code),
        Bson::JavaScriptCodeWithScope(JavaScriptCodeWithScope {
            ref code,
            ref scope,
        }) => {
            let mut buf = Vec::new();
            write_string(&mut buf, code)?;
            serialize_document(&mut buf, scope, options)?;

            write_i32(writer, buf.len() as i32 + mem::size_of::<i32>() as i32)?;
            writer.write_all(&buf).map_err(From::from)
        }
        Bson::Int32(v) => write_i32(writer, v),
        Bson::Int64(v) => write_i64(writer, v),
        Bson::Timestamp(ts) => write_i64(writer, ts.to_le_u64() as i64),
        Bson::Binary(ref bin) => write_binary(writer, &bin.bytes, bin.subtype),
        Bson::ObjectId(ref id) => writer.write_all(&id.bytes()).map_err(From::from),
        Bson::DateTime(dt) => write_i64(writer, dt.timestamp_millis()),
        Bson::Symbol(ref s) => write_string(writer, s),
        Bson::DbPointer(ref p) => {
            write_string(writer, &p.namespace)?;
            writer.write_all(&p.id.bytes()).map_err(From::from)
        }
        Bson::Decimal128(..) => unreachable!("resolved above"),
    }
}
