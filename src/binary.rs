//! The BSON binary value, including the GUID representation handling.

use std::fmt;

use base64::prelude::{Engine, BASE64_STANDARD};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::spec::BinarySubtype;

/// A BSON binary value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binary {
    /// The subtype of the bytes.
    pub subtype: BinarySubtype,

    /// The binary bytes.
    pub bytes: Vec<u8>,
}

impl fmt::Display for Binary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Binary({:#x}, {})",
            u8::from(self.subtype),
            BASE64_STANDARD.encode(&self.bytes)
        )
    }
}

impl From<Vec<u8>> for Binary {
    fn from(bytes: Vec<u8>) -> Self {
        Binary {
            subtype: BinarySubtype::Generic,
            bytes,
        }
    }
}

impl Binary {
    /// Create a [`Binary`] from a base64 string and an optional subtype,
    /// defaulting to [`BinarySubtype::Generic`].
    pub fn from_base64(
        input: impl AsRef<str>,
        subtype: impl Into<Option<BinarySubtype>>,
    ) -> Result<Self> {
        let bytes = BASE64_STANDARD
            .decode(input.as_ref())
            .map_err(|e| Error::argument(format!("invalid base64: {e}")))?;
        Ok(Binary {
            subtype: subtype.into().unwrap_or(BinarySubtype::Generic),
            bytes,
        })
    }
}

/// The representations a UUID can have on the wire.
///
/// Historical drivers serialized GUIDs under the deprecated subtype 0x03 in
/// platform-native byte orders; only [`UuidRepresentation::Standard`] uses the
/// RFC 4122 order under subtype 0x04. The representation must be chosen
/// explicitly whenever legacy data may be involved — the bytes alone cannot
/// distinguish the legacy orders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum UuidRepresentation {
    /// RFC 4122 byte order, binary subtype 0x04.
    Standard,
    /// Legacy C# driver order: the first three fields are little-endian,
    /// binary subtype 0x03.
    CSharpLegacy,
    /// Legacy Java driver order: each 8-byte half is reversed, binary
    /// subtype 0x03.
    JavaLegacy,
    /// Legacy Python driver order: RFC 4122 bytes under binary subtype 0x03.
    PythonLegacy,
}

impl Binary {
    /// Serialize a [`Uuid`] with the standard representation.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Binary {
            subtype: BinarySubtype::Uuid,
            bytes: uuid.as_bytes().to_vec(),
        }
    }

    /// Serialize a [`Uuid`] with the requested representation.
    /// `from_uuid_with_representation(uuid, UuidRepresentation::Standard)` is
    /// equivalent to `from_uuid(uuid)`.
    pub fn from_uuid_with_representation(uuid: Uuid, rep: UuidRepresentation) -> Self {
        match rep {
            UuidRepresentation::Standard => Binary::from_uuid(uuid),
            UuidRepresentation::CSharpLegacy => {
                let mut bytes = uuid.into_bytes();
                bytes[0..4].reverse();
                bytes[4..6].reverse();
                bytes[6..8].reverse();
                Binary {
                    subtype: BinarySubtype::UuidOld,
                    bytes: bytes.to_vec(),
                }
            }
            UuidRepresentation::PythonLegacy => Binary {
                subtype: BinarySubtype::UuidOld,
                bytes: uuid.as_bytes().to_vec(),
            },
            UuidRepresentation::JavaLegacy => {
                let mut bytes = uuid.into_bytes();
                bytes[0..8].reverse();
                bytes[8..16].reverse();
                Binary {
                    subtype: BinarySubtype::UuidOld,
                    bytes: bytes.to_vec(),
                }
            }
        }
    }

    /// Deserialize this binary value into a [`Uuid`] according to the provided
    /// representation. Fails if the stored subtype does not match the
    /// representation, or if the payload is not 16 bytes.
    pub fn to_uuid_with_representation(&self, rep: UuidRepresentation) -> Result<Uuid> {
        let expected = if rep == UuidRepresentation::Standard {
            BinarySubtype::Uuid
        } else {
            BinarySubtype::UuidOld
        };
        if self.subtype != expected {
            return Err(Error::format(format!(
                "expected binary subtype {:#04x} for {rep:?} UUID, found {:#04x}",
                u8::from(expected),
                u8::from(self.subtype),
            )));
        }
        if self.bytes.len() != 16 {
            return Err(Error::format(format!(
                "UUID payload must be 16 bytes, found {}",
                self.bytes.len()
            )));
        }
        let mut buf = [0u8; 16];
        buf.copy_from_slice(&self.bytes);
        Ok(match rep {
            UuidRepresentation::Standard | UuidRepresentation::PythonLegacy => {
                Uuid::from_bytes(buf)
            }
            UuidRepresentation::CSharpLegacy => {
                buf[0..4].reverse();
                buf[4..6].reverse();
                buf[6..8].reverse();
                Uuid::from_bytes(buf)
            }
            UuidRepresentation::JavaLegacy => {
                buf[0..8].reverse();
                buf[8..16].reverse();
                Uuid::from_bytes(buf)
            }
        })
    }

    /// Deserialize this binary value into a [`Uuid`] using the standard
    /// representation.
    pub fn to_uuid(&self) -> Result<Uuid> {
        self.to_uuid_with_representation(UuidRepresentation::Standard)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn representation_round_trips() {
        let uuid = Uuid::parse_str("00112233-4455-6677-8899-aabbccddeeff").unwrap();
        for rep in [
            UuidRepresentation::Standard,
            UuidRepresentation::CSharpLegacy,
            UuidRepresentation::JavaLegacy,
            UuidRepresentation::PythonLegacy,
        ] {
            let bin = Binary::from_uuid_with_representation(uuid, rep);
            assert_eq!(bin.to_uuid_with_representation(rep).unwrap(), uuid);
        }
    }

    #[test]
    fn legacy_byte_orders() {
        let uuid = Uuid::parse_str("00112233-4455-6677-8899-aabbccddeeff").unwrap();

        let csharp = Binary::from_uuid_with_representation(uuid, UuidRepresentation::CSharpLegacy);
        assert_eq!(csharp.subtype, BinarySubtype::UuidOld);
        assert_eq!(
            csharp.bytes,
            hex::decode("33221100554477668899aabbccddeeff").unwrap()
        );

        let java = Binary::from_uuid_with_representation(uuid, UuidRepresentation::JavaLegacy);
        assert_eq!(
            java.bytes,
            hex::decode("7766554433221100ffeeddccbbaa9988").unwrap()
        );

        let python = Binary::from_uuid_with_representation(uuid, UuidRepresentation::PythonLegacy);
        assert_eq!(python.bytes, uuid.as_bytes().to_vec());
    }

    #[test]
    fn subtype_mismatch_is_an_error() {
        let uuid = Uuid::new_v4();
        let standard = Binary::from_uuid(uuid);
        assert!(standard
            .to_uuid_with_representation(UuidRepresentation::CSharpLegacy)
            .is_err());

        let legacy = Binary::from_uuid_with_representation(uuid, UuidRepresentation::PythonLegacy);
        assert!(legacy.to_uuid().is_err());
    }
}
