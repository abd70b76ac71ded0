//! Module containing functionality related to BSON ObjectIds.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::{rngs::OsRng, RngCore};

use crate::error::{Error, Result};

static OID_COUNTER: AtomicU32 = AtomicU32::new(0);

/// A wrapper around a raw 12-byte ObjectId: a 4-byte big-endian seconds
/// timestamp, a 5-byte per-process random value and a 3-byte big-endian
/// counter starting at a random value.
#[derive(Clone, Copy, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct ObjectId {
    id: [u8; 12],
}

impl ObjectId {
    /// Generate a new ObjectId.
    pub fn new() -> ObjectId {
        let timestamp = ObjectId::gen_timestamp();
        let process_unique = ObjectId::process_unique();
        let counter = ObjectId::gen_count();

        let mut buf = [0u8; 12];
        buf[0..4].copy_from_slice(&timestamp);
        buf[4..9].copy_from_slice(&process_unique);
        buf[9..12].copy_from_slice(&counter);

        ObjectId::from_bytes(buf)
    }

    /// Construct an ObjectId from its raw byte representation.
    pub const fn from_bytes(bytes: [u8; 12]) -> ObjectId {
        ObjectId { id: bytes }
    }

    /// Construct an ObjectId from a 24-character hexadecimal string.
    pub fn parse_str(s: impl AsRef<str>) -> Result<ObjectId> {
        let s = s.as_ref();
        let bytes: Vec<u8> = hex::decode(s.as_bytes())
            .map_err(|_| Error::argument(format!("invalid ObjectId hex string \"{s}\"")))?;
        if bytes.len() != 12 {
            return Err(Error::argument(format!(
                "ObjectId hex string must be 24 characters, got {}",
                s.len()
            )));
        }
        let mut buf = [0u8; 12];
        buf.copy_from_slice(&bytes);
        Ok(ObjectId::from_bytes(buf))
    }

    /// The raw byte representation.
    pub const fn bytes(&self) -> [u8; 12] {
        self.id
    }

    /// The timestamp portion, as seconds since the Unix epoch.
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.id[0], self.id[1], self.id[2], self.id[3]])
    }

    /// The hexadecimal string representation.
    pub fn to_hex(self) -> String {
        hex::encode(self.id)
    }

    fn gen_timestamp() -> [u8; 4] {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0) as u32;
        secs.to_be_bytes()
    }

    fn process_unique() -> [u8; 5] {
        use std::sync::OnceLock;
        static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
        *PROCESS_UNIQUE.get_or_init(|| {
            let mut bytes = [0u8; 5];
            OsRng.fill_bytes(&mut bytes);
            bytes
        })
    }

    fn gen_count() -> [u8; 3] {
        use std::sync::OnceLock;
        static SEEDED: OnceLock<()> = OnceLock::new();
        SEEDED.get_or_init(|| {
            OID_COUNTER.store(OsRng.next_u32() & 0xFF_FFFF, Ordering::SeqCst);
        });
        let count = OID_COUNTER.fetch_add(1, Ordering::SeqCst) & 0xFF_FFFF;
        let [_, b1, b2, b3] = count.to_be_bytes();
        [b1, b2, b3]
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        ObjectId::new()
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<ObjectId> {
        ObjectId::parse_str(s)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId(\"{}\")", self.to_hex())
    }
}
