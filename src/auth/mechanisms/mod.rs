//! The built-in SASL mechanisms.

pub mod cram_md5;
pub mod digest_md5;
pub mod external;
pub mod plain;
pub mod scram_sha1;

pub use self::cram_md5::CramMd5;
pub use self::digest_md5::DigestMd5;
pub use self::external::{External, ExternalSecurityProvider};
pub use self::plain::Plain;
pub use self::scram_sha1::ScramSha1;
