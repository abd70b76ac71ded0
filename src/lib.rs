//! The core of a document-database client: the BSON value model, the binary
//! codec, and the authentication subsystem.
//!
//! ## Values and documents
//!
//! BSON values are modeled by the [`Bson`] enum and composed into ordered
//! [`Document`]s, most conveniently through the [`doc!`] macro:
//!
//! ```rust
//! use docwire::doc;
//!
//! let mut doc = doc! {
//!     "title": "Back to the Future",
//!     "year": 1985,
//! };
//! doc.insert("director", "Robert Zemeckis");
//!
//! let bytes = doc.to_vec()?;
//! let round_tripped = docwire::Document::from_slice(&bytes)?;
//! assert_eq!(round_tripped, doc);
//! # Ok::<(), docwire::Error>(())
//! ```
//!
//! Types with more than one legal wire encoding (128-bit decimals, UUIDs) are
//! resolved through [`RepresentationOptions`], passed explicitly to the
//! `*_with` codec entry points. Encoding and decoding with the same options
//! round-trips exactly.
//!
//! ## Authentication
//!
//! The [`auth`] module negotiates a SASL mechanism with the server and drives
//! the challenge/response conversation over a caller-supplied
//! [`auth::CommandRunner`]:
//!
//! ```rust,no_run
//! use docwire::auth::{CommandRunner, Credential, SaslAuthenticator};
//! # struct Connection;
//! # impl CommandRunner for Connection {
//! #     fn run_command(
//! #         &mut self,
//! #         _: &str,
//! #         _: &docwire::Document,
//! #     ) -> docwire::Result<docwire::Document> {
//! #         unimplemented!()
//! #     }
//! # }
//! # let mut connection = Connection;
//!
//! let credential = Credential::password("app", "admin", "hunter2")?;
//! SaslAuthenticator::default().authenticate(&mut connection, &credential)?;
//! # Ok::<(), docwire::Error>(())
//! ```

pub mod auth;
mod binary;
mod bson;
mod datetime;
mod de;
mod decimal;
mod document;
mod error;
#[macro_use]
mod macros;
mod oid;
mod options;
mod ser;
pub mod spec;

pub use self::binary::{Binary, UuidRepresentation};
pub use self::bson::{Array, Bson, DbPointer, JavaScriptCodeWithScope, Regex, Timestamp};
pub use self::datetime::DateTime;
pub use self::decimal::Decimal128;
pub use self::document::Document;
pub use self::error::{Error, ErrorKind, Result};
pub use self::oid::ObjectId;
pub use self::options::RepresentationOptions;
