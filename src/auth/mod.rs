//! Authentication against a document database server.
//!
//! The entry point is [`SaslAuthenticator`], which negotiates a mechanism with
//! the server and drives the challenge/response conversation over a caller
//! supplied [`CommandRunner`]. The legacy nonce-based scheme lives in
//! [`mongo_cr`] and does not go through SASL at all.

pub mod conversation;
pub mod credential;
pub mod mechanisms;
pub mod mongo_cr;
pub mod negotiate;
pub mod sasl;

pub use self::conversation::{Conversation, ConversationResource};
pub use self::credential::{Credential, Evidence, Identity, PasswordEvidence, ProcessEvidence};
pub use self::negotiate::{MechanismRegistry, SaslAuthenticator};
pub use self::sasl::{Mechanism, NextStep, SaslState, Step};

use crate::document::Document;
use crate::error::Result;

/// The transport seam: something that can execute a database command and
/// return the server's reply document.
pub trait CommandRunner {
    fn run_command(&mut self, database: &str, command: &Document) -> Result<Document>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &mut T {
    fn run_command(&mut self, database: &str, command: &Document) -> Result<Document> {
        (**self).run_command(database, command)
    }
}
