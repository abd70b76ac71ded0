//! Who is authenticating, and with what proof.

use std::fmt::{self, Debug, Formatter};
use std::str;

use md5::Md5;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// A user identity: an account name and the database it is defined in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    username: String,
    source: String,
}

impl Identity {
    /// Create an identity. Both fields must be non-empty.
    pub fn new(username: impl Into<String>, source: impl Into<String>) -> Result<Identity> {
        let username = username.into();
        let source = source.into();
        if username.is_empty() {
            return Err(Error::argument("username must not be empty"));
        }
        if source.is_empty() {
            return Err(Error::argument("identity source must not be empty"));
        }
        Ok(Identity { username, source })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// The database that holds this user's account.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// A password held for the duration of an authentication attempt.
///
/// The raw bytes are wiped when the evidence is dropped. Equality compares
/// SHA-256 digests so two instances can be compared without retaining either
/// password longer than necessary.
pub struct PasswordEvidence {
    secret: Vec<u8>,
    digest: [u8; 32],
}

impl PasswordEvidence {
    pub fn new(password: impl Into<String>) -> PasswordEvidence {
        let secret = password.into().into_bytes();
        let digest = Sha256::digest(&secret).into();
        PasswordEvidence { secret, digest }
    }

    pub(crate) fn password(&self) -> &str {
        // Constructed from a String, so always valid UTF-8.
        str::from_utf8(&self.secret).unwrap_or_default()
    }
}

impl Clone for PasswordEvidence {
    fn clone(&self) -> Self {
        PasswordEvidence {
            secret: self.secret.clone(),
            digest: self.digest,
        }
    }
}

impl PartialEq for PasswordEvidence {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest
    }
}

impl Eq for PasswordEvidence {}

impl Debug for PasswordEvidence {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordEvidence(<redacted>)")
    }
}

impl Drop for PasswordEvidence {
    fn drop(&mut self) {
        for byte in self.secret.iter_mut() {
            // Volatile so the wipe survives dead-store elimination.
            unsafe { std::ptr::write_volatile(byte, 0) };
        }
    }
}

/// Evidence tied to the identity of the running process rather than a secret
/// the caller supplies, e.g. an X.509 client certificate or a Kerberos ticket.
/// Any two process evidences compare equal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessEvidence;

/// The proof of identity attached to a [`Credential`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Evidence {
    Password(PasswordEvidence),
    Process(ProcessEvidence),
}

/// An identity plus the evidence used to prove it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
    identity: Identity,
    evidence: Evidence,
    mechanism: Option<String>,
}

impl Credential {
    /// A password credential for a user defined in `source`.
    pub fn password(
        username: impl Into<String>,
        source: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Credential> {
        Ok(Credential {
            identity: Identity::new(username, source)?,
            evidence: Evidence::Password(PasswordEvidence::new(password)),
            mechanism: None,
        })
    }

    /// A credential backed by the ambient process identity, resolved against
    /// the `$external` source.
    pub fn external(username: impl Into<String>) -> Result<Credential> {
        Ok(Credential {
            identity: Identity::new(username, "$external")?,
            evidence: Evidence::Process(ProcessEvidence),
            mechanism: None,
        })
    }

    /// Pin the credential to a named mechanism, skipping negotiation.
    pub fn with_mechanism(mut self, mechanism: impl Into<String>) -> Credential {
        self.mechanism = Some(mechanism.into());
        self
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn evidence(&self) -> &Evidence {
        &self.evidence
    }

    pub fn mechanism(&self) -> Option<&str> {
        self.mechanism.as_deref()
    }

    /// The password, for mechanisms that require one.
    pub(crate) fn password_str(&self) -> Result<&str> {
        match &self.evidence {
            Evidence::Password(evidence) => Ok(evidence.password()),
            Evidence::Process(_) => Err(Error::argument(
                "this mechanism requires a password credential",
            )),
        }
    }
}

/// The shared password digest: `hex(MD5("<username>:mongo:<password>"))`.
pub(crate) fn mongo_password_digest(username: &str, password: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(username.as_bytes());
    hasher.update(b":mongo:");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn password_evidence_compares_by_digest() {
        let a = PasswordEvidence::new("hunter2");
        let b = PasswordEvidence::new("hunter2");
        let c = PasswordEvidence::new("hunter3");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn password_evidence_never_prints_the_secret() {
        let evidence = PasswordEvidence::new("hunter2");
        let printed = format!("{evidence:?}");
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn process_evidence_is_equal_by_type() {
        assert_eq!(ProcessEvidence, ProcessEvidence);
    }

    #[test]
    fn empty_identity_fields_are_rejected() {
        assert!(Identity::new("", "admin").is_err());
        assert!(Identity::new("bob", "").is_err());
    }

    #[test]
    fn known_password_digest() {
        // From the documented digest construction for user "user" with
        // password "pencil".
        assert_eq!(
            mongo_password_digest("user", "pencil"),
            "1c33006ec1ffd90f9cadcbcc0e118200"
        );
    }
}
