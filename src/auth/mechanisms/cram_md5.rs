//! CRAM-MD5 (RFC 2195), keyed with the shared password digest.

use hmac::{Hmac, Mac};
use md5::Md5;

use crate::auth::conversation::Conversation;
use crate::auth::credential::{mongo_password_digest, Credential, Evidence};
use crate::auth::sasl::{Mechanism, SaslState, Step};
use crate::error::{Error, Result};

/// The CRAM-MD5 challenge/response mechanism.
///
/// The client sends no initial data; the server issues a challenge and the
/// client answers with `"<username> " + hex(HMAC-MD5(digest, challenge))`,
/// where the HMAC key is the hex password digest.
#[derive(Default)]
pub struct CramMd5;

pub(crate) const MECHANISM_NAME: &str = "CRAM-MD5";

impl Mechanism for CramMd5 {
    fn name(&self) -> &'static str {
        MECHANISM_NAME
    }

    fn can_use(&self, credential: &Credential) -> bool {
        matches!(credential.evidence(), Evidence::Password(_))
    }

    fn initialize(
        &self,
        _conversation: &mut Conversation,
        credential: &Credential,
    ) -> Result<Step> {
        let username = credential.identity().username().to_owned();
        let digest = mongo_password_digest(username.as_str(), credential.password_str()?);

        Ok(Step::then(Vec::new(), AwaitingChallenge { username, digest }))
    }
}

struct AwaitingChallenge {
    username: String,
    digest: String,
}

impl SaslState for AwaitingChallenge {
    fn transition(
        self: Box<Self>,
        _conversation: &mut Conversation,
        challenge: &[u8],
    ) -> Result<Step> {
        let mut mac = Hmac::<Md5>::new_from_slice(self.digest.as_bytes())
            .map_err(|_| Error::argument("invalid HMAC key length"))?;
        mac.update(challenge);
        let response = format!("{} {}", self.username, hex::encode(mac.finalize().into_bytes()));

        Ok(Step::conclude(response.into_bytes()))
    }
}
