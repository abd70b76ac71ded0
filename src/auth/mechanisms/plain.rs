//! PLAIN (RFC 4616): a single NUL-delimited cleartext message.

use crate::auth::conversation::Conversation;
use crate::auth::credential::{Credential, Evidence};
use crate::auth::sasl::{Mechanism, Step};
use crate::error::Result;

/// The PLAIN mechanism, used against LDAP-backed deployments. The password
/// crosses the wire unprotected, so this is only sensible over TLS.
#[derive(Default)]
pub struct Plain;

pub(crate) const MECHANISM_NAME: &str = "PLAIN";

impl Mechanism for Plain {
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
        // authzid is left empty: authorize as the authenticated user.
        let mut payload = Vec::new();
        payload.push(0);
        payload.extend_from_slice(credential.identity().username().as_bytes());
        payload.push(0);
        payload.extend_from_slice(credential.password_str()?.as_bytes());

        Ok(Step::conclude(payload))
    }
}
