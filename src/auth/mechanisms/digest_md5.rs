//! DIGEST-MD5 (RFC 2831), md5-sess with `qop=auth`.

use std::str;

use md5::{Digest, Md5};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::auth::conversation::Conversation;
use crate::auth::credential::{mongo_password_digest, Credential, Evidence};
use crate::auth::sasl::{Mechanism, SaslState, Step};
use crate::error::{Error, Result};

pub(crate) const MECHANISM_NAME: &str = "DIGEST-MD5";

const NONCE_COUNT: &str = "00000001";
const CNONCE_LENGTH: usize = 16;

/// The DIGEST-MD5 challenge/response mechanism.
///
/// Server-first: the client answers the digest-challenge with a response
/// keyed on the shared password digest, then checks the server's `rspauth`
/// before concluding. The digest URI names the database service on the host
/// the mechanism is built for, so the instance is per-server rather than
/// shared.
pub struct DigestMd5 {
    service_host: String,
}

impl DigestMd5 {
    pub fn new(service_host: impl Into<String>) -> DigestMd5 {
        DigestMd5 {
            service_host: service_host.into(),
        }
    }
}

impl Mechanism for DigestMd5 {
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
        let secret = mongo_password_digest(username.as_str(), credential.password_str()?);

        Ok(Step::then(
            Vec::new(),
            AwaitingChallenge {
                username,
                secret,
                digest_uri: format!("mongodb/{}", self.service_host),
            },
        ))
    }
}

fn generate_cnonce() -> String {
    let mut bytes = [0u8; CNONCE_LENGTH];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Split a challenge into `key=value` directives, honoring quoted values.
fn parse_directives(challenge: &[u8]) -> Result<Vec<(String, String)>> {
    let text = str::from_utf8(challenge)
        .map_err(|_| Error::protocol("digest-challenge is not valid UTF-8"))?;

    let mut directives = Vec::new();
    let mut rest = text.trim_start();
    while !rest.is_empty() {
        let eq = rest
            .find('=')
            .ok_or_else(|| Error::protocol("malformed digest-challenge directive"))?;
        let key = rest[..eq].trim().to_owned();
        rest = &rest[eq + 1..];

        let value = if let Some(quoted) = rest.strip_prefix('"') {
            let end = quoted
                .find('"')
                .ok_or_else(|| Error::protocol("unterminated quoted directive value"))?;
            let value = quoted[..end].to_owned();
            rest = quoted[end + 1..].trim_start();
            value
        } else {
            let end = rest.find(',').unwrap_or(rest.len());
            let value = rest[..end].trim().to_owned();
            rest = &rest[end..];
            value
        };
        rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();

        directives.push((key, value));
    }
    Ok(directives)
}

fn directive<'a>(directives: &'a [(String, String)], name: &str) -> Option<&'a str> {
    directives
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// The RFC 2831 response-value: `a2_prefix` is `AUTHENTICATE` for the client
/// response and empty for the server's `rspauth`.
fn response_value(
    username: &str,
    realm: &str,
    secret: &str,
    nonce: &str,
    cnonce: &str,
    digest_uri: &str,
    a2_prefix: &str,
) -> String {
    let mut a1 = Md5::digest(format!("{username}:{realm}:{secret}").as_bytes()).to_vec();
    a1.extend_from_slice(format!(":{nonce}:{cnonce}").as_bytes());
    let ha1 = hex::encode(Md5::digest(&a1));
    let ha2 = hex::encode(Md5::digest(format!("{a2_prefix}:{digest_uri}").as_bytes()));

    hex::encode(Md5::digest(
        format!("{ha1}:{nonce}:{NONCE_COUNT}:{cnonce}:auth:{ha2}").as_bytes(),
    ))
}

struct AwaitingChallenge {
    username: String,
    secret: String,
    digest_uri: String,
}

impl SaslState for AwaitingChallenge {
    fn transition(
        self: Box<Self>,
        _conversation: &mut Conversation,
        challenge: &[u8],
    ) -> Result<Step> {
        let directives = parse_directives(challenge)?;
        let nonce = directive(&directives, "nonce")
            .ok_or_else(|| Error::protocol("digest-challenge is missing the nonce directive"))?;
        let realm = directive(&directives, "realm").unwrap_or("");
        let cnonce = generate_cnonce();

        let response = response_value(
            &self.username,
            realm,
            &self.secret,
            nonce,
            &cnonce,
            &self.digest_uri,
            "AUTHENTICATE",
        );
        let expected_rspauth = response_value(
            &self.username,
            realm,
            &self.secret,
            nonce,
            &cnonce,
            &self.digest_uri,
            "",
        );

        let message = format!(
            "username=\"{}\",realm=\"{realm}\",nonce=\"{nonce}\",cnonce=\"{cnonce}\",\
             nc={NONCE_COUNT},qop=auth,digest-uri=\"{}\",response={response},charset=utf-8",
            self.username, self.digest_uri
        );

        Ok(Step::then(
            message.into_bytes(),
            AwaitingRspauth {
                expected: expected_rspauth,
            },
        ))
    }
}

struct AwaitingRspauth {
    expected: String,
}

impl SaslState for AwaitingRspauth {
    fn transition(
        self: Box<Self>,
        _conversation: &mut Conversation,
        challenge: &[u8],
    ) -> Result<Step> {
        let directives = parse_directives(challenge)?;
        let rspauth = directive(&directives, "rspauth")
            .ok_or_else(|| Error::protocol("server reply is missing the rspauth directive"))?;
        if rspauth != self.expected {
            return Err(Error::security(
                "server failed to prove knowledge of the shared secret",
            ));
        }

        Ok(Step::conclude(Vec::new()))
    }
}
