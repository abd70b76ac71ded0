//! SCRAM-SHA-1 (RFC 5802), keyed with the shared password digest.

use std::str;

use base64::prelude::{Engine, BASE64_STANDARD};
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha1::{Digest, Sha1};

use crate::auth::conversation::Conversation;
use crate::auth::credential::{mongo_password_digest, Credential, Evidence};
use crate::auth::sasl::{Mechanism, SaslState, Step};
use crate::error::{Error, Result};

pub(crate) const MECHANISM_NAME: &str = "SCRAM-SHA-1";

const NONCE_LENGTH: usize = 24;
const HASH_LENGTH: usize = 20;

/// Salted challenge/response authentication.
///
/// The proof is derived from the hex password digest rather than the raw
/// password, and the server always finishes with one empty round after its
/// signature has been sent.
#[derive(Default)]
pub struct ScramSha1;

impl Mechanism for ScramSha1 {
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
        let username = credential.identity().username();
        let digest = mongo_password_digest(username, credential.password_str()?);
        let client_nonce = generate_nonce();

        let client_first_bare = format!("n={},r={}", escape_username(username), client_nonce);
        let payload = format!("n,,{client_first_bare}");

        Ok(Step::then(
            payload.into_bytes(),
            ClientFirstSent {
                digest,
                client_nonce,
                client_first_bare,
            },
        ))
    }
}

fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_LENGTH];
    OsRng.fill_bytes(&mut bytes);
    BASE64_STANDARD.encode(bytes)
}

/// `=` and `,` are structural in SCRAM messages and must be escaped in the
/// username.
fn escape_username(username: &str) -> String {
    username.replace('=', "=3D").replace(',', "=2C")
}

fn hmac_sha1(key: &[u8], data: &[u8]) -> Result<[u8; HASH_LENGTH]> {
    let mut mac = Hmac::<Sha1>::new_from_slice(key)
        .map_err(|_| Error::argument("invalid HMAC key length"))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

/// Split a SCRAM message into its single-letter attributes.
fn parse_attributes(message: &str) -> Result<Vec<(char, &str)>> {
    message
        .split(',')
        .map(|part| {
            let (name, value) = part
                .split_once('=')
                .ok_or_else(|| Error::protocol(format!("malformed SCRAM attribute {part:?}")))?;
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(letter), None) => Ok((letter, value)),
                _ => Err(Error::protocol(format!(
                    "malformed SCRAM attribute name {name:?}"
                ))),
            }
        })
        .collect()
}

fn required_attribute<'a>(attributes: &[(char, &'a str)], name: char) -> Result<&'a str> {
    attributes
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| *v)
        .ok_or_else(|| Error::protocol(format!("SCRAM message is missing the {name} attribute")))
}

struct ClientFirstSent {
    digest: String,
    client_nonce: String,
    client_first_bare: String,
}

impl SaslState for ClientFirstSent {
    fn transition(
        self: Box<Self>,
        _conversation: &mut Conversation,
        challenge: &[u8],
    ) -> Result<Step> {
        let server_first = str::from_utf8(challenge)
            .map_err(|_| Error::protocol("SCRAM server-first message is not UTF-8"))?;
        let attributes = parse_attributes(server_first)?;

        let server_nonce = required_attribute(&attributes, 'r')?;
        if !server_nonce.starts_with(self.client_nonce.as_str()) {
            return Err(Error::security(
                "server nonce does not extend the client nonce",
            ));
        }

        let salt = BASE64_STANDARD
            .decode(required_attribute(&attributes, 's')?)
            .map_err(|e| Error::protocol(format!("invalid SCRAM salt: {e}")))?;
        let iterations: u32 = required_attribute(&attributes, 'i')?
            .parse()
            .map_err(|_| Error::protocol("invalid SCRAM iteration count"))?;

        let mut salted_password = [0u8; HASH_LENGTH];
        pbkdf2_hmac::<Sha1>(
            self.digest.as_bytes(),
            &salt,
            iterations,
            &mut salted_password,
        );

        let client_key = hmac_sha1(&salted_password, b"Client Key")?;
        let stored_key = Sha1::digest(client_key);

        // "biws" is base64("n,,"): the channel binding we sent in client-first.
        let without_proof = format!("c=biws,r={server_nonce}");
        let auth_message = format!(
            "{},{},{}",
            self.client_first_bare, server_first, without_proof
        );

        let client_signature = hmac_sha1(stored_key.as_slice(), auth_message.as_bytes())?;
        let proof: Vec<u8> = client_key
            .iter()
            .zip(client_signature.iter())
            .map(|(k, s)| k ^ s)
            .collect();
        let payload = format!("{},p={}", without_proof, BASE64_STANDARD.encode(proof));

        let server_key = hmac_sha1(&salted_password, b"Server Key")?;
        let server_signature = hmac_sha1(&server_key, auth_message.as_bytes())?;

        Ok(Step::then(
            payload.into_bytes(),
            ClientFinalSent { server_signature },
        ))
    }
}

struct ClientFinalSent {
    server_signature: [u8; HASH_LENGTH],
}

impl SaslState for ClientFinalSent {
    fn transition(
        self: Box<Self>,
        _conversation: &mut Conversation,
        challenge: &[u8],
    ) -> Result<Step> {
        let server_final = str::from_utf8(challenge)
            .map_err(|_| Error::protocol("SCRAM server-final message is not UTF-8"))?;
        let attributes = parse_attributes(server_final)?;

        let verifier = BASE64_STANDARD
            .decode(required_attribute(&attributes, 'v')?)
            .map_err(|e| Error::protocol(format!("invalid SCRAM server signature: {e}")))?;
        if verifier != self.server_signature {
            return Err(Error::security("server signature verification failed"));
        }

        // The server closes the conversation with one last empty round.
        Ok(Step::conclude(Vec::new()))
    }
}
