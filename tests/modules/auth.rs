use base64::prelude::{Engine, BASE64_STANDARD};
use hmac::{Hmac, Mac};
use md5::Md5;
use pbkdf2::pbkdf2_hmac;
use sha1::{Digest, Sha1};

use docwire::auth::{CommandRunner, Credential, SaslAuthenticator};
use docwire::{doc, Binary, Document, ErrorKind, Result};

fn hmac_sha1(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha1>::new_from_slice(key).unwrap();
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn password_digest(username: &str, password: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(format!("{username}:mongo:{password}"));
    hex::encode(hasher.finalize())
}

/// A server-side SCRAM-SHA-1 implementation good for exactly one user.
struct ScramServer {
    salt: Vec<u8>,
    iterations: u32,
    stored_key: Vec<u8>,
    server_key: Vec<u8>,
    client_first_bare: Option<String>,
    server_first: Option<String>,
    commands_seen: Vec<String>,
}

impl ScramServer {
    fn new(username: &str, password: &str) -> ScramServer {
        let salt = b"fifteen sixteen".to_vec();
        let iterations = 4096;

        let digest = password_digest(username, password);
        let mut salted = [0u8; 20];
        pbkdf2_hmac::<Sha1>(digest.as_bytes(), &salt, iterations, &mut salted);
        let client_key = hmac_sha1(&salted, b"Client Key");
        let stored_key = Sha1::digest(&client_key).to_vec();
        let server_key = hmac_sha1(&salted, b"Server Key");

        ScramServer {
            salt,
            iterations,
            stored_key,
            server_key,
            client_first_bare: None,
            server_first: None,
            commands_seen: Vec::new(),
        }
    }

    fn attribute<'a>(message: &'a str, name: char) -> &'a str {
        message
            .split(',')
            .find_map(|part| part.strip_prefix(&format!("{name}=")))
            .unwrap_or_else(|| panic!("no {name} attribute in {message:?}"))
    }

    fn start(&mut self, payload: &[u8]) -> Document {
        let client_first = String::from_utf8(payload.to_vec()).unwrap();
        let bare = client_first.strip_prefix("n,,").unwrap().to_owned();
        let client_nonce = Self::attribute(&bare, 'r');

        let server_first = format!(
            "r={client_nonce}ServerSide,s={},i={}",
            BASE64_STANDARD.encode(&self.salt),
            self.iterations
        );
        self.client_first_bare = Some(bare);
        self.server_first = Some(server_first.clone());

        doc! {
            "conversationId": 1,
            "code": 0,
            "done": false,
            "payload": Binary::from(server_first.into_bytes()),
        }
    }

    fn continue_conversation(&mut self, command: &Document) -> Document {
        assert_eq!(command.get_i32("conversationId").unwrap(), 1);
        let payload = command.get_binary("payload").unwrap().bytes.clone();

        if payload.is_empty() {
            // The closing round after the server signature was accepted.
            return doc! { "conversationId": 1, "code": 0, "done": true };
        }

        let client_final = String::from_utf8(payload).unwrap();
        let without_proof = client_final
            .rsplit_once(",p=")
            .map(|(head, _)| head)
            .unwrap();
        let auth_message = format!(
            "{},{},{}",
            self.client_first_bare.as_deref().unwrap(),
            self.server_first.as_deref().unwrap(),
            without_proof
        );

        let client_signature = hmac_sha1(&self.stored_key, auth_message.as_bytes());
        let proof = BASE64_STANDARD
            .decode(Self::attribute(&client_final, 'p'))
            .unwrap();
        let client_key: Vec<u8> = proof
            .iter()
            .zip(client_signature.iter())
            .map(|(p, s)| p ^ s)
            .collect();

        if Sha1::digest(&client_key).as_slice() != self.stored_key {
            return doc! {
                "conversationId": 1,
                "code": 18,
                "done": false,
                "errmsg": "Authentication failed.",
            };
        }

        let server_signature = hmac_sha1(&self.server_key, auth_message.as_bytes());
        let server_final = format!("v={}", BASE64_STANDARD.encode(server_signature));
        doc! {
            "conversationId": 1,
            "code": 0,
            "done": false,
            "payload": Binary::from(server_final.into_bytes()),
        }
    }
}

impl CommandRunner for ScramServer {
    fn run_command(&mut self, database: &str, command: &Document) -> Result<Document> {
        assert_eq!(database, "admin");

        if command.contains_key("saslStart") {
            let mechanism = command.get_str("mechanism").unwrap();
            self.commands_seen.push(format!("saslStart:{mechanism}"));
            if mechanism.is_empty() {
                return Ok(doc! {
                    "supportedMechanisms": ["SCRAM-SHA-1", "CRAM-MD5"],
                    "code": 0,
                    "done": true,
                });
            }
            assert_eq!(mechanism, "SCRAM-SHA-1");
            let payload = command.get_binary("payload").unwrap().bytes.clone();
            return Ok(self.start(&payload));
        }

        self.commands_seen.push("saslContinue".to_string());
        Ok(self.continue_conversation(command))
    }
}

#[test]
fn authenticates_end_to_end_over_scram() {
    let mut server = ScramServer::new("user", "pencil");
    let credential = Credential::password("user", "admin", "pencil").unwrap();

    SaslAuthenticator::default()
        .authenticate(&mut server, &credential)
        .unwrap();

    assert_eq!(
        server.commands_seen,
        vec![
            "saslStart:",
            "saslStart:SCRAM-SHA-1",
            "saslContinue",
            "saslContinue",
        ]
    );
}

#[test]
fn wrong_password_is_rejected_with_the_server_code() {
    let mut server = ScramServer::new("user", "pencil");
    let credential = Credential::password("user", "admin", "pen").unwrap();

    let err = SaslAuthenticator::default()
        .authenticate(&mut server, &credential)
        .unwrap_err();

    match err.kind {
        ErrorKind::Security { code, .. } => assert_eq!(code, Some(18)),
        other => panic!("expected a security error, got {other}"),
    }
    // The conversation stopped at the rejected proof.
    assert_eq!(server.commands_seen.last().unwrap(), "saslContinue");
    assert_eq!(server.commands_seen.len(), 3);
}

#[test]
fn pinned_mechanism_skips_discovery() {
    let mut server = ScramServer::new("user", "pencil");
    let credential = Credential::password("user", "admin", "pencil")
        .unwrap()
        .with_mechanism("SCRAM-SHA-1");

    SaslAuthenticator::default()
        .authenticate(&mut server, &credential)
        .unwrap();

    assert_eq!(server.commands_seen.first().unwrap(), "saslStart:SCRAM-SHA-1");
}
