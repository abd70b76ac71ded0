//! The legacy nonce/response scheme that predates SASL.

use md5::{Digest, Md5};
use tracing::debug;

use crate::auth::credential::{mongo_password_digest, Credential};
use crate::auth::CommandRunner;
use crate::bson::Bson;
use crate::doc;
use crate::document::Document;
use crate::error::{Error, Result};

/// Authenticate with the two-command nonce exchange: `getnonce` followed by
/// `authenticate` carrying `hex(MD5(nonce + username + digest))`.
pub fn authenticate(runner: &mut dyn CommandRunner, credential: &Credential) -> Result<()> {
    let identity = credential.identity();
    let database = identity.source();

    let reply = runner.run_command(database, &doc! { "getnonce": 1 })?;
    check_ok(&reply)?;
    let nonce = reply
        .get_str("nonce")
        .map_err(|_| Error::protocol("getnonce reply is missing the nonce field"))?;

    let key = response_key(nonce, identity.username(), credential.password_str()?);
    let command = doc! {
        "authenticate": 1,
        "user": identity.username(),
        "nonce": nonce,
        "key": key,
    };

    let reply = runner.run_command(database, &command)?;
    if check_ok(&reply).is_err() {
        let errmsg = reply.get_str("errmsg").unwrap_or("authentication failed");
        return Err(Error::security(errmsg));
    }

    debug!(username = identity.username(), source = database, "authenticated");
    Ok(())
}

fn response_key(nonce: &str, username: &str, password: &str) -> String {
    let digest = mongo_password_digest(username, password);

    let mut hasher = Md5::new();
    hasher.update(nonce.as_bytes());
    hasher.update(username.as_bytes());
    hasher.update(digest.as_bytes());
    hex::encode(hasher.finalize())
}

fn check_ok(reply: &Document) -> Result<()> {
    let ok = match reply.get("ok") {
        Some(Bson::Double(v)) => *v == 1.0,
        Some(Bson::Int32(v)) => *v == 1,
        Some(Bson::Int64(v)) => *v == 1,
        Some(Bson::Boolean(v)) => *v,
        _ => return Err(Error::protocol("command reply is missing the ok field")),
    };
    if !ok {
        return Err(Error::security("command returned ok: 0"));
    }
    Ok(())
}
