//! Mechanism discovery and selection.

use tracing::debug;

use crate::auth::credential::Credential;
use crate::auth::mechanisms::{CramMd5, Plain, ScramSha1};
use crate::auth::sasl::{self, Mechanism};
use crate::auth::CommandRunner;
use crate::binary::Binary;
use crate::bson::Bson;
use crate::doc;
use crate::error::{Error, Result};

/// The client's ordered list of known mechanisms, strongest first.
///
/// The ordering is fixed at construction; callers wanting a different policy
/// substitute a whole registry rather than reordering per call, so a single
/// request cannot downgrade the negotiation.
pub struct MechanismRegistry {
    mechanisms: Vec<Box<dyn Mechanism>>,
}

impl MechanismRegistry {
    /// The default preference order.
    pub fn standard() -> MechanismRegistry {
        MechanismRegistry {
            mechanisms: vec![
                Box::new(ScramSha1),
                Box::new(CramMd5),
                Box::new(Plain),
            ],
        }
    }

    /// A registry with an explicit mechanism list, strongest first.
    pub fn new(mechanisms: Vec<Box<dyn Mechanism>>) -> MechanismRegistry {
        MechanismRegistry { mechanisms }
    }

    /// Append a mechanism at the end of the preference order.
    pub fn register(&mut self, mechanism: Box<dyn Mechanism>) {
        self.mechanisms.push(mechanism);
    }

    /// Ask the server which mechanisms it supports by probing with an empty
    /// mechanism name. Legacy servers omit the field; that reads as an empty
    /// list, not an error.
    pub fn discover(&self, runner: &mut dyn CommandRunner, source: &str) -> Result<Vec<String>> {
        let command = doc! {
            "saslStart": 1,
            "mechanism": "",
            "payload": Binary::from(Vec::new()),
        };
        let reply = runner.run_command(source, &command)?;

        let supported = match reply.get("supportedMechanisms") {
            Some(Bson::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_owned))
                .collect(),
            _ => Vec::new(),
        };
        Ok(supported)
    }

    /// The first mechanism in preference order that the server advertises and
    /// that can authenticate the credential.
    pub fn select(
        &self,
        server_mechanisms: &[String],
        credential: &Credential,
    ) -> Result<&dyn Mechanism> {
        self.mechanisms
            .iter()
            .find(|mechanism| {
                server_mechanisms.iter().any(|name| name == mechanism.name())
                    && mechanism.can_use(credential)
            })
            .map(Box::as_ref)
            .ok_or_else(|| Error::security("unable to negotiate a protocol"))
    }

    fn find(&self, name: &str) -> Option<&dyn Mechanism> {
        self.mechanisms
            .iter()
            .find(|mechanism| mechanism.name() == name)
            .map(Box::as_ref)
    }
}

impl Default for MechanismRegistry {
    fn default() -> Self {
        MechanismRegistry::standard()
    }
}

/// Authenticates a credential over a [`CommandRunner`], negotiating the
/// mechanism first unless the credential pins one.
pub struct SaslAuthenticator {
    registry: MechanismRegistry,
}

impl SaslAuthenticator {
    pub fn new(registry: MechanismRegistry) -> SaslAuthenticator {
        SaslAuthenticator { registry }
    }

    pub fn authenticate(
        &self,
        runner: &mut dyn CommandRunner,
        credential: &Credential,
    ) -> Result<()> {
        let mechanism = match credential.mechanism() {
            Some(name) => self
                .registry
                .find(name)
                .filter(|mechanism| mechanism.can_use(credential))
                .ok_or_else(|| {
                    Error::security(format!("mechanism {name} cannot authenticate this credential"))
                })?,
            None => {
                let advertised = self
                    .registry
                    .discover(&mut *runner, credential.identity().source())?;
                self.registry.select(&advertised, credential)?
            }
        };

        debug!(
            mechanism = mechanism.name(),
            username = credential.identity().username(),
            source = credential.identity().source(),
            "mechanism selected"
        );
        sasl::run_conversation(runner, mechanism, credential)
    }
}

impl Default for SaslAuthenticator {
    fn default() -> Self {
        SaslAuthenticator::new(MechanismRegistry::standard())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::auth::sasl::test::ScriptedRunner;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn selection_honors_client_preference_order() {
        let registry = MechanismRegistry::standard();
        let credential = Credential::password("bob", "admin", "pw").unwrap();

        let selected = registry
            .select(&names(&["CRAM-MD5", "SCRAM-SHA-1"]), &credential)
            .unwrap();
        assert_eq!(selected.name(), "SCRAM-SHA-1");

        let selected = registry.select(&names(&["CRAM-MD5"]), &credential).unwrap();
        assert_eq!(selected.name(), "CRAM-MD5");
    }

    #[test]
    fn no_match_is_a_security_error() {
        let registry = MechanismRegistry::standard();
        let credential = Credential::password("bob", "admin", "pw").unwrap();

        assert!(registry.select(&[], &credential).unwrap_err().is_security());
        assert!(registry
            .select(&names(&["GSSAPI"]), &credential)
            .unwrap_err()
            .is_security());
    }

    #[test]
    fn incompatible_evidence_skips_a_mechanism() {
        let registry = MechanismRegistry::standard();
        let credential = Credential::external("CN=svc").unwrap();

        // Advertised, but every standard mechanism wants a password.
        let err = registry
            .select(&names(&["SCRAM-SHA-1", "PLAIN"]), &credential)
            .unwrap_err();
        assert!(err.is_security());
    }

    #[test]
    fn registered_mechanisms_join_the_negotiation() {
        let mut registry = MechanismRegistry::standard();
        registry.register(Box::new(crate::auth::mechanisms::DigestMd5::new(
            "db.example.com",
        )));
        let credential = Credential::password("bob", "admin", "pw").unwrap();

        let selected = registry
            .select(&names(&["DIGEST-MD5"]), &credential)
            .unwrap();
        assert_eq!(selected.name(), "DIGEST-MD5");

        // Appended mechanisms never outrank the standard set.
        let selected = registry
            .select(&names(&["DIGEST-MD5", "SCRAM-SHA-1"]), &credential)
            .unwrap();
        assert_eq!(selected.name(), "SCRAM-SHA-1");
    }

    #[test]
    fn discovery_probe_uses_an_empty_mechanism_name() {
        let registry = MechanismRegistry::standard();
        let mut runner = ScriptedRunner::new(vec![doc! {
            "supportedMechanisms": ["SCRAM-SHA-1", "CRAM-MD5"],
            "code": 0,
            "done": true,
        }]);

        let advertised = registry.discover(&mut runner, "admin").unwrap();
        assert_eq!(advertised, names(&["SCRAM-SHA-1", "CRAM-MD5"]));

        let (database, probe) = &runner.commands[0];
        assert_eq!(database, "admin");
        assert_eq!(probe.get_str("mechanism").unwrap(), "");
        assert!(probe.get_binary("payload").unwrap().bytes.is_empty());
    }

    #[test]
    fn legacy_servers_read_as_no_mechanisms() {
        let registry = MechanismRegistry::standard();
        let mut runner = ScriptedRunner::new(vec![doc! { "ok": 1 }]);

        assert!(registry.discover(&mut runner, "admin").unwrap().is_empty());
    }
}
