//! A slot for externally implemented mechanisms such as GSSAPI.

use crate::auth::conversation::Conversation;
use crate::auth::credential::{Credential, Evidence};
use crate::auth::sasl::{Mechanism, Step};
use crate::error::Result;

/// The security-context half of an external mechanism. Implementations wrap a
/// platform library (Kerberos, an SSPI binding) and own any native handles,
/// registering them with the conversation so they are released when it ends.
pub trait ExternalSecurityProvider {
    /// The mechanism name to advertise, e.g. `"GSSAPI"`.
    fn mechanism_name(&self) -> &'static str;

    /// Produce the first client message and the state machine that follows.
    fn initialize(&self, conversation: &mut Conversation, credential: &Credential)
        -> Result<Step>;
}

/// Adapter that exposes an [`ExternalSecurityProvider`] as a [`Mechanism`].
/// Only process-identity credentials apply; passwords never reach the
/// provider.
pub struct External {
    provider: Box<dyn ExternalSecurityProvider>,
}

impl External {
    pub fn new(provider: Box<dyn ExternalSecurityProvider>) -> External {
        External { provider }
    }
}

impl Mechanism for External {
    fn name(&self) -> &'static str {
        self.provider.mechanism_name()
    }

    fn can_use(&self, credential: &Credential) -> bool {
        matches!(credential.evidence(), Evidence::Process(_))
    }

    fn initialize(
        &self,
        conversation: &mut Conversation,
        credential: &Credential,
    ) -> Result<Step> {
        self.provider.initialize(conversation, credential)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::auth::conversation::ConversationResource;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Handle {
        released: Rc<RefCell<bool>>,
    }

    impl ConversationResource for Handle {
        fn release(&mut self) {
            *self.released.borrow_mut() = true;
        }
    }

    struct StubProvider {
        released: Rc<RefCell<bool>>,
    }

    impl ExternalSecurityProvider for StubProvider {
        fn mechanism_name(&self) -> &'static str {
            "GSSAPI"
        }

        fn initialize(
            &self,
            conversation: &mut Conversation,
            _credential: &Credential,
        ) -> Result<Step> {
            conversation.register(Box::new(Handle {
                released: Rc::clone(&self.released),
            }));
            Ok(Step::conclude(b"token".to_vec()))
        }
    }

    #[test]
    fn provider_resources_are_released_with_the_conversation() {
        let released = Rc::new(RefCell::new(false));
        let mechanism = External::new(Box::new(StubProvider {
            released: Rc::clone(&released),
        }));
        let credential = Credential::external("CN=svc").unwrap();

        {
            let mut conversation = Conversation::new();
            let step = mechanism.initialize(&mut conversation, &credential).unwrap();
            assert_eq!(step.payload, b"token");
            assert!(!*released.borrow());
        }

        assert!(*released.borrow());
    }

    #[test]
    fn password_credentials_do_not_apply() {
        let mechanism = External::new(Box::new(StubProvider {
            released: Rc::new(RefCell::new(false)),
        }));
        let credential = Credential::password("bob", "admin", "pw").unwrap();
        assert!(!mechanism.can_use(&credential));
    }
}
