//! The mechanism-agnostic SASL conversation engine.

use std::fmt;

use tracing::debug;

use crate::auth::conversation::Conversation;
use crate::auth::credential::Credential;
use crate::auth::CommandRunner;
use crate::binary::Binary;
use crate::bson::Bson;
use crate::doc;
use crate::document::Document;
use crate::error::{Error, Result};

/// One client turn: the bytes to send and what happens afterwards.
pub struct Step {
    /// The payload to hand the server in this round.
    pub payload: Vec<u8>,
    /// What the mechanism does with the server's next challenge.
    pub next: NextStep,
}

impl Step {
    pub fn conclude(payload: Vec<u8>) -> Step {
        Step {
            payload,
            next: NextStep::Finished,
        }
    }

    pub fn then(payload: Vec<u8>, state: impl SaslState + 'static) -> Step {
        Step {
            payload,
            next: NextStep::Continue(Box::new(state)),
        }
    }
}

// Payloads carry proofs derived from credentials; Debug output shows their
// length only.
impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("payload_len", &self.payload.len())
            .field("next", &self.next)
            .finish()
    }
}

/// Whether the mechanism expects another challenge from the server.
pub enum NextStep {
    Continue(Box<dyn SaslState>),
    Finished,
}

impl fmt::Debug for NextStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextStep::Continue(_) => f.write_str("Continue(..)"),
            NextStep::Finished => f.write_str("Finished"),
        }
    }
}

/// A point in a mechanism's state machine, consumed by the transition that
/// leaves it.
pub trait SaslState {
    fn transition(self: Box<Self>, conversation: &mut Conversation, challenge: &[u8])
        -> Result<Step>;
}

/// A SASL mechanism: a name, an applicability test, and the first step of its
/// state machine.
pub trait Mechanism {
    /// The registered mechanism name, e.g. `"SCRAM-SHA-1"`.
    fn name(&self) -> &'static str;

    /// Whether this mechanism can authenticate the given credential.
    fn can_use(&self, credential: &Credential) -> bool;

    /// Produce the first client message.
    fn initialize(&self, conversation: &mut Conversation, credential: &Credential)
        -> Result<Step>;
}

impl fmt::Debug for dyn Mechanism + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Mechanism").field(&self.name()).finish()
    }
}

struct SaslReply {
    conversation_id: Bson,
    done: bool,
    payload: Vec<u8>,
}

impl SaslReply {
    fn parse(reply: &Document) -> Result<SaslReply> {
        let code = reply
            .get_i32("code")
            .map_err(|_| Error::protocol("SASL reply is missing the code field"))?;
        if code != 0 {
            let errmsg = reply.get_str("errmsg").unwrap_or("authentication failed");
            return Err(Error::security_with_code(code, errmsg));
        }

        let done = reply
            .get_bool("done")
            .map_err(|_| Error::protocol("SASL reply is missing the done field"))?;

        // The remaining fields only matter while the conversation continues;
        // a final reply may legitimately omit them.
        let conversation_id = if done {
            Bson::Null
        } else {
            reply
                .get("conversationId")
                .cloned()
                .ok_or_else(|| Error::protocol("SASL reply is missing the conversationId field"))?
        };
        let payload = if done {
            Vec::new()
        } else {
            reply
                .get_binary("payload")
                .map_err(|_| Error::protocol("SASL reply is missing the payload field"))?
                .bytes
                .clone()
        };

        Ok(SaslReply {
            conversation_id,
            done,
            payload,
        })
    }
}

/// Drive a full conversation for `mechanism` over `runner`, issuing
/// `saslStart` and as many `saslContinue` rounds as the server asks for.
pub(crate) fn run_conversation(
    runner: &mut dyn CommandRunner,
    mechanism: &dyn Mechanism,
    credential: &Credential,
) -> Result<()> {
    let database = credential.identity().source();
    let mut conversation = Conversation::new();

    let Step { payload, mut next } = mechanism.initialize(&mut conversation, credential)?;
    let mut command = doc! {
        "saslStart": 1,
        "mechanism": mechanism.name(),
        "payload": Binary::from(payload),
        "autoAuthorize": 1,
    };

    let mut round = 1u32;
    loop {
        let reply = runner.run_command(database, &command)?;
        let reply = SaslReply::parse(&reply)?;
        debug!(
            mechanism = mechanism.name(),
            round,
            done = reply.done,
            "SASL round completed"
        );

        if reply.done {
            return Ok(());
        }

        let state = match next {
            NextStep::Continue(state) => state,
            NextStep::Finished => {
                return Err(Error::protocol(
                    "server requested another SASL round after the mechanism finished",
                ))
            }
        };

        let step = state.transition(&mut conversation, &reply.payload)?;
        next = step.next;
        command = doc! {
            "saslContinue": 1,
            "conversationId": reply.conversation_id,
            "payload": Binary::from(step.payload),
        };
        round += 1;
    }
}
