//! Lifetime management for resources a mechanism acquires mid-conversation.

/// A resource owned by a [`Conversation`], released when the conversation
/// ends.
pub trait ConversationResource {
    fn release(&mut self);
}

/// The shared state of one authentication exchange.
///
/// Mechanisms register resources (security contexts, native handles) as they
/// acquire them; the conversation releases them in reverse registration order
/// when it is dropped, on every exit path including errors.
#[derive(Default)]
pub struct Conversation {
    resources: Vec<Box<dyn ConversationResource>>,
}

impl Conversation {
    pub fn new() -> Conversation {
        Conversation::default()
    }

    /// Take ownership of a resource for the rest of the conversation.
    pub fn register(&mut self, resource: Box<dyn ConversationResource>) {
        self.resources.push(resource);
    }
}

impl Drop for Conversation {
    fn drop(&mut self) {
        while let Some(mut resource) = self.resources.pop() {
            resource.release();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Tracked {
        id: u32,
        log: Rc<RefCell<Vec<u32>>>,
    }

    impl ConversationResource for Tracked {
        fn release(&mut self) {
            self.log.borrow_mut().push(self.id);
        }
    }

    #[test]
    fn resources_release_in_reverse_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));

        {
            let mut conversation = Conversation::new();
            for id in 1..=3 {
                conversation.register(Box::new(Tracked {
                    id,
                    log: Rc::clone(&log),
                }));
            }
        }

        assert_eq!(*log.borrow(), vec![3, 2, 1]);
    }
}
