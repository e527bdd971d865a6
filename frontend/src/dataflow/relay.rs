//! Typed event relay with any number of subscribers
//!
//! A relay is the only way state owners announce changes. Every subscriber
//! gets its own unbounded channel, so a slow view never drops events for
//! another one.

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use std::cell::RefCell;
use std::rc::Rc;

/// Event relay following the `{source}_{event}_relay` naming pattern:
/// - `blobs_changed_relay` - bucket model announced a change
/// - `pointer_event_relay` - the canvas received a pointer event
///
/// # Examples
///
/// ```rust
/// let (polling_changed_relay, mut polling_stream) = relay::<bool>();
/// let mut second_view = polling_changed_relay.subscribe();
///
/// polling_changed_relay.send(false);
///
/// assert_eq!(polling_stream.next().await, Some(false));
/// assert_eq!(second_view.next().await, Some(false));
/// ```
pub struct Relay<T>
where
    T: Clone + 'static,
{
    subscribers: Rc<RefCell<Vec<UnboundedSender<T>>>>,
}

impl<T> Clone for Relay<T>
where
    T: Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            subscribers: self.subscribers.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Relay<T>
where
    T: Clone + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl<T> Relay<T>
where
    T: Clone + 'static,
{
    /// Relay without subscribers; events are dropped until someone subscribes.
    pub fn new() -> Self {
        Self {
            subscribers: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Adds a subscriber. It only sees events sent after this call.
    pub fn subscribe(&self) -> UnboundedReceiver<T> {
        let (sender, receiver) = unbounded();
        self.subscribers.borrow_mut().push(sender);
        receiver
    }

    /// Delivers `value` to every live subscriber and forgets the dropped ones.
    pub fn send(&self, value: T) {
        self.subscribers
            .borrow_mut()
            .retain(|subscriber| subscriber.unbounded_send(value.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|subscriber| !subscriber.is_closed())
            .count()
    }
}

impl<T> Default for Relay<T>
where
    T: Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Creates a relay together with its first subscription.
pub fn relay<T>() -> (Relay<T>, UnboundedReceiver<T>)
where
    T: Clone + 'static,
{
    let relay = Relay::new();
    let receiver = relay.subscribe();
    (relay, receiver)
}
