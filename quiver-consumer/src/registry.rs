use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::message::Message;

/// A callback invoked for every message received on a topic.
///
/// Handlers are invoked on whatever task or thread the broker client delivers
/// from, potentially concurrently for the same topic.
pub trait MessageHandler: Send + Sync + 'static {
    fn handle(&self, msg: &Message);
}

impl<F> MessageHandler for F
where
    F: Fn(&Message) + Send + Sync + 'static,
{
    fn handle(&self, msg: &Message) {
        (self)(msg)
    }
}

#[derive(Clone, Default)]
/// Maps each topic to the single handler its messages are dispatched to.
///
/// Registering a handler for a topic which already has one replaces it,
/// the last registration wins.
pub struct TopicHandlerRegistry {
    handlers: Arc<RwLock<HashMap<String, Arc<dyn MessageHandler>>>>,
}

impl TopicHandlerRegistry {
    /// Registers the handler for the given topic.
    ///
    /// Returns the handler which was previously registered for the topic, if any.
    pub fn register<H>(
        &self,
        topic: impl Into<String>,
        handler: H,
    ) -> Option<Arc<dyn MessageHandler>>
    where
        H: MessageHandler,
    {
        let topic = topic.into();
        let previous = {
            let mut lock = self.handlers.write();
            lock.insert(topic.clone(), Arc::new(handler))
        };

        if previous.is_some() {
            warn!(topic = %topic, "Replaced the existing handler for topic.");
        } else {
            debug!(topic = %topic, "Registered handler for topic.");
        }

        previous
    }

    /// Removes the handler for the given topic.
    pub fn unregister(&self, topic: &str) -> Option<Arc<dyn MessageHandler>> {
        self.handlers.write().remove(topic)
    }

    /// Gets the handler registered for the given topic.
    pub fn handler(&self, topic: &str) -> Option<Arc<dyn MessageHandler>> {
        self.handlers.read().get(topic).cloned()
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.handlers.read().contains_key(topic)
    }

    /// The topics which currently have a handler.
    pub fn topics(&self) -> Vec<String> {
        let mut topics = self.handlers.read().keys().cloned().collect::<Vec<_>>();
        topics.sort();
        topics
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// Invokes the handler registered for the topic with the message.
    ///
    /// The lock is only held for the lookup, a slow handler holds up neither
    /// other dispatches nor registrations. This means registration does not
    /// exclude dispatches which are already running: a dispatch which looked
    /// up a handler before it was replaced still completes with the old one.
    /// Only dispatches starting after `register` returns see the new handler.
    ///
    /// Messages for a topic without a handler are dropped.
    ///
    /// Returns if a handler was invoked.
    pub fn dispatch(&self, topic: &str, msg: &Message) -> bool {
        let handler = match self.handler(topic) {
            Some(handler) => handler,
            None => {
                warn!(topic = topic, msg_id = %msg.id, "No handler registered for topic, dropping message.");
                return false;
            },
        };

        trace!(topic = topic, msg_id = %msg.id, attempts = msg.attempts, "Dispatching message.");
        handler.handle(msg);
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;
    use std::time::{Duration, Instant};

    use super::*;

    fn message(body: &'static str) -> Message {
        Message::new(*b"0000000000000001", 0, body)
    }

    fn counting_handler(counter: &Arc<AtomicUsize>) -> impl MessageHandler {
        let counter = counter.clone();
        move |_: &Message| {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_dispatch_to_registered_handler() {
        let registry = TopicHandlerRegistry::default();
        let received = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let sink = received.clone();
        registry.register("orders", move |msg: &Message| {
            sink.lock().push(msg.body.clone());
        });

        assert!(registry.dispatch("orders", &message("first")));
        assert!(registry.dispatch("orders", &message("second")));
        assert_eq!(
            received.lock().as_slice(),
            &[bytes::Bytes::from("first"), bytes::Bytes::from("second")],
        );
    }

    #[test]
    fn test_last_registration_wins() {
        let registry = TopicHandlerRegistry::default();
        let handler_a = Arc::new(AtomicUsize::new(0));
        let handler_b = Arc::new(AtomicUsize::new(0));

        let previous = registry.register("orders", counting_handler(&handler_a));
        assert!(previous.is_none());
        let previous = registry.register("orders", counting_handler(&handler_b));
        assert!(previous.is_some(), "Replacing a handler should return the old one");

        registry.dispatch("orders", &message("hello"));
        assert_eq!(handler_a.load(Ordering::SeqCst), 0);
        assert_eq!(handler_b.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_dispatch_unregistered_topic() {
        let registry = TopicHandlerRegistry::default();
        let counter = Arc::new(AtomicUsize::new(0));
        registry.register("orders", counting_handler(&counter));

        assert!(!registry.dispatch("payments", &message("hello")));
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        registry.unregister("orders");
        assert!(!registry.dispatch("orders", &message("hello")));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_topics_are_independent() {
        let registry = TopicHandlerRegistry::default();
        let orders = Arc::new(AtomicUsize::new(0));
        let payments = Arc::new(AtomicUsize::new(0));
        registry.register("orders", counting_handler(&orders));
        registry.register("payments", counting_handler(&payments));

        registry.dispatch("orders", &message("1"));
        registry.dispatch("orders", &message("2"));
        registry.dispatch("payments", &message("3"));

        assert_eq!(orders.load(Ordering::SeqCst), 2);
        assert_eq!(payments.load(Ordering::SeqCst), 1);
        assert_eq!(registry.topics(), vec!["orders".to_string(), "payments".to_string()]);
    }

    #[test]
    fn test_slow_handler_does_not_block_others() {
        let registry = TopicHandlerRegistry::default();
        let (started_tx, started_rx) = mpsc::channel();
        let started_tx = parking_lot::Mutex::new(started_tx);
        registry.register("slow", move |_: &Message| {
            let _ = started_tx.lock().send(());
            thread::sleep(Duration::from_millis(500));
        });
        let fast = Arc::new(AtomicUsize::new(0));
        registry.register("fast", counting_handler(&fast));

        let slow_registry = registry.clone();
        let slow = thread::spawn(move || slow_registry.dispatch("slow", &message("1")));
        started_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("Slow handler should start");

        let start = Instant::now();
        assert!(registry.dispatch("fast", &message("2")));
        assert!(!registry.dispatch("missing", &message("3")));
        registry.register("late", counting_handler(&fast));
        assert!(start.elapsed() < Duration::from_millis(250));
        assert_eq!(fast.load(Ordering::SeqCst), 1);

        assert!(slow.join().expect("Join slow dispatch"));
    }

    #[test]
    fn test_replace_during_running_dispatch() {
        let registry = TopicHandlerRegistry::default();
        let (started_tx, started_rx) = mpsc::channel();
        let started_tx = parking_lot::Mutex::new(started_tx);
        let old = Arc::new(AtomicUsize::new(0));
        let old_counter = old.clone();
        registry.register("orders", move |_: &Message| {
            let _ = started_tx.lock().send(());
            thread::sleep(Duration::from_millis(500));
            old_counter.fetch_add(1, Ordering::SeqCst);
        });

        let running_registry = registry.clone();
        let running = thread::spawn(move || running_registry.dispatch("orders", &message("1")));
        started_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("Old handler should start");

        let new = Arc::new(AtomicUsize::new(0));
        let start = Instant::now();
        let previous = registry.register("orders", counting_handler(&new));
        assert!(previous.is_some());
        assert!(start.elapsed() < Duration::from_millis(250));

        assert!(running.join().expect("Join running dispatch"));
        assert_eq!(old.load(Ordering::SeqCst), 1);
        assert_eq!(new.load(Ordering::SeqCst), 0);

        registry.dispatch("orders", &message("2"));
        assert_eq!(old.load(Ordering::SeqCst), 1);
        assert_eq!(new.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_dispatch_same_topic() {
        let registry = TopicHandlerRegistry::default();
        let counter = Arc::new(AtomicUsize::new(0));
        registry.register("orders", counting_handler(&counter));

        let threads = (0..8)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        registry.dispatch("orders", &message("hello"));
                    }
                })
            })
            .collect::<Vec<_>>();

        for handle in threads {
            handle.join().expect("Join dispatch thread");
        }

        assert_eq!(counter.load(Ordering::SeqCst), 800);
    }
}
