//! Per-session publish/subscribe fan-out feeding the SSE streams.

use std::sync::Mutex;

use tokio::sync::mpsc;

/// Capacity of each subscriber queue. A subscriber that falls this far
/// behind is disconnected instead of stalling the publisher.
const SUBSCRIBER_BUFFER: usize = 32;

/// Name of the terminal event delivered when the session ends.
pub const CLOSE_EVENT: &str = "close";

/// Name of the event carrying the abnormal-close reason.
pub const ERROR_EVENT: &str = "error";

/// An event as published to SSE subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub name: &'static str,
    pub data: String,
}

/// Event fan-out for one session.
///
/// Subscribers observe only events published after they joined. Closing
/// the broker delivers a final `close` event and detaches every
/// subscriber; it is idempotent, and later publishes are dropped.
#[derive(Debug, Default)]
pub struct Broker {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    subscribers: Vec<mpsc::Sender<Published>>,
    closed: bool,
}

impl Broker {
    /// Registers a new subscriber and returns its event stream.
    pub fn subscribe(&self) -> mpsc::Receiver<Published> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let mut state = self.state.lock().unwrap();
        if state.closed {
            // the stream ends right after the terminal event
            let _ = tx.try_send(Published {
                name: CLOSE_EVENT,
                data: String::new(),
            });
        } else {
            state.subscribers.push(tx);
        }
        rx
    }

    /// Delivers an event to every live subscriber. Subscribers whose
    /// queue is full or gone are dropped.
    pub fn publish(&self, name: &'static str, data: String) {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return;
        }
        state.subscribers.retain(|tx| {
            tx.try_send(Published {
                name,
                data: data.clone(),
            })
            .is_ok()
        });
    }

    /// Publishes the terminal `close` event and detaches all subscribers.
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return;
        }
        state.closed = true;
        for tx in state.subscribers.drain(..) {
            let _ = tx.try_send(Published {
                name: CLOSE_EVENT,
                data: String::new(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_sees_only_later_events() {
        let broker = Broker::default();
        broker.publish("early", "1".into());
        let mut rx = broker.subscribe();
        broker.publish("late", "2".into());
        let event = rx.recv().await.unwrap();
        assert_eq!(event.name, "late");
        assert_eq!(event.data, "2");
    }

    #[tokio::test]
    async fn all_subscribers_receive_in_order() {
        let broker = Broker::default();
        let mut first = broker.subscribe();
        let mut second = broker.subscribe();
        broker.publish("a", "1".into());
        broker.publish("b", "2".into());
        for rx in [&mut first, &mut second] {
            assert_eq!(rx.recv().await.unwrap().name, "a");
            assert_eq!(rx.recv().await.unwrap().name, "b");
        }
    }

    #[tokio::test]
    async fn lagging_subscriber_is_disconnected() {
        let broker = Broker::default();
        let mut lagging = broker.subscribe();
        for n in 0..=SUBSCRIBER_BUFFER {
            broker.publish("tick", n.to_string());
        }
        // queue overflowed: subscriber dropped, stream ends after drain
        let mut seen = 0;
        while lagging.recv().await.is_some() {
            seen += 1;
        }
        assert_eq!(seen, SUBSCRIBER_BUFFER);
    }

    #[tokio::test]
    async fn close_sends_terminal_event() {
        let broker = Broker::default();
        let mut rx = broker.subscribe();
        broker.close();
        broker.close(); // idempotent
        assert_eq!(rx.recv().await.unwrap().name, CLOSE_EVENT);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn subscribe_after_close_terminates_immediately() {
        let broker = Broker::default();
        broker.close();
        let mut rx = broker.subscribe();
        assert_eq!(rx.recv().await.unwrap().name, CLOSE_EVENT);
        assert!(rx.recv().await.is_none());
    }
}
