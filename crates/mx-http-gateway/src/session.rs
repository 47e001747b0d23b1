//! A logged-in user session: one MX connection plus its event fan-out.

use std::sync::Arc;

use mx::{Connection, Frame, Login};
use tokio::sync::mpsc;

use crate::{broker::Broker, events};

/// Wraps an authenticated [`Connection`] and republishes its decoded
/// events to the session [`Broker`].
pub struct Session {
    conn: Connection,
    login: Login,
    broker: Arc<Broker>,
}

impl Session {
    /// Takes ownership of a connection and starts the event dispatcher.
    pub fn start(conn: Connection, login: Login) -> Arc<Session> {
        let events = conn.events();
        let broker = Arc::new(Broker::default());
        let session = Arc::new(Session {
            conn,
            login,
            broker,
        });
        tokio::spawn(dispatch(
            events,
            session.broker.clone(),
            session.login.user_name.clone(),
        ));
        session
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn broker(&self) -> &Arc<Broker> {
        &self.broker
    }

    pub fn user_name(&self) -> &str {
        &self.login.user_name
    }

    /// Ends the session: subscribers get the terminal `close` event and
    /// the connection is torn down.
    pub fn close(&self) {
        self.broker.close();
        self.conn.close();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.login.user_name)
            .finish()
    }
}

/// Decodes unsolicited frames and hands them to the broker. Runs until
/// the connection reader closes the event channel.
async fn dispatch(mut frames: mpsc::Receiver<Frame>, broker: Arc<Broker>, user: String) {
    while let Some(frame) = frames.recv().await {
        match events::decode(&frame) {
            Ok(Some((name, body))) => broker.publish(name, body.to_string()),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(user = %user, event = %frame.name, error = %err, "undecodable event")
            }
        }
    }
    tracing::debug!(user = %user, "event dispatcher finished");
}
