//! Token-indexed table of live sessions.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc, RwLock,
    },
};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::Rng;

use crate::{broker::ERROR_EVENT, session::Session};

const TOKEN_SIZE: usize = 12;

/// Thread-safe map from access token to session.
#[derive(Debug, Default)]
pub struct Sessions {
    list: RwLock<HashMap<String, Arc<Session>>>,
    active: AtomicI64,
}

impl Sessions {
    /// Inserts a session under a fresh random token and returns it.
    ///
    /// A closer is installed on the underlying connection: when the
    /// connection dies the session is removed from the table, and an
    /// abnormal termination is announced to SSE subscribers as an
    /// `error` event before the terminal `close`.
    pub fn store(self: &Arc<Self>, session: Arc<Session>) -> String {
        let raw: [u8; TOKEN_SIZE] = rand::rng().random();
        let token = URL_SAFE_NO_PAD.encode(raw);
        let active = self.active.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(user = %session.user_name(), token = %token, active, "store session");
        self.list
            .write()
            .unwrap()
            .insert(token.clone(), session.clone());
        let sessions = self.clone();
        let broker = session.broker().clone();
        let closer_token = token.clone();
        session.connection().set_closer(move |err| {
            if let Some(err) = err {
                broker.publish(ERROR_EVENT, err.to_string());
            }
            broker.close();
            sessions.delete(&closer_token);
        });
        token
    }

    /// Looks a session up by token.
    pub fn get(&self, token: &str) -> Option<Arc<Session>> {
        self.list.read().unwrap().get(token).cloned()
    }

    /// Removes a session from the table without touching the
    /// connection. Idempotent.
    pub fn delete(&self, token: &str) {
        if self.list.write().unwrap().remove(token).is_some() {
            let active = self.active.fetch_sub(1, Ordering::Relaxed) - 1;
            tracing::debug!(token = %token, active, "delete session");
        }
    }

    /// Number of sessions currently in the table.
    pub fn active(&self) -> i64 {
        self.active.load(Ordering::Relaxed)
    }

    /// Closes every session. Each close triggers the connection closer,
    /// which removes the entry; the drain here makes the teardown safe
    /// under concurrent deletion.
    pub fn close_all(&self) {
        let all: Vec<(String, Arc<Session>)> =
            self.list.write().unwrap().drain().collect();
        for (token, session) in all {
            tracing::debug!(token = %token, "closing session at shutdown");
            self.active.fetch_sub(1, Ordering::Relaxed);
            session.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_url_safe_and_unique() {
        let raw: [u8; TOKEN_SIZE] = rand::rng().random();
        let token = URL_SAFE_NO_PAD.encode(raw);
        assert_eq!(token.len(), 16);
        assert!(!token.contains('='));
        let other = URL_SAFE_NO_PAD.encode(rand::rng().random::<[u8; TOKEN_SIZE]>());
        assert_ne!(token, other);
    }
}
