//! Client engine for the MX telephony server.
//!
//! The MX server speaks CSTA over TLS: every message is an XML fragment
//! wrapped in an 8-byte length frame that carries a four-digit correlation
//! id. [`Connection`] owns the socket, performs the login handshake, keeps
//! the link alive and multiplexes responses and unsolicited events back to
//! the callers.

mod codec;
mod conn;
mod error;
mod login;
mod tls;

pub use codec::{Codec, Frame, EVENT_ID, KEEP_ALIVE_BODY};
pub use conn::{
    Connection, CONNECT_TIMEOUT, DEFAULT_PORT, KEEP_ALIVE_INTERVAL, READ_TIMEOUT,
};
pub use error::{CstaError, Error, LoginError, LogoutError};
pub use login::{Info, Jid, Login};
