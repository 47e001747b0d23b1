use quick_xml::events::Event;
use serde::{Deserialize, Serialize};

/// Unified error type for everything a connection can fail with.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server rejected the login request.
    #[error(transparent)]
    Login(#[from] LoginError),
    /// The server answered a command with a `CSTAErrorCode` frame.
    #[error(transparent)]
    Csta(#[from] CstaError),
    /// No response arrived within [`crate::READ_TIMEOUT`].
    #[error("MX response timeout")]
    Timeout,
    /// The server terminated the session with a `Logout` frame.
    #[error(transparent)]
    Logout(#[from] LogoutError),
    /// Socket-level failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The frame body could not be decoded into the expected schema.
    #[error("xml decode: {0}")]
    Xml(#[from] quick_xml::DeError),
    /// The peer violated the wire protocol.
    #[error("protocol: {0}")]
    Protocol(String),
}

impl Error {
    /// True when the error is a local or socket-level timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Timeout => true,
            Error::Io(err) => err.kind() == std::io::ErrorKind::TimedOut,
            _ => false,
        }
    }
}

/// Authorization failure reported by a `loginFailed` frame.
#[derive(Debug, Clone, Default, Deserialize, Serialize, thiserror::Error)]
#[error("login denied (code {code}): {message}")]
pub struct LoginError {
    #[serde(default, rename(deserialize = "@code"))]
    pub code: u8,
    #[serde(default, rename(deserialize = "@apiversion", serialize = "api"))]
    pub apiversion: u16,
    #[serde(default, rename(deserialize = "$text"))]
    pub message: String,
}

/// Command failure reported by a `CSTAErrorCode` frame.
///
/// The error payload is a single child element whose name is free-form,
/// so the message is pulled out of the first child rather than bound to
/// a schema.
#[derive(Debug, Clone, Default, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct CstaError {
    pub message: String,
}

impl CstaError {
    /// Extracts the text of the first child element of the error frame.
    pub fn parse(body: &str) -> Self {
        let mut reader = quick_xml::Reader::from_str(body);
        reader.config_mut().trim_text(true);
        let mut depth = 0u32;
        let mut message = String::new();
        loop {
            match reader.read_event() {
                Ok(Event::Start(_)) => depth += 1,
                Ok(Event::Text(text)) if depth > 1 => {
                    message = text.unescape().unwrap_or_default().into_owned();
                    break;
                }
                Ok(Event::Eof) | Err(_) => break,
                _ => {}
            }
        }
        CstaError { message }
    }
}

/// Forced session termination pushed by the server.
#[derive(Debug, Clone, Default, Deserialize, Serialize, thiserror::Error)]
#[error("logout: {mode}")]
pub struct LogoutError {
    #[serde(default, rename(deserialize = "@mode"))]
    pub mode: String,
}
