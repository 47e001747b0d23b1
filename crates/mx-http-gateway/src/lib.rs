//! HTTP/JSON and SSE gateway in front of an MX telephony server.
//!
//! Each HTTP client that logs in gets a token-bound [`session::Session`]
//! wrapping one authenticated [`mx::Connection`]. Commands are posted as
//! JSON, translated through the [`commands`] catalog to the XML wire
//! form, and the asynchronous [`events`] of the session are streamed
//! back over Server-Sent Events.

pub mod broker;
pub mod commands;
pub mod events;
pub mod http;
pub mod session;
pub mod sessions;
pub mod wire;
