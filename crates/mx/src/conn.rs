use std::{
    borrow::Cow,
    collections::HashMap,
    io,
    sync::{
        atomic::{AtomicU16, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
    sync::{mpsc, oneshot},
    time::Instant,
};
use tokio_rustls::{rustls::pki_types::ServerName, TlsConnector};
use tokio_util::{
    codec::{FramedRead, FramedWrite},
    sync::CancellationToken,
};

use crate::{
    codec::{Codec, Frame, EVENT_ID, KEEP_ALIVE_BODY},
    error::{CstaError, Error, LogoutError},
    login::{self, Info, Login},
    tls,
};

/// Default MX server port, appended when the host carries none.
pub const DEFAULT_PORT: u16 = 7778;

/// Maximum time to wait for the TLS connection to come up.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Maximum time to wait for a command response or a named event.
pub const READ_TIMEOUT: Duration = Duration::from_secs(7);

/// Idle interval after which a keep-alive frame is written.
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(60);

pub(crate) type BoxRead = Box<dyn AsyncRead + Send + Unpin>;
type BoxWrite = Box<dyn AsyncWrite + Send + Unpin>;
type Closer = Box<dyn FnOnce(Option<Error>) + Send>;

/// An authenticated connection to an MX server.
///
/// A background reader task matches responses to pending commands by
/// correlation id and fans unsolicited events out to the channel handed
/// out by [`Connection::events`]. A second task keeps the link alive
/// while it is idle. Both stop when the connection is closed, the socket
/// fails, or the server pushes a `Logout`.
pub struct Connection {
    info: Info,
    inner: Arc<Inner>,
}

struct Writer {
    sink: FramedWrite<BoxWrite, Codec>,
    last_send: Instant,
}

pub(crate) struct Inner {
    /// Serializes socket writes and guards the keep-alive deadline.
    writer: tokio::sync::Mutex<Writer>,
    counter: AtomicU16,
    pending: Mutex<HashMap<u16, oneshot::Sender<Frame>>>,
    waiters: Mutex<HashMap<String, oneshot::Sender<Frame>>>,
    events: Mutex<Option<mpsc::Sender<Frame>>>,
    closer: Mutex<Option<Closer>>,
    cancel: CancellationToken,
    user: String,
}

impl Connection {
    /// Connects to the MX server and authorizes the user.
    ///
    /// The host gets the default port appended when it carries none. The
    /// TLS handshake runs with certificate verification disabled, which
    /// is how the upstream expects to be contacted.
    pub async fn connect(host: &str, login: Login) -> Result<Connection, Error> {
        let (server_name, addr) = host_port(host);
        let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timeout"))??;
        let connector = TlsConnector::from(Arc::new(tls::client_config()));
        let server_name = ServerName::try_from(server_name)
            .map_err(|err| Error::Protocol(format!("invalid server name: {err}")))?;
        let stream = connector.connect(server_name, stream).await?;
        Self::establish(stream, login).await
    }

    /// Performs the login handshake on an already-open stream and spawns
    /// the reader and keep-alive tasks.
    ///
    /// This is the transport-agnostic half of [`Connection::connect`];
    /// it works over any duplex byte stream.
    pub async fn establish<S>(stream: S, login: Login) -> Result<Connection, Error>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read, write) = tokio::io::split(stream);
        let mut reader = FramedRead::new(Box::new(read) as BoxRead, Codec);
        let inner = Arc::new(Inner {
            writer: tokio::sync::Mutex::new(Writer {
                sink: FramedWrite::new(Box::new(write) as BoxWrite, Codec),
                last_send: Instant::now(),
            }),
            counter: AtomicU16::new(0),
            pending: Mutex::new(HashMap::new()),
            waiters: Mutex::new(HashMap::new()),
            events: Mutex::new(None),
            closer: Mutex::new(None),
            cancel: CancellationToken::new(),
            user: login.user_name.clone(),
        });
        let info = login::authorize(&inner, &mut reader, &login).await?;
        tokio::spawn(read_loop(inner.clone(), reader));
        tokio::spawn(keep_alive_loop(inner.clone()));
        Ok(Connection { info, inner })
    }

    /// Login information returned by the server.
    pub fn info(&self) -> &Info {
        &self.info
    }

    /// Sends a command without waiting for a reply.
    pub async fn send<C: Serialize>(&self, root: &str, cmd: &C) -> Result<(), Error> {
        let xml = marshal(root, cmd)?;
        self.inner.write_frame(self.inner.next_id(), xml.into()).await
    }

    /// Sends a pre-rendered XML fragment without waiting for a reply.
    pub async fn send_raw(&self, xml: &str) -> Result<(), Error> {
        self.inner
            .write_frame(self.inner.next_id(), Bytes::copy_from_slice(xml.as_bytes()))
            .await
    }

    /// Sends a command and decodes the correlated response into `R`.
    ///
    /// Returns [`Error::Csta`] when the server answers with a
    /// `CSTAErrorCode` frame and [`Error::Timeout`] when nothing matching
    /// arrives within [`READ_TIMEOUT`].
    pub async fn command<C, R>(&self, root: &str, cmd: &C) -> Result<R, Error>
    where
        C: Serialize,
        R: DeserializeOwned,
    {
        self.request(marshal(root, cmd)?).await?.decode()
    }

    /// Sends a command and waits for the correlated response, discarding
    /// its body. Used for commands whose only interesting reply is a
    /// possible `CSTAErrorCode`.
    pub async fn execute<C: Serialize>(&self, root: &str, cmd: &C) -> Result<(), Error> {
        self.request(marshal(root, cmd)?).await.map(drop)
    }

    async fn request(&self, xml: String) -> Result<Frame, Error> {
        let id = self.inner.next_id();
        let (tx, rx) = oneshot::channel();
        self.inner.pending.lock().unwrap().insert(id, tx);
        // the entry goes away on every exit path, including cancellation
        let _cleanup = PendingGuard { inner: &self.inner, id };
        self.inner.write_frame(id, xml.into()).await?;
        match tokio::time::timeout(READ_TIMEOUT, rx).await {
            Ok(Ok(frame)) if frame.name == "CSTAErrorCode" => {
                Err(Error::Csta(CstaError::parse(&frame.body)))
            }
            Ok(Ok(frame)) => Ok(frame),
            // Deliberately reported as a timeout even if the reader died
            // in the meantime; its terminal error reaches the subscribers
            // through the closer.
            Ok(Err(_)) | Err(_) => Err(Error::Timeout),
        }
    }

    /// Waits for an unsolicited event with the given root element and
    /// decodes it into `R`. The event bypasses the fan-out channel.
    ///
    /// Only one waiter per name may exist at a time; a second concurrent
    /// registration is rejected.
    pub async fn wait_event<R: DeserializeOwned>(&self, name: &str) -> Result<R, Error> {
        let (tx, rx) = oneshot::channel();
        {
            let mut waiters = self.inner.waiters.lock().unwrap();
            if waiters.contains_key(name) {
                return Err(Error::Protocol(format!(
                    "event waiter for {name:?} already registered"
                )));
            }
            waiters.insert(name.to_owned(), tx);
        }
        let _cleanup = WaiterGuard { inner: &self.inner, name };
        match tokio::time::timeout(READ_TIMEOUT, rx).await {
            Ok(Ok(frame)) => frame.decode(),
            Ok(Err(_)) | Err(_) => Err(Error::Timeout),
        }
    }

    /// Returns the unsolicited-event channel.
    ///
    /// The channel is bounded and the reader applies back-pressure, so
    /// the single consumer must keep draining it. It is closed when the
    /// reader exits. Calling this again replaces the previous channel.
    pub fn events(&self) -> mpsc::Receiver<Frame> {
        let (tx, rx) = mpsc::channel(1);
        if !self.inner.cancel.is_cancelled() {
            *self.inner.events.lock().unwrap() = Some(tx);
        }
        rx
    }

    /// Installs a callback invoked exactly once when the reader exits,
    /// with the terminal error (`None` for a locally requested close).
    pub fn set_closer(&self, closer: impl FnOnce(Option<Error>) + Send + 'static) {
        *self.inner.closer.lock().unwrap() = Some(Box::new(closer));
    }

    /// Requests connection shutdown. The reader observes the request,
    /// tears the connection down and runs the closer callback.
    pub fn close(&self) {
        self.inner.cancel.cancel();
    }
}

struct PendingGuard<'a> {
    inner: &'a Inner,
    id: u16,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.inner.pending.lock().unwrap().remove(&self.id);
    }
}

struct WaiterGuard<'a> {
    inner: &'a Inner,
    name: &'a str,
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        self.inner.waiters.lock().unwrap().remove(self.name);
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("user", &self.inner.user)
            .field("closed", &self.inner.cancel.is_cancelled())
            .finish()
    }
}

impl Inner {
    /// Next correlation id: 1..=9998, wrapping back to 1.
    pub(crate) fn next_id(&self) -> u16 {
        let previous = self
            .counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(if current >= 9998 { 1 } else { current + 1 })
            })
            .expect("fetch_update never fails");
        if previous >= 9998 { 1 } else { previous + 1 }
    }

    pub(crate) async fn write_frame(&self, id: u16, body: Bytes) -> Result<(), Error> {
        tracing::trace!(user = %self.user, id, body = %redact(std::str::from_utf8(&body).unwrap_or("<binary>")), "send");
        let mut writer = self.writer.lock().await;
        writer.sink.send((id, body)).await?;
        writer.last_send = Instant::now();
        Ok(())
    }
}

async fn read_loop(inner: Arc<Inner>, mut reader: FramedRead<BoxRead, Codec>) {
    let mut terminal: Option<Error> = None;
    loop {
        let next = tokio::select! {
            _ = inner.cancel.cancelled() => break,
            next = reader.next() => next,
        };
        let frame = match next {
            Some(Ok(frame)) => frame,
            Some(Err(err)) => {
                tracing::debug!(user = %inner.user, error = %err, "read failed");
                terminal = Some(err);
                break;
            }
            None => {
                terminal = Some(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed by server",
                )));
                break;
            }
        };
        tracing::trace!(user = %inner.user, id = frame.id, body = %redact(&frame.body), "recv");
        if frame.id < EVENT_ID {
            // response to a pending command; unclaimed responses are dropped
            match inner.pending.lock().unwrap().remove(&frame.id) {
                Some(tx) => {
                    let _ = tx.send(frame);
                }
                None => tracing::debug!(user = %inner.user, id = frame.id, "unclaimed response"),
            }
            continue;
        }
        let logout = frame.name == "Logout";
        let waiter = inner.waiters.lock().unwrap().remove(&frame.name);
        match waiter {
            // awaited events bypass the fan-out channel
            Some(tx) => {
                let _ = tx.send(frame.clone());
            }
            None => {
                let tx = inner.events.lock().unwrap().clone();
                if let Some(tx) = tx {
                    // back-pressure: the reader stalls until the consumer
                    // drains the channel
                    let _ = tx.send(frame.clone()).await;
                }
            }
        }
        if logout {
            terminal = Some(match frame.decode::<LogoutError>() {
                Ok(logout) => Error::Logout(logout),
                Err(err) => err,
            });
            break;
        }
    }
    inner.cancel.cancel();
    // closes the fan-out channel (exactly once, after the reader is done)
    inner.events.lock().unwrap().take();
    if let Some(closer) = inner.closer.lock().unwrap().take() {
        closer(terminal);
    }
}

async fn keep_alive_loop(inner: Arc<Inner>) {
    loop {
        let deadline = inner.writer.lock().await.last_send + KEEP_ALIVE_INTERVAL;
        tokio::select! {
            _ = inner.cancel.cancelled() => return,
            _ = tokio::time::sleep_until(deadline) => {}
        }
        let mut writer = inner.writer.lock().await;
        // a send may have slipped in while this task slept
        if writer.last_send + KEEP_ALIVE_INTERVAL <= Instant::now() {
            if writer
                .sink
                .send((0, Bytes::from_static(KEEP_ALIVE_BODY)))
                .await
                .is_err()
            {
                return;
            }
            writer.last_send = Instant::now();
            tracing::trace!(user = %inner.user, "keep-alive");
        }
    }
}

fn marshal<C: Serialize>(root: &str, cmd: &C) -> Result<String, Error> {
    quick_xml::se::to_string_with_root(root, cmd)
        .map_err(|err| Error::Protocol(format!("xml encode: {err}")))
}

/// Hides voicemail payloads from trace output.
fn redact(body: &str) -> Cow<'_, str> {
    match (body.find("<mediaContent>"), body.rfind("</mediaContent>")) {
        (Some(start), Some(end)) if end > start => Cow::Owned(format!(
            "{}<mediaContent>[bin data]</mediaContent>{}",
            &body[..start],
            &body[end + "</mediaContent>".len()..]
        )),
        _ => Cow::Borrowed(body),
    }
}

/// Splits a host string into the TLS server name and the dial address,
/// appending [`DEFAULT_PORT`] when no port is given.
fn host_port(host: &str) -> (String, String) {
    if let Some(rest) = host.strip_prefix('[') {
        // bracketed IPv6, with or without a port
        if let Some((name, port)) = rest.split_once(']') {
            let addr = if port.is_empty() {
                format!("{host}:{DEFAULT_PORT}")
            } else {
                host.to_owned()
            };
            return (name.to_owned(), addr);
        }
    }
    if host.matches(':').count() > 1 {
        // bare IPv6 address
        return (host.to_owned(), format!("[{host}]:{DEFAULT_PORT}"));
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
            (name.to_owned(), host.to_owned())
        }
        _ => (host.to_owned(), format!("{host}:{DEFAULT_PORT}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_counter_wraps_to_one() {
        let inner = Inner {
            writer: tokio::sync::Mutex::new(Writer {
                sink: FramedWrite::new(Box::new(tokio::io::sink()) as BoxWrite, Codec),
                last_send: Instant::now(),
            }),
            counter: AtomicU16::new(0),
            pending: Mutex::new(HashMap::new()),
            waiters: Mutex::new(HashMap::new()),
            events: Mutex::new(None),
            closer: Mutex::new(None),
            cancel: CancellationToken::new(),
            user: String::new(),
        };
        assert_eq!(inner.next_id(), 1);
        assert_eq!(inner.next_id(), 2);
        inner.counter.store(9997, Ordering::SeqCst);
        assert_eq!(inner.next_id(), 9998);
        assert_eq!(inner.next_id(), 1);
    }

    #[test]
    fn redacts_media_content() {
        let body = "<chunk><mediaContent>QUJD\nREVG</mediaContent></chunk>";
        assert_eq!(
            redact(body),
            "<chunk><mediaContent>[bin data]</mediaContent></chunk>"
        );
        assert_eq!(redact("<presence/>"), "<presence/>");
    }

    #[test]
    fn host_port_defaults() {
        assert_eq!(
            host_port("mx.example.com"),
            ("mx.example.com".into(), "mx.example.com:7778".into())
        );
        assert_eq!(
            host_port("mx.example.com:7000"),
            ("mx.example.com".into(), "mx.example.com:7000".into())
        );
        assert_eq!(host_port("::1"), ("::1".into(), "[::1]:7778".into()));
        assert_eq!(host_port("[::1]:7000"), ("::1".into(), "[::1]:7000".into()));
    }
}
