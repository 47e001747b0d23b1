//! The HTTP surface: authorization, command dispatch and the two
//! streaming flows (address-book collection, voicemail download).

use std::{convert::Infallible, io, sync::Arc};

use axum::{
    body::{Body, Bytes},
    extract::{FromRequestParts, Path, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use mx::{Connection, Login};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    commands::{
        AbList, AnswerCall, AssignDevice, ClearConnection, Command, Contact, DeflectCall,
        GetAddressBook, GetAgentState, GetAgentStateResponse, GetCallLog, GetServiceList,
        HoldCall, MailCancelReceive, MailDeleteIncoming, MailGetListIncoming,
        MailGetListIncomingResponse, MailReceiveIncoming, MailSetStatus, MakeCall,
        MakeCallResponse, MonitorStart, MonitorStartAb, MonitorStartResponse, MonitorStop,
        MonitorStopAb, ParkCall, RetrieveCall, Services, SetAgentState, SetCallMode, SetStatus,
        SingleStepTransferCall, SingleStepTransferCallResponse, SnapshotDevice, StartRecording,
        StopRecording, TransferCall, UpdateVmNote, VmChunk,
    },
    session::Session,
    sessions::Sessions,
};

/// Realm announced in `WWW-Authenticate` challenges.
pub const REALM: &str = "mx-http-gateway";

/// Server-side page size of the address book. The continuation test
/// `(index + 1) * PAGE < size` depends on it; treat it as a protocol
/// constant.
const ADDRESS_BOOK_PAGE: u32 = 50;

#[derive(Clone)]
pub struct App {
    pub sessions: Arc<Sessions>,
    pub mx_host: Arc<str>,
}

pub fn router(app: App) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/events", get(events))
        .route("/{cmd}", post(command))
        .with_state(app)
}

/// Bearer token extracted from the `Authorization` header or the
/// `access_token` query parameter. Absence is a 401 with a challenge.
pub struct Token(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Token {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let bearer = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        if let Some(token) = bearer {
            return Ok(Token(token.to_owned()));
        }
        if let Some(query) = parts.uri.query() {
            for pair in query.split('&') {
                if let Some(token) = pair.strip_prefix("access_token=") {
                    if !token.is_empty() {
                        return Ok(Token(token.to_owned()));
                    }
                }
            }
        }
        Err((
            StatusCode::UNAUTHORIZED,
            [(
                header::WWW_AUTHENTICATE,
                format!("Token realm=\"{REALM}\""),
            )],
            "authorization required",
        )
            .into_response())
    }
}

fn forbidden() -> Response {
    (StatusCode::FORBIDDEN, "unknown access token").into_response()
}

/// Binds the request body as JSON. The content type must be
/// `application/json`, optionally with a utf-8 charset; an empty body is
/// treated as an empty object.
fn read_json<T: DeserializeOwned>(headers: &HeaderMap, body: &Bytes) -> Result<T, Response> {
    if !body.is_empty() {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if !is_json_content_type(content_type) {
            return Err((
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "expected application/json",
            )
                .into_response());
        }
    }
    let raw: &[u8] = if body.is_empty() { b"{}" } else { body };
    serde_json::from_slice(raw)
        .map_err(|err| (StatusCode::BAD_REQUEST, format!("bad request: {err}")).into_response())
}

fn is_json_content_type(value: &str) -> bool {
    let mut parts = value.split(';');
    let mime = parts.next().unwrap_or_default().trim();
    if !mime.eq_ignore_ascii_case("application/json") {
        return false;
    }
    for param in parts {
        if let Some(charset) = param.trim().strip_prefix("charset=") {
            return charset.trim_matches('"').eq_ignore_ascii_case("utf-8");
        }
    }
    true
}

/// Maps connection errors onto HTTP statuses. This is the only place
/// where MX errors become status codes.
fn error_response(err: mx::Error) -> Response {
    let status = match &err {
        mx::Error::Login(_) => StatusCode::FORBIDDEN,
        mx::Error::Csta(_) => StatusCode::BAD_REQUEST,
        mx::Error::Timeout => StatusCode::GATEWAY_TIMEOUT,
        mx::Error::Io(io) if io.kind() == io::ErrorKind::TimedOut => StatusCode::GATEWAY_TIMEOUT,
        mx::Error::Io(_) | mx::Error::Logout(_) => StatusCode::BAD_GATEWAY,
        mx::Error::Xml(_) | mx::Error::Protocol(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string()).into_response()
}

async fn login(State(app): State<App>, headers: HeaderMap, body: Bytes) -> Response {
    let login: Login = match read_json(&headers, &body) {
        Ok(login) => login,
        Err(response) => return response,
    };
    let conn = match Connection::connect(&app.mx_host, login.clone()).await {
        Ok(conn) => conn,
        Err(err) => {
            tracing::debug!(user = %login.user_name, error = %err, "login failed");
            return error_response(err);
        }
    };
    let info = conn.info().clone();
    let session = Session::start(conn, login);
    let token = app.sessions.store(session);
    let mut payload = serde_json::to_value(&info).unwrap_or(Value::Null);
    if let Value::Object(object) = &mut payload {
        object.insert("token".to_owned(), token.into());
    }
    Json(payload).into_response()
}

async fn logout(State(app): State<App>, Token(token): Token) -> Response {
    let Some(session) = app.sessions.get(&token) else {
        return forbidden();
    };
    if let Err(err) = session.connection().send_raw("<logout/>").await {
        tracing::debug!(error = %err, "logout command failed");
    }
    app.sessions.delete(&token);
    session.close();
    StatusCode::NO_CONTENT.into_response()
}

async fn events(State(app): State<App>, Token(token): Token) -> Response {
    let Some(session) = app.sessions.get(&token) else {
        return forbidden();
    };
    let stream = ReceiverStream::new(session.broker().subscribe()).map(|event| {
        Ok::<Event, Infallible>(Event::default().event(event.name).data(event.data))
    });
    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

async fn command(
    State(app): State<App>,
    Token(token): Token,
    Path(cmd): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(session) = app.sessions.get(&token) else {
        return forbidden();
    };
    let conn = session.connection();
    let result = match cmd.as_str() {
        "monitorStart" => typed::<MonitorStart, MonitorStartResponse>(conn, &headers, &body).await,
        "monitorStop" => acked::<MonitorStop>(conn, &headers, &body).await,
        "monitorStartAb" => acked::<MonitorStartAb>(conn, &headers, &body).await,
        "monitorStopAb" => acked::<MonitorStopAb>(conn, &headers, &body).await,
        "makeCall" => typed::<MakeCall, MakeCallResponse>(conn, &headers, &body).await,
        "clearConnection" => acked::<ClearConnection>(conn, &headers, &body).await,
        "answerCall" => acked::<AnswerCall>(conn, &headers, &body).await,
        "holdCall" => acked::<HoldCall>(conn, &headers, &body).await,
        "parkCall" => acked::<ParkCall>(conn, &headers, &body).await,
        "retrieveCall" => acked::<RetrieveCall>(conn, &headers, &body).await,
        "singleStepTransfer" => {
            typed::<SingleStepTransferCall, SingleStepTransferCallResponse>(conn, &headers, &body)
                .await
        }
        "deflectCall" => acked::<DeflectCall>(conn, &headers, &body).await,
        "transferCall" => acked::<TransferCall>(conn, &headers, &body).await,
        // the reply arrives as a callloginfo event on the SSE stream
        "callLog" => fire::<GetCallLog>(conn, &headers, &body).await,
        "assignDevice" => acked::<AssignDevice>(conn, &headers, &body).await,
        "setCallMode" => fire::<SetCallMode>(conn, &headers, &body).await,
        "startRecording" => acked::<StartRecording>(conn, &headers, &body).await,
        "stopRecording" => acked::<StopRecording>(conn, &headers, &body).await,
        "vmList" => vm_list(conn, &headers, &body).await,
        "vmDelete" => vm_delete(conn, &headers, &body).await,
        "vmSetStatus" => vm_set_status(conn, &headers, &body).await,
        "vmNote" => acked::<UpdateVmNote>(conn, &headers, &body).await,
        "vmReceive" => vm_receive(session.clone(), &headers, &body).await,
        "getAddressBook" => address_book(conn, &headers, &body).await,
        "serviceList" => service_list(conn, &headers, &body).await,
        "setStatus" => acked::<SetStatus>(conn, &headers, &body).await,
        "snapshotDevice" => acked::<SnapshotDevice>(conn, &headers, &body).await,
        "getAgentState" => typed::<GetAgentState, GetAgentStateResponse>(conn, &headers, &body).await,
        "setAgentState" => acked::<SetAgentState>(conn, &headers, &body).await,
        _ => Err((StatusCode::NOT_FOUND, format!("unknown command {cmd:?}")).into_response()),
    };
    result.unwrap_or_else(|response| response)
}

/// Command with a decoded reply, returned as JSON.
async fn typed<Req, Resp>(
    conn: &Connection,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Response, Response>
where
    Req: Command + DeserializeOwned,
    Resp: DeserializeOwned + Serialize,
{
    let request: Req = read_json(headers, body)?;
    let reply: Resp = conn
        .command(Req::ROOT, &request)
        .await
        .map_err(error_response)?;
    Ok(Json(reply).into_response())
}

/// Command whose reply carries no body: wait for it (it may be a CSTA
/// error) and answer 204.
async fn acked<Req>(conn: &Connection, headers: &HeaderMap, body: &Bytes) -> Result<Response, Response>
where
    Req: Command + DeserializeOwned,
{
    let request: Req = read_json(headers, body)?;
    conn.execute(Req::ROOT, &request)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Command that gets no direct reply at all.
async fn fire<Req>(conn: &Connection, headers: &HeaderMap, body: &Bytes) -> Result<Response, Response>
where
    Req: Command + DeserializeOwned,
{
    let request: Req = read_json(headers, body)?;
    conn.send(Req::ROOT, &request)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn vm_list(conn: &Connection, headers: &HeaderMap, body: &Bytes) -> Result<Response, Response> {
    let mut request: MailGetListIncoming = read_json(headers, body)?;
    if request.user == 0 {
        request.user = conn.info().user_id;
    }
    let reply: MailGetListIncomingResponse = conn
        .command(MailGetListIncoming::ROOT, &request)
        .await
        .map_err(error_response)?;
    if reply.mails.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok(Json(reply.mails).into_response())
}

async fn vm_delete(conn: &Connection, headers: &HeaderMap, body: &Bytes) -> Result<Response, Response> {
    let mut request: MailDeleteIncoming = read_json(headers, body)?;
    if request.user == 0 {
        request.user = conn.info().user_id;
    }
    conn.execute(MailDeleteIncoming::ROOT, &request)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn vm_set_status(
    conn: &Connection,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Response, Response> {
    let mut request: MailSetStatus = read_json(headers, body)?;
    if request.user == 0 {
        request.user = conn.info().user_id;
    }
    conn.execute(MailSetStatus::ROOT, &request)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn service_list(
    conn: &Connection,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Response, Response> {
    let request: GetServiceList = read_json(headers, body)?;
    let reply: Services = conn
        .command(GetServiceList::ROOT, &request)
        .await
        .map_err(error_response)?;
    Ok(Json(reply.services).into_response())
}

/// Collects the full address book. The request gets no direct reply;
/// the server pushes `ablist` pages that are awaited one by one and
/// re-requested with an incremented index until the last page.
async fn address_book(
    conn: &Connection,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Response, Response> {
    let mut request: GetAddressBook = read_json(headers, body)?;
    request.index = 0;
    conn.send(GetAddressBook::ROOT, &request)
        .await
        .map_err(error_response)?;
    let mut contacts: Vec<Contact> = Vec::new();
    loop {
        let page: AbList = conn.wait_event("ablist").await.map_err(error_response)?;
        if contacts.is_empty() {
            contacts.reserve(page.size as usize);
        }
        contacts.extend(page.contacts);
        if (page.index + 1) * ADDRESS_BOOK_PAGE < page.size {
            request.index = page.index + 1;
            conn.send(GetAddressBook::ROOT, &request)
                .await
                .map_err(error_response)?;
        } else {
            break;
        }
    }
    Ok(Json(contacts).into_response())
}

/// Streams a voicemail download. The first chunk determines the content
/// type and file name; follow-up chunks are requested while the HTTP
/// client keeps reading. A disconnect aborts the transfer upstream.
async fn vm_receive(
    session: Arc<Session>,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Response, Response> {
    let mut request: MailReceiveIncoming = read_json(headers, body)?;
    let first: VmChunk = session
        .connection()
        .command(MailReceiveIncoming::ROOT, &request)
        .await
        .map_err(error_response)?;
    let content_type = content_type_for(&first.format);
    let disposition = format!("attachment; filename=\"{}\"", first.name);
    // follow-up requests repeat the original body plus the marker
    request.next_chunk = Some(String::new());
    let (tx, rx) = mpsc::channel::<Result<Bytes, io::Error>>(1);
    tokio::spawn(stream_chunks(session, request, first, tx));
    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(ReceiverStream::new(rx)))
        .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response())
}

async fn stream_chunks(
    session: Arc<Session>,
    request: MailReceiveIncoming,
    mut chunk: VmChunk,
    tx: mpsc::Sender<Result<Bytes, io::Error>>,
) {
    let conn = session.connection();
    loop {
        let data = match chunk.decode() {
            Ok(data) => data,
            Err(err) => {
                let _ = tx
                    .send(Err(io::Error::new(io::ErrorKind::InvalidData, err)))
                    .await;
                return;
            }
        };
        if tx.send(Ok(data.into())).await.is_err() {
            // the HTTP client went away: abort the transfer upstream
            let cancel = MailCancelReceive {
                id: request.id,
                media_type: request.media_type.clone(),
            };
            if let Err(err) = conn.send(MailCancelReceive::ROOT, &cancel).await {
                tracing::debug!(mail = request.id, error = %err, "voicemail cancel failed");
            }
            return;
        }
        if chunk.number >= chunk.total {
            return;
        }
        chunk = match conn.command(MailReceiveIncoming::ROOT, &request).await {
            Ok(chunk) => chunk,
            Err(err) => {
                let _ = tx.send(Err(io::Error::other(err))).await;
                return;
            }
        };
    }
}

fn content_type_for(format: &str) -> &'static str {
    match format.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "m4a" | "mp4" => "audio/mp4",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_content_types() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("application/json; charset=utf-8"));
        assert!(is_json_content_type("application/JSON; charset=UTF-8"));
        assert!(!is_json_content_type("application/json; charset=koi8-r"));
        assert!(!is_json_content_type("text/plain"));
        assert!(!is_json_content_type(""));
    }

    #[test]
    fn content_types_for_voicemail_formats() {
        assert_eq!(content_type_for("wav"), "audio/wav");
        assert_eq!(content_type_for(".WAV"), "audio/wav");
        assert_eq!(content_type_for("mp3"), "audio/mpeg");
        assert_eq!(content_type_for("weird"), "application/octet-stream");
    }

    #[test]
    fn error_statuses() {
        assert_eq!(error_response(mx::Error::Timeout).status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            error_response(mx::Error::Login(mx::LoginError::default())).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            error_response(mx::Error::Csta(mx::CstaError::default())).status(),
            StatusCode::BAD_REQUEST
        );
        let timed_out = io::Error::new(io::ErrorKind::TimedOut, "read");
        assert_eq!(
            error_response(mx::Error::Io(timed_out)).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "dial");
        assert_eq!(
            error_response(mx::Error::Io(refused)).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            error_response(mx::Error::Protocol("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
