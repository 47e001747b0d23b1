//! Catalog of unsolicited MX events and their SSE form.
//!
//! Every schema deserializes from the XML frame body and serializes to
//! the JSON published over SSE. [`decode`] is the dispatcher: it picks
//! the schema by the frame's root element, drops what should not be
//! republished and fixes up wire spellings.

use mx::{CstaError, Frame, Jid, LogoutError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::wire::{is_false, is_zero_i64, is_zero_jid, jid, DeviceId};

/// Decodes an unsolicited frame into its SSE name and JSON body.
///
/// Returns `None` for frames that are not republished: `ablist` pages
/// (consumed by the address-book flow) and roots this gateway does not
/// know, which are logged and dropped.
pub fn decode(frame: &Frame) -> Result<Option<(&'static str, Value)>, mx::Error> {
    let event = match frame.name.as_str() {
        "presence" => ("presence", to_value(frame.decode::<StatusMessage>()?)?),
        "message" => {
            let mut message: ServerMessage = frame.decode()?;
            message.new = true;
            ("message", to_value(message)?)
        }
        "messageHist" => ("messageHist", to_value(frame.decode::<ServerMessage>()?)?),
        "DivertedEvent" => ("DivertedEvent", to_value(frame.decode::<DivertedEvent>()?)?),
        "DeliveredEvent" => ("DeliveredEvent", to_value(frame.decode::<DeliveredEvent>()?)?),
        "EstablishedEvent" => (
            "EstablishedEvent",
            to_value(frame.decode::<EstablishedEvent>()?)?,
        ),
        "HeldEvent" => ("HeldEvent", to_value(frame.decode::<HeldEvent>()?)?),
        "RecordingStateEvent" => (
            "RecordingStateEvent",
            to_value(frame.decode::<RecordingStateEvent>()?)?,
        ),
        "ServiceInitiatedEvent" => (
            "ServiceInitiatedEvent",
            to_value(frame.decode::<ServiceInitiatedEvent>()?)?,
        ),
        "ConnectionClearedEvent" => (
            "ConnectionClearedEvent",
            to_value(frame.decode::<ConnectionClearedEvent>()?)?,
        ),
        "OriginatedEvent" => ("OriginatedEvent", to_value(frame.decode::<OriginatedEvent>()?)?),
        "NetworkReachedEvent" => (
            "NetworkReachedEvent",
            to_value(frame.decode::<NetworkReachedEvent>()?)?,
        ),
        "FailedEvent" => ("FailedEvent", to_value(frame.decode::<FailedEvent>()?)?),
        "RetrievedEvent" => ("RetrievedEvent", to_value(frame.decode::<RetrievedEvent>()?)?),
        // spelled with a single "r" on the wire
        "TransferedEvent" => (
            "TransferredEvent",
            to_value(frame.decode::<TransferredEvent>()?)?,
        ),
        "callParkInfo" => ("callParkInfo", to_value(frame.decode::<ParkedEvent>()?)?),
        "callloginfo" => ("callloginfo", to_value(frame.decode::<CallLogInfo>()?)?),
        "CSTAErrorCode" => ("CSTAErrorCode", to_value(CstaError::parse(&frame.body))?),
        "Logout" => ("Logout", to_value(frame.decode::<LogoutError>()?)?),
        // consumed by the address-book flow, never republished
        "ablist" => return Ok(None),
        name => {
            tracing::debug!(name, "unknown event dropped");
            return Ok(None);
        }
    };
    Ok(Some(event))
}

fn to_value<T: Serialize>(value: T) -> Result<Value, mx::Error> {
    serde_json::to_value(value)
        .map_err(|err| mx::Error::Protocol(format!("event encode: {err}")))
}

/// Call identification inside events.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Call {
    #[serde(default, rename(deserialize = "callID", serialize = "id"))]
    pub id: i64,
    #[serde(default, rename(deserialize = "deviceID", serialize = "device"))]
    pub device: String,
}

/// Call identification plus the global call id.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CallWithGlobal {
    #[serde(default, rename(deserialize = "callID", serialize = "id"))]
    pub id: i64,
    #[serde(default, rename(deserialize = "deviceID", serialize = "device"))]
    pub device: String,
    #[serde(
        default,
        rename(deserialize = "globalCallID", serialize = "global"),
        with = "jid",
        skip_serializing_if = "is_zero_jid"
    )]
    pub global: Jid,
}

/// Presence change (`presence`). A zero `user` means the status of the
/// logged-in user itself.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct StatusMessage {
    #[serde(
        default,
        rename(deserialize = "@from", serialize = "user"),
        with = "jid",
        skip_serializing_if = "is_zero_jid"
    )]
    pub from: Jid,
    #[serde(
        default,
        rename(deserialize = "@mxStatus", serialize = "status"),
        skip_serializing_if = "String::is_empty"
    )]
    pub status: String,
    #[serde(
        default,
        rename(deserialize = "@status", serialize = "presence"),
        skip_serializing_if = "String::is_empty"
    )]
    pub presence: String,
    #[serde(
        default,
        rename(deserialize = "presenceNote", serialize = "note"),
        skip_serializing_if = "String::is_empty"
    )]
    pub note: String,
}

/// Instant message, live (`message`) or from history (`messageHist`).
/// Both roots share the schema; live delivery sets `new`.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ServerMessage {
    #[serde(default, rename(deserialize = "@msgId", serialize = "id"))]
    pub id: i64,
    #[serde(default, rename(deserialize = "@persistId", serialize = "gid"))]
    pub gid: i64,
    #[serde(skip_deserializing, rename(serialize = "new"), skip_serializing_if = "is_false")]
    pub new: bool,
    #[serde(default, rename(deserialize = "@from", serialize = "from"), with = "jid")]
    pub from: Jid,
    #[serde(
        default,
        rename(deserialize = "@name", serialize = "fromName"),
        skip_serializing_if = "String::is_empty"
    )]
    pub from_name: String,
    #[serde(default, rename(deserialize = "@toRecipId", serialize = "to"), with = "jid")]
    pub to: Jid,
    #[serde(
        default,
        rename(deserialize = "@toRecipName", serialize = "toName"),
        skip_serializing_if = "String::is_empty"
    )]
    pub to_name: String,
    #[serde(
        default,
        rename(deserialize = "@groupId", serialize = "group"),
        with = "jid",
        skip_serializing_if = "is_zero_jid"
    )]
    pub group: Jid,
    #[serde(
        default,
        rename(deserialize = "did", serialize = "did"),
        skip_serializing_if = "String::is_empty"
    )]
    pub did: String,
    #[serde(
        default,
        rename(deserialize = "@reqId", serialize = "req"),
        skip_serializing_if = "is_zero_i64"
    )]
    pub req: i64,
    #[serde(default, rename(deserialize = "@delivered", serialize = "delivered"))]
    pub delivered: bool,
    #[serde(default, rename(deserialize = "@seen", serialize = "seen"))]
    pub seen: bool,
    /// "User", "Server" or "Group".
    #[serde(
        default,
        rename(deserialize = "@recipType", serialize = "recipType"),
        skip_serializing_if = "String::is_empty"
    )]
    pub recip_type: String,
    /// "Text", "Binary" or "Conf".
    #[serde(
        default,
        rename(deserialize = "@packetType", serialize = "type"),
        skip_serializing_if = "String::is_empty"
    )]
    pub kind: String,
    #[serde(
        default,
        rename(deserialize = "timestamp", serialize = "timestamp"),
        skip_serializing_if = "is_zero_i64"
    )]
    pub timestamp: i64,
    /// Conference messages only.
    #[serde(default, rename(deserialize = "@finished", serialize = "finished"))]
    pub finished: bool,
    /// Binary messages only.
    #[serde(
        default,
        rename(deserialize = "@contentState", serialize = "contentState"),
        skip_serializing_if = "String::is_empty"
    )]
    pub content_state: String,
    #[serde(
        default,
        rename(deserialize = "@contentSize", serialize = "contentSize"),
        skip_serializing_if = "is_zero_i64"
    )]
    pub content_size: i64,
    #[serde(default, rename(deserialize = "text", serialize = "text"))]
    pub text: String,
}

/// Additional call data attached to delivery events.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Cad {
    #[serde(default, rename(deserialize = "@name", serialize = "name"))]
    pub name: String,
    #[serde(default, rename(deserialize = "@type", serialize = "type"))]
    pub kind: String,
    #[serde(default, rename(deserialize = "$text", serialize = "value"))]
    pub value: String,
}

/// A call was diverted away from a device.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct DivertedEvent {
    #[serde(default, rename(deserialize = "monitorCrossRefID", serialize = "monitor"))]
    pub monitor: i64,
    #[serde(default, rename(deserialize = "connection", serialize = "call"))]
    pub call: Call,
    #[serde(default, rename(deserialize = "divertingDevice", serialize = "diverting"))]
    pub diverting: DeviceId,
    #[serde(default, rename(deserialize = "newDestination", serialize = "to"))]
    pub to: DeviceId,
    #[serde(default, rename(deserialize = "cause", serialize = "cause"))]
    pub cause: String,
    #[serde(
        default,
        rename(deserialize = "cmdsAllowed", serialize = "allowed"),
        skip_serializing_if = "is_zero_i64"
    )]
    pub allowed: i64,
    #[serde(
        default,
        rename(deserialize = "callTypeFlags", serialize = "flags"),
        skip_serializing_if = "is_zero_i64"
    )]
    pub flags: i64,
}

/// A call is being presented to a device.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct DeliveredEvent {
    #[serde(default, rename(deserialize = "monitorCrossRefID", serialize = "monitor"))]
    pub monitor: i64,
    #[serde(default, rename(deserialize = "connection", serialize = "call"))]
    pub call: CallWithGlobal,
    #[serde(default, rename(deserialize = "alertingDevice", serialize = "alerting"))]
    pub alerting: DeviceId,
    #[serde(default, rename(deserialize = "alertingDisplayName", serialize = "alertingName"))]
    pub alerting_name: String,
    #[serde(
        default,
        rename(deserialize = "networkCallingDevice", serialize = "networkCalling")
    )]
    pub network_calling: DeviceId,
    #[serde(default, rename(deserialize = "callingDevice", serialize = "calling"))]
    pub calling: DeviceId,
    #[serde(default, rename(deserialize = "callingDisplayName", serialize = "callingName"))]
    pub calling_name: String,
    #[serde(default, rename(deserialize = "calledDevice", serialize = "called"))]
    pub called: DeviceId,
    #[serde(
        default,
        rename(deserialize = "lastRedirectionDevice", serialize = "lastRedirection"),
        skip_serializing_if = "DeviceId::is_empty"
    )]
    pub last_redirection: DeviceId,
    #[serde(
        default,
        rename(deserialize = "localConnectionInfo", serialize = "localConnection")
    )]
    pub local_connection: String,
    #[serde(default, rename(deserialize = "cause", serialize = "cause"))]
    pub cause: String,
    #[serde(
        default,
        rename(deserialize = "cmdsAllowed", serialize = "cmdsAllowed"),
        skip_serializing_if = "is_zero_i64"
    )]
    pub cmds_allowed: i64,
    #[serde(
        default,
        rename(deserialize = "callTypeFlags", serialize = "callTypeFlags"),
        skip_serializing_if = "is_zero_i64"
    )]
    pub call_type_flags: i64,
    #[serde(
        default,
        rename(deserialize = "cad", serialize = "cads"),
        skip_serializing_if = "Vec::is_empty"
    )]
    pub cads: Vec<Cad>,
}

/// A call was answered at a device.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct EstablishedEvent {
    #[serde(default, rename(deserialize = "monitorCrossRefID", serialize = "monitor"))]
    pub monitor: i64,
    #[serde(default, rename(deserialize = "establishedConnection", serialize = "call"))]
    pub call: CallWithGlobal,
    #[serde(default, rename(deserialize = "answeringDevice", serialize = "answering"))]
    pub answering: DeviceId,
    #[serde(
        default,
        rename(deserialize = "answeringDisplayName", serialize = "answeringName")
    )]
    pub answering_name: String,
    #[serde(default, rename(deserialize = "callingDevice", serialize = "calling"))]
    pub calling: DeviceId,
    #[serde(default, rename(deserialize = "callingDisplayName", serialize = "callingName"))]
    pub calling_name: String,
    #[serde(default, rename(deserialize = "calledDevice", serialize = "called"))]
    pub called: DeviceId,
    #[serde(
        default,
        rename(deserialize = "lastRedirectionDevice", serialize = "lastRedirection"),
        skip_serializing_if = "DeviceId::is_empty"
    )]
    pub last_redirection: DeviceId,
    #[serde(default, rename(deserialize = "cause", serialize = "cause"))]
    pub cause: String,
    #[serde(
        default,
        rename(deserialize = "cmdsAllowed", serialize = "allowed"),
        skip_serializing_if = "is_zero_i64"
    )]
    pub allowed: i64,
    #[serde(
        default,
        rename(deserialize = "callTypeFlags", serialize = "flags"),
        skip_serializing_if = "is_zero_i64"
    )]
    pub flags: i64,
    #[serde(
        default,
        rename(deserialize = "cad", serialize = "cads"),
        skip_serializing_if = "Vec::is_empty"
    )]
    pub cads: Vec<Cad>,
}

/// A call was placed on hold.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct HeldEvent {
    #[serde(default, rename(deserialize = "monitorCrossRefID", serialize = "monitor"))]
    pub monitor: i64,
    #[serde(default, rename(deserialize = "heldConnection", serialize = "call"))]
    pub call: Call,
    #[serde(default, rename(deserialize = "holdingDevice", serialize = "holding"))]
    pub holding: DeviceId,
    #[serde(
        default,
        rename(deserialize = "localConnectionInfo", serialize = "localConnection")
    )]
    pub local_connection: String,
    #[serde(default, rename(deserialize = "cause", serialize = "cause"))]
    pub cause: String,
    #[serde(
        default,
        rename(deserialize = "cmdsAllowed", serialize = "allowed"),
        skip_serializing_if = "is_zero_i64"
    )]
    pub allowed: i64,
    #[serde(
        default,
        rename(deserialize = "callTypeFlags", serialize = "flags"),
        skip_serializing_if = "is_zero_i64"
    )]
    pub flags: i64,
}

/// Recording availability and activity changed for a call.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RecordingStateEvent {
    #[serde(default, rename(deserialize = "monitorCrossRefID", serialize = "monitor"))]
    pub monitor: i64,
    #[serde(default, rename(deserialize = "connection", serialize = "call"))]
    pub call: Call,
    #[serde(default, rename(deserialize = "RecIsAvailable", serialize = "available"))]
    pub available: bool,
    #[serde(default, rename(deserialize = "RecIsActive", serialize = "active"))]
    pub active: bool,
}

/// A telephony service started at a monitored device.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ServiceInitiatedEvent {
    #[serde(default, rename(deserialize = "monitorCrossRefID", serialize = "monitor"))]
    pub monitor: i64,
    #[serde(default, rename(deserialize = "initiatedConnection", serialize = "call"))]
    pub call: Call,
    #[serde(default, rename(deserialize = "initiatingDevice", serialize = "initiating"))]
    pub initiating: DeviceId,
    #[serde(
        default,
        rename(deserialize = "localConnectionInfo", serialize = "localConnection")
    )]
    pub local_connection: String,
    #[serde(default, rename(deserialize = "cause", serialize = "cause"))]
    pub cause: String,
}

/// A call was cleared and no longer exists.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ConnectionClearedEvent {
    #[serde(default, rename(deserialize = "monitorCrossRefID", serialize = "monitor"))]
    pub monitor: i64,
    #[serde(default, rename(deserialize = "droppedConnection", serialize = "call"))]
    pub call: Call,
    #[serde(default, rename(deserialize = "releasingDevice", serialize = "releasing"))]
    pub releasing: DeviceId,
    #[serde(default, rename(deserialize = "cause", serialize = "cause"))]
    pub cause: String,
}

/// A call attempt is leaving a device.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct OriginatedEvent {
    #[serde(default, rename(deserialize = "monitorCrossRefID", serialize = "monitor"))]
    pub monitor: i64,
    #[serde(default, rename(deserialize = "originatedConnection", serialize = "call"))]
    pub call: Call,
    #[serde(default, rename(deserialize = "callingDevice", serialize = "calling"))]
    pub calling: DeviceId,
    #[serde(default, rename(deserialize = "calledDevice", serialize = "called"))]
    pub called: DeviceId,
    #[serde(
        default,
        rename(deserialize = "localConnectionInfo", serialize = "localConnection")
    )]
    pub local_connection: String,
    #[serde(default, rename(deserialize = "cause", serialize = "cause"))]
    pub cause: String,
    #[serde(
        default,
        rename(deserialize = "cmdsAllowed", serialize = "allowed"),
        skip_serializing_if = "is_zero_i64"
    )]
    pub allowed: i64,
    #[serde(
        default,
        rename(deserialize = "callTypeFlags", serialize = "flags"),
        skip_serializing_if = "is_zero_i64"
    )]
    pub flags: i64,
}

/// A call crossed into another network.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct NetworkReachedEvent {
    #[serde(default, rename(deserialize = "monitorCrossRefID", serialize = "monitor"))]
    pub monitor: i64,
    #[serde(default, rename(deserialize = "outboundConnection", serialize = "call"))]
    pub call: Call,
    #[serde(default, rename(deserialize = "networkInterfaceUsed", serialize = "network"))]
    pub network: DeviceId,
    #[serde(default, rename(deserialize = "callingDevice", serialize = "calling"))]
    pub calling: DeviceId,
    #[serde(default, rename(deserialize = "calledDevice", serialize = "called"))]
    pub called: DeviceId,
    #[serde(
        default,
        rename(deserialize = "localConnectionInfo", serialize = "localConnection")
    )]
    pub local_connection: String,
    #[serde(default, rename(deserialize = "cause", serialize = "cause"))]
    pub cause: String,
}

/// A call could not be completed.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct FailedEvent {
    #[serde(default, rename(deserialize = "monitorCrossRefID", serialize = "monitor"))]
    pub monitor: i64,
    #[serde(default, rename(deserialize = "failedConnection", serialize = "call"))]
    pub call: Call,
    #[serde(default, rename(deserialize = "callingDevice", serialize = "calling"))]
    pub calling: DeviceId,
    #[serde(default, rename(deserialize = "calledDevice", serialize = "called"))]
    pub called: DeviceId,
    #[serde(
        default,
        rename(deserialize = "localConnectionInfo", serialize = "localConnection")
    )]
    pub local_connection: String,
    #[serde(default, rename(deserialize = "cause", serialize = "cause"))]
    pub cause: String,
}

/// A held call was retrieved.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RetrievedEvent {
    #[serde(default, rename(deserialize = "monitorCrossRefID", serialize = "monitor"))]
    pub monitor: i64,
    #[serde(default, rename(deserialize = "retrievedConnection", serialize = "call"))]
    pub call: Call,
    #[serde(default, rename(deserialize = "retrievingDevice", serialize = "retrieving"))]
    pub retrieving: DeviceId,
    #[serde(
        default,
        rename(deserialize = "localConnectionInfo", serialize = "localConnection")
    )]
    pub local_connection: String,
    #[serde(default, rename(deserialize = "cause", serialize = "cause"))]
    pub cause: String,
    #[serde(
        default,
        rename(deserialize = "cmdsAllowed", serialize = "allowed"),
        skip_serializing_if = "is_zero_i64"
    )]
    pub allowed: i64,
    #[serde(
        default,
        rename(deserialize = "callTypeFlags", serialize = "flags"),
        skip_serializing_if = "is_zero_i64"
    )]
    pub flags: i64,
}

/// A call was transferred and the transferring device dropped off.
/// The wire root is the misspelled `TransferedEvent`.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TransferredEvent {
    #[serde(default, rename(deserialize = "monitorCrossRefID", serialize = "monitor"))]
    pub monitor: i64,
    #[serde(default, rename(deserialize = "primaryOldCall", serialize = "call"))]
    pub call: Call,
    #[serde(default, rename(deserialize = "transferringDevice", serialize = "transferring"))]
    pub transferring: DeviceId,
    #[serde(default, rename(deserialize = "transferredToDevice", serialize = "to"))]
    pub to: DeviceId,
    #[serde(
        default,
        rename(deserialize = "localConnectionInfo", serialize = "localConnection")
    )]
    pub local_connection: String,
    #[serde(default, rename(deserialize = "cause", serialize = "cause"))]
    pub cause: String,
}

/// A call was parked (`callParkInfo`).
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ParkedEvent {
    #[serde(default, rename(deserialize = "monitorCrossRefID", serialize = "monitor"))]
    pub monitor: i64,
    #[serde(default, rename(deserialize = "parkID", serialize = "park"))]
    pub park: i64,
}

/// One entry of the call log.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CallLogEntry {
    #[serde(default, rename(deserialize = "record_id", serialize = "id"))]
    pub id: i64,
    #[serde(default, rename(deserialize = "@missed", serialize = "missed"))]
    pub missed: bool,
    #[serde(default, rename(deserialize = "@direction", serialize = "direction"))]
    pub direction: String,
    #[serde(default, rename(deserialize = "gcid", serialize = "gcid"))]
    pub gcid: String,
    #[serde(
        default,
        rename(deserialize = "connectTimestamp", serialize = "connectTimestamp"),
        skip_serializing_if = "is_zero_i64"
    )]
    pub connect_timestamp: i64,
    #[serde(
        default,
        rename(deserialize = "disconnectTimestamp", serialize = "disconnectTimestamp"),
        skip_serializing_if = "is_zero_i64"
    )]
    pub disconnect_timestamp: i64,
    #[serde(default, rename(deserialize = "callingPartyNo", serialize = "callingPartyNo"))]
    pub calling_party: String,
    #[serde(
        default,
        rename(deserialize = "originalCalledPartyNo", serialize = "originalCalledPartyNo")
    )]
    pub original_called_party: String,
    #[serde(
        default,
        rename(deserialize = "firstName", serialize = "firstName"),
        skip_serializing_if = "String::is_empty"
    )]
    pub first_name: String,
    #[serde(
        default,
        rename(deserialize = "lastName", serialize = "lastName"),
        skip_serializing_if = "String::is_empty"
    )]
    pub last_name: String,
    #[serde(
        default,
        rename(deserialize = "extension", serialize = "device"),
        skip_serializing_if = "String::is_empty"
    )]
    pub ext: String,
    #[serde(
        default,
        rename(deserialize = "serviceName", serialize = "serviceName"),
        skip_serializing_if = "String::is_empty"
    )]
    pub service_name: String,
    #[serde(
        default,
        rename(deserialize = "serviceExtension", serialize = "serviceExtension"),
        skip_serializing_if = "String::is_empty"
    )]
    pub service_ext: String,
    #[serde(
        default,
        rename(deserialize = "callType", serialize = "callType"),
        skip_serializing_if = "is_zero_i64"
    )]
    pub call_type: i64,
    #[serde(
        default,
        rename(deserialize = "legType", serialize = "legType"),
        skip_serializing_if = "is_zero_i64"
    )]
    pub leg_type: i64,
    #[serde(
        default,
        rename(deserialize = "selfLegType", serialize = "selfLegType"),
        skip_serializing_if = "is_zero_i64"
    )]
    pub self_leg_type: i64,
    #[serde(
        default,
        rename(deserialize = "monitorType", serialize = "monitorType"),
        skip_serializing_if = "is_zero_i64"
    )]
    pub monitor_type: i64,
}

/// Call-log delivery (`callloginfo`).
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CallLogInfo {
    #[serde(
        default,
        rename(deserialize = "callinfo", serialize = "callLog"),
        skip_serializing_if = "Vec::is_empty"
    )]
    pub entries: Vec<CallLogEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mx::EVENT_ID;

    fn frame(name: &str, body: &str) -> Frame {
        Frame {
            id: EVENT_ID,
            name: name.to_owned(),
            body: body.to_owned(),
        }
    }

    #[test]
    fn delivered_event_round_trip() {
        let body = r#"<DeliveredEvent>
            <monitorCrossRefID>5</monitorCrossRefID>
            <connection><callID>12</callID><deviceID>101</deviceID>
                <globalCallID>777</globalCallID></connection>
            <alertingDevice><deviceIdentifier>101</deviceIdentifier></alertingDevice>
            <callingDevice><deviceIdentifier>102</deviceIdentifier></callingDevice>
            <calledDevice><deviceIdentifier>101</deviceIdentifier></calledDevice>
            <localConnectionInfo>alerting</localConnectionInfo>
            <cause>newCall</cause>
        </DeliveredEvent>"#;
        let (name, json) = decode(&frame("DeliveredEvent", body)).unwrap().unwrap();
        assert_eq!(name, "DeliveredEvent");
        assert_eq!(json["monitor"], 5);
        assert_eq!(json["call"]["id"], 12);
        assert_eq!(json["call"]["device"], "101");
        assert_eq!(json["call"]["global"], "777");
        assert_eq!(json["alerting"], "101");
        assert_eq!(json["calling"], "102");
        assert_eq!(json["cause"], "newCall");
    }

    #[test]
    fn transferred_event_is_renamed() {
        let body = r#"<TransferedEvent><monitorCrossRefID>5</monitorCrossRefID>
            <primaryOldCall><callID>3</callID><deviceID>101</deviceID></primaryOldCall>
            <transferringDevice><deviceIdentifier>101</deviceIdentifier></transferringDevice>
            <transferredToDevice><deviceIdentifier>103</deviceIdentifier></transferredToDevice>
            <cause>transfer</cause></TransferedEvent>"#;
        let (name, json) = decode(&frame("TransferedEvent", body)).unwrap().unwrap();
        assert_eq!(name, "TransferredEvent");
        assert_eq!(json["transferring"], "101");
        assert_eq!(json["to"], "103");
    }

    #[test]
    fn live_message_is_flagged_new() {
        let body = r#"<message msgId="9" from="42" toRecipId="43"><text>hi</text></message>"#;
        let (name, json) = decode(&frame("message", body)).unwrap().unwrap();
        assert_eq!(name, "message");
        assert_eq!(json["new"], true);
        assert_eq!(json["from"], "42");
        assert_eq!(json["text"], "hi");

        let (name, json) = decode(&frame("messageHist", body)).unwrap().unwrap();
        assert_eq!(name, "messageHist");
        assert!(json.get("new").is_none());
    }

    #[test]
    fn presence_event() {
        let body = r#"<presence from="42" mxStatus="online" status="available">
            <presenceNote>back at 5</presenceNote></presence>"#;
        let (name, json) = decode(&frame("presence", body)).unwrap().unwrap();
        assert_eq!(name, "presence");
        assert_eq!(json["user"], "42");
        assert_eq!(json["status"], "online");
        assert_eq!(json["presence"], "available");
        assert_eq!(json["note"], "back at 5");
    }

    #[test]
    fn logout_event() {
        let (name, json) = decode(&frame("Logout", r#"<Logout mode="forced"/>"#))
            .unwrap()
            .unwrap();
        assert_eq!(name, "Logout");
        assert_eq!(json["mode"], "forced");
    }

    #[test]
    fn csta_error_event() {
        let body = "<CSTAErrorCode><operation>generic</operation></CSTAErrorCode>";
        let (name, json) = decode(&frame("CSTAErrorCode", body)).unwrap().unwrap();
        assert_eq!(name, "CSTAErrorCode");
        assert_eq!(json["message"], "generic");
    }

    #[test]
    fn ablist_is_not_republished() {
        assert!(decode(&frame("ablist", r#"<ablist size="1"/>"#))
            .unwrap()
            .is_none());
    }

    #[test]
    fn unknown_event_is_dropped() {
        assert!(decode(&frame("mystery", "<mystery/>")).unwrap().is_none());
    }

    #[test]
    fn call_log_event() {
        let body = r#"<callloginfo><callinfo missed="true" direction="inbound">
            <record_id>4</record_id><gcid>g-1</gcid>
            <callingPartyNo>101</callingPartyNo>
            <originalCalledPartyNo>102</originalCalledPartyNo>
        </callinfo></callloginfo>"#;
        let (name, json) = decode(&frame("callloginfo", body)).unwrap().unwrap();
        assert_eq!(name, "callloginfo");
        assert_eq!(json["callLog"][0]["id"], 4);
        assert_eq!(json["callLog"][0]["missed"], true);
        assert_eq!(json["callLog"][0]["direction"], "inbound");
    }

    #[test]
    fn park_event() {
        let body = r#"<callParkInfo><monitorCrossRefID>2</monitorCrossRefID>
            <parkID>31</parkID></callParkInfo>"#;
        let (name, json) = decode(&frame("callParkInfo", body)).unwrap().unwrap();
        assert_eq!(name, "callParkInfo");
        assert_eq!(json["park"], 31);
    }
}
