//! Catalog of MX commands exposed over the HTTP surface.
//!
//! Request schemas bind the HTTP JSON body and serialize to the XML wire
//! form; response schemas decode the XML reply and serialize back to
//! JSON. One struct carries both bindings through split
//! `rename(serialize = …, deserialize = …)` attributes, so attribute
//! fields (`@…`) always come before element fields.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use mx::Jid;
use serde::{Deserialize, Serialize, Serializer};

use crate::{
    events,
    wire::{is_false, is_zero_jid, is_zero_u16, is_zero_u32, jid},
};

/// A request schema together with the XML root element it is sent under.
pub trait Command: Serialize {
    const ROOT: &'static str;
}

macro_rules! command {
    ($type:ty, $root:literal) => {
        impl Command for $type {
            const ROOT: &'static str = $root;
        }
    };
}

/// Call identification as the HTTP clients see it: `{id, device}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Call {
    #[serde(rename(serialize = "callID", deserialize = "id"))]
    pub id: i64,
    #[serde(rename(serialize = "deviceID", deserialize = "device"))]
    pub device: String,
}

/// Starts monitoring of CSTA events for a device.
#[derive(Debug, Serialize, Deserialize)]
pub struct MonitorStart {
    #[serde(rename(serialize = "monitorObject", deserialize = "device"))]
    pub device: MonitorObject,
    #[serde(
        default,
        rename(serialize = "confEvents", deserialize = "conf"),
        skip_serializing_if = "is_false"
    )]
    pub conf: bool,
}
command!(MonitorStart, "MonitorStart");

/// The monitored device: a plain string in JSON, nested under
/// `monitorObject>deviceObject` on the wire.
#[derive(Debug, Clone, Default)]
pub struct MonitorObject(pub String);

impl Serialize for MonitorObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Nested<'a> {
            #[serde(rename = "deviceObject")]
            device_object: &'a str,
        }
        Nested { device_object: &self.0 }.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MonitorObject {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(MonitorObject)
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MonitorStartResponse {
    #[serde(default, rename(deserialize = "monitorCrossRefID", serialize = "monitor"))]
    pub monitor: i64,
    #[serde(
        default,
        rename(deserialize = "actualMonitorMediaClass", serialize = "voice"),
        skip_serializing_if = "MediaClass::is_off"
    )]
    pub voice: MediaClass,
}

/// `actualMonitorMediaClass>voice`, flattened to a bare bool in JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaClass(pub bool);

impl MediaClass {
    fn is_off(&self) -> bool {
        !self.0
    }
}

impl Serialize for MediaClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(self.0)
    }
}

impl<'de> Deserialize<'de> for MediaClass {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Nested {
            #[serde(default)]
            voice: bool,
        }
        Nested::deserialize(deserializer).map(|nested| MediaClass(nested.voice))
    }
}

/// Stops a CSTA event monitor.
#[derive(Debug, Serialize, Deserialize)]
pub struct MonitorStop {
    #[serde(rename(serialize = "monitorCrossRefID", deserialize = "monitor"))]
    pub monitor: i64,
}
command!(MonitorStop, "MonitorStop");

/// Starts the address-book change monitor.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MonitorStartAb {}
command!(MonitorStartAb, "MonitorStartAb");

/// Stops the address-book change monitor.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MonitorStopAb {}
command!(MonitorStopAb, "MonitorStopAb");

/// Sets up a call between a calling and a called device.
#[derive(Debug, Serialize, Deserialize)]
pub struct MakeCall {
    #[serde(default, rename(serialize = "callingDevice", deserialize = "device"))]
    pub device: CallingDevice,
    #[serde(rename(serialize = "calledDirectoryNumber", deserialize = "to"))]
    pub to: String,
    #[serde(default, rename(serialize = "group", deserialize = "group"), skip_serializing_if = "String::is_empty")]
    pub group: String,
    #[serde(
        default,
        rename(serialize = "callerID", deserialize = "callerId"),
        skip_serializing_if = "String::is_empty"
    )]
    pub caller_id: String,
    #[serde(
        default,
        rename(serialize = "callerName", deserialize = "callerName"),
        skip_serializing_if = "String::is_empty"
    )]
    pub caller_name: String,
}
command!(MakeCall, "MakeCall");

/// The calling device of [`MakeCall`]. An empty value serializes as an
/// element whose `typeOfNumber` attribute is `deviceID`; otherwise the
/// device identifier is the element text and the attribute is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallingDevice(pub String);

impl Serialize for CallingDevice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Device<'a> {
            #[serde(rename = "@typeOfNumber", skip_serializing_if = "Option::is_none")]
            type_of_number: Option<&'a str>,
            #[serde(rename = "$text")]
            device: &'a str,
        }
        Device {
            type_of_number: self.0.is_empty().then_some("deviceID"),
            device: &self.0,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CallingDevice {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(CallingDevice)
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MakeCallResponse {
    #[serde(default, rename(deserialize = "callingDevice", serialize = "call"))]
    pub call: events::Call,
    #[serde(
        default,
        rename(deserialize = "calledDevice", serialize = "calledDevice"),
        skip_serializing_if = "String::is_empty"
    )]
    pub called_device: String,
}

/// Releases all devices from an existing call.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClearConnection {
    #[serde(rename(serialize = "connectionToBeCleared", deserialize = "call"))]
    pub call: Call,
}
command!(ClearConnection, "ClearConnection");

/// Answers an inbound call.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerCall {
    #[serde(rename(serialize = "callToBeAnswered", deserialize = "call"))]
    pub call: Call,
}
command!(AnswerCall, "AnswerCall");

/// Places a connected call on hold.
#[derive(Debug, Serialize, Deserialize)]
pub struct HoldCall {
    #[serde(rename(serialize = "callToBeHeld", deserialize = "call"))]
    pub call: Call,
}
command!(HoldCall, "HoldCall");

/// Moves a call at a device to a parked destination.
#[derive(Debug, Serialize, Deserialize)]
pub struct ParkCall {
    #[serde(rename(serialize = "parking", deserialize = "call"))]
    pub call: Call,
}
command!(ParkCall, "ParkCall");

/// Reconnects a held or parked call.
#[derive(Debug, Serialize, Deserialize)]
pub struct RetrieveCall {
    #[serde(rename(serialize = "callToBeRetrieved", deserialize = "call"))]
    pub call: Call,
}
command!(RetrieveCall, "RetrieveCall");

/// Transfers an existing connection to another device in one step.
#[derive(Debug, Serialize, Deserialize)]
pub struct SingleStepTransferCall {
    #[serde(rename(serialize = "activeCall", deserialize = "call"))]
    pub call: Call,
    #[serde(rename(serialize = "transferredTo", deserialize = "to"))]
    pub to: String,
}
command!(SingleStepTransferCall, "SingleStepTransferCall");

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SingleStepTransferCallResponse {
    #[serde(default, rename(deserialize = "transferredCall", serialize = "call"))]
    pub call: events::Call,
}

/// Diverts a call to another destination.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeflectCall {
    #[serde(rename(serialize = "callToBeDiverted", deserialize = "call"))]
    pub call: Call,
    #[serde(rename(serialize = "newDestination", deserialize = "to"))]
    pub to: String,
}
command!(DeflectCall, "DeflectCall");

/// Joins a held and an active call.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransferCall {
    #[serde(rename(serialize = "heldCall", deserialize = "heldCall"))]
    pub held_call: Call,
    #[serde(rename(serialize = "activeCall", deserialize = "activeCall"))]
    pub active_call: Call,
}
command!(TransferCall, "TransferCall");

/// Requests the call log; the entries arrive as a `callloginfo` event.
#[derive(Debug, Serialize, Deserialize)]
pub struct GetCallLog {
    #[serde(rename(serialize = "@type"), skip_deserializing, default = "iq_get")]
    pub kind: String,
    #[serde(rename(serialize = "@id"), skip_deserializing, default = "iq_calllog")]
    pub id: String,
    #[serde(default, rename(serialize = "@timestamp", deserialize = "timestamp"))]
    pub timestamp: i64,
}
command!(GetCallLog, "iq");

/// Named device with an optional type, used by [`AssignDevice`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceName {
    #[serde(
        default,
        rename(serialize = "@type", deserialize = "type"),
        skip_serializing_if = "String::is_empty"
    )]
    pub kind: String,
    #[serde(rename(serialize = "$text", deserialize = "name"))]
    pub name: String,
}

/// Binds the session to a device.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AssignDevice {
    #[serde(
        default,
        rename(serialize = "deviceID", deserialize = "device"),
        skip_serializing_if = "Option::is_none"
    )]
    pub device: Option<DeviceName>,
}
command!(AssignDevice, "AssignDevice");

/// Changes the call handling mode.
#[derive(Debug, Serialize, Deserialize)]
pub struct SetCallMode {
    #[serde(rename(serialize = "@type"), skip_deserializing, default = "iq_set")]
    pub kind: String,
    #[serde(rename(serialize = "@id"), skip_deserializing, default = "iq_mode")]
    pub id: String,
    #[serde(
        default,
        rename(serialize = "@mode", deserialize = "mode"),
        skip_serializing_if = "String::is_empty"
    )]
    pub mode: String,
    #[serde(
        default,
        rename(serialize = "@ringdelay", deserialize = "ringDelay"),
        skip_serializing_if = "is_zero_u32"
    )]
    pub ring_delay: u32,
    #[serde(
        default,
        rename(serialize = "@vmdelay", deserialize = "vmDelay"),
        skip_serializing_if = "is_zero_u32"
    )]
    pub vm_delay: u32,
    #[serde(
        default,
        rename(serialize = "address", deserialize = "device"),
        skip_serializing_if = "String::is_empty"
    )]
    pub from: String,
}
command!(SetCallMode, "iq");

/// Starts server-side call recording.
#[derive(Debug, Serialize, Deserialize)]
pub struct StartRecording {
    #[serde(rename(serialize = "Call", deserialize = "call"))]
    pub call: Call,
    #[serde(
        default,
        rename(serialize = "groupID", deserialize = "group"),
        skip_serializing_if = "String::is_empty"
    )]
    pub group: String,
}
command!(StartRecording, "StartRecording");

/// Stops server-side call recording.
#[derive(Debug, Serialize, Deserialize)]
pub struct StopRecording {
    #[serde(rename(serialize = "Call", deserialize = "call"))]
    pub call: Call,
    #[serde(
        default,
        rename(serialize = "groupID", deserialize = "group"),
        skip_serializing_if = "String::is_empty"
    )]
    pub group: String,
}
command!(StopRecording, "StopRecording");

/// Requests the list of incoming voice mails.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MailGetListIncoming {
    #[serde(
        default,
        rename(serialize = "userId", deserialize = "user"),
        with = "jid",
        skip_serializing_if = "is_zero_jid"
    )]
    pub user: Jid,
    #[serde(
        default,
        rename(serialize = "mediaType", deserialize = "mediaType"),
        skip_serializing_if = "String::is_empty"
    )]
    pub media_type: String,
}
command!(MailGetListIncoming, "MailGetListIncoming");

/// A stored voice mail as listed by the server.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VoiceMail {
    #[serde(default, rename(deserialize = "mailId", serialize = "id"))]
    pub id: i64,
    #[serde(default, rename(deserialize = "@from", serialize = "from"))]
    pub from: String,
    #[serde(
        default,
        rename(deserialize = "@fromName", serialize = "fromName"),
        skip_serializing_if = "String::is_empty"
    )]
    pub from_name: String,
    #[serde(
        default,
        rename(deserialize = "@callerName", serialize = "callerName"),
        skip_serializing_if = "String::is_empty"
    )]
    pub caller_name: String,
    #[serde(default, rename(deserialize = "@to", serialize = "to"))]
    pub to: String,
    #[serde(default, rename(deserialize = "@ownerType", serialize = "ownerType"))]
    pub owner_type: String,
    #[serde(
        default,
        rename(deserialize = "mediaType", serialize = "mediaType"),
        skip_serializing_if = "String::is_empty"
    )]
    pub media_type: String,
    #[serde(default, rename(deserialize = "received", serialize = "received"))]
    pub received: i64,
    #[serde(
        default,
        rename(deserialize = "duration", serialize = "duration"),
        skip_serializing_if = "is_zero_u16"
    )]
    pub duration: u16,
    #[serde(
        default,
        rename(deserialize = "read", serialize = "read"),
        skip_serializing_if = "is_false"
    )]
    pub read: bool,
    #[serde(
        default,
        rename(deserialize = "note", serialize = "note"),
        skip_serializing_if = "String::is_empty"
    )]
    pub note: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MailGetListIncomingResponse {
    #[serde(
        default,
        rename(deserialize = "@rowCount", serialize = "total"),
        skip_serializing_if = "is_zero_u16"
    )]
    pub total: u16,
    #[serde(
        default,
        rename(deserialize = "mail", serialize = "mails"),
        skip_serializing_if = "Vec::is_empty"
    )]
    pub mails: Vec<VoiceMail>,
}

/// Deletes a voice mail.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MailDeleteIncoming {
    #[serde(
        default,
        rename(serialize = "userId", deserialize = "user"),
        with = "jid",
        skip_serializing_if = "is_zero_jid"
    )]
    pub user: Jid,
    #[serde(rename(serialize = "mailId", deserialize = "id"))]
    pub id: i64,
    #[serde(
        default,
        rename(serialize = "mediaType", deserialize = "mediaType"),
        skip_serializing_if = "String::is_empty"
    )]
    pub media_type: String,
}
command!(MailDeleteIncoming, "MailDeleteIncoming");

/// Flags a voice mail as read or unread.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MailSetStatus {
    #[serde(
        default,
        rename(serialize = "userId", deserialize = "user"),
        with = "jid",
        skip_serializing_if = "is_zero_jid"
    )]
    pub user: Jid,
    #[serde(rename(serialize = "mailId", deserialize = "id"))]
    pub id: i64,
    #[serde(
        default,
        rename(serialize = "mediaType", deserialize = "mediaType"),
        skip_serializing_if = "String::is_empty"
    )]
    pub media_type: String,
    #[serde(
        default,
        rename(serialize = "read", deserialize = "read"),
        skip_serializing_if = "is_false"
    )]
    pub read: bool,
}
command!(MailSetStatus, "MailSetStatus");

/// Replaces the note attached to a voice mail.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateVmNote {
    #[serde(rename(serialize = "mailId", deserialize = "id"))]
    pub id: i64,
    #[serde(
        default,
        rename(serialize = "mediaType", deserialize = "mediaType"),
        skip_serializing_if = "String::is_empty"
    )]
    pub media_type: String,
    #[serde(
        default,
        rename(serialize = "note", deserialize = "note"),
        skip_serializing_if = "String::is_empty"
    )]
    pub note: String,
}
command!(UpdateVmNote, "UpdateVmNote");

/// Requests a voice mail download; the reply is the first [`VmChunk`].
/// Follow-up requests repeat the original body with an added empty
/// `nextChunk` element.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailReceiveIncoming {
    #[serde(rename(serialize = "faxSessionID", deserialize = "id"))]
    pub id: i64,
    #[serde(
        default,
        rename(serialize = "mediaType", deserialize = "mediaType"),
        skip_serializing_if = "String::is_empty"
    )]
    pub media_type: String,
    #[serde(
        rename(serialize = "nextChunk"),
        skip_deserializing,
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub next_chunk: Option<String>,
}
command!(MailReceiveIncoming, "MailReceiveIncoming");

/// One chunk of a voice mail file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VmChunk {
    #[serde(default, rename = "@mailId")]
    pub id: i64,
    #[serde(default, rename = "@chunkNumber")]
    pub number: i64,
    #[serde(default, rename = "@totalChunks")]
    pub total: i64,
    #[serde(default, rename = "@chunkSize")]
    pub size: i64,
    #[serde(default, rename = "fileFormat")]
    pub format: String,
    #[serde(default, rename = "documentName")]
    pub name: String,
    #[serde(default, rename = "mediaContent")]
    pub media_content: String,
}

impl VmChunk {
    /// Base64-decodes the chunk payload, tolerating embedded whitespace.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        let compact: String = self
            .media_content
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        STANDARD.decode(compact)
    }
}

/// Aborts a voice mail download in progress.
#[derive(Debug, Default, Serialize)]
pub struct MailCancelReceive {
    #[serde(rename = "mailId")]
    pub id: i64,
    #[serde(rename = "mediaType", skip_serializing_if = "String::is_empty")]
    pub media_type: String,
}
command!(MailCancelReceive, "MailCancelReceive");

/// Requests an address-book page; pages arrive as `ablist` events.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GetAddressBook {
    #[serde(rename(serialize = "@type"), skip_deserializing, default = "iq_get")]
    pub kind: String,
    #[serde(rename(serialize = "@id"), skip_deserializing, default = "iq_addressbook")]
    pub id: String,
    #[serde(rename(serialize = "@index"), skip_deserializing, default)]
    pub index: u32,
    #[serde(
        default,
        rename(serialize = "@sortmode", deserialize = "sort"),
        skip_serializing_if = "String::is_empty"
    )]
    pub sort: String,
}
command!(GetAddressBook, "iq");

/// An address-book entry.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Contact {
    #[serde(default, rename(deserialize = "@jid", serialize = "id"), with = "jid")]
    pub jid: Jid,
    #[serde(default, rename(deserialize = "businessPhone", serialize = "device"))]
    pub ext: String,
    #[serde(default, rename(deserialize = "firstName", serialize = "firstName"))]
    pub first_name: String,
    #[serde(default, rename(deserialize = "lastName", serialize = "lastName"))]
    pub last_name: String,
    #[serde(
        default,
        rename(deserialize = "homePhone", serialize = "homePhone"),
        skip_serializing_if = "String::is_empty"
    )]
    pub home_phone: String,
    #[serde(
        default,
        rename(deserialize = "cellPhone", serialize = "cellPhone"),
        skip_serializing_if = "String::is_empty"
    )]
    pub cell_phone: String,
    #[serde(
        default,
        rename(deserialize = "email", serialize = "email"),
        skip_serializing_if = "String::is_empty"
    )]
    pub email: String,
    #[serde(
        default,
        rename(deserialize = "homeSystem", serialize = "homeSystem"),
        with = "jid",
        skip_serializing_if = "is_zero_jid"
    )]
    pub home_system: Jid,
    #[serde(
        default,
        rename(deserialize = "did", serialize = "did"),
        skip_serializing_if = "String::is_empty"
    )]
    pub did: String,
    #[serde(
        default,
        rename(deserialize = "exchangeId", serialize = "exchangeId"),
        skip_serializing_if = "String::is_empty"
    )]
    pub exchange_id: String,
}

/// One page of the server address book, pushed as an `ablist` event.
#[derive(Debug, Default, Deserialize)]
pub struct AbList {
    #[serde(default, rename = "@size")]
    pub size: u32,
    #[serde(default, rename = "@index")]
    pub index: u32,
    #[serde(default, rename = "abentry")]
    pub contacts: Vec<Contact>,
}

/// Requests the configured service list.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GetServiceList {}
command!(GetServiceList, "GetServiceList");

/// A configured MX service.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServiceInfo {
    #[serde(default, rename(deserialize = "serviceId", serialize = "id"), with = "jid")]
    pub id: Jid,
    #[serde(default, rename(deserialize = "serviceName", serialize = "name"))]
    pub name: String,
    #[serde(default, rename(deserialize = "serviceType", serialize = "type"))]
    pub kind: String,
    #[serde(default, rename(deserialize = "extension", serialize = "device"))]
    pub ext: String,
    #[serde(
        default,
        rename(deserialize = "homeSystem", serialize = "homeSystem"),
        with = "jid",
        skip_serializing_if = "is_zero_jid"
    )]
    pub home_system: Jid,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Services {
    #[serde(default, rename(deserialize = "Service", serialize = "services"))]
    pub services: Vec<ServiceInfo>,
}

/// Sets the user presence.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SetStatus {
    #[serde(rename(serialize = "@status", deserialize = "presence"))]
    pub presence: String,
}
command!(SetStatus, "presence");

/// Asks for the calls currently associated with a device.
#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotDevice {
    #[serde(rename(serialize = "snapshotObject", deserialize = "device"))]
    pub device: String,
}
command!(SnapshotDevice, "SnapshotDevice");

/// Queries the agent state of a device.
#[derive(Debug, Serialize, Deserialize)]
pub struct GetAgentState {
    #[serde(rename(serialize = "device", deserialize = "device"))]
    pub device: String,
}
command!(GetAgentState, "GetAgentState");

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GetAgentStateResponse {
    #[serde(default, rename(deserialize = "loggedOnState", serialize = "loggedOnState"))]
    pub logged_on: bool,
    #[serde(default, rename(deserialize = "readyState", serialize = "readyState"))]
    pub ready: bool,
}

/// Sets the agent state of a device.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SetAgentState {
    #[serde(rename(serialize = "device", deserialize = "device"))]
    pub device: String,
    #[serde(rename(serialize = "requestedAgentState", deserialize = "state"))]
    pub state: String,
    #[serde(default, rename(serialize = "agentID", deserialize = "agent"), with = "jid")]
    pub agent: Jid,
    #[serde(default, rename(serialize = "password", deserialize = "password"))]
    pub password: String,
    #[serde(
        default,
        rename(serialize = "physicalDevice", deserialize = "physicalDevice")
    )]
    pub physical_device: String,
}
command!(SetAgentState, "SetAgentState");

fn iq_get() -> String {
    "get".to_owned()
}

fn iq_set() -> String {
    "set".to_owned()
}

fn iq_calllog() -> String {
    "calllog".to_owned()
}

fn iq_mode() -> String {
    "mode".to_owned()
}

fn iq_addressbook() -> String {
    "addressbook".to_owned()
}

/// Serializes a request to its framed XML body.
pub fn to_xml<C: Command>(cmd: &C) -> Result<String, quick_xml::SeError> {
    quick_xml::se::to_string_with_root(C::ROOT, cmd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hold_call_binding() {
        let cmd: HoldCall = serde_json::from_str(r#"{"call":{"id":1,"device":"101"}}"#).unwrap();
        assert_eq!(
            to_xml(&cmd).unwrap(),
            "<HoldCall><callToBeHeld><callID>1</callID><deviceID>101</deviceID></callToBeHeld></HoldCall>"
        );
    }

    #[test]
    fn make_call_with_device() {
        let cmd: MakeCall = serde_json::from_str(r#"{"device":"101","to":"102"}"#).unwrap();
        assert_eq!(
            to_xml(&cmd).unwrap(),
            "<MakeCall><callingDevice>101</callingDevice>\
             <calledDirectoryNumber>102</calledDirectoryNumber></MakeCall>"
        );
    }

    #[test]
    fn make_call_empty_device_gets_type_of_number() {
        let cmd: MakeCall = serde_json::from_str(r#"{"to":"102"}"#).unwrap();
        let xml = to_xml(&cmd).unwrap();
        assert!(xml.contains(r#"<callingDevice typeOfNumber="deviceID""#), "{xml}");
    }

    #[test]
    fn monitor_start_nests_device_object() {
        let cmd: MonitorStart = serde_json::from_str(r#"{"device":"101"}"#).unwrap();
        assert_eq!(
            to_xml(&cmd).unwrap(),
            "<MonitorStart><monitorObject><deviceObject>101</deviceObject></monitorObject></MonitorStart>"
        );
    }

    #[test]
    fn call_log_iq_envelope() {
        let cmd: GetCallLog = serde_json::from_str(r#"{"timestamp":123}"#).unwrap();
        assert_eq!(
            to_xml(&cmd).unwrap(),
            r#"<iq type="get" id="calllog" timestamp="123"/>"#
        );
    }

    #[test]
    fn address_book_iq_envelope() {
        let cmd: GetAddressBook = serde_json::from_str("{}").unwrap();
        assert_eq!(
            to_xml(&cmd).unwrap(),
            r#"<iq type="get" id="addressbook" index="0"/>"#
        );
    }

    #[test]
    fn set_call_mode_iq_envelope() {
        let cmd: SetCallMode = serde_json::from_str(r#"{"mode":"dnd"}"#).unwrap();
        assert_eq!(to_xml(&cmd).unwrap(), r#"<iq type="set" id="mode" mode="dnd"/>"#);
    }

    #[test]
    fn mail_receive_next_chunk_marker() {
        let mut cmd: MailReceiveIncoming = serde_json::from_str(r#"{"id":7}"#).unwrap();
        assert_eq!(
            to_xml(&cmd).unwrap(),
            "<MailReceiveIncoming><faxSessionID>7</faxSessionID></MailReceiveIncoming>"
        );
        cmd.next_chunk = Some(String::new());
        assert!(to_xml(&cmd).unwrap().contains("<nextChunk"));
    }

    #[test]
    fn vm_chunk_decodes_with_whitespace() {
        let chunk = VmChunk {
            media_content: "SGVs\nbG8g\nd29y\nbGQ=\n".into(),
            ..VmChunk::default()
        };
        assert_eq!(chunk.decode().unwrap(), b"Hello world");
        let compact = VmChunk {
            media_content: "SGVsbG8gd29ybGQ=".into(),
            ..VmChunk::default()
        };
        assert_eq!(chunk.decode().unwrap(), compact.decode().unwrap());
    }

    #[test]
    fn vm_chunk_from_xml() {
        let chunk: VmChunk = quick_xml::de::from_str(
            r#"<MailReceiveIncomingResponse mailId="7" chunkNumber="1" totalChunks="3" chunkSize="4">
                <fileFormat>wav</fileFormat>
                <documentName>message.wav</documentName>
                <mediaContent>QUJDRA==</mediaContent>
            </MailReceiveIncomingResponse>"#,
        )
        .unwrap();
        assert_eq!(chunk.id, 7);
        assert_eq!(chunk.number, 1);
        assert_eq!(chunk.total, 3);
        assert_eq!(chunk.format, "wav");
        assert_eq!(chunk.decode().unwrap(), b"ABCD");
    }

    #[test]
    fn ablist_event_decodes() {
        let list: AbList = quick_xml::de::from_str(
            r#"<ablist size="120" index="1">
                <abentry jid="281474976710656"><businessPhone>101</businessPhone>
                    <firstName>Ada</firstName><lastName>Lovelace</lastName></abentry>
                <abentry jid="281474976710657"><businessPhone>102</businessPhone>
                    <firstName>Alan</firstName><lastName>Turing</lastName></abentry>
            </ablist>"#,
        )
        .unwrap();
        assert_eq!(list.size, 120);
        assert_eq!(list.index, 1);
        assert_eq!(list.contacts.len(), 2);
        let json = serde_json::to_value(&list.contacts[0]).unwrap();
        assert_eq!(json["id"], "281474976710656");
        assert_eq!(json["device"], "101");
        assert_eq!(json["firstName"], "Ada");
    }

    #[test]
    fn service_list_unwraps() {
        let services: Services = quick_xml::de::from_str(
            "<GetServiceListResponse>\
                <Service><serviceId>9</serviceId><serviceName>Ops</serviceName>\
                <serviceType>ACD</serviceType><extension>500</extension></Service>\
            </GetServiceListResponse>",
        )
        .unwrap();
        assert_eq!(services.services.len(), 1);
        let json = serde_json::to_value(&services.services[0]).unwrap();
        assert_eq!(json["id"], "9");
        assert_eq!(json["name"], "Ops");
        assert_eq!(json["device"], "500");
    }

    #[test]
    fn voice_mail_list_response() {
        let list: MailGetListIncomingResponse = quick_xml::de::from_str(
            r#"<MailGetListIncomingResponse rowCount="1">
                <mail from="101" fromName="Ada" to="102" ownerType="User">
                    <mailId>7</mailId><received>1612345678</received>
                    <duration>42</duration><read>true</read></mail>
            </MailGetListIncomingResponse>"#,
        )
        .unwrap();
        assert_eq!(list.total, 1);
        let json = serde_json::to_value(&list.mails[0]).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["from"], "101");
        assert_eq!(json["duration"], 42);
        assert_eq!(json["read"], true);
    }

    #[test]
    fn assign_device_with_and_without_device() {
        let cmd: AssignDevice = serde_json::from_str("{}").unwrap();
        assert_eq!(to_xml(&cmd).unwrap(), "<AssignDevice/>");
        let cmd: AssignDevice =
            serde_json::from_str(r#"{"device":{"type":"softphone","name":"sp101"}}"#).unwrap();
        assert_eq!(
            to_xml(&cmd).unwrap(),
            r#"<AssignDevice><deviceID type="softphone">sp101</deviceID></AssignDevice>"#
        );
    }

    #[test]
    fn set_status_attribute() {
        let cmd: SetStatus = serde_json::from_str(r#"{"presence":"Away"}"#).unwrap();
        assert_eq!(to_xml(&cmd).unwrap(), r#"<presence status="Away"/>"#);
    }

    #[test]
    fn monitor_start_response_flattens_voice() {
        let resp: MonitorStartResponse = quick_xml::de::from_str(
            "<MonitorStartResponse><monitorCrossRefID>5</monitorCrossRefID>\
             <actualMonitorMediaClass><voice>true</voice></actualMonitorMediaClass>\
             </MonitorStartResponse>",
        )
        .unwrap();
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["monitor"], 5);
        assert_eq!(json["voice"], true);
    }
}
