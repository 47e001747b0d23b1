//! Serde helpers shared by the command and event schemas.
//!
//! Schemas are written once with split renames: requests deserialize
//! from the HTTP JSON body and serialize to the XML wire form, responses
//! and events go the opposite way. The helpers here cover the bindings
//! serde cannot express with attributes alone.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// JID fields: numeric on the XML wire, strings in JSON.
pub mod jid {
    use super::*;
    use mx::Jid;

    pub fn serialize<S: Serializer>(value: &Jid, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Jid, D::Error> {
        struct Visitor;

        impl de::Visitor<'_> for Visitor {
            type Value = Jid;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a JID as a number or string")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Jid, E> {
                value.parse().map_err(de::Error::custom)
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Jid, E> {
                Ok(value)
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Jid, E> {
                u64::try_from(value).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}

/// A device reference nested as `<parent><deviceIdentifier>…` in XML but
/// flattened to a plain string in JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceId(pub String);

impl Serialize for DeviceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for DeviceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Nested {
            #[serde(default, rename = "deviceIdentifier")]
            device_identifier: String,
        }
        Nested::deserialize(deserializer).map(|nested| DeviceId(nested.device_identifier))
    }
}

impl DeviceId {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub fn is_false(value: &bool) -> bool {
    !*value
}

pub fn is_zero_i64(value: &i64) -> bool {
    *value == 0
}

pub fn is_zero_u16(value: &u16) -> bool {
    *value == 0
}

pub fn is_zero_u32(value: &u32) -> bool {
    *value == 0
}

pub fn is_zero_jid(value: &mx::Jid) -> bool {
    *value == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "jid")]
        id: mx::Jid,
    }

    #[test]
    fn jid_serializes_as_json_string() {
        let json = serde_json::to_string(&Holder { id: 42 }).unwrap();
        assert_eq!(json, r#"{"id":"42"}"#);
    }

    #[test]
    fn jid_deserializes_from_string_and_number() {
        let holder: Holder = serde_json::from_str(r#"{"id":"42"}"#).unwrap();
        assert_eq!(holder.id, 42);
        let holder: Holder = serde_json::from_str(r#"{"id":42}"#).unwrap();
        assert_eq!(holder.id, 42);
    }

    #[test]
    fn device_id_flattens_nested_identifier() {
        #[derive(Debug, Deserialize)]
        struct Event {
            #[serde(rename = "callingDevice")]
            calling: DeviceId,
        }
        let event: Event = quick_xml::de::from_str(
            "<e><callingDevice><deviceIdentifier>101</deviceIdentifier></callingDevice></e>",
        )
        .unwrap();
        assert_eq!(event.calling.0, "101");
        assert_eq!(serde_json::to_string(&event.calling).unwrap(), r#""101""#);
    }
}
