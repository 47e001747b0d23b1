use std::io;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::StreamExt;
use serde::{Deserialize, Serialize, Serializer};
use sha1::{Digest, Sha1};
use tokio_util::codec::FramedRead;

use crate::{
    codec::Codec,
    conn::{BoxRead, Inner, READ_TIMEOUT},
    error::{Error, LoginError},
};

/// 64-bit MX object identifier (user, group, service). Carried as a
/// number on the wire and as a string in JSON.
pub type Jid = u64;

/// Authorization parameters supplied by the HTTP client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Login {
    #[serde(rename = "login")]
    pub user_name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub version: String,
    /// "", "Mobile", "Desktop" or "CRM".
    #[serde(default, rename = "clientType")]
    pub client_type: String,
    /// "" or "SMS".
    #[serde(default, rename = "serverType")]
    pub server_type: String,
    /// "Audio|Video|Im|911Support|BinIm|WebChat".
    #[serde(default, rename = "loginCapab")]
    pub login_capab: String,
    /// "Voicemail|Fax|CallRec".
    #[serde(default, rename = "mediaCapab")]
    pub media_capab: String,
    #[serde(default, rename = "abNotify")]
    pub ab_notify: bool,
    #[serde(default)]
    pub forced: bool,
    #[serde(default, rename = "apiVersion")]
    pub api_version: i32,
}

impl Login {
    /// Returns the password in hashed form: `base64(sha1(password))` with
    /// a trailing newline. A password that already looks hashed (ends in
    /// a newline and base64-decodes to 20 bytes) is returned verbatim for
    /// wire compatibility.
    pub fn hashed_password(&self) -> String {
        let password = &self.password;
        if password.len() > 4 && password.ends_with('\n') {
            if let Ok(raw) = STANDARD.decode(&password[..password.len() - 1]) {
                if raw.len() == Sha1::output_size() {
                    return password.clone();
                }
            }
        }
        STANDARD.encode(Sha1::digest(password.as_bytes())) + "\n"
    }

    /// Builds the `loginRequest` XML body with the given password form.
    pub(crate) fn request_xml(&self, pwd: &str) -> Result<String, crate::Error> {
        let request = LoginRequest {
            kind: &self.kind,
            platform: &self.platform,
            version: &self.version,
            client_type: &self.client_type,
            server_type: &self.server_type,
            login_capab: &self.login_capab,
            media_capab: &self.media_capab,
            ab_notify: self.ab_notify,
            forced: self.forced,
            api_version: self.api_version,
            user_name: &self.user_name,
            pwd,
        };
        quick_xml::se::to_string_with_root("loginRequest", &request)
            .map_err(|err| crate::Error::Protocol(format!("xml encode: {err}")))
    }
}

/// Wire form of the login command. Attributes first, then the child
/// elements, as the serializer requires.
#[derive(Serialize)]
struct LoginRequest<'a> {
    #[serde(rename = "@type", skip_serializing_if = "is_empty")]
    kind: &'a str,
    #[serde(rename = "@platform", skip_serializing_if = "is_empty")]
    platform: &'a str,
    #[serde(rename = "@version", skip_serializing_if = "is_empty")]
    version: &'a str,
    #[serde(rename = "@clientType", skip_serializing_if = "is_empty")]
    client_type: &'a str,
    #[serde(rename = "@serverType", skip_serializing_if = "is_empty")]
    server_type: &'a str,
    #[serde(rename = "@loginCapab", skip_serializing_if = "is_empty")]
    login_capab: &'a str,
    #[serde(rename = "@mediaCapab", skip_serializing_if = "is_empty")]
    media_capab: &'a str,
    #[serde(rename = "@abNotify", skip_serializing_if = "is_false")]
    ab_notify: bool,
    #[serde(rename = "@forced", skip_serializing_if = "is_false")]
    forced: bool,
    #[serde(rename = "@apiVersion", skip_serializing_if = "is_zero")]
    api_version: i32,
    #[serde(rename = "userName")]
    user_name: &'a str,
    pwd: &'a str,
}

fn is_empty(value: &&str) -> bool {
    value.is_empty()
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero(value: &i32) -> bool {
    *value == 0
}

/// Runs the login handshake on a fresh connection.
///
/// The first attempt always carries the hashed password form. When the
/// server rejects it with code 2 or 4 on API version 3 or later, one
/// retry is made with the cleartext password, which older account
/// records require.
pub(crate) async fn authorize(
    inner: &Inner,
    reader: &mut FramedRead<BoxRead, Codec>,
    login: &Login,
) -> Result<Info, Error> {
    let mut pwd = login.hashed_password();
    loop {
        let xml = login.request_xml(&pwd)?;
        let id = inner.next_id();
        inner.write_frame(id, xml.into()).await?;
        // The dispatch loop is not running yet: read frames directly
        // until one matches the sent id. Every frame resets the timeout.
        let frame = loop {
            let frame = tokio::time::timeout(READ_TIMEOUT, reader.next())
                .await
                .map_err(|_| Error::Timeout)?
                .ok_or_else(|| {
                    Error::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed during login",
                    ))
                })??;
            if frame.id == id {
                break frame;
            }
        };
        match frame.name.as_str() {
            // spelled this way on the wire
            "loginResponce" => {
                let info: Info = frame.decode()?;
                tracing::debug!(user = %login.user_name, user_id = info.user_id, "login ok");
                return Ok(info);
            }
            "loginFailed" => {
                let failure: LoginError = frame.decode()?;
                if (failure.code == 2 || failure.code == 4)
                    && failure.apiversion > 2
                    && pwd != login.password
                {
                    tracing::debug!(
                        user = %login.user_name,
                        code = failure.code,
                        "hashed password rejected, retrying with cleartext"
                    );
                    pwd = login.password.clone();
                    continue;
                }
                return Err(Error::Login(failure));
            }
            other => {
                return Err(Error::Protocol(format!(
                    "unknown mx login response {other:?}"
                )));
            }
        }
    }
}

/// Information returned by a successful login (`loginResponce` frame):
/// the authorized user plus server identity and capabilities.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Info {
    #[serde(
        default,
        rename(deserialize = "@userId", serialize = "user"),
        serialize_with = "jid_as_string",
        skip_serializing_if = "jid_is_zero"
    )]
    pub user_id: Jid,
    #[serde(
        default,
        rename(deserialize = "@ext", serialize = "device"),
        skip_serializing_if = "String::is_empty"
    )]
    pub ext: String,
    #[serde(
        default,
        rename(deserialize = "@softPhonePwd", serialize = "softPhonePwd"),
        skip_serializing_if = "String::is_empty"
    )]
    pub soft_phone_pwd: String,
    #[serde(
        default,
        rename(deserialize = "@apiversion", serialize = "api"),
        skip_serializing_if = "u16_is_zero"
    )]
    pub api_version: u16,
    #[serde(
        default,
        rename(deserialize = "@sn", serialize = "mx"),
        skip_serializing_if = "String::is_empty"
    )]
    pub mx_id: String,
    #[serde(
        default,
        rename(deserialize = "@mxCapab", serialize = "capab"),
        skip_serializing_if = "String::is_empty"
    )]
    pub capab: String,
    #[serde(
        default,
        rename(deserialize = "@maxMsgFileSizeMb", serialize = "maxMsgFileSizeMb"),
        skip_serializing_if = "i64_is_zero"
    )]
    pub max_file_size_mb: i64,
}

pub(crate) fn jid_as_string<S: Serializer>(value: &Jid, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

fn jid_is_zero(value: &Jid) -> bool {
    *value == 0
}

fn u16_is_zero(value: &u16) -> bool {
    *value == 0
}

fn i64_is_zero(value: &i64) -> bool {
    *value == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login(password: &str) -> Login {
        Login {
            user_name: "u".into(),
            password: password.into(),
            kind: "User".into(),
            ..Login::default()
        }
    }

    #[test]
    fn hashes_cleartext_password() {
        let hashed = login("p").hashed_password();
        assert!(hashed.ends_with('\n'));
        let raw = STANDARD.decode(hashed.trim_end()).unwrap();
        assert_eq!(raw.len(), 20);
    }

    #[test]
    fn hashing_is_idempotent() {
        let once = login("secret").hashed_password();
        let twice = login(&once).hashed_password();
        assert_eq!(once, twice);
    }

    #[test]
    fn short_password_is_always_hashed() {
        // "p\n" is too short to be a hash even though it ends in a newline.
        let hashed = login("p\n").hashed_password();
        assert_ne!(hashed, "p\n");
    }

    #[test]
    fn login_request_xml() {
        let xml = login("p").request_xml("hash\n").unwrap();
        assert!(xml.starts_with("<loginRequest type=\"User\""));
        assert!(xml.contains("<userName>u</userName>"));
        assert!(xml.contains("<pwd>hash\n</pwd>"));
        // unset optional attributes stay off the wire
        assert!(!xml.contains("platform"));
        assert!(!xml.contains("abNotify"));
    }

    #[test]
    fn info_from_login_responce() {
        let xml = r#"<loginResponce userId="42" ext="101" apiversion="6" sn="MX-1"/>"#;
        let info: Info = quick_xml::de::from_str(xml).unwrap();
        assert_eq!(info.user_id, 42);
        assert_eq!(info.ext, "101");
        assert_eq!(info.api_version, 6);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["user"], "42");
        assert_eq!(json["device"], "101");
        assert!(json.get("softPhonePwd").is_none());
    }
}
