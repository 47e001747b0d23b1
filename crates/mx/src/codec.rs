use bytes::{Buf, BufMut, Bytes, BytesMut};
use quick_xml::events::Event;
use serde::de::DeserializeOwned;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::Error;

/// Correlation id reserved for server-originated events.
pub const EVENT_ID: u16 = 9999;

/// Body of the idle keep-alive frame, sent with id `0000`.
pub const KEEP_ALIVE_BODY: &[u8] = b"<keepalive />";

const HEADER_LEN: usize = 8;

/// A decoded frame: correlation id, XML root-element name and raw body.
#[derive(Debug, Clone)]
pub struct Frame {
    pub id: u16,
    pub name: String,
    pub body: String,
}

impl Frame {
    /// Unmarshals the XML body into the given schema.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(quick_xml::de::from_str(&self.body)?)
    }
}

/// Codec for the MX wire framing.
///
/// Header layout: two zero bytes, the big-endian total frame length
/// (body + 8) and four ASCII decimal digits carrying the correlation id.
/// The codec does not interpret the XML payload beyond locating the root
/// element name.
#[derive(Debug, Default, Clone, Copy)]
pub struct Codec;

impl Decoder for Codec {
    type Item = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, Error> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }
        let total = u16::from_be_bytes([src[2], src[3]]) as usize;
        if total < HEADER_LEN {
            return Err(Error::Protocol(format!("invalid frame length {total}")));
        }
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }
        let id = std::str::from_utf8(&src[4..8])
            .ok()
            .and_then(|digits| digits.parse::<u16>().ok())
            .ok_or_else(|| {
                Error::Protocol(format!("invalid correlation id {:?}", &src[4..8]))
            })?;
        src.advance(HEADER_LEN);
        let body = src.split_to(total - HEADER_LEN);
        let body = String::from_utf8(body.to_vec())
            .map_err(|_| Error::Protocol("frame body is not valid utf-8".into()))?;
        let name = root_name(&body)?;
        Ok(Some(Frame { id, name, body }))
    }
}

impl Encoder<(u16, Bytes)> for Codec {
    type Error = Error;

    fn encode(&mut self, (id, body): (u16, Bytes), dst: &mut BytesMut) -> Result<(), Error> {
        if body.len() > u16::MAX as usize - HEADER_LEN {
            return Err(Error::Protocol(format!("frame body too large: {}", body.len())));
        }
        if id > EVENT_ID {
            return Err(Error::Protocol(format!("correlation id out of range: {id}")));
        }
        dst.reserve(HEADER_LEN + body.len());
        dst.put_slice(&[0, 0]);
        dst.put_u16((body.len() + HEADER_LEN) as u16);
        dst.put_slice(format!("{id:04}").as_bytes());
        dst.put_slice(&body);
        Ok(())
    }
}

/// Returns the local name of the first element, skipping anything before it.
fn root_name(body: &str) -> Result<String, Error> {
    let mut reader = quick_xml::Reader::from_str(body);
    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => return name_of(start.local_name().as_ref()),
            Ok(Event::Empty(start)) => return name_of(start.local_name().as_ref()),
            Ok(Event::Eof) => return Err(Error::Protocol("frame without root element".into())),
            Err(err) => return Err(Error::Protocol(format!("malformed frame body: {err}"))),
            Ok(_) => {}
        }
    }
}

fn name_of(raw: &[u8]) -> Result<String, Error> {
    std::str::from_utf8(raw)
        .map(str::to_owned)
        .map_err(|_| Error::Protocol("root element name is not valid utf-8".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(id: u16, body: &'static [u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        Codec.encode((id, Bytes::from_static(body)), &mut buf).unwrap();
        buf
    }

    #[test]
    fn encode_header_layout() {
        let buf = encode(1, b"<logout/>");
        assert_eq!(&buf[..2], &[0, 0]);
        assert_eq!(u16::from_be_bytes([buf[2], buf[3]]), 9 + 8);
        assert_eq!(&buf[4..8], b"0001");
        assert_eq!(&buf[8..], b"<logout/>");
    }

    #[test]
    fn encode_zero_pads_id() {
        let buf = encode(42, b"<a/>");
        assert_eq!(&buf[4..8], b"0042");
        let buf = encode(9998, b"<a/>");
        assert_eq!(&buf[4..8], b"9998");
    }

    #[test]
    fn keep_alive_frame_bytes() {
        // The wire constant used by the original client.
        let buf = encode(0, KEEP_ALIVE_BODY);
        assert_eq!(
            &buf[..],
            &[
                0x00, 0x00, 0x00, 0x15, 0x30, 0x30, 0x30, 0x30, 0x3c, 0x6b, 0x65, 0x65, 0x70,
                0x61, 0x6c, 0x69, 0x76, 0x65, 0x20, 0x2f, 0x3e
            ]
        );
    }

    #[test]
    fn decode_roundtrip() {
        let mut buf = encode(7, b"<MakeCall><to>101</to></MakeCall>");
        let frame = Codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.id, 7);
        assert_eq!(frame.name, "MakeCall");
        assert_eq!(frame.body, "<MakeCall><to>101</to></MakeCall>");
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_waits_for_full_frame() {
        let full = encode(1, b"<presence status=\"online\"/>");
        let mut partial = BytesMut::from(&full[..10]);
        assert!(Codec.decode(&mut partial).unwrap().is_none());
        partial.extend_from_slice(&full[10..]);
        let frame = Codec.decode(&mut partial).unwrap().unwrap();
        assert_eq!(frame.name, "presence");
    }

    #[test]
    fn decode_rejects_non_digit_id() {
        let mut buf = encode(1, b"<a/>");
        buf[5] = b'x';
        assert!(matches!(Codec.decode(&mut buf), Err(Error::Protocol(_))));
    }

    #[test]
    fn decode_event_id() {
        let mut raw = encode(0, b"<DeliveredEvent/>");
        raw[4..8].copy_from_slice(b"9999");
        let frame = Codec.decode(&mut raw).unwrap().unwrap();
        assert_eq!(frame.id, EVENT_ID);
        assert_eq!(frame.name, "DeliveredEvent");
    }

    #[test]
    fn decode_two_frames_from_one_buffer() {
        let mut buf = encode(1, b"<a/>");
        buf.extend_from_slice(&encode(2, b"<b/>"));
        let first = Codec.decode(&mut buf).unwrap().unwrap();
        let second = Codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!((first.id, second.id), (1, 2));
        assert_eq!((first.name.as_str(), second.name.as_str()), ("a", "b"));
    }
}
