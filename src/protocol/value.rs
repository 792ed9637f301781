//! The decoded RESP value tree and its wire serialization.

use super::{integer, CRLF};
use bytes::{BufMut, Bytes, BytesMut};

/// One node of a decoded RESP message.
///
/// Leaf variants own the *complete* wire encoding for the node (type marker,
/// payload, CRLF) in a single contiguous buffer, so re-serializing a decoded
/// message is a straight copy with no re-formatting. An array owns only its
/// `*<count>\r\n` header line plus its children; `items == None` represents
/// a null array. Trees are immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// `-<message>\r\n`
    Error(Bytes),
    /// `+<text>\r\n`
    SimpleString(Bytes),
    /// `:<number>\r\n`; the payload is parsed on demand, never eagerly.
    Integer(Bytes),
    /// `$<len>\r\n<payload>\r\n`, or just `$-1\r\n` for a null bulk.
    Bulk(Bytes),
    /// `*<count>\r\n` header plus decoded children, in wire order.
    Array {
        header: Bytes,
        items: Option<Vec<RespValue>>,
    },
    /// A bare byte string, never produced by decoding. Serialized as a bulk
    /// payload followed by CRLF when a caller hands back a synthesized reply.
    Key(Bytes),
}

impl RespValue {
    /// `+<payload>\r\n`
    pub fn simple(payload: &[u8]) -> Self {
        RespValue::SimpleString(line(b'+', payload))
    }

    /// `-<message>\r\n`
    pub fn error_msg(message: &str) -> Self {
        RespValue::Error(line(b'-', message.as_bytes()))
    }

    /// `:<n>\r\n`
    pub fn integer(n: i64) -> Self {
        RespValue::Integer(line(b':', &integer::encode(n)))
    }

    /// Build a bulk node carrying the complete wire encoding of `payload`.
    pub fn bulk(payload: &[u8]) -> Self {
        let len = integer::encode(payload.len() as i64);
        let mut raw = BytesMut::with_capacity(payload.len() + len.len() + 5);
        raw.put_u8(b'$');
        raw.extend_from_slice(&len);
        raw.extend_from_slice(CRLF);
        raw.extend_from_slice(payload);
        raw.extend_from_slice(CRLF);
        RespValue::Bulk(raw.freeze())
    }

    pub fn null_bulk() -> Self {
        RespValue::Bulk(Bytes::from_static(b"$-1\r\n"))
    }

    pub fn null_array() -> Self {
        RespValue::Array {
            header: Bytes::from_static(b"*-1\r\n"),
            items: None,
        }
    }

    /// Build an array node; the header count always matches `items.len()`.
    pub fn array(items: Vec<RespValue>) -> Self {
        let count = integer::encode(items.len() as i64);
        let mut header = BytesMut::with_capacity(count.len() + 3);
        header.put_u8(b'*');
        header.extend_from_slice(&count);
        header.extend_from_slice(CRLF);
        RespValue::Array {
            header: header.freeze(),
            items: Some(items),
        }
    }

    /// Wrap a bare byte string for serialization as a synthesized reply.
    pub fn from_key(bytes: impl Into<Bytes>) -> Self {
        RespValue::Key(bytes.into())
    }

    /// Logical payload of a leaf node, as a zero-copy slice of its buffer.
    ///
    /// Strips the type marker and trailing CRLF. A bulk buffer still carries
    /// its length header after that first cut, so the slice is trimmed again
    /// past the first LF; a null bulk has no LF left and yields `None`, as
    /// do arrays.
    pub fn payload(&self) -> Option<Bytes> {
        match self {
            RespValue::Error(raw) | RespValue::SimpleString(raw) | RespValue::Integer(raw) => {
                if raw.len() < 3 {
                    return None;
                }
                Some(raw.slice(1..raw.len() - 2))
            }
            RespValue::Bulk(raw) => {
                if raw.len() < 3 {
                    return None;
                }
                let inner = raw.slice(1..raw.len() - 2);
                let lf = inner.iter().position(|&b| b == b'\n')?;
                Some(inner.slice(lf + 1..))
            }
            RespValue::Key(raw) => Some(raw.clone()),
            RespValue::Array { .. } => None,
        }
    }

    /// Append the wire encoding of this tree to `buf`. Never mutates the
    /// tree; leaf buffers are copied verbatim.
    pub fn write_to(&self, buf: &mut BytesMut) {
        match self {
            RespValue::Error(raw)
            | RespValue::SimpleString(raw)
            | RespValue::Integer(raw)
            | RespValue::Bulk(raw) => buf.extend_from_slice(raw),
            RespValue::Key(raw) => {
                buf.extend_from_slice(raw);
                buf.extend_from_slice(CRLF);
            }
            RespValue::Array { header, items } => {
                buf.extend_from_slice(header);
                if let Some(items) = items {
                    for item in items {
                        item.write_to(buf);
                    }
                }
            }
        }
    }

    /// Serialize this tree into one contiguous buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(256);
        self.write_to(&mut buf);
        buf.freeze()
    }
}

fn line(marker: u8, payload: &[u8]) -> Bytes {
    let mut raw = BytesMut::with_capacity(payload.len() + 3);
    raw.put_u8(marker);
    raw.extend_from_slice(payload);
    raw.extend_from_slice(CRLF);
    raw.freeze()
}
