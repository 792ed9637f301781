//! RESP (Redis Serialization Protocol) wire support: value model, decoder,
//! encoder, and the integer codec backing length prefixes.

pub mod decoder;
pub mod integer;
pub mod value;

pub use decoder::decode;
pub use value::RespValue;

/// Two-byte terminator every RESP line ends with.
pub const CRLF: &[u8] = b"\r\n";
