//! RESP protocol codec and command key routing for a sharding Redis proxy.

pub mod error;
pub mod protocol;
pub mod routing;

pub use error::{CodecError, Result};
pub use protocol::{decode, RespValue};
pub use routing::{is_keyless, FALLBACK_KEY, KEYLESS_COMMANDS};
