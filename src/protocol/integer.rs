//! ASCII integer codec for RESP length prefixes and integer replies.
//!
//! Length prefixes are overwhelmingly small, so encoding goes through a
//! pre-built table of buffers for `0..10000` and allocates only above that.

use crate::error::{CodecError, Result};
use bytes::Bytes;
use std::sync::OnceLock;

const CACHE_SIZE: usize = 10_000;

static CACHE: OnceLock<Vec<Bytes>> = OnceLock::new();

fn cache() -> &'static [Bytes] {
    CACHE.get_or_init(|| (0..CACHE_SIZE).map(|n| Bytes::from(n.to_string())).collect())
}

/// Encode `n` as ASCII decimal bytes.
///
/// Small non-negative values clone a shared buffer out of the cache, which
/// is a reference-count bump rather than an allocation.
pub fn encode(n: i64) -> Bytes {
    match usize::try_from(n) {
        Ok(small) if small < CACHE_SIZE => cache()[small].clone(),
        _ => Bytes::from(n.to_string()),
    }
}

/// Parse an optionally minus-signed run of ASCII digits.
///
/// Fails with `InvalidNumber` on an empty run, a lone `-`, any non-digit
/// byte, or a digit run that overflows `i64`.
pub fn parse(raw: &[u8]) -> Result<i64> {
    let (sign, digits) = match raw.split_first() {
        Some((b'-', rest)) => (-1, rest),
        _ => (1, raw),
    };

    if digits.is_empty() {
        return Err(invalid(raw));
    }

    let mut n: i64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return Err(invalid(raw));
        }
        n = n
            .checked_mul(10)
            .and_then(|n| n.checked_add(i64::from(b - b'0')))
            .ok_or_else(|| invalid(raw))?;
    }

    Ok(sign * n)
}

fn invalid(raw: &[u8]) -> CodecError {
    CodecError::InvalidNumber(String::from_utf8_lossy(raw).into_owned())
}
