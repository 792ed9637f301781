//! Command key extraction for shard routing.
//!
//! Given a decoded command, the router needs to know which arguments are
//! keys. Most commands treat every argument after the name as a key; a small
//! set declares its key count in the third argument instead. The strategy
//! table is built once and read concurrently without synchronization.

use crate::error::{CodecError, Result};
use crate::protocol::{integer, RespValue};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Sentinel key returned for commands that address no real key, so key-less
/// invocations still route to a deterministic shard.
pub const FALLBACK_KEY: &[u8] = b"fakeKey";

/// Commands that never address a key by content. Callers are expected to
/// route these with [`FALLBACK_KEY`] instead of inspecting arguments.
pub const KEYLESS_COMMANDS: &[&[u8]] = &[b"PING", b"SLOTSNUM", b"SLOTSCHECK"];

/// Commands whose third argument declares how many of the following
/// arguments are keys.
const THIRD_ARG_COUNT_COMMANDS: &[&[u8]] = &[b"ZINTERSTORE", b"ZUNIONSTORE", b"EVAL", b"EVALSHA"];

type KeyStrategy = fn(&[RespValue]) -> Result<Vec<Bytes>>;

static STRATEGIES: OnceLock<HashMap<&'static [u8], KeyStrategy>> = OnceLock::new();

fn strategies() -> &'static HashMap<&'static [u8], KeyStrategy> {
    STRATEGIES.get_or_init(|| {
        let mut table: HashMap<&'static [u8], KeyStrategy> = HashMap::new();
        for &name in THIRD_ARG_COUNT_COMMANDS {
            table.insert(name, third_arg_count_keys);
        }
        table
    })
}

/// Whether `op` names a command from the keyless set, ignoring case.
pub fn is_keyless(op: &[u8]) -> bool {
    let upper = op.to_ascii_uppercase();
    KEYLESS_COMMANDS.iter().any(|name| *name == upper.as_slice())
}

impl RespValue {
    /// The command name: payload of the first child of a non-empty array.
    pub fn op(&self) -> Result<Bytes> {
        let items = self.command_items()?;
        items[0]
            .payload()
            .ok_or_else(|| CodecError::InvalidCommand("command name is not a bulk string".into()))
    }

    /// The keys this command addresses, in argument order.
    ///
    /// The strategy table holds uppercase names; the lookup uppercases a
    /// copy of the op so the decoded command itself is never touched.
    pub fn keys(&self) -> Result<Vec<Bytes>> {
        let items = self.command_items()?;
        let op = self.op()?.to_ascii_uppercase();
        match strategies().get(op.as_slice()) {
            Some(strategy) => strategy(items),
            None => default_keys(items),
        }
    }

    /// The first key, or [`FALLBACK_KEY`] when the command addresses none.
    /// The convenience entry point for single-key routing decisions.
    pub fn key(&self) -> Result<Bytes> {
        let keys = self.keys()?;
        Ok(keys
            .into_iter()
            .next()
            .unwrap_or_else(|| Bytes::from_static(FALLBACK_KEY)))
    }

    fn command_items(&self) -> Result<&[RespValue]> {
        match self {
            RespValue::Array {
                items: Some(items), ..
            } if !items.is_empty() => Ok(items),
            _ => Err(CodecError::InvalidCommand(
                "value is not a non-empty command array".into(),
            )),
        }
    }
}

/// Every argument after the command name is a key.
fn default_keys(items: &[RespValue]) -> Result<Vec<Bytes>> {
    items[1..]
        .iter()
        .map(|item| {
            item.payload()
                .ok_or_else(|| CodecError::InvalidCommand("argument is not a bulk string".into()))
        })
        .collect()
}

/// The third argument declares the key count; keys follow it.
///
/// `EVAL`-style invocations with no keys at all get the fallback key so they
/// stay routable.
fn third_arg_count_keys(items: &[RespValue]) -> Result<Vec<Bytes>> {
    if items.len() < 4 {
        return Ok(vec![Bytes::from_static(FALLBACK_KEY)]);
    }

    let count_arg = items[2]
        .payload()
        .ok_or_else(|| CodecError::InvalidCommand("key count is not a bulk string".into()))?;
    let num_keys = integer::parse(&count_arg)?;

    items[3..]
        .iter()
        .take(num_keys.max(0) as usize)
        .map(|item| {
            item.payload()
                .ok_or_else(|| CodecError::InvalidCommand("key is not a bulk string".into()))
        })
        .collect()
}
