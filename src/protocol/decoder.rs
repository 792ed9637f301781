//! Recursive-descent RESP decoder driven by a buffered byte source.
//!
//! One call to [`decode`] consumes exactly one message from the stream. The
//! only suspension points are the line and bulk-payload reads; partial reads
//! stay inside the caller's `BufReader` and are never observable here. After
//! any error the stream position is undefined and the connection that owns
//! the reader must be torn down.

use super::{integer, RespValue};
use crate::error::{CodecError, Result};
use bytes::Bytes;
use std::future::Future;
use std::io;
use std::pin::Pin;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Hard cap on array nesting. Well-formed traffic nests two or three levels
/// deep; past this the input is treated as hostile.
const MAX_NESTING: usize = 128;

/// Decode one RESP message, dispatching on the first byte of its first line.
///
/// A line opening with an ASCII letter is a legacy inline (telnet) command
/// and is normalized into an array of bulk strings.
pub async fn decode<R>(reader: &mut R) -> Result<RespValue>
where
    R: AsyncBufRead + Unpin + Send,
{
    decode_at(reader, 0).await
}

// Boxed so the async recursion through array children has a sized future.
fn decode_at<'a, R>(
    reader: &'a mut R,
    depth: usize,
) -> Pin<Box<dyn Future<Output = Result<RespValue>> + Send + 'a>>
where
    R: AsyncBufRead + Unpin + Send,
{
    Box::pin(async move {
        let line = read_line(reader).await?;
        tracing::trace!("read {} byte header line", line.len());

        match line[0] {
            b'-' => Ok(RespValue::Error(Bytes::from(line))),
            b'+' => Ok(RespValue::SimpleString(Bytes::from(line))),
            b':' => Ok(RespValue::Integer(Bytes::from(line))),
            b'$' => {
                let size = integer::parse(&line[1..line.len() - 2])?;
                let mut raw = line;
                if size >= 0 {
                    read_bulk_payload(reader, size as usize, &mut raw).await?;
                }
                Ok(RespValue::Bulk(Bytes::from(raw)))
            }
            b'*' => {
                let count = integer::parse(&line[1..line.len() - 2])?;
                let header = Bytes::from(line);
                if count < 0 {
                    return Ok(RespValue::Array {
                        header,
                        items: None,
                    });
                }
                if depth >= MAX_NESTING {
                    return Err(CodecError::Protocol(format!(
                        "array nesting deeper than {MAX_NESTING}"
                    )));
                }
                // capacity hint only; the declared count is untrusted
                let mut items = Vec::with_capacity((count as usize).min(1024));
                for _ in 0..count {
                    items.push(decode_at(reader, depth + 1).await?);
                }
                Ok(RespValue::Array {
                    header,
                    items: Some(items),
                })
            }
            c if c.is_ascii_alphabetic() => Ok(inline_command(&line)),
            c => Err(CodecError::Protocol(format!(
                "invalid type marker {:?}",
                c as char
            ))),
        }
    })
}

/// Read bytes through the next LF. The unit of framing for every
/// line-oriented RESP field.
async fn read_line<R>(reader: &mut R) -> Result<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line).await?;

    if !line.ends_with(b"\n") {
        return Err(CodecError::TruncatedLine);
    }
    if line.len() < 2 || line[line.len() - 2] != b'\r' {
        return Err(CodecError::Protocol(format!(
            "line not terminated by CRLF: {:?}",
            String::from_utf8_lossy(&line)
        )));
    }

    Ok(line)
}

/// Read `size` payload bytes plus the trailing CRLF, appending both to the
/// header line already in `raw` so the node stays a single allocation.
async fn read_bulk_payload<R>(reader: &mut R, size: usize, raw: &mut Vec<u8>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let start = raw.len();
    raw.resize(start + size, 0);
    reader
        .read_exact(&mut raw[start..])
        .await
        .map_err(|err| match err.kind() {
            io::ErrorKind::UnexpectedEof => CodecError::TruncatedLine,
            _ => CodecError::Io(err),
        })?;

    let terminator = read_line(reader).await?;
    raw.extend_from_slice(&terminator);
    if terminator.len() != 2 {
        return Err(CodecError::Protocol(
            "bulk payload not followed by a bare CRLF".into(),
        ));
    }

    Ok(())
}

/// Normalize a telnet-style command line into the multi-bulk form: tokens
/// split on spaces, empty tokens dropped, each re-encoded as a bulk string.
fn inline_command(line: &[u8]) -> RespValue {
    let text = &line[..line.len() - 2];
    let items: Vec<RespValue> = text
        .split(|&b| b == b' ')
        .filter(|token| !token.is_empty())
        .map(RespValue::bulk)
        .collect();
    RespValue::array(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn decode_all(input: &[u8]) -> Result<RespValue> {
        let mut reader = input;
        decode(&mut reader).await
    }

    #[tokio::test]
    async fn test_decode_simple_string() {
        let value = decode_all(b"+OK\r\n").await.unwrap();
        assert_eq!(value, RespValue::SimpleString(Bytes::from_static(b"+OK\r\n")));
        assert_eq!(&value.payload().unwrap()[..], b"OK");
    }

    #[tokio::test]
    async fn test_decode_error() {
        let value = decode_all(b"-ERR bad\r\n").await.unwrap();
        assert_eq!(&value.payload().unwrap()[..], b"ERR bad");
    }

    #[tokio::test]
    async fn test_decode_integer_keeps_raw_line() {
        let value = decode_all(b":1000\r\n").await.unwrap();
        assert_eq!(value, RespValue::Integer(Bytes::from_static(b":1000\r\n")));
        assert_eq!(integer::parse(&value.payload().unwrap()).unwrap(), 1000);
    }

    #[tokio::test]
    async fn test_decode_bulk_single_buffer() {
        let value = decode_all(b"$6\r\nfoobar\r\n").await.unwrap();
        assert_eq!(value, RespValue::Bulk(Bytes::from_static(b"$6\r\nfoobar\r\n")));
        assert_eq!(&value.payload().unwrap()[..], b"foobar");
    }

    #[tokio::test]
    async fn test_decode_empty_bulk() {
        let value = decode_all(b"$0\r\n\r\n").await.unwrap();
        assert_eq!(&value.payload().unwrap()[..], b"");
    }

    #[tokio::test]
    async fn test_decode_null_bulk_reads_no_payload() {
        // nothing follows the header; a payload read would hit EOF and fail
        let value = decode_all(b"$-1\r\n").await.unwrap();
        assert_eq!(value, RespValue::Bulk(Bytes::from_static(b"$-1\r\n")));
        assert!(value.payload().is_none());
    }

    #[tokio::test]
    async fn test_decode_array() {
        let value = decode_all(b"*2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n").await.unwrap();
        match &value {
            RespValue::Array {
                items: Some(items), ..
            } => {
                assert_eq!(items.len(), 2);
                assert_eq!(&items[0].payload().unwrap()[..], b"foo");
                assert_eq!(&items[1].payload().unwrap()[..], b"bar");
            }
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_decode_nested_array() {
        let value = decode_all(b"*2\r\n*1\r\n:1\r\n*1\r\n:2\r\n").await.unwrap();
        match value {
            RespValue::Array {
                items: Some(items), ..
            } => {
                assert_eq!(items.len(), 2);
                assert!(matches!(&items[0], RespValue::Array { .. }));
            }
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_decode_null_array() {
        let value = decode_all(b"*-1\r\n").await.unwrap();
        assert_eq!(
            value,
            RespValue::Array {
                header: Bytes::from_static(b"*-1\r\n"),
                items: None,
            }
        );
    }

    #[tokio::test]
    async fn test_decode_empty_array() {
        let value = decode_all(b"*0\r\n").await.unwrap();
        match value {
            RespValue::Array {
                items: Some(items), ..
            } => assert!(items.is_empty()),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_inline_command_matches_multibulk_form() {
        let inline = decode_all(b"PING\r\n").await.unwrap();
        let multibulk = decode_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();
        assert_eq!(inline, multibulk);
    }

    #[tokio::test]
    async fn test_inline_command_collapses_whitespace() {
        let value = decode_all(b"SET   foo  bar\r\n").await.unwrap();
        match value {
            RespValue::Array {
                header,
                items: Some(items),
            } => {
                assert_eq!(&header[..], b"*3\r\n");
                assert_eq!(&items[2].payload().unwrap()[..], b"bar");
            }
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_truncated_line() {
        assert!(matches!(
            decode_all(b"+OK").await,
            Err(CodecError::TruncatedLine)
        ));
        assert!(matches!(
            decode_all(b"").await,
            Err(CodecError::TruncatedLine)
        ));
    }

    #[tokio::test]
    async fn test_truncated_bulk_terminator() {
        assert!(matches!(
            decode_all(b"$3\r\nabc\r").await,
            Err(CodecError::TruncatedLine)
        ));
    }

    #[tokio::test]
    async fn test_truncated_bulk_payload() {
        assert!(matches!(
            decode_all(b"$10\r\nabc").await,
            Err(CodecError::TruncatedLine)
        ));
    }

    #[tokio::test]
    async fn test_malformed_bulk_terminator() {
        assert!(matches!(
            decode_all(b"$3\r\nabcXY\r\n").await,
            Err(CodecError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_line_with_bare_lf() {
        assert!(matches!(
            decode_all(b"$3\r\nabcX\n").await,
            Err(CodecError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_type_marker() {
        assert!(matches!(
            decode_all(b"?what\r\n").await,
            Err(CodecError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_bulk_length() {
        assert!(matches!(
            decode_all(b"$3a\r\nabc\r\n").await,
            Err(CodecError::InvalidNumber(_))
        ));
    }

    #[tokio::test]
    async fn test_nesting_limit() {
        let hostile = b"*1\r\n".repeat(MAX_NESTING + 2);
        assert!(matches!(
            decode_all(&hostile).await,
            Err(CodecError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_deep_but_legal_nesting() {
        let mut input = b"*1\r\n".repeat(MAX_NESTING - 1);
        input.extend_from_slice(b":1\r\n");
        assert!(decode_all(&input).await.is_ok());
    }

    #[tokio::test]
    async fn test_sequential_messages_from_one_reader() {
        let mut reader = &b"+OK\r\n:42\r\n"[..];
        let first = decode(&mut reader).await.unwrap();
        let second = decode(&mut reader).await.unwrap();
        assert_eq!(&first.payload().unwrap()[..], b"OK");
        assert_eq!(&second.payload().unwrap()[..], b"42");
    }
}
