// Length-delimited JSON framing over TCP.
//
// Wire format: a 4-byte big-endian length prefix followed by a serde_json
// payload. `write_frame`/`read_frame` move raw bytes; `send`/`recv` wrap them
// with JSON (de)serialization for any serde type, so the server and client
// share one codec.
//
// `MAX_FRAME_SIZE` (64 KiB) bounds allocation from a bad length prefix. The
// largest real frame is a `GameEvent` carrying one hand, well under 1 KiB.
//
// `FrameError::is_unavailable` classifies I/O failures that mean "the peer is
// gone" (reset, broken pipe, EOF). The server's push pump uses it to tell a
// disconnect apart from other transport failures.

use std::io::{self, Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

pub const MAX_FRAME_SIZE: u32 = 64 * 1024;

/// Failure reading or writing a framed message.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame too large: {len} bytes (max {MAX_FRAME_SIZE})")]
    TooLarge { len: usize },
}

impl FrameError {
    /// True when the error means the other end has hung up.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::NotConnected
                    | io::ErrorKind::UnexpectedEof
            ),
            Self::Json(_) | Self::TooLarge { .. } => false,
        }
    }
}

/// Write one frame: 4-byte big-endian length, then payload, then flush.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError> {
    let len = payload.len();
    let prefix = match u32::try_from(len) {
        Ok(n) if n <= MAX_FRAME_SIZE => n,
        _ => return Err(FrameError::TooLarge { len }),
    };
    writer.write_all(&prefix.to_be_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame. A clean close before the prefix surfaces as
/// `UnexpectedEof`.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>, FrameError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge { len: len as usize });
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Serialize `msg` as JSON and write it as one frame.
pub fn send<W: Write, T: Serialize>(writer: &mut W, msg: &T) -> Result<(), FrameError> {
    let json = serde_json::to_vec(msg)?;
    write_frame(writer, &json)
}

/// Read one frame and deserialize it as `T`.
pub fn recv<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T, FrameError> {
    let bytes = read_frame(reader)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::message::{ClientMessage, ServerMessage};
    use crate::types::{ActionKind, ClientAction};

    #[test]
    fn messages_in_sequence() {
        let mut wire = Vec::new();
        send(
            &mut wire,
            &ClientMessage::Subscribe {
                username: "alice".into(),
            },
        )
        .unwrap();
        send(
            &mut wire,
            &ClientMessage::PerformAction {
                action: ClientAction::new("alice", ActionKind::Stand),
            },
        )
        .unwrap();

        let mut cursor = Cursor::new(wire);
        let first: ClientMessage = recv(&mut cursor).unwrap();
        let second: ClientMessage = recv(&mut cursor).unwrap();
        assert!(matches!(
            first,
            ClientMessage::Subscribe { username } if username == "alice"
        ));
        assert!(matches!(
            second,
            ClientMessage::PerformAction { action } if action.kind == ActionKind::Stand
        ));
    }

    #[test]
    fn rejects_oversized_write() {
        let big = vec![0u8; MAX_FRAME_SIZE as usize + 1];
        let err = write_frame(&mut Vec::new(), &big).unwrap_err();
        assert!(matches!(err, FrameError::TooLarge { .. }));
    }

    #[test]
    fn rejects_oversized_read() {
        let mut cursor = Cursor::new((MAX_FRAME_SIZE + 1).to_be_bytes().to_vec());
        let err = read_frame(&mut cursor).unwrap_err();
        assert!(matches!(err, FrameError::TooLarge { .. }));
    }

    #[test]
    fn truncated_prefix_is_unavailable() {
        let mut cursor = Cursor::new(vec![0u8, 1]);
        let err = read_frame(&mut cursor).unwrap_err();
        assert!(err.is_unavailable(), "EOF mid-prefix means the peer left: {err}");
    }

    #[test]
    fn garbage_payload_is_not_unavailable() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"not json").unwrap();
        let err = recv::<_, ServerMessage>(&mut Cursor::new(wire)).unwrap_err();
        assert!(matches!(err, FrameError::Json(_)));
        assert!(!err.is_unavailable());
    }
}
