/// Read and write implementations for terminator framed messages
use std::io::{self, BufRead, Write};

use crate::{error::ReadError, protocol::TERMINATOR};

/// Writes a command followed by the terminator byte.
pub fn write_command(writer: &mut impl Write, command: &str) -> io::Result<()> {
    let mut frame = Vec::with_capacity(command.len() + 1);
    frame.extend_from_slice(command.as_bytes());
    frame.push(TERMINATOR);
    writer.write_all(&frame)
}

/// Reads the next message and strips its terminator.
/// Invalid UTF-8 is replaced rather than rejected, so one bad message does not end the stream.
///
/// Returns `Ok(None)` when the stream is closed between two messages.
pub fn read_message(reader: &mut impl BufRead) -> Result<Option<String>, ReadError> {
    let mut frame = Vec::with_capacity(64);
    let n = reader.read_until(TERMINATOR, &mut frame)?;
    if n == 0 {
        return Ok(None);
    }
    if frame.last() != Some(&TERMINATOR) {
        return Err(ReadError::UnexpectedEof {
            pending: frame.len(),
        });
    }
    frame.pop();
    Ok(Some(String::from_utf8_lossy(&frame).into_owned()))
}

#[cfg(feature = "tokio")]
pub use tokio_codec::MessageCodec;

#[cfg(feature = "tokio")]
mod tokio_codec {
    use std::io;

    use bytes::{BufMut, BytesMut};
    use tokio_util::codec::{Decoder, Encoder};

    use crate::{error::ReadError, protocol::TERMINATOR};

    /// Splits a byte stream into terminator delimited messages and frames outgoing commands.
    #[derive(Debug, Default, Clone)]
    pub struct MessageCodec {
        // Bytes before this offset are known not to contain a terminator.
        next_index: usize,
    }

    impl MessageCodec {
        pub fn new() -> MessageCodec {
            MessageCodec::default()
        }
    }

    impl Decoder for MessageCodec {
        type Item = String;
        type Error = ReadError;

        fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, ReadError> {
            let Some(offset) = src[self.next_index..]
                .iter()
                .position(|b| *b == TERMINATOR)
            else {
                self.next_index = src.len();
                return Ok(None);
            };
            let end = self.next_index + offset;
            self.next_index = 0;
            let mut frame = src.split_to(end + 1);
            frame.truncate(end);
            Ok(Some(String::from_utf8_lossy(&frame).into_owned()))
        }

        fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, ReadError> {
            match self.decode(src)? {
                Some(message) => Ok(Some(message)),
                None if src.is_empty() => Ok(None),
                None => {
                    let pending = src.len();
                    src.clear();
                    self.next_index = 0;
                    Err(ReadError::UnexpectedEof { pending })
                }
            }
        }
    }

    impl<T: AsRef<str>> Encoder<T> for MessageCodec {
        type Error = io::Error;

        fn encode(&mut self, item: T, dst: &mut BytesMut) -> io::Result<()> {
            let command = item.as_ref().as_bytes();
            dst.reserve(command.len() + 1);
            dst.put_slice(command);
            dst.put_u8(TERMINATOR);
            Ok(())
        }
    }

}
