use std::{cmp, io};

use bytes::{Buf, Bytes, BytesMut};

use crate::coding::{Decode, DecodeError};

use super::SessionError;

/// Decodes types off a receive stream, buffering partial reads.
///
/// Each attempt decodes from a cursor over the buffered bytes; only when a
/// decode succeeds is the consumed prefix committed, so a half-received
/// message costs nothing but another read.
pub struct Reader {
    stream: web_transport::RecvStream,
    buffer: BytesMut,
}

impl Reader {
    pub fn new(stream: web_transport::RecvStream) -> Self {
        Self {
            stream,
            buffer: Default::default(),
        }
    }

    pub async fn decode<T: Decode>(&mut self) -> Result<T, SessionError> {
        loop {
            let mut cursor = io::Cursor::new(&self.buffer);

            // Try to decode with the current buffer.
            let required = match T::decode(&mut cursor) {
                Ok(msg) => {
                    let consumed = cursor.position() as usize;
                    self.buffer.advance(consumed);
                    log::trace!(
                        "decoded {} ({} bytes)",
                        std::any::type_name::<T>(),
                        consumed
                    );
                    return Ok(msg);
                }
                Err(DecodeError::More(required)) => self.buffer.len() + required,
                Err(err) => return Err(err.into()),
            };

            // Read in more data until we reach the requested amount.
            // We always read at least once to avoid an infinite loop if some dingus puts remain=0
            loop {
                if !self.stream.read_buf(&mut self.buffer).await? {
                    return Err(DecodeError::More(required - self.buffer.len()).into());
                };

                if self.buffer.len() >= required {
                    break;
                }
            }
        }
    }

    /// Read up to `max` raw bytes.
    pub async fn read_chunk(&mut self, max: usize) -> Result<Option<Bytes>, SessionError> {
        if !self.buffer.is_empty() {
            let size = cmp::min(max, self.buffer.len());
            let data = self.buffer.split_to(size).freeze();
            return Ok(Some(data));
        }

        Ok(self.stream.read_chunk(max).await?)
    }

    /// True once the stream has finished and the buffer is drained.
    pub async fn done(&mut self) -> Result<bool, SessionError> {
        if !self.buffer.is_empty() {
            return Ok(false);
        }

        Ok(!self.stream.read_buf(&mut self.buffer).await?)
    }
}
