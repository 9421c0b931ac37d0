use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::core::{Error, MAX_FRAME_SIZE};
use super::message::Command;

/// Newline-delimited text frame codec
///
/// Decodes raw text frames without parsing them, so a frame that fails to
/// parse still counts as proof of life. Invalid UTF-8 is replaced rather than
/// rejected, and a frame longer than the limit is cut to the limit with the
/// rest skipped up to the next delimiter. Neither ends the stream. Encodes
/// commands as one JSON object per line.
#[derive(Clone, Debug)]
pub struct MessageCodec {
    /// Largest accepted frame, excluding the delimiter
    max_frame: usize,
    /// Bytes already scanned for a delimiter
    scanned: usize,
    /// Head of an oversized frame whose remainder is being skipped
    oversized: Option<String>,
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageCodec {
    /// Creates a codec with the default frame limit
    pub fn new() -> Self {
        Self::with_max_frame(MAX_FRAME_SIZE)
    }

    /// Creates a codec with a custom frame limit
    pub fn with_max_frame(max_frame: usize) -> Self {
        MessageCodec {
            max_frame,
            scanned: 0,
            oversized: None,
        }
    }

    fn take_frame(&mut self, src: &mut BytesMut, end: usize, skip: usize) -> String {
        let mut line = src.split_to(end);
        src.advance(skip);
        self.scanned = 0;

        if line.len() > self.max_frame {
            warn!(len = line.len(), limit = self.max_frame, "truncating oversized frame");
            line.truncate(self.max_frame);
        }

        let mut text = String::from_utf8_lossy(&line).into_owned();
        if text.ends_with('\r') {
            text.pop();
        }
        text
    }
}

impl Decoder for MessageCodec {
    type Item = String;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let newline = src[self.scanned..].iter().position(|b| *b == b'\n');

            if self.oversized.is_some() {
                match newline {
                    Some(offset) => {
                        src.advance(self.scanned + offset + 1);
                        self.scanned = 0;
                        return Ok(self.oversized.take());
                    }
                    None => {
                        src.clear();
                        self.scanned = 0;
                        return Ok(None);
                    }
                }
            }

            match newline {
                Some(offset) => {
                    let end = self.scanned + offset;
                    let frame = self.take_frame(src, end, 1);
                    if frame.trim().is_empty() {
                        continue;
                    }
                    return Ok(Some(frame));
                }
                None if src.len() > self.max_frame => {
                    let head = self.take_frame(src, self.max_frame, 0);
                    warn!(limit = self.max_frame, "skipping rest of oversized frame");
                    src.clear();
                    self.oversized = Some(head);
                    return Ok(None);
                }
                None => {
                    self.scanned = src.len();
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if let Some(head) = self.oversized.take() {
            src.clear();
            return Ok(Some(head));
        }
        if src.is_empty() {
            return Ok(None);
        }
        let end = src.len();
        let frame = self.take_frame(src, end, 0);
        Ok(if frame.trim().is_empty() { None } else { Some(frame) })
    }
}

impl Encoder<Command> for MessageCodec {
    type Error = Error;

    fn encode(&mut self, item: Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let text = item.to_json()?;
        dst.reserve(text.len() + 1);
        dst.extend_from_slice(text.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}
