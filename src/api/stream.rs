use crate::error::EventParseError;
use crate::types::StreamEvent;
use bytes::BytesMut;
use serde_json::Value;

const DATA_PREFIX: &str = "data:";

/// Splits a chunked `data:` stream into event payloads.
///
/// Bytes are decoded incrementally: a multi-byte character split across two
/// chunks is held in `pending` until the rest of it arrives. Decoded text is
/// kept in `carry` until a newline completes the line.
#[derive(Default)]
pub struct FrameDecoder {
    pending: BytesMut,
    carry: String,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns the payloads of every line it completed,
    /// in stream order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.decode_utf8(chunk);
        self.carry.push_str(&text);

        let Some(last_newline) = self.carry.rfind('\n') else {
            return Vec::new();
        };
        let complete: String = self.carry.drain(..=last_newline).collect();

        complete
            .lines()
            .filter_map(frame_payload)
            .map(ToOwned::to_owned)
            .collect()
    }

    /// The trailing partial line not yet terminated by a newline.
    pub fn carry(&self) -> &str {
        &self.carry
    }

    /// Ends the stream. Whatever is still buffered is an incomplete frame and
    /// is returned for diagnostics only; it is never parsed.
    pub fn finish(mut self) -> String {
        let mut tail = std::mem::take(&mut self.carry);
        if !self.pending.is_empty() {
            tail.push_str(&String::from_utf8_lossy(&self.pending));
        }
        tail
    }

    fn decode_utf8(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::new();

        loop {
            let error = match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    None
                }
                Err(error) => Some(error),
            };
            let Some(error) = error else {
                self.pending.clear();
                break;
            };

            let valid = self.pending.split_to(error.valid_up_to());
            out.push_str(&String::from_utf8_lossy(&valid));

            match error.error_len() {
                Some(invalid_len) => {
                    let _ = self.pending.split_to(invalid_len);
                    out.push(char::REPLACEMENT_CHARACTER);
                }
                // Incomplete sequence at the end of the chunk; wait for more bytes.
                None => break,
            }
        }

        out
    }
}

fn frame_payload(line: &str) -> Option<&str> {
    let clean = line.trim();
    if clean.is_empty() {
        return None;
    }
    clean.strip_prefix(DATA_PREFIX).map(str::trim_start)
}

/// Parses one payload. Valid JSON without a `type` field is not an event the
/// client knows and decodes to [`StreamEvent::Unknown`].
pub fn decode_event(payload: &str) -> Result<StreamEvent, EventParseError> {
    let parse_error = |source: serde_json::Error| EventParseError {
        payload: payload.to_string(),
        source,
    };

    let value: Value = serde_json::from_str(payload).map_err(parse_error)?;
    if value.get("type").is_none() {
        return Ok(StreamEvent::Unknown);
    }
    serde_json::from_value(value).map_err(parse_error)
}
