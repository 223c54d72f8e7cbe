//! ## callcap-esl::codec
//! Event socket framing.
//!
//! A frame is a block of `Name: value` lines closed by an empty line,
//! followed by `Content-Length` bytes of body when that header is present.
//! Plain-text events carry a second, URL-encoded header block as their body.

use bytes::{Bytes, BytesMut};
use percent_encoding::percent_decode_str;
use tracing::trace;

use callcap_core::events::SignalEvent;

use crate::EslError;

/// Upper bound on a buffered header block without its terminator.
const MAX_HEADER_BLOCK: usize = 64 * 1024;

/// Upper bound on a declared body.
const MAX_BODY: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    headers: Vec<(String, String)>,
    body: Option<Bytes>,
}

impl Frame {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    pub fn reply_text(&self) -> Option<&str> {
        self.header("Reply-Text")
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }
}

fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

fn parse_header_lines(block: &str) -> Vec<(String, String)> {
    block
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .filter_map(|line| match line.split_once(':') {
            Some((k, v)) => Some((k.trim().to_string(), v.trim().to_string())),
            None => {
                trace!("Skipping header line without separator: {:?}", line);
                None
            }
        })
        .collect()
}

/// Takes one complete frame off the front of `buf`.
///
/// Returns `Ok(None)` and leaves `buf` untouched until a whole frame,
/// body included, has been buffered.
pub fn decode_frame(buf: &mut BytesMut) -> Result<Option<Frame>, EslError> {
    // Stray newlines between frames.
    while buf.first() == Some(&b'\n') {
        let _ = buf.split_to(1);
    }

    let Some(end) = find_terminator(&buf[..]) else {
        if buf.len() > MAX_HEADER_BLOCK {
            return Err(EslError::Malformed("header block too large".into()));
        }
        return Ok(None);
    };

    let block = std::str::from_utf8(&buf[..end])
        .map_err(|e| EslError::Malformed(format!("header block is not UTF-8: {e}")))?;
    let headers = parse_header_lines(block);

    let body_len = match headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("Content-Length"))
    {
        Some((_, v)) => {
            let len = v
                .parse::<usize>()
                .map_err(|_| EslError::Malformed(format!("bad Content-Length {v:?}")))?;
            if len > MAX_BODY {
                return Err(EslError::Malformed(format!("body of {len} bytes too large")));
            }
            Some(len)
        }
        None => None,
    };

    let head_len = end + 2;
    if buf.len() < head_len + body_len.unwrap_or(0) {
        return Ok(None);
    }

    let _ = buf.split_to(head_len);
    let body = body_len.map(|len| buf.split_to(len).freeze());
    Ok(Some(Frame { headers, body }))
}

/// Parses a `text/event-plain` body into an event.
pub fn parse_event_plain(body: &[u8]) -> Result<SignalEvent, EslError> {
    let text = std::str::from_utf8(body)
        .map_err(|e| EslError::Malformed(format!("event is not UTF-8: {e}")))?;

    // Anything after the first empty line is the event's own body.
    let block = match text.find("\n\n") {
        Some(end) => &text[..end],
        None => text,
    };

    let event: SignalEvent = parse_header_lines(block)
        .into_iter()
        .map(|(k, v)| {
            let value = percent_decode_str(&v).decode_utf8_lossy().into_owned();
            (k, value)
        })
        .collect();

    if event.is_empty() {
        return Err(EslError::Malformed("event without headers".into()));
    }
    Ok(event)
}
