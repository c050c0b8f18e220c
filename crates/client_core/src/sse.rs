//! Minimal incremental decoder for `text/event-stream` bodies.
//!
//! The progress endpoint only ever populates the `data` field, so the
//! decoder collects `data` lines per event and skips `event`/`id`/`retry`
//! fields and comment lines. Events may arrive split across arbitrary chunk
//! boundaries; callers feed raw chunks and receive complete payloads.

#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of the response body; returns the `data` payloads of
    /// every event completed by this chunk, in arrival order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some((frame_end, delim_len)) = find_event_boundary(&self.buf) {
            let frame: Vec<u8> = self.buf.drain(..frame_end + delim_len).collect();
            let text = String::from_utf8_lossy(&frame[..frame_end]);
            if let Some(data) = event_data(&text) {
                payloads.push(data);
            }
        }
        payloads
    }
}

/// Locate the first blank-line event separator. Returns the frame length and
/// the separator length.
fn find_event_boundary(buf: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i < buf.len() {
        if buf[i..].starts_with(b"\r\n\r\n") {
            return Some((i, 4));
        }
        if buf[i..].starts_with(b"\n\n") {
            return Some((i, 2));
        }
        i += 1;
    }
    None
}

fn event_data(frame: &str) -> Option<String> {
    let mut data_lines: Vec<&str> = Vec::new();
    for line in frame.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_single_event() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(b"data: {\"progress\": 1}\n\n");
        assert_eq!(payloads, vec!["{\"progress\": 1}".to_string()]);
    }

    #[test]
    fn reassembles_events_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: {\"progre").is_empty());
        assert!(decoder.feed(b"ss\": 2}").is_empty());
        let payloads = decoder.feed(b"\n\ndata: {\"progress\": 3}\n\n");
        assert_eq!(
            payloads,
            vec![
                "{\"progress\": 2}".to_string(),
                "{\"progress\": 3}".to_string(),
            ]
        );
    }

    #[test]
    fn handles_crlf_line_endings() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(b"data: one\r\n\r\ndata: two\r\n\r\n");
        assert_eq!(payloads, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn skips_comments_and_non_data_fields() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b": keep-alive\n\n").is_empty());
        let payloads = decoder.feed(b"event: progress\nid: 7\ndata: payload\n\n");
        assert_eq!(payloads, vec!["payload".to_string()]);
    }

    #[test]
    fn joins_multi_line_data_fields() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(b"data: first\ndata: second\n\n");
        assert_eq!(payloads, vec!["first\nsecond".to_string()]);
    }
}
