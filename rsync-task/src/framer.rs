//! Line framing for child process output
//!
//! rsync redraws its progress line with a bare carriage return, so stdout has to be
//! split on `\r` as well as `\n`. The codec here plugs into [`FramedRead`] and yields
//! one `String` per line, decoding invalid UTF-8 lossily so a stray byte never ends
//! the stream.

use bytes::BytesMut;
use tokio::io::AsyncRead;
use tokio_util::codec::{Decoder, FramedRead};

/// Which bytes end a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Terminators {
    /// `\n`, `\r\n` and bare `\r`
    #[default]
    Any,
    /// `\n` only; a `\r` is kept as part of the line
    NewlineOnly,
}

/// Splits a byte stream into lines without the terminators
#[derive(Debug, Clone, Copy, Default)]
pub struct LineCodec {
    terminators: Terminators,
}

impl LineCodec {
    /// Codec accepting `\n`, `\r\n` and `\r`
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec splitting on `\n` only
    pub fn newline_only() -> Self {
        Self {
            terminators: Terminators::NewlineOnly,
        }
    }

    /// Frame a reader into a stream of lines
    pub fn frame<R: AsyncRead>(self, reader: R) -> FramedRead<R, Self> {
        FramedRead::new(reader, self)
    }

    fn next_line(&self, buf: &mut BytesMut, at_eof: bool) -> Option<String> {
        let scan = match self.terminators {
            Terminators::Any => scan_line(buf, at_eof),
            Terminators::NewlineOnly => scan_newline(buf, at_eof),
        };
        scan.map(|(advance, len)| {
            let chunk = buf.split_to(advance);
            String::from_utf8_lossy(&chunk[..len]).into_owned()
        })
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        Ok(self.next_line(buf, false))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        Ok(self.next_line(buf, true))
    }
}

/// Locate the next line in `data`.
///
/// Returns `(advance, len)`: the number of bytes to consume and the length of the
/// line within them. `None` means more data is needed, or at end of stream that
/// nothing is left. A trailing bare `\r` is held back until the next byte shows
/// whether it starts a `\r\n` pair.
pub fn scan_line(data: &[u8], at_eof: bool) -> Option<(usize, usize)> {
    if at_eof && data.is_empty() {
        return None;
    }

    if let Some(i) = data.iter().position(|&b| b == b'\n' || b == b'\r') {
        if data[i] == b'\n' {
            return Some((i + 1, i));
        }
        return match data.get(i + 1) {
            Some(b'\n') => Some((i + 2, i)),
            Some(_) => Some((i + 1, i)),
            None if at_eof => Some((i + 1, i)),
            None => None,
        };
    }

    if at_eof {
        return Some((data.len(), data.len()));
    }
    None
}

fn scan_newline(data: &[u8], at_eof: bool) -> Option<(usize, usize)> {
    if at_eof && data.is_empty() {
        return None;
    }
    match data.iter().position(|&b| b == b'\n') {
        Some(i) => Some((i + 1, i)),
        None if at_eof => Some((data.len(), data.len())),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use test_case::test_case;

    async fn collect(codec: LineCodec, input: &'static [u8]) -> Vec<String> {
        codec
            .frame(input)
            .map(|line| line.unwrap())
            .collect()
            .await
    }

    #[test_case(b"a\nb\n", &["a", "b"] ; "newline")]
    #[test_case(b"a\r\nb\r\n", &["a", "b"] ; "crlf")]
    #[test_case(b"a\rb\r", &["a", "b"] ; "bare carriage return")]
    #[test_case(b"a\rb\r\nc\n", &["a", "b", "c"] ; "mixed")]
    #[test_case(b"a\nb", &["a", "b"] ; "unterminated tail")]
    #[test_case(b"\n\n", &["", ""] ; "empty lines")]
    #[test_case(b"", &[] ; "empty stream")]
    #[tokio::test]
    async fn test_frames_any_terminator(input: &'static [u8], expected: &[&str]) {
        assert_eq!(collect(LineCodec::new(), input).await, expected);
    }

    #[test_case(b"a\r\nb\n", &["a\r", "b"] ; "carriage return kept")]
    #[test_case(b"a\rb", &["a\rb"] ; "no newline")]
    #[test_case(b"x\ny", &["x", "y"] ; "unterminated tail")]
    #[tokio::test]
    async fn test_frames_newline_only(input: &'static [u8], expected: &[&str]) {
        assert_eq!(collect(LineCodec::newline_only(), input).await, expected);
    }

    #[test]
    fn test_trailing_carriage_return_waits_for_more_data() {
        assert_eq!(scan_line(b"abc\r", false), None);
        assert_eq!(scan_line(b"abc\r", true), Some((4, 3)));
        assert_eq!(scan_line(b"abc\r\n", false), Some((5, 3)));
        assert_eq!(scan_line(b"abc\rd", false), Some((4, 3)));
    }

    #[test]
    fn test_no_terminator_needs_more_data() {
        assert_eq!(scan_line(b"partial", false), None);
        assert_eq!(scan_line(b"partial", true), Some((7, 7)));
        assert_eq!(scan_line(b"", true), None);
    }

    #[tokio::test]
    async fn test_crlf_split_across_reads() {
        let reader = tokio_test::io::Builder::new()
            .read(b"  10%\r")
            .read(b"\n 20%\r")
            .read(b" 30%\n")
            .build();

        let lines: Vec<String> = LineCodec::new()
            .frame(reader)
            .map(|line| line.unwrap())
            .collect()
            .await;

        assert_eq!(lines, vec!["  10%", " 20%", " 30%"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let lines = collect(LineCodec::new(), b"ok\n\xffbad\n").await;
        assert_eq!(lines, vec!["ok".to_string(), "\u{fffd}bad".to_string()]);
    }
}
