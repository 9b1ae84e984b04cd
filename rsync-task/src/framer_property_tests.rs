//! Property tests for line framing using proptest

use bytes::BytesMut;
use proptest::prelude::*;
use tokio_util::codec::Decoder;

use crate::framer::LineCodec;

/// Strategy for non-empty line content without terminators.
///
/// Empty lines are left out: `a\r` followed by an empty `\n` line is the same
/// byte sequence as `a\r\n`.
pub fn line_content() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 %./:,-]{1,40}"
}

/// Strategy for a line terminator
pub fn terminator() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("\n"), Just("\r\n"), Just("\r")]
}

/// Feed `input` to the codec in chunks of `chunk` bytes, then signal end of stream
fn frame_in_chunks(input: &[u8], chunk: usize) -> Vec<String> {
    let mut codec = LineCodec::new();
    let mut buf = BytesMut::new();
    let mut lines = Vec::new();

    for piece in input.chunks(chunk.max(1)) {
        buf.extend_from_slice(piece);
        while let Some(line) = codec.decode(&mut buf).unwrap() {
            lines.push(line);
        }
    }
    while let Some(line) = codec.decode_eof(&mut buf).unwrap() {
        lines.push(line);
    }
    lines
}

proptest! {
    #[test]
    fn test_terminated_lines_frame_exactly(
        lines in prop::collection::vec((line_content(), terminator()), 0..20),
        chunk in 1usize..16,
    ) {
        let input: String = lines.iter().map(|(line, end)| format!("{line}{end}")).collect();

        let framed = frame_in_chunks(input.as_bytes(), chunk);

        let expected: Vec<String> = lines.into_iter().map(|(line, _)| line).collect();
        prop_assert_eq!(framed, expected);
    }

    #[test]
    fn test_unterminated_tail_is_an_extra_line(
        lines in prop::collection::vec((line_content(), terminator()), 0..10),
        tail in "[a-z0-9%]{1,20}",
        chunk in 1usize..16,
    ) {
        let mut input: String = lines.iter().map(|(line, end)| format!("{line}{end}")).collect();
        input.push_str(&tail);

        let framed = frame_in_chunks(input.as_bytes(), chunk);

        prop_assert_eq!(framed.len(), lines.len() + 1);
        prop_assert_eq!(framed.last(), Some(&tail));
    }

    #[test]
    fn test_framed_lines_never_contain_terminators(input in prop::collection::vec(any::<u8>(), 0..256)) {
        for line in frame_in_chunks(&input, 7) {
            prop_assert!(!line.contains('\n') && !line.contains('\r'));
        }
    }
}
