//! Shared helper for walking `\n`-terminated records inside a decompressed
//! byte buffer while tracking byte offsets.

/// Yield `(start, end, line_bytes)` for each `\n`-terminated record in
/// `data`, where `line_bytes` includes the trailing `\n`. A final
/// non-terminated trailing chunk (if any) is not yielded — callers are only
/// expected to see complete records, per spec.md's record model.
pub fn iter_lines(data: &[u8]) -> impl Iterator<Item = (u64, u64, &[u8])> {
    let mut start = 0usize;
    memchr::memchr_iter(b'\n', data).map(move |end_nl| {
        let end = end_nl + 1;
        let line = &data[start..end];
        let span = (start as u64, end as u64, line);
        start = end;
        span
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_tracks_offsets() {
        let data = b"one\ntwo\nthree\n";
        let lines: Vec<_> = iter_lines(data).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], (0, 4, &b"one\n"[..]));
        assert_eq!(lines[1], (4, 8, &b"two\n"[..]));
        assert_eq!(lines[2], (8, 14, &b"three\n"[..]));
    }

    #[test]
    fn ignores_unterminated_trailing_chunk() {
        let data = b"one\ntwo";
        let lines: Vec<_> = iter_lines(data).collect();
        assert_eq!(lines.len(), 1);
    }
}
