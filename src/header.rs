//! Heuristic sanity checks on a candidate gzip/zstd header.
//!
//! The frame boundary detector (`frames`) can find the magic bytes by chance
//! inside a compressed payload; these checks reject most such false
//! positives. They are heuristics, not proofs — see spec.md §4.2.

/// 2010-01-01T00:00:00Z, the oldest Unix timestamp considered plausible for a
/// gzip mtime field.
pub const OLDEST_UNIX_TIMESTAMP: i64 = 1_262_307_600;

/// Operating-system ids considered plausible in a gzip header's OS byte.
const POSSIBLE_OS_TYPES: [u8; 4] = [0x00, 0x03, 0x07, 0xFF];

/// Validate a 10-byte gzip header candidate (bytes 0..10 of the member,
/// i.e. starting at the `1f 8b 08` magic).
///
/// `now` is the current Unix timestamp, threaded in by the caller so this
/// function stays pure and is trivial to test against fixed clocks.
pub fn is_valid_gzip_header(header: &[u8], now: i64) -> bool {
    if header.len() < crate::compress::GZIP_HEADER_LEN {
        return false;
    }

    let mtime = i32::from_le_bytes([header[4], header[5], header[6], header[7]]) as i64;
    if mtime < OLDEST_UNIX_TIMESTAMP || mtime > now {
        return false;
    }

    POSSIBLE_OS_TYPES.contains(&header[9])
}

/// Validate a zstd frame header descriptor (the single byte at offset 4 of
/// the candidate, i.e. the byte right after the 4-byte magic).
///
/// Per §4.2: bits 3..4 (Reserved + Unused) must be `00`, and bit 5
/// (Single_Segment_flag) must be `1`. Frames produced by this crate's own
/// writer always set Single_Segment_flag, so this also doubles as "did we
/// write this frame".
pub fn is_valid_zstd_header(frame_header_descriptor: u8) -> bool {
    let reserved_and_unused = (frame_header_descriptor >> 3) & 0b11;
    let single_segment_bit = (frame_header_descriptor >> 5) & 0x1;
    reserved_and_unused == 0 && single_segment_bit == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gzip_header(mtime: i32, os: u8) -> Vec<u8> {
        let mut h = vec![0x1f, 0x8b, 0x08, 0x00];
        h.extend_from_slice(&mtime.to_le_bytes());
        h.push(0x00); // XFL
        h.push(os);
        h
    }

    #[test]
    fn rejects_too_old_timestamp() {
        let h = gzip_header(0, 0x03);
        assert!(!is_valid_gzip_header(&h, 2_000_000_000));
    }

    #[test]
    fn rejects_future_timestamp() {
        let h = gzip_header(2_000_000_000, 0x03);
        assert!(!is_valid_gzip_header(&h, 1_700_000_000));
    }

    #[test]
    fn rejects_unknown_os() {
        let h = gzip_header(1_700_000_000, 0x42);
        assert!(!is_valid_gzip_header(&h, 1_700_000_000));
    }

    #[test]
    fn accepts_plausible_header() {
        let h = gzip_header(1_700_000_000, 0xFF);
        assert!(is_valid_gzip_header(&h, 1_700_000_000));
    }

    #[test]
    fn rejects_short_header() {
        assert!(!is_valid_gzip_header(&[0x1f, 0x8b, 0x08], 1_700_000_000));
    }

    #[test]
    fn zstd_header_single_segment_required() {
        assert!(!is_valid_zstd_header(0b0000_0000));
        assert!(is_valid_zstd_header(0b0010_0000));
    }

    #[test]
    fn zstd_header_reserved_bit_rejected() {
        assert!(!is_valid_zstd_header(0b0010_1000));
    }
}
