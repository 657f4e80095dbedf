//! Run configuration.
//!
//! Every tunable that the original reference implementation kept as a
//! process-wide global (CSV field-size limit, default column/delimiter/field,
//! chunk size, binary-search buffer threshold) is plumbed through this struct
//! instead, and passed explicitly to the indexer, repacker and search entry
//! points.

pub const DEFAULT_CSV_COLUMN: usize = 0;
pub const DEFAULT_CSV_DELIMITER: u8 = b'|';
pub const DEFAULT_JSON_FIELD: &str = "domain";
pub const DEFAULT_CHUNK_SIZE: usize = 5000;
/// Minimum number of bytes the frame detector reads before it is willing to
/// split on a newly found header; keeps adjacent frames from being joined if
/// a magic happens to fall very close to the start of the buffer.
pub const DEFAULT_FRAME_READ_BUFFER: usize = 100_000;
/// Binary-search in-memory buffering threshold, in kibibytes.
pub const DEFAULT_SEARCH_BUFFER_KIB: u64 = 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub csv_column: usize,
    pub csv_delimiter: u8,
    pub json_field: String,
    pub chunk_size: usize,
    pub frame_read_buffer: usize,
    pub search_buffer_kib: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            csv_column: DEFAULT_CSV_COLUMN,
            csv_delimiter: DEFAULT_CSV_DELIMITER,
            json_field: DEFAULT_JSON_FIELD.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            frame_read_buffer: DEFAULT_FRAME_READ_BUFFER,
            search_buffer_kib: DEFAULT_SEARCH_BUFFER_KIB,
        }
    }
}
