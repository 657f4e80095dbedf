//! Index entry model: the fixed 5-field `|`-delimited text record that
//! locates one data record inside a repacked file.

use std::io::Write;

use crate::error::{Error, Result};

/// One `key|frame_start_off|frame_len|line_start_off|line_len` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub key: String,
    pub frame_start_off: u64,
    pub frame_len: u64,
    pub line_start_off: u64,
    pub line_len: u64,
}

impl IndexEntry {
    /// Render as the `\n`-terminated text line stored in the index file.
    pub fn to_line(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}\n",
            self.key, self.frame_start_off, self.frame_len, self.line_start_off, self.line_len
        )
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_all(self.to_line().as_bytes())?;
        Ok(())
    }

    /// Parse one index line (with or without a trailing `\n`).
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() != 5 {
            return Err(Error::MalformedIndex(format!(
                "expected 5 `|`-separated fields, got {}: {line:?}",
                fields.len()
            )));
        }
        let parse_u64 = |s: &str| -> Result<u64> {
            s.parse::<u64>()
                .map_err(|e| Error::MalformedIndex(format!("non-integer offset '{s}': {e}")))
        };
        Ok(IndexEntry {
            key: fields[0].to_string(),
            frame_start_off: parse_u64(fields[1])?,
            frame_len: parse_u64(fields[2])?,
            line_start_off: parse_u64(fields[3])?,
            line_len: parse_u64(fields[4])?,
        })
    }
}
