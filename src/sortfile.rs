//! External sorter driver: sorts an index file in place via the system
//! `sort` utility, C-locale byte-lex order on the first `|`-field.
//!
//! Grounded on `original_source/gzipi/lib.py::sort_file` (the fuller,
//! unfiltered reference implementation this spec was distilled from pipes
//! `sort` the same way; see spec.md §4.9).

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use crate::compress::{self, CompressionKind, Writer};
use crate::error::{Error, Result};

/// Sort the index file at `path` ascending by key, byte-lexicographic,
/// in place. If `path` ends in `.gz`, the file is decompressed before
/// sorting and the sorted result is recompressed before replacing it.
///
/// On success the original is atomically replaced; on failure the
/// original is left untouched and the sort's temp file remains on disk
/// (a logged artifact — see spec.md §9's open question on cleanup).
pub fn sort_index_file<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    let is_gz = path.extension().and_then(|e| e.to_str()) == Some("gz");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = tempfile::Builder::new()
        .prefix(".gzipi-sort-")
        .tempfile_in(dir)
        .map_err(Error::Io)?;
    let tmp_path = tmp.path().to_path_buf();

    let mut input = File::open(path)?;
    let plain: Box<dyn Read> = if is_gz {
        Box::new(compress::open_reader(&mut input, CompressionKind::Gzip))
    } else {
        Box::new(input)
    };

    let sorted_text = run_sort(plain)?;

    {
        let mut out = BufWriter::new(File::create(&tmp_path)?);
        if is_gz {
            let mut w = Writer::new(&mut out, CompressionKind::Gzip)?;
            w.write_all(&sorted_text)?;
            w.finish()?;
        } else {
            out.write_all(&sorted_text)?;
        }
        out.flush()?;
    }

    std::fs::rename(&tmp_path, path)?;
    // `tmp`'s Drop tries to unlink `tmp_path`, which the rename already
    // moved away; tempfile ignores that failure.
    drop(tmp);
    Ok(())
}

fn run_sort<R: Read>(mut input: R) -> Result<Vec<u8>> {
    let parallelism = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);

    let mut child = Command::new("sort")
        .arg("-t")
        .arg("|")
        .arg("-k1,1")
        .arg(format!("--parallel={parallelism}"))
        .arg("--buffer-size=1G")
        .env("LC_ALL", "C")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(Error::Io)?;

    let mut input_bytes = Vec::new();
    input.read_to_end(&mut input_bytes)?;

    let mut stdin = child.stdin.take().expect("piped stdin");
    let writer = std::thread::spawn(move || -> std::io::Result<()> {
        stdin.write_all(&input_bytes)?;
        Ok(())
    });

    let mut stdout = child.stdout.take().expect("piped stdout");
    let mut sorted = Vec::new();
    stdout.read_to_end(&mut sorted)?;

    writer.join().map_err(|_| Error::Decode("sort input writer thread panicked".to_string()))??;
    let status = child.wait()?;
    if !status.success() {
        let mut stderr = String::new();
        if let Some(mut e) = child.stderr.take() {
            let _ = e.read_to_string(&mut stderr);
        }
        return Err(Error::Decode(format!("external sort failed: {stderr}")));
    }

    Ok(sorted)
}
