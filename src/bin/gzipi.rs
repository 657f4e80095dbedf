//! CLI surface: `index`, `retrieve`, `search`, `repack` — spec.md §6.
//!
//! Grounded on `original_source/gzipi/cli.py`'s subcommand dispatch and the
//! teacher's convention of a thin `main.rs`/bin crate around a library.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gzipi::compress::{self, CompressionKind};
use gzipi::config::Config;
use gzipi::indexer::index_stream;
use gzipi::keys::KeyExtractor;
use gzipi::repack::repack_stream;
use gzipi::retrieve::{retrieve, search_one};
use gzipi::sortfile::sort_index_file;
use gzipi::store;

#[derive(Parser)]
#[command(name = "gzipi", version, about = "Random-access retrieval of records from chunked, indexed gzip/zstd files.")]
struct Cli {
    /// Log level (error, warn, info, debug, trace); falls back to RUST_LOG.
    #[arg(short = 'l', long = "loglevel", global = true)]
    loglevel: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputCompression {
    Gzip,
    Zstd,
}

impl From<OutputCompression> for CompressionKind {
    fn from(c: OutputCompression) -> Self {
        match c {
            OutputCompression::Gzip => CompressionKind::Gzip,
            OutputCompression::Zstd => CompressionKind::Zstd,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Index a compressed file of CSV/JSON records.
    Index {
        #[arg(long, value_enum)]
        format: Format,
        #[arg(short = 'i', long = "input-file")]
        input_file: Option<String>,
        #[arg(short = 'o', long = "index-file")]
        index_file: Option<String>,
        #[arg(long, default_value_t = 0)]
        column: usize,
        #[arg(long, default_value = "|")]
        delimiter: String,
        #[arg(long, default_value = "domain")]
        field: String,
    },
    /// Retrieve records for a set of keys (index need not be sorted).
    Retrieve {
        #[arg(short = 'f', long = "input-file")]
        input_file: String,
        #[arg(short = 'k', long = "keys", value_delimiter = ',')]
        keys: Vec<String>,
        #[arg(short = 'i', long = "index-file")]
        index_file: Option<String>,
        #[arg(short = 'o', long = "output-file")]
        output_file: Option<String>,
    },
    /// Look up one record by key via binary search (index must be sorted).
    Search {
        #[arg(short = 'k', long = "key")]
        key: String,
        #[arg(short = 'f', long = "input-file")]
        input_file: String,
        #[arg(short = 'i', long = "index-file")]
        index_file: Option<String>,
        #[arg(short = 'o', long = "output-file")]
        output_file: Option<String>,
    },
    /// Re-chunk a long compressed stream into independently decodable frames.
    Repack {
        #[arg(long, value_enum)]
        format: Format,
        #[arg(short = 'f', long = "input-file")]
        input_file: Option<String>,
        #[arg(short = 'o', long = "output-file")]
        output_file: Option<String>,
        #[arg(short = 'i', long = "index-file")]
        index_file: Option<String>,
        #[arg(long, default_value_t = 0)]
        column: usize,
        #[arg(long, default_value = "|")]
        delimiter: String,
        #[arg(long, default_value = "domain")]
        field: String,
        #[arg(long = "chunk-size", default_value_t = 5000)]
        chunk_size: usize,
        #[arg(long = "output-compression", value_enum, default_value_t = OutputCompression::Gzip)]
        output_compression: OutputCompression,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.loglevel.as_deref());

    if let Err(e) = run(cli.command) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(loglevel: Option<&str>) {
    let mut builder = env_logger::Builder::from_default_env();
    if let Some(level) = loglevel {
        builder.parse_filters(level);
    }
    builder.init();
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Index { format, input_file, index_file, column, delimiter, field } => {
            cmd_index(format, input_file, index_file, column, &delimiter, &field)
        }
        Command::Retrieve { input_file, keys, index_file, output_file } => {
            cmd_retrieve(&input_file, &keys, index_file, output_file)
        }
        Command::Search { key, input_file, index_file, output_file } => {
            cmd_search(&key, &input_file, index_file, output_file)
        }
        Command::Repack { format, input_file, output_file, index_file, column, delimiter, field, chunk_size, output_compression } => {
            cmd_repack(format, input_file, output_file, index_file, column, &delimiter, &field, chunk_size, output_compression)
        }
    }
}

fn build_extractor(format: Format, column: usize, delimiter: &str, field: &str) -> Result<KeyExtractor> {
    let delim_byte = *delimiter.as_bytes().first().context("--delimiter must be non-empty")?;
    Ok(match format {
        Format::Csv => KeyExtractor::CsvColumn { column, delimiter: delim_byte },
        Format::Json => KeyExtractor::JsonField { field: field.to_string() },
    })
}

/// Derive the default index path for an input path: strip a trailing
/// compression extension (`.gz`/`.zst`) and append `.gzi`.
fn default_index_path(input: &str) -> String {
    let path = Path::new(input);
    let stripped: PathBuf = match path.extension().and_then(|e| e.to_str()) {
        Some("gz") | Some("zst") => path.with_extension(""),
        _ => path.to_path_buf(),
    };
    format!("{}.gzi", stripped.display())
}

fn confirm_overwrite(path: &str) -> Result<()> {
    if path == "-" || !Path::new(path).exists() {
        return Ok(());
    }
    print!("{path} already exists. Overwrite? [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    if answer == "y" || answer == "yes" {
        Ok(())
    } else {
        bail!("refused to overwrite {path}");
    }
}

fn cmd_index(
    format: Format,
    input_file: Option<String>,
    index_file: Option<String>,
    column: usize,
    delimiter: &str,
    field: &str,
) -> Result<()> {
    let extractor = build_extractor(format, column, delimiter, field)?;
    let config = Config::default();

    let index_path = index_file.or_else(|| input_file.as_deref().map(default_index_path));
    let index_path = index_path.context("an --index-file is required when --input-file is omitted")?;
    confirm_overwrite(&index_path)?;

    let input: Box<dyn Read> = match &input_file {
        Some(p) => store::open_read(p)?,
        None => Box::new(io::stdin()),
    };

    let mut index_buf = Vec::new();
    let count = index_stream(input, &mut index_buf, &extractor, &config)?;
    log::info!("indexed {count} records");

    std::fs::write(&index_path, &index_buf).with_context(|| format!("writing {index_path}"))?;
    sort_index_file(&index_path).with_context(|| format!("sorting {index_path}"))?;
    Ok(())
}

fn cmd_retrieve(
    input_file: &str,
    keys: &[String],
    index_file: Option<String>,
    output_file: Option<String>,
) -> Result<()> {
    let index_path = index_file.unwrap_or_else(|| default_index_path(input_file));
    let index = store::open_read(&index_path).with_context(|| format!("opening index {index_path}"))?;
    let data = store::open(input_file).with_context(|| format!("opening data file {input_file}"))?;

    let mut out: Box<dyn Write> = match output_file {
        Some(p) => store::open_write(&p)?,
        None => Box::new(io::stdout()),
    };

    retrieve(index, data.as_ref(), keys, &mut out)?;
    out.flush()?;
    Ok(())
}

fn cmd_search(
    key: &str,
    input_file: &str,
    index_file: Option<String>,
    output_file: Option<String>,
) -> Result<()> {
    let index_path = index_file.unwrap_or_else(|| default_index_path(input_file));
    let data = store::open(input_file).with_context(|| format!("opening data file {input_file}"))?;
    let buffer_threshold_kib = Config::default().search_buffer_kib;

    let mut out: Box<dyn Write> = match output_file {
        Some(p) => store::open_write(&p)?,
        None => Box::new(io::stdout()),
    };

    // A gzip-compressed index has no byte-for-byte correspondence between
    // compressed offsets and decompressed line positions, so binary search
    // needs the decompressed text; buffer it fully rather than seek the
    // compressed file directly.
    if index_path.ends_with(".gz") {
        let mut decompressed = Vec::new();
        compress::open_reader(std::fs::File::open(&index_path)?, CompressionKind::Gzip)
            .read_to_end(&mut decompressed)?;
        let size = decompressed.len() as u64;
        let mut cursor = std::io::Cursor::new(decompressed);
        search_one(key.as_bytes(), &mut cursor, size, data.as_ref(), buffer_threshold_kib, &mut out)?;
    } else {
        let mut index_reader = std::fs::File::open(&index_path).with_context(|| format!("opening index {index_path}"))?;
        let index_size = index_reader.metadata()?.len();
        search_one(key.as_bytes(), &mut index_reader, index_size, data.as_ref(), buffer_threshold_kib, &mut out)?;
    }
    out.flush()?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_repack(
    format: Format,
    input_file: Option<String>,
    output_file: Option<String>,
    index_file: Option<String>,
    column: usize,
    delimiter: &str,
    field: &str,
    chunk_size: usize,
    output_compression: OutputCompression,
) -> Result<()> {
    let extractor = build_extractor(format, column, delimiter, field)?;
    let output_kind: CompressionKind = output_compression.into();

    let output_path = output_file.unwrap_or_else(|| "-".to_string());
    let index_path = index_file.unwrap_or_else(|| {
        let base = input_file.as_deref().unwrap_or(&output_path);
        default_index_path(base)
    });

    confirm_overwrite(&output_path)?;
    confirm_overwrite(&index_path)?;

    let input: Box<dyn Read> = match &input_file {
        Some(p) => store::open_read(p)?,
        None => Box::new(io::stdin()),
    };
    let mut data_out = store::open_write(&output_path)?;
    let mut index_out = Vec::new();

    repack_stream(input, &mut data_out, &mut index_out, &extractor, chunk_size, output_kind)?;
    data_out.flush()?;

    if index_path == "-" {
        io::stdout().write_all(&index_out)?;
    } else {
        std::fs::write(&index_path, &index_out).with_context(|| format!("writing {index_path}"))?;
        sort_index_file(&index_path).with_context(|| format!("sorting {index_path}"))?;
    }
    Ok(())
}

