use anyhow::{bail, Context, Result};
use clap::Parser;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};

use iba_dat::{read_file, CodecOptions, IbaWriter};

mod models;

use crate::models::document::RecordingDocument;

/// Convert between JSON recordings and ibaAnalyzer .dat files
///
/// `X.json` is encoded to `X.json.dat`, `X.dat` is decoded to `X.dat.json`.
#[derive(Parser, Debug)]
#[command(name = "iba-dat", version)]
struct Cli {
    /// Input file (*.json or *.dat)
    input: PathBuf,

    /// Output file (defaults to the input path plus .dat or .json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON file with codec options used when encoding
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log every channel
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let extension = cli
        .input
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("json") => {
            let output = cli.output.unwrap_or_else(|| with_suffix(&cli.input, ".dat"));
            encode(&cli.input, &output, cli.config.as_deref())
        }
        Some("dat") => {
            let output = cli.output.unwrap_or_else(|| with_suffix(&cli.input, ".json"));
            decode(&cli.input, &output)
        }
        _ => bail!(
            "Unsupported input {}: expected *.json (encode) or *.dat (decode)",
            cli.input.display()
        ),
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn encode(input: &Path, output: &Path, config: Option<&Path>) -> Result<()> {
    let options = match config {
        Some(path) => CodecOptions::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => CodecOptions::default(),
    };

    let data = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let document: RecordingDocument = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse {}", input.display()))?;

    let channels = document.channels()?;
    let begin = document.begin()?;
    let file = File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let written = IbaWriter::with_options(BufWriter::new(file), options)
        .and_then(|mut writer| writer.write(begin, document.interval(), &channels));

    if let Err(err) = written {
        // don't leave a truncated .dat behind
        if let Err(remove_err) = fs::remove_file(output) {
            warn!("Failed to remove {}: {}", output.display(), remove_err);
        }
        return Err(err).with_context(|| format!("Failed to encode {}", input.display()));
    }

    info!("Encoded {} -> {}", input.display(), output.display());
    Ok(())
}

fn decode(input: &Path, output: &Path) -> Result<()> {
    let recording = read_file(input)
        .with_context(|| format!("Failed to decode {}", input.display()))?;
    let document = RecordingDocument::from_recording(&recording)?;

    let file = File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &document)?;
    writer.flush()?;

    info!("Decoded {} -> {}", input.display(), output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_suffix() {
        assert_eq!(with_suffix(Path::new("run/a.json"), ".dat"), PathBuf::from("run/a.json.dat"));
    }

    #[test]
    fn test_encode_decode_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("rec.json");
        fs::write(&input, r#"["2024-01-02T03:04:05", 0.5, {"a": [1.5, "NaN"], "d": [true]}]"#).unwrap();

        let dat = with_suffix(&input, ".dat");
        encode(&input, &dat, None).unwrap();
        let json = with_suffix(&dat, ".json");
        decode(&dat, &json).unwrap();

        assert_eq!(
            fs::read_to_string(&json).unwrap(),
            r#"["2024-01-02 03:04:05",0.5,{"a":[1.5,"NaN"],"d":[true]}]"#
        );
    }

    #[test]
    fn test_failed_encode_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("empty.json");
        fs::write(&input, "[null, 1, {}]").unwrap();
        let output = with_suffix(&input, ".dat");

        assert!(encode(&input, &output, None).is_err());
        assert!(!output.exists());
    }
}
