use std::{
    fs::File,
    io::{BufReader, BufWriter, Read},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};
use serde::{Serialize, de::DeserializeOwned};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }
}

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn read_structured<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let file = File::open(path).with_context(|| format!("Opening {path:?}"))?;
    let reader = BufReader::new(file);
    match DocumentFormat::from_path(path) {
        DocumentFormat::Json => {
            serde_json::from_reader(reader).with_context(|| format!("Parsing JSON in {path:?}"))
        }
        DocumentFormat::Yaml => {
            serde_yaml::from_reader(reader).with_context(|| format!("Parsing YAML in {path:?}"))
        }
    }
}

pub fn write_structured<T>(path: &Path, value: &T) -> Result<()>
where
    T: Serialize,
{
    let file = File::create(path).with_context(|| format!("Creating {path:?}"))?;
    let writer = BufWriter::new(file);
    match DocumentFormat::from_path(path) {
        DocumentFormat::Json => serde_json::to_writer_pretty(writer, value)
            .with_context(|| format!("Writing JSON to {path:?}")),
        DocumentFormat::Yaml => {
            serde_yaml::to_writer(writer, value).with_context(|| format!("Writing YAML to {path:?}"))
        }
    }
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn open_csv_reader_from_path(path: &Path, delimiter: u8) -> Result<csv::Reader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        ))
    };
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    Ok(builder.from_reader(reader))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn reader_headers<R>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> Result<Vec<String>>
where
    R: Read,
{
    let headers = reader.byte_headers()?.clone();
    headers
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_and_delimiter_follow_extension() {
        assert_eq!(DocumentFormat::from_path(Path::new("a.JSON")), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_path(Path::new("a.yml")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(Path::new("snapshot")), DocumentFormat::Yaml);
        assert_eq!(resolve_input_delimiter(Path::new("rows.tsv"), None), b'\t');
        assert_eq!(resolve_input_delimiter(Path::new("rows.tsv"), Some(b';')), b';');
        assert_eq!(resolve_input_delimiter(Path::new("rows.csv"), None), b',');
    }

    #[test]
    fn encodings_resolve_by_label() {
        assert_eq!(resolve_encoding(None).expect("default"), UTF_8);
        assert_eq!(
            resolve_encoding(Some("latin1")).expect("latin1").name(),
            "windows-1252"
        );
        assert!(resolve_encoding(Some("klingon")).is_err());
    }
}
