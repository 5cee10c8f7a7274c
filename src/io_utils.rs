//! CSV boundary glue: delimiter and encoding resolution, raw-frame reading,
//! and cleaned-frame writing.
//!
//! The pipeline core never touches files; raw bytes enter here and leave here.
//! Delimiters resolve from the file extension (`.tsv` → tab) unless overridden,
//! input decoding goes through `encoding_rs` (UTF-8 default), and the `-` path
//! convention routes through standard streams.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

use crate::data::{Cell, Frame};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
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

pub fn resolve_output_delimiter(path: Option<&Path>, provided: Option<u8>, fallback: u8) -> u8 {
    if let Some(delim) = provided {
        return delim;
    }
    if let Some(path) = path {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => return DEFAULT_TSV_DELIMITER,
            Some(ext) if ext.eq_ignore_ascii_case("csv") => return DEFAULT_CSV_DELIMITER,
            _ => {}
        }
    }
    fallback
}

fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
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

/// Reads a headed CSV into a raw frame of text cells. Empty fields become
/// nulls; ragged rows are padded to the header width.
pub fn read_raw_frame(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Frame> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        ))
    };
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(reader);

    let header_record = csv_reader.byte_headers()?.clone();
    let columns = header_record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect::<Result<Vec<_>>>()
        .context("Decoding header row")?;

    let mut frame = Frame::new(columns);
    for (row_idx, record) in csv_reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let row = record
            .iter()
            .map(|field| {
                let text = decode_bytes(field, encoding)?;
                Ok((!text.is_empty()).then_some(Cell::Text(text)))
            })
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("Decoding row {}", row_idx + 2))?;
        frame.push_row(row);
    }
    Ok(frame)
}

/// Writes a frame as UTF-8 CSV (stdout when no path). Dates render as
/// `YYYY-MM-DD`, nulls as empty fields.
pub fn write_frame(frame: &Frame, path: Option<&Path>, delimiter: u8) -> Result<()> {
    let writer: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    };
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Always)
        .double_quote(true)
        .from_writer(writer);

    csv_writer
        .write_record(&frame.columns)
        .context("Writing header row")?;
    for (row_idx, row) in frame.rows.iter().enumerate() {
        let record: Vec<String> = row
            .iter()
            .map(|cell| cell.as_ref().map(Cell::as_display).unwrap_or_default())
            .collect();
        csv_writer
            .write_record(&record)
            .with_context(|| format!("Writing row {}", row_idx + 2))?;
    }
    csv_writer.flush().context("Flushing CSV output")
}
