use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Normalize commerce exports and derive revenue KPIs", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show how input columns resolve onto the canonical schema
    Map(MapArgs),
    /// Normalize and repair a transaction export into canonical CSV
    Clean(CleanArgs),
    /// Run the full pipeline and report KPIs and summaries
    Analyze(AnalyzeArgs),
}

#[derive(Debug, Args)]
pub struct MapArgs {
    /// Input CSV file to inspect ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Custom canonical schema file (YAML) with alias lists
    #[arg(short, long)]
    pub schema: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Input CSV file to clean ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Custom canonical schema file (YAML) with alias lists
    #[arg(short, long)]
    pub schema: Option<PathBuf>,
    /// CSV delimiter character for reading input
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Delimiter to use for output (defaults to input delimiter)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Input CSV file to analyze ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Custom canonical schema file (YAML) with alias lists
    #[arg(short, long)]
    pub schema: Option<PathBuf>,
    /// Also summarize by this categorical field (channel, region, category, device)
    #[arg(long)]
    pub segment: Option<String>,
    /// Also print the per-day revenue summary
    #[arg(long)]
    pub daily: bool,
    /// Emit the KPI set as JSON instead of tables
    #[arg(long)]
    pub json: bool,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_parser_accepts_names_and_single_chars() {
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert_eq!(parse_delimiter("pipe").unwrap(), b'|');
        assert_eq!(parse_delimiter(";").unwrap(), b';');
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
    }
}
