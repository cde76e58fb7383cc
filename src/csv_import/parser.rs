//! Delimited-text decoding for uploaded CSV files.
//!
//! The first line is the header. Header names are trimmed and lower-cased so
//! `Name`, ` NAME ` and `name` address the same column. Comma, semicolon and
//! tab separated files are accepted; the separator is picked from the header.

use std::collections::BTreeMap;

use thiserror::Error;

/// UTF-8 BOM bytes.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

const CANDIDATE_DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

/// One data record keyed by normalized header name.
pub type CsvRecord = BTreeMap<String, String>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("file is not valid UTF-8 text")]
    InvalidUtf8,

    #[error("file contains binary data")]
    Binary,

    #[error("failed to read CSV: {0}")]
    Malformed(String),
}

/// Strip UTF-8 BOM from the beginning of data if present.
fn strip_utf8_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(UTF8_BOM).unwrap_or(data)
}

/// Picks the candidate with the most occurrences outside quotes in the first
/// line. Ties and headers without any candidate fall back to comma.
pub fn detect_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    let mut counts = [0usize; CANDIDATE_DELIMITERS.len()];
    let mut in_quotes = false;
    for b in header.bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(i) = CANDIDATE_DELIMITERS.iter().position(|d| *d == b) {
            counts[i] += 1;
        }
    }

    let mut best = 0;
    for i in 1..counts.len() {
        if counts[i] > counts[best] {
            best = i;
        }
    }
    CANDIDATE_DELIMITERS[best]
}

/// Decodes `data` into records. Empty lines are dropped by the reader, but a
/// line of empty fields such as `,,` is kept so it can be reported. Short
/// records read missing trailing columns as empty strings.
pub fn parse_csv(data: &[u8]) -> Result<Vec<CsvRecord>, ParseError> {
    let data = strip_utf8_bom(data);
    let text = std::str::from_utf8(data).map_err(|_| ParseError::InvalidUtf8)?;
    if text.contains('\0') {
        return Err(ParseError::Binary);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(detect_delimiter(text))
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ParseError::Malformed(e.to_string()))?
        .iter()
        .map(|h| h.to_lowercase())
        .collect();

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| ParseError::Malformed(e.to_string()))?;

        let mut row = CsvRecord::new();
        for (i, name) in headers.iter().enumerate() {
            if name.is_empty() {
                continue;
            }
            let value = record.get(i).unwrap_or_default();
            row.entry(name.clone()).or_insert_with(|| value.to_string());
        }
        records.push(row);
    }
    Ok(records)
}
