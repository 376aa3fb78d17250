//! Teacher-count CSV parser with encoding and delimiter auto-detection.
//!
//! Rows are mapped by header name, so column order does not matter and a
//! short row simply leaves its trailing columns empty. Count columns are
//! coerced with [`safe_parse`]; a bad cell becomes 0 instead of failing the
//! whole file.

pub mod coerce;

use chrono::Utc;
use std::collections::HashMap;
use std::path::Path;

use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::error::{CsvError, CsvResult};
use crate::models::{Dataset, DatasetSchema, Record};

pub use coerce::safe_parse;

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "iso-8859-15" => "iso-8859-15".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        // WHATWG maps the iso-8859-1 label to windows-1252
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        "iso-8859-15" | "latin-9" | "latin9" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        // UTF-8 and anything unknown: lossy UTF-8
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the first line.
///
/// Falls back to `,` when the header has a single column.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse a CSV file with auto-detection of encoding and delimiter.
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P, schema: &DatasetSchema) -> CsvResult<Dataset> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes, schema)
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8], schema: &DatasetSchema) -> CsvResult<Dataset> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    parse_str(&content, delimiter, encoding, schema)
}

/// Parse CSV text with an explicit delimiter.
pub fn parse_str(
    content: &str,
    delimiter: char,
    encoding: String,
    schema: &DatasetSchema,
) -> CsvResult<Dataset> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let delimiter_byte = u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| CsvError::ParseError {
            line: 0,
            message: format!("delimiter '{}' is not a single ASCII character", delimiter),
        })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_byte)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    log_info(format!("CSV has {} columns:", headers.len()));
    for (i, col) in headers.iter().enumerate() {
        log_info_indent(format!("[{:2}] {}", i + 1, col), 1);
    }

    let index: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.as_str(), i))
        .collect();

    let year_idx = *index
        .get(schema.year_column.as_str())
        .ok_or_else(|| CsvError::MissingColumn(schema.year_column.clone()))?;
    let facet_idx = *index
        .get(schema.facet_column.as_str())
        .ok_or_else(|| CsvError::MissingColumn(schema.facet_column.clone()))?;
    let numeric: Vec<(usize, &String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != year_idx && *i != facet_idx)
        .collect();

    let mut records = Vec::new();
    let mut skipped_rows = 0;

    for result in reader.records() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                log_warning(format!("Skipping unreadable row: {}", e));
                skipped_rows += 1;
                continue;
            }
        };

        let year = row.get(year_idx).unwrap_or("");
        if year.is_empty() {
            skipped_rows += 1;
            continue;
        }
        let facet = row.get(facet_idx).unwrap_or("");

        let counts = numeric
            .iter()
            .map(|(i, name)| ((*name).clone(), safe_parse(row.get(*i))))
            .collect();

        records.push(Record::new(year, facet, counts));
    }

    if skipped_rows > 0 {
        log_warning(format!("{} rows skipped (blank year or unreadable)", skipped_rows));
    }
    log_success(format!("Read {} rows, {} columns", records.len(), headers.len()));

    Ok(Dataset {
        records,
        headers,
        schema: schema.clone(),
        encoding,
        delimiter,
        skipped_rows,
        loaded_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(csv: &str) -> Dataset {
        parse_str(csv, ',', "utf-8".into(), &DatasetSchema::default()).unwrap()
    }

    #[test]
    fn test_simple_csv() {
        let ds = parse("Year,Age Group,Overall Total\n2019,25-29,100\n2020,30-34,200");

        assert_eq!(ds.records.len(), 2);
        assert_eq!(ds.records[0].year(), "2019");
        assert_eq!(ds.records[0].facet(), "25-29");
        assert_eq!(ds.records[0].count("Overall Total"), 100);
        assert_eq!(ds.records[1].count("Overall Total"), 200);
    }

    #[test]
    fn test_quoted_thousands() {
        let ds = parse("Year,Age Group,Overall Total\n2019,All,\"1,234\"");
        assert_eq!(ds.records[0].count("Overall Total"), 1234);
    }

    #[test]
    fn test_header_driven_mapping() {
        let ds = parse("Overall Total,Year,Age Group\n55,2021,40-44");
        assert_eq!(ds.records[0].year(), "2021");
        assert_eq!(ds.records[0].count("Overall Total"), 55);
    }

    #[test]
    fn test_short_row_yields_empty_values() {
        let ds = parse("Year,Age Group,Overall Total,Primary Female\n2019,25-29");
        assert_eq!(ds.records.len(), 1);
        assert_eq!(ds.records[0].count("Overall Total"), 0);
        assert_eq!(ds.records[0].count("Primary Female"), 0);
    }

    #[test]
    fn test_malformed_counts_default_to_zero() {
        let ds = parse("Year,Age Group,Overall Total\n2019,All,n.a.\n2020,All,-");
        assert_eq!(ds.records.len(), 2);
        assert!(ds.records.iter().all(|r| r.count("Overall Total") == 0));
    }

    #[test]
    fn test_blank_year_and_empty_lines_skipped() {
        let ds = parse("Year,Age Group,Overall Total\n2019,All,1\n\n,All,5\n2020,All,2\n");
        assert_eq!(ds.records.len(), 2);
        assert_eq!(ds.skipped_rows, 1);
    }

    #[test]
    fn test_missing_year_column() {
        let err = parse_str("Age Group,Overall Total\nAll,1", ',', "utf-8".into(), &DatasetSchema::default())
            .unwrap_err();
        assert!(matches!(err, CsvError::MissingColumn(c) if c == "Year"));
    }

    #[test]
    fn test_empty_csv_error() {
        let err = parse_str("  \n", ',', "utf-8".into(), &DatasetSchema::default()).unwrap_err();
        assert!(matches!(err, CsvError::EmptyFile));
    }

    #[test]
    fn test_metrics_listed() {
        let ds = parse("Year,Age Group,Overall Total,Pre-University Female\n2019,All,1,2");
        assert_eq!(ds.metrics(), vec!["Overall Total", "Pre-University Female"]);
        assert!(ds.has_metric("Pre-University Female"));
        assert!(!ds.has_metric("Year"));
    }

    #[test]
    fn test_detect_delimiter_comma() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
    }

    #[test]
    fn test_detect_delimiter_semicolon() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
    }

    #[test]
    fn test_detect_delimiter_tab() {
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
    }

    #[test]
    fn test_auto_parse_semicolon() {
        let csv = "Year;Age Group;Overall Total\n2019;All;10";
        let ds = parse_bytes_auto(csv.as_bytes(), &DatasetSchema::default()).unwrap();
        assert_eq!(ds.delimiter, ';');
        assert_eq!(ds.records[0].count("Overall Total"), 10);
    }

    #[test]
    fn test_parse_file_auto() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("teachers.csv");
        std::fs::write(&path, "Year,Age Group,Overall Total\n2023,50-54,\"2,500\"\n").unwrap();

        let ds = parse_csv_file_auto(&path, &DatasetSchema::default()).unwrap();
        assert_eq!(ds.records[0].count("Overall Total"), 2500);
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_latin1_symbols_not_latin9() {
        // 0xA4, 0xA6, 0xA8 differ between ISO-8859-1 and ISO-8859-15
        let bytes: &[u8] = &[0xA4, 0xA6, 0xA8];
        assert_eq!(decode_content(bytes, "iso-8859-1"), "¤¦¨");
        assert_eq!(decode_content(bytes, "iso-8859-15"), "€Šš");
    }
}
