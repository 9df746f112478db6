//! Whitespace-separated numeric text inputs

use crate::error::ConfigError;
use std::fs;
use std::path::Path;

/// Read a whole text file, mapping failures to `ConfigError::Io`
pub(crate) fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Parse every token of a line as `f64`
pub(crate) fn parse_numbers(line: &str, source: &str, line_no: usize) -> Result<Vec<f64>, ConfigError> {
    line.split_whitespace()
        .map(|token| {
            token.parse::<f64>().map_err(|_| ConfigError::Parse {
                source: source.to_string(),
                line: line_no,
                message: format!("'{token}' is not a number"),
            })
        })
        .collect()
}

/// Parse a line that must hold exactly `expected` numbers
pub(crate) fn parse_row<const N: usize>(line: &str, source: &str, line_no: usize) -> Result<[f64; N], ConfigError> {
    let values = parse_numbers(line, source, line_no)?;
    <[f64; N]>::try_from(values.as_slice()).map_err(|_| ConfigError::Parse {
        source: source.to_string(),
        line: line_no,
        message: format!("expected {N} columns, found {}", values.len()),
    })
}

/// Non-empty lines with their 1-based line numbers
pub(crate) fn data_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_row_counts_columns() {
        assert_eq!(parse_row::<3>(" 1 2.5\t-3 ", "t", 1).unwrap(), [1.0, 2.5, -3.0]);

        let err = parse_row::<3>("1 2", "t", 4).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Parse {
                source: "t".to_string(),
                line: 4,
                message: "expected 3 columns, found 2".to_string()
            }
        );
    }

    #[test]
    fn test_bad_token_reported() {
        let err = parse_numbers("1 x 3", "Turbines.txt", 2).unwrap_err();
        assert!(err.to_string().contains("'x' is not a number"));
    }

    #[test]
    fn test_blank_lines_skipped() {
        let lines: Vec<_> = data_lines("a\n\n  \nb\n").collect();
        assert_eq!(lines, vec![(1, "a"), (4, "b")]);
    }
}
