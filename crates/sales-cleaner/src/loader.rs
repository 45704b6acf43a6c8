//! Loading the raw table from a delimited file.
//!
//! Every column is read as text so raw cells reach the coercer exactly as
//! they appear in the file.

use crate::config::{CsvOptions, InputEncoding};
use crate::error::{CleaningError, Result, ResultExt};
use polars::io::csv::read::{CsvEncoding, CsvParseOptions, CsvReadOptions};
use polars::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

fn read_options(options: &CsvOptions) -> CsvReadOptions {
    let encoding = match options.encoding {
        InputEncoding::Utf8 => CsvEncoding::Utf8,
        InputEncoding::LossyUtf8 => CsvEncoding::LossyUtf8,
    };

    CsvReadOptions::default()
        .with_has_header(options.has_header)
        .with_infer_schema_length(Some(0))
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(options.delimiter_byte())
                .with_quote_char(Some(b'"'))
                .with_encoding(encoding),
        )
}

/// Load a raw table from a file.
///
/// When the file cannot be parsed as-is, blank lines are removed and
/// parsing is retried once before giving up.
pub fn load_raw_table(path: impl AsRef<Path>, options: &CsvOptions) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CleaningError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Input file not found: {}", path.display()),
        )));
    }

    let first_attempt = read_options(options)
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish();

    let df = match first_attempt {
        Ok(df) => df,
        Err(e) => {
            debug!("Standard loading failed: {}", e);
            let content = decode(std::fs::read(path)?, options.encoding, path)?;
            parse_raw_table(&drop_blank_lines(&content), options)
                .context(format!("Failed to parse {}", path.display()))?
        }
    };

    info!("Loaded {} rows x {} columns from {}", df.height(), df.width(), path.display());
    Ok(df)
}

/// Parse a raw table from in-memory delimited text.
pub fn parse_raw_table(content: &str, options: &CsvOptions) -> Result<DataFrame> {
    let cursor = Cursor::new(content.as_bytes().to_vec());
    Ok(read_options(options)
        .into_reader_with_file_handle(cursor)
        .finish()?)
}

/// Decode file contents under the configured encoding. Strict UTF-8 never
/// substitutes replacement characters.
fn decode(bytes: Vec<u8>, encoding: InputEncoding, path: &Path) -> Result<String> {
    match encoding {
        InputEncoding::Utf8 => String::from_utf8(bytes).map_err(|e| {
            CleaningError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{} is not valid UTF-8: {}", path.display(), e.utf8_error()),
            ))
        }),
        InputEncoding::LossyUtf8 => Ok(String::from_utf8_lossy(&bytes).into_owned()),
    }
}

fn drop_blank_lines(content: &str) -> String {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_every_column_is_text() {
        let df = parse_raw_table(
            "Order ID,Quantity,Total Sales\nA1,3,$10.00\nA2,4,12\n",
            &CsvOptions::default(),
        )
        .unwrap();

        assert_eq!(df.shape(), (2, 3));
        for col in df.get_columns() {
            assert_eq!(col.dtype(), &DataType::String);
        }
    }

    #[test]
    fn test_custom_delimiter() {
        let options = CsvOptions {
            delimiter: ';',
            ..CsvOptions::default()
        };
        let df = parse_raw_table("Region;Total Sales\nNorth;\"1,000\"\n", &options).unwrap();

        let value = df.column("Total Sales").unwrap().get(0).unwrap();
        assert_eq!(value, AnyValue::String("1,000"));
    }

    #[test]
    fn test_drop_blank_lines() {
        assert_eq!(drop_blank_lines("a,b\n\n1,2\n   \n"), "a,b\n1,2");
    }

    fn write_temp(name: &str, bytes: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "sales_cleaner_loader_{}_{}.csv",
            name,
            std::process::id()
        ));
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_invalid_utf8_is_rejected_under_strict_encoding() {
        let path = write_temp(
            "strict",
            b"Order Date,Region,Total Sales\n\n2024-01-05,Nor\xffth,$10\n",
        );

        let err = load_raw_table(&path, &CsvOptions::default()).unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_decode_respects_encoding() {
        let bytes = b"Nor\xffth".to_vec();
        let path = Path::new("sales.csv");

        assert!(decode(bytes.clone(), InputEncoding::Utf8, path).is_err());
        assert_eq!(
            decode(bytes, InputEncoding::LossyUtf8, path).unwrap(),
            "Nor\u{FFFD}th"
        );
        assert_eq!(
            decode(b"North".to_vec(), InputEncoding::Utf8, path).unwrap(),
            "North"
        );
    }

    #[test]
    fn test_missing_file() {
        let err = load_raw_table("/definitely/not/here.csv", &CsvOptions::default()).unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }
}
