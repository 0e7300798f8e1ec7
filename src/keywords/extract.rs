use calamine::{Data, Ods, Reader, Xls, Xlsx};
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

/// Header the keyword column must carry, compared exactly.
pub const KEYWORD_COLUMN: &str = "keywords";

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Unsupported file format. Please upload a CSV or Excel file.")]
    UnsupportedFormat(String),

    #[error("The uploaded file must contain a column named '{}'.", KEYWORD_COLUMN)]
    MissingColumn,

    #[error("Error reading file. Please ensure it is a valid CSV or Excel file.")]
    Parse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableFormat {
    Csv,
    Xlsx,
    Xls,
    Ods,
}

impl TableFormat {
    fn from_file_name(file_name: &str) -> Option<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|s| s.to_str())?
            .to_ascii_lowercase();

        match extension.as_str() {
            "csv" => Some(TableFormat::Csv),
            "xlsx" => Some(TableFormat::Xlsx),
            "xls" => Some(TableFormat::Xls),
            "ods" => Some(TableFormat::Ods),
            _ => None,
        }
    }
}

/// Reads the `keywords` column of an uploaded table.
///
/// The format is picked from the file name's extension. Blank cells are
/// skipped and values are trimmed; duplicates are left to the caller.
pub fn extract_keywords(file_name: &str, data: &[u8]) -> Result<Vec<String>, ExtractError> {
    let format = TableFormat::from_file_name(file_name)
        .ok_or_else(|| ExtractError::UnsupportedFormat(file_name.to_string()))?;

    tracing::debug!("Extracting keywords from {} as {:?}", file_name, format);

    let keywords = match format {
        TableFormat::Csv => read_csv(data)?,
        TableFormat::Xlsx => read_workbook::<Xlsx<Cursor<Vec<u8>>>>(data)?,
        TableFormat::Xls => read_workbook::<Xls<Cursor<Vec<u8>>>>(data)?,
        TableFormat::Ods => read_workbook::<Ods<Cursor<Vec<u8>>>>(data)?,
    };

    tracing::debug!("Extracted {} keywords from {}", keywords.len(), file_name);
    Ok(keywords)
}

/// Like `extract_keywords`, but a failure yields no keywords plus the error to show.
pub fn extract_or_empty(file_name: &str, data: &[u8]) -> (Vec<String>, Option<ExtractError>) {
    match extract_keywords(file_name, data) {
        Ok(keywords) => (keywords, None),
        Err(e) => {
            tracing::warn!("Keyword extraction failed for {}: {:?}", file_name, e);
            (Vec::new(), Some(e))
        }
    }
}

fn keep_cell(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn read_csv(data: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| ExtractError::Parse(e.to_string()))?;
    let column = headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}') == KEYWORD_COLUMN)
        .ok_or(ExtractError::MissingColumn)?;

    let mut keywords = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ExtractError::Parse(e.to_string()))?;
        if let Some(keyword) = record.get(column).and_then(keep_cell) {
            keywords.push(keyword);
        }
    }
    Ok(keywords)
}

fn read_workbook<R>(data: &[u8]) -> Result<Vec<String>, ExtractError>
where
    R: Reader<Cursor<Vec<u8>>>,
{
    let mut workbook = R::new(Cursor::new(data.to_vec()))
        .map_err(|e| ExtractError::Parse(format!("{:?}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ExtractError::Parse("workbook has no sheets".into()))?
        .map_err(|e| ExtractError::Parse(format!("{:?}", e)))?;

    let mut rows = range.rows();
    let header = rows.next().ok_or(ExtractError::MissingColumn)?;
    let column = header
        .iter()
        .position(|cell| matches!(cell, Data::String(s) if s == KEYWORD_COLUMN))
        .ok_or(ExtractError::MissingColumn)?;

    Ok(rows
        .filter_map(|row| match row.get(column) {
            None | Some(Data::Empty) | Some(Data::Error(_)) => None,
            Some(Data::String(s)) => keep_cell(s),
            Some(other) => keep_cell(&other.to_string()),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_keyword_column_from_csv() {
        let data = b"id,keywords,notes\n1,pumps,x\n2, valves ,y\n3,,z\n4,pumps,w\n";
        let keywords = extract_keywords("list.csv", data).unwrap();
        assert_eq!(keywords, vec!["pumps", "valves", "pumps"]);
    }

    #[test]
    fn csv_with_byte_order_mark() {
        let data = "\u{feff}keywords\nصيانة\n".as_bytes();
        assert_eq!(extract_keywords("arabic.CSV", data).unwrap(), vec!["صيانة"]);
    }

    #[test]
    fn short_rows_are_skipped() {
        let data = b"id,keywords\n1,pumps\n2\n";
        assert_eq!(extract_keywords("list.csv", data).unwrap(), vec!["pumps"]);
    }

    #[test]
    fn missing_column_yields_nothing_and_an_error() {
        let data = b"id,terms\n1,pumps\n";
        let (keywords, error) = extract_or_empty("list.csv", data);
        assert!(keywords.is_empty());
        assert!(matches!(error, Some(ExtractError::MissingColumn)));
    }

    #[test]
    fn column_name_is_case_sensitive() {
        let data = b"Keywords\npumps\n";
        assert!(matches!(
            extract_keywords("list.csv", data),
            Err(ExtractError::MissingColumn)
        ));
    }

    #[test]
    fn unsupported_extension_yields_nothing_and_an_error() {
        let (keywords, error) = extract_or_empty("list.txt", b"keywords\npumps\n");
        assert!(keywords.is_empty());
        assert!(matches!(error, Some(ExtractError::UnsupportedFormat(_))));

        let (keywords, error) = extract_or_empty("no_extension", b"keywords\npumps\n");
        assert!(keywords.is_empty());
        assert!(error.is_some());
    }

    fn workbook(cells: &[(u32, u16, &str)], numbers: &[(u32, u16, f64)]) -> Vec<u8> {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        for (row, col, text) in cells {
            sheet.write_string(*row, *col, *text).unwrap();
        }
        for (row, col, number) in numbers {
            sheet.write_number(*row, *col, *number).unwrap();
        }
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn reads_keyword_column_from_xlsx() {
        let data = workbook(
            &[(0, 0, "id"), (0, 1, "keywords"), (1, 1, " pumps "), (4, 1, "valves")],
            &[(2, 1, 42.0), (3, 0, 4.0)],
        );
        assert_eq!(
            extract_keywords("list.xlsx", &data).unwrap(),
            vec!["pumps", "42", "valves"]
        );
    }

    #[test]
    fn xlsx_without_keyword_column() {
        let data = workbook(&[(0, 0, "terms"), (1, 0, "pumps")], &[]);
        let (keywords, error) = extract_or_empty("list.XLSX", &data);
        assert!(keywords.is_empty());
        assert!(matches!(error, Some(ExtractError::MissingColumn)));
    }

    #[test]
    fn corrupt_workbook_is_a_parse_error() {
        let (keywords, error) = extract_or_empty("list.xlsx", b"definitely not a zip archive");
        assert!(keywords.is_empty());
        assert!(matches!(error, Some(ExtractError::Parse(_))));
    }

    #[test]
    fn invalid_utf8_csv_is_a_parse_error() {
        let data = b"keywords\n\xff\xfe\n";
        assert!(matches!(
            extract_keywords("list.csv", data),
            Err(ExtractError::Parse(_))
        ));
    }
}
