use std::collections::HashMap;

use crate::error::ExportError;

/// Placeholder rendered for an (entity, column) pair with no summary row.
pub const MISSING_CELL: &str = "-";

/// Byte-order mark prepended to delimited exports so spreadsheet tools pick
/// up UTF-8 (accented names otherwise come out garbled).
pub const UTF8_BOM: &str = "\u{FEFF}";

const ID_HEADER: &str = "ID";
const NAME_HEADER: &str = "Name";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub external_id: String,
    pub name: String,
    pub cells: Vec<String>,
}

/// Tabular pivot export: `ID, Name, <label>...` followed by one row per entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTable {
    labels: Vec<String>,
    rows: Vec<ExportRow>,
}

impl ExportTable {
    #[must_use]
    pub fn new(labels: Vec<String>, rows: Vec<ExportRow>) -> Self {
        Self { labels, rows }
    }

    #[must_use]
    pub fn header(&self) -> Vec<&str> {
        [ID_HEADER, NAME_HEADER]
            .into_iter()
            .chain(self.labels.iter().map(String::as_str))
            .collect()
    }

    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[must_use]
    pub fn rows(&self) -> &[ExportRow] {
        &self.rows
    }

    /// `(external id, column label) -> rendered cell` for every cell.
    #[must_use]
    pub fn cell_map(&self) -> HashMap<(String, String), String> {
        self.rows
            .iter()
            .flat_map(|row| {
                self.labels.iter().zip(&row.cells).map(|(label, cell)| {
                    ((row.external_id.clone(), label.clone()), cell.clone())
                })
            })
            .collect()
    }

    /// Serialize as comma-separated text with a header row and leading BOM.
    ///
    /// # Errors
    ///
    /// Returns `ExportError` if the CSV writer fails.
    pub fn to_csv(&self) -> Result<String, ExportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(self.header())?;
        for row in &self.rows {
            writer.write_record(
                [row.external_id.as_str(), row.name.as_str()]
                    .into_iter()
                    .chain(row.cells.iter().map(String::as_str)),
            )?;
        }
        let bytes = writer.into_inner().map_err(|err| err.into_error())?;
        let body = String::from_utf8(bytes)?;
        Ok(format!("{UTF8_BOM}{body}"))
    }

    /// Parse text produced by [`ExportTable::to_csv`]. The BOM is optional.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::MissingHeader` when the header lacks the id/name
    /// columns, `ExportError::ShortRecord` or `ExportError::LongRecord` when a
    /// record's width differs from the header, or `ExportError::Csv` for
    /// malformed input.
    pub fn from_csv(text: &str) -> Result<Self, ExportError> {
        let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let header = reader.headers()?.clone();
        let expected = header.len();
        if expected < 2 {
            return Err(ExportError::MissingHeader);
        }
        let labels = header.iter().skip(2).map(str::to_owned).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map_or(0, csv::Position::line);
            let found = record.len();
            if found < expected {
                return Err(ExportError::ShortRecord { line, found, expected });
            }
            if found > expected {
                return Err(ExportError::LongRecord { line, found, expected });
            }
            let mut fields = record.iter();
            let external_id = fields.next().unwrap_or_default();
            let name = fields.next().unwrap_or_default();
            rows.push(ExportRow {
                external_id: external_id.to_owned(),
                name: name.to_owned(),
                cells: fields.map(str::to_owned).collect(),
            });
        }

        Ok(Self { labels, rows })
    }
}
