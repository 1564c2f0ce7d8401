//! Tabular dataset parsed from an uploaded CSV.
//!
//! Cells are kept as strings; a column is numeric when every non-empty cell
//! parses as `f64`.

use csv::ReaderBuilder;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("file is empty")]
    Empty,

    #[error("file is not valid UTF-8 text")]
    NotUtf8,

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("header row contains no columns")]
    NoColumns,

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("column {0} is not numeric")]
    NotNumeric(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Numeric,
    Text,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub column_type: ColumnType,
    pub missing: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub columns: Vec<ColumnInfo>,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    types: Vec<ColumnType>,
}

impl Dataset {
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self, DatasetError> {
        let text = std::str::from_utf8(bytes).map_err(|_| DatasetError::NotUtf8)?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        if text.trim().is_empty() {
            return Err(DatasetError::Empty);
        }

        let mut rdr = ReaderBuilder::new()
            .delimiter(sniff_delimiter(text))
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let columns: Vec<String> = rdr
            .headers()?
            .iter()
            .enumerate()
            .map(|(idx, h)| {
                if h.is_empty() {
                    format!("column_{}", idx + 1)
                } else {
                    h.to_string()
                }
            })
            .collect();
        if columns.is_empty() {
            return Err(DatasetError::NoColumns);
        }

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(|v| v.to_string()).collect());
        }

        Ok(Self::from_parts(columns, rows))
    }

    /// Assembles a dataset from already-split cells. Every row must have one
    /// cell per column.
    pub fn from_parts(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let types = (0..columns.len())
            .map(|idx| infer_type(rows.iter().filter_map(|r| r.get(idx))))
            .collect();
        Self {
            columns,
            rows,
            types,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Result<usize, DatasetError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .or_else(|| {
                self.columns
                    .iter()
                    .position(|c| c.eq_ignore_ascii_case(name))
            })
            .ok_or_else(|| DatasetError::UnknownColumn(name.to_string()))
    }

    pub fn column_type(&self, idx: usize) -> ColumnType {
        self.types.get(idx).copied().unwrap_or(ColumnType::Text)
    }

    /// Raw cell values of one column, in row order.
    pub fn values(&self, name: &str) -> Result<Vec<&str>, DatasetError> {
        let idx = self.column_index(name)?;
        Ok(self
            .rows
            .iter()
            .map(|r| r.get(idx).map(String::as_str).unwrap_or(""))
            .collect())
    }

    /// Parsed values of a numeric column, skipping empty and non-finite cells.
    pub fn numeric(&self, name: &str) -> Result<Vec<f64>, DatasetError> {
        let idx = self.column_index(name)?;
        if self.column_type(idx) != ColumnType::Numeric {
            return Err(DatasetError::NotNumeric(self.columns[idx].clone()));
        }
        Ok(self
            .rows
            .iter()
            .filter_map(|r| r.get(idx))
            .filter_map(|v| parse_finite(v))
            .collect())
    }

    /// Row-aligned numeric pairs of two columns; rows missing either value are
    /// dropped.
    pub fn numeric_pairs(&self, x: &str, y: &str) -> Result<Vec<(f64, f64)>, DatasetError> {
        let xi = self.column_index(x)?;
        let yi = self.column_index(y)?;
        for idx in [xi, yi] {
            if self.column_type(idx) != ColumnType::Numeric {
                return Err(DatasetError::NotNumeric(self.columns[idx].clone()));
            }
        }
        Ok(self
            .rows
            .iter()
            .filter_map(|r| {
                let a = parse_finite(r.get(xi)?)?;
                let b = parse_finite(r.get(yi)?)?;
                Some((a, b))
            })
            .collect())
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            rows: self.rows.len(),
            columns: self
                .columns
                .iter()
                .enumerate()
                .map(|(idx, name)| ColumnInfo {
                    name: name.clone(),
                    column_type: self.column_type(idx),
                    missing: self
                        .rows
                        .iter()
                        .filter(|r| r.get(idx).map_or(true, |v| v.is_empty()))
                        .count(),
                })
                .collect(),
        }
    }

    /// First `n` rows rendered as CSV text, header included.
    pub fn head_csv(&self, n: usize) -> String {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        // Writing into a Vec cannot fail except on field-count mismatch,
        // which `from_csv_bytes` already rejects.
        let _ = wtr.write_record(&self.columns);
        for row in self.rows.iter().take(n) {
            let _ = wtr.write_record(row);
        }
        wtr.into_inner()
            .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            .unwrap_or_default()
    }
}

/// `inf` and `NaN` parse as `f64` but are treated as text.
pub(crate) fn parse_finite(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn infer_type<'a, I>(cells: I) -> ColumnType
where
    I: Iterator<Item = &'a String>,
{
    let mut seen = false;
    for cell in cells.filter(|c| !c.is_empty()) {
        seen = true;
        if parse_finite(cell).is_none() {
            return ColumnType::Text;
        }
    }
    if seen {
        ColumnType::Numeric
    } else {
        ColumnType::Text
    }
}

fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or("");
    // Comma goes last so it wins ties.
    let candidates = [b'\t', b';', b','];
    candidates
        .iter()
        .copied()
        .max_by_key(|d| header.bytes().filter(|b| b == d).count())
        .filter(|d| header.bytes().any(|b| b == *d))
        .unwrap_or(b',')
}
