//! Parsing of uploaded status sheets.
//!
//! A sheet is delimited text whose first non-blank line names the columns.
//! The delivery-number and status columns are located by case-insensitive
//! substring search over Portuguese and English synonyms.

use thiserror::Error;

use crate::domain::normalise_delivery_number;

const NUMBER_SYNONYMS: [&str; 7] = [
    "numero",
    "número",
    "number",
    "nº",
    "container",
    "entrega",
    "delivery",
];
const STATUS_SYNONYMS: [&str; 2] = ["status", "situa"];
const SUBMITTED_SYNONYMS: [&str; 6] = [
    "entregue",
    "delivered",
    "submitted",
    "enviado",
    "concluid",
    "finaliz",
];
const PENDING_SYNONYMS: [&str; 5] = ["pendente", "pending", "draft", "rascunho", "aguardando"];

/// Validation failures for an uploaded sheet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconciliationError {
    /// Fewer than two non-blank lines: no header or no data.
    #[error("the file must contain a header line and at least one data line")]
    TooFewLines,
    /// No header names a delivery-number column.
    #[error("no delivery number column found in headers: {}", .headers.join(", "))]
    MissingNumberColumn {
        /// Headers as read from the file.
        headers: Vec<String>,
    },
    /// No header names a status column.
    #[error("no status column found in headers: {}", .headers.join(", "))]
    MissingStatusColumn {
        /// Headers as read from the file.
        headers: Vec<String>,
    },
}

impl ReconciliationError {
    /// Headers found in the file, when the failure concerns them.
    #[must_use]
    pub fn headers(&self) -> Option<&[String]> {
        match self {
            Self::TooFewLines => None,
            Self::MissingNumberColumn { headers } | Self::MissingStatusColumn { headers } => {
                Some(headers)
            }
        }
    }
}

/// One usable data row of a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    /// Upper-cased delivery number.
    pub delivery_number: String,
    /// Lower-cased status text as uploaded.
    pub status: String,
}

/// Parse a status sheet into its usable rows.
///
/// Rows with an empty number or status cell are skipped.
///
/// # Errors
/// Returns [`ReconciliationError`] when the file is too short or a required
/// column cannot be found.
///
/// # Examples
/// ```
/// use podtrack::domain::parse_status_sheet;
///
/// let rows = parse_status_sheet("Número;Situação\ncnt-1;Entregue\n").unwrap();
/// assert_eq!(rows[0].delivery_number, "CNT-1");
/// assert_eq!(rows[0].status, "entregue");
/// ```
pub fn parse_status_sheet(input: &str) -> Result<Vec<SheetRow>, ReconciliationError> {
    let mut lines = input
        .lines()
        .map(|line| line.trim_start_matches('\u{feff}'))
        .filter(|line| !line.trim().is_empty());
    let (Some(header_line), Some(first_data)) = (lines.next(), lines.next()) else {
        return Err(ReconciliationError::TooFewLines);
    };

    let delimiter = detect_delimiter(header_line);
    let headers = split_cells(header_line, delimiter);
    let lowered: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();

    let Some(number_column) = find_column(&lowered, &NUMBER_SYNONYMS) else {
        return Err(ReconciliationError::MissingNumberColumn { headers });
    };
    let Some(status_column) = find_column(&lowered, &STATUS_SYNONYMS) else {
        return Err(ReconciliationError::MissingStatusColumn { headers });
    };

    let rows = std::iter::once(first_data)
        .chain(lines)
        .filter_map(|line| {
            let cells = split_cells(line, delimiter);
            let number = cells.get(number_column).map(|cell| cell.trim())?;
            let status = cells.get(status_column).map(|cell| cell.trim())?;
            if number.is_empty() || status.is_empty() {
                return None;
            }
            Some(SheetRow {
                delivery_number: normalise_delivery_number(number),
                status: status.to_lowercase(),
            })
        })
        .collect();
    Ok(rows)
}

/// Map uploaded status text onto the stored vocabulary.
///
/// Text that matches no synonym is returned lower-cased as is, so unknown
/// statuses surface as proposed changes rather than errors.
#[must_use]
pub fn normalise_sheet_status(raw: &str) -> String {
    let status = raw.trim().to_lowercase();
    if SUBMITTED_SYNONYMS.iter().any(|s| status.contains(s)) {
        "submitted".to_owned()
    } else if PENDING_SYNONYMS.iter().any(|s| status.contains(s)) {
        "pending".to_owned()
    } else {
        status
    }
}

fn detect_delimiter(header: &str) -> char {
    [';', '\t']
        .into_iter()
        .find(|candidate| header.contains(*candidate))
        .unwrap_or(',')
}

fn find_column(headers: &[String], synonyms: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|header| synonyms.iter().any(|synonym| header.contains(synonym)))
}

/// Split one line, honouring double-quoted cells and `""` escapes.
fn split_cells(line: &str, delimiter: char) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            c if c == delimiter && !quoted => cells.push(std::mem::take(&mut cell).trim().to_owned()),
            c => cell.push(c),
        }
    }
    cells.push(cell.trim().to_owned());
    cells
}
