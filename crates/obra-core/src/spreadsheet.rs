//! Semicolon-delimited service spreadsheet
//!
//! Format: UTF-8 text, first line is a header, columns are
//! `item;unit;quantity` and any further columns are ignored. A blank
//! quantity marks a pending line item.

use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::registry::{ServiceDefinition, ServiceRegistry};

pub const DELIMITER: char = ';';

#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Spreadsheet is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpreadsheetRow {
    pub item: String,
    pub unit: String,
    pub quantity: String,
}

impl SpreadsheetRow {
    pub fn new(item: &str, unit: &str, quantity: &str) -> Self {
        Self {
            item: item.to_string(),
            unit: unit.to_string(),
            quantity: quantity.to_string(),
        }
    }

    /// Quantity not filled in yet
    pub fn is_pending(&self) -> bool {
        self.quantity.is_empty()
    }

    /// Service whose name equals `item`, ignoring case
    pub fn linked_service<'r>(
        &self,
        registry: &'r ServiceRegistry,
    ) -> Option<&'r ServiceDefinition> {
        registry.find_service_ignore_case(&self.item)
    }

    fn parse_line(line: &str) -> Self {
        let mut fields = line.split(DELIMITER).map(str::trim);
        Self {
            item: fields.next().unwrap_or_default().to_string(),
            unit: fields.next().unwrap_or_default().to_string(),
            quantity: fields.next().unwrap_or_default().to_string(),
        }
    }
}

/// All rows of a loaded spreadsheet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Spreadsheet {
    rows: Vec<SpreadsheetRow>,
}

impl Spreadsheet {
    /// Parse spreadsheet text
    ///
    /// The header line and blank lines are dropped, missing fields become
    /// empty strings. Lines made only of delimiters are treated as blank.
    pub fn parse(content: &str) -> Self {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let rows: Vec<SpreadsheetRow> = content
            .lines()
            .skip(1)
            .filter(|line| !line.trim().is_empty())
            .map(SpreadsheetRow::parse_line)
            .filter(|row| !(row.item.is_empty() && row.unit.is_empty() && row.quantity.is_empty()))
            .collect();
        debug!(rows = rows.len(), "Parsed spreadsheet");
        Self { rows }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, SpreadsheetError> {
        let content = String::from_utf8(bytes)?;
        Ok(Self::parse(&content))
    }

    /// Read and parse a spreadsheet file; all rows load or none do
    pub fn load(path: &Path) -> Result<Self, SpreadsheetError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(bytes)
    }

    pub fn rows(&self) -> &[SpreadsheetRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows that name a registered service, with that service
    pub fn linked_rows<'a, 'r>(
        &'a self,
        registry: &'r ServiceRegistry,
    ) -> Vec<(&'a SpreadsheetRow, &'r ServiceDefinition)> {
        self.rows
            .iter()
            .filter_map(|row| row.linked_service(registry).map(|service| (row, service)))
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_pending()).count()
    }
}
