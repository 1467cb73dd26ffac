use crate::MenuError;

/// A grid of optional cell texts. Row 0 is the header row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuTable {
    rows: Vec<Vec<Option<String>>>,
}

impl MenuTable {
    pub fn new(rows: Vec<Vec<Option<String>>>) -> Self {
        Self { rows }
    }

    /// Builds a table from plain strings, mapping `""` to an empty cell.
    pub fn from_strings<R, C, S>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| {
                        let cell = cell.into();
                        (!cell.is_empty()).then_some(cell)
                    })
                    .collect()
            })
            .collect();
        Self { rows }
    }

    pub fn header(&self) -> &[Option<String>] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of valid column indices, as defined by the header row.
    pub fn width(&self) -> usize {
        self.header().len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell text, or `None` when the position is empty or out of range.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column)?.as_deref()
    }
}

/// Turns raw document bytes into the first table of the first page.
pub trait TableParser {
    fn parse_first_table(&self, bytes: &[u8]) -> Result<Option<MenuTable>, MenuError>;
}

pub fn extract_table(parser: &impl TableParser, bytes: &[u8]) -> Result<MenuTable, MenuError> {
    match parser.parse_first_table(bytes)? {
        Some(table) if table.row_count() > 0 => Ok(table),
        _ => Err(MenuError::ExtractionError("no table found".to_string())),
    }
}
