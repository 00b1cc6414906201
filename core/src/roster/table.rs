use super::RosterEntry;
use serde::{Deserialize, Serialize};

/// Rows scanned when looking for a header row.
const HEADER_SCAN_ROWS: usize = 5;

/// One spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Cell contents as trimmed text; whole numbers lose their fractional part.
    pub fn render(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(value) => value.trim().to_string(),
            Cell::Number(value) if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 => {
                format!("{}", *value as i64)
            }
            Cell::Number(value) => value.to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(value) => value.trim().is_empty(),
            Cell::Number(value) => value.is_nan(),
        }
    }
}

/// Rows x columns of optionally empty cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub rows: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Splits delimited text (CSV export) into text cells. Double quotes group
    /// fields that contain the delimiter or line breaks; `""` is a literal quote.
    pub fn from_delimited(text: &str, delimiter: char) -> Self {
        let mut rows = Vec::new();
        let mut row = Vec::new();
        let mut field = String::new();
        let mut quoted = false;
        let mut chars = text.chars().peekable();

        while let Some(ch) = chars.next() {
            if quoted {
                if ch == '"' {
                    if chars.peek() == Some(&'"') {
                        field.push('"');
                        chars.next();
                    } else {
                        quoted = false;
                    }
                } else {
                    field.push(ch);
                }
                continue;
            }

            match ch {
                '"' if field.is_empty() => quoted = true,
                '\r' => {}
                '\n' => {
                    row.push(delimited_cell(std::mem::take(&mut field)));
                    rows.push(std::mem::take(&mut row));
                }
                c if c == delimiter => row.push(delimited_cell(std::mem::take(&mut field))),
                c => field.push(c),
            }
        }

        if !field.is_empty() || !row.is_empty() {
            row.push(delimited_cell(field));
            rows.push(row);
        }

        Self { rows }
    }

    /// Drops rows and columns that hold no data at all.
    pub fn compact(&self) -> Grid {
        let width = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        let keep_columns: Vec<usize> = (0..width)
            .filter(|&col| {
                self.rows
                    .iter()
                    .any(|row| row.get(col).is_some_and(|cell| !cell.is_blank()))
            })
            .collect();

        let rows = self
            .rows
            .iter()
            .filter(|row| row.iter().any(|cell| !cell.is_blank()))
            .map(|row| {
                keep_columns
                    .iter()
                    .map(|&col| row.get(col).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();

        Grid { rows }
    }
}

fn delimited_cell(field: String) -> Cell {
    if field.trim().is_empty() {
        Cell::Empty
    } else {
        Cell::Text(field)
    }
}

/// Column layout resolved from the header scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    pub name_column: usize,
    pub identifier_column: usize,
    /// First row holding data.
    pub data_start: usize,
}

fn header_tokens(cell: &Cell) -> Vec<String> {
    cell.render()
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}

fn is_name_header(cell: &Cell) -> bool {
    header_tokens(cell)
        .iter()
        .any(|token| token.starts_with("name") || token.ends_with("name"))
}

fn is_identifier_header(cell: &Cell) -> bool {
    header_tokens(cell)
        .iter()
        .any(|token| token.starts_with("roll") || token == "id")
}

/// Finds the name and identifier columns; a compacted grid is expected.
pub fn detect_layout(grid: &Grid) -> TableLayout {
    for (row_index, row) in grid.rows.iter().take(HEADER_SCAN_ROWS).enumerate() {
        let name_column = row.iter().position(is_name_header);
        let identifier_column = row
            .iter()
            .enumerate()
            .position(|(col, cell)| Some(col) != name_column && is_identifier_header(cell));

        let (name_column, identifier_column) = match (name_column, identifier_column) {
            (Some(name), Some(id)) => (name, id),
            (Some(name), None) => (name, if name == 1 { 0 } else { 1 }),
            (None, Some(id)) => (if id == 0 { 1 } else { 0 }, id),
            (None, None) => continue,
        };

        return TableLayout {
            name_column,
            identifier_column,
            data_start: row_index + 1,
        };
    }

    TableLayout {
        name_column: 0,
        identifier_column: 1,
        data_start: 0,
    }
}

fn is_placeholder(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("none") || value.eq_ignore_ascii_case("nan")
}

/// Extracts roster entries from a grid.
pub fn parse_grid(grid: &Grid) -> Vec<RosterEntry> {
    let grid = grid.compact();
    let layout = detect_layout(&grid);

    grid.rows
        .iter()
        .skip(layout.data_start)
        .filter_map(|row| {
            let name = row.get(layout.name_column).map(Cell::render).unwrap_or_default();
            let identifier = row
                .get(layout.identifier_column)
                .map(Cell::render)
                .unwrap_or_default();
            if is_placeholder(&name) || is_placeholder(&identifier) {
                return None;
            }
            if name.chars().count() <= 1 {
                return None;
            }
            Some(RosterEntry::new(name, identifier))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(entries: &[RosterEntry]) -> Vec<(&str, &str)> {
        entries
            .iter()
            .map(|e| (e.canonical_name.as_str(), e.identifier.as_str()))
            .collect()
    }

    #[test]
    fn header_row_selects_columns() {
        let grid = Grid::new(vec![
            vec![Cell::text("Batch 72"), Cell::Empty, Cell::Empty],
            vec![Cell::text("Roll No"), Cell::text("Student Name"), Cell::Empty],
            vec![Cell::Number(1.0), Cell::text("Jahid"), Cell::Empty],
            vec![Cell::Number(8.0), Cell::text("Fahad Akash"), Cell::Empty],
        ]);
        let entries = parse_grid(&grid);
        assert_eq!(pairs(&entries), vec![("Jahid", "1"), ("Fahad Akash", "8")]);
    }

    #[test]
    fn missing_header_defaults_to_first_two_columns() {
        let grid = Grid::new(vec![
            vec![Cell::Empty, Cell::Empty, Cell::Empty],
            vec![Cell::Empty, Cell::text("Emon"), Cell::text("3")],
            vec![Cell::Empty, Cell::text("Mitu"), Cell::Number(26.0)],
        ]);
        let entries = parse_grid(&grid);
        assert_eq!(pairs(&entries), vec![("Emon", "3"), ("Mitu", "26")]);
    }

    #[test]
    fn placeholder_and_short_rows_are_skipped() {
        let grid = Grid::new(vec![
            vec![Cell::text("Name"), Cell::text("Roll")],
            vec![Cell::text("nan"), Cell::text("4")],
            vec![Cell::text("Joy"), Cell::text("None")],
            vec![Cell::text("J"), Cell::text("5")],
            vec![Cell::text("Jim"), Cell::Empty],
            vec![Cell::text("Sahil"), Cell::Number(18.0)],
        ]);
        let entries = parse_grid(&grid);
        assert_eq!(pairs(&entries), vec![("Sahil", "18")]);
    }

    #[test]
    fn names_containing_id_letters_are_not_headers() {
        let grid = Grid::new(vec![
            vec![Cell::text("Jahid"), Cell::text("1")],
            vec![Cell::text("Nahid"), Cell::text("44")],
        ]);
        assert_eq!(detect_layout(&grid).data_start, 0);
        assert_eq!(parse_grid(&grid).len(), 2);
    }

    #[test]
    fn delimited_text_handles_quotes() {
        let grid = Grid::from_delimited("Name,Roll\r\n\"Alvi, roll-29\",29\n\"Say \"\"Hi\"\"\",7\n", ',');
        assert_eq!(grid.rows.len(), 3);
        assert_eq!(grid.rows[1][0], Cell::text("Alvi, roll-29"));
        assert_eq!(grid.rows[2][0], Cell::text("Say \"Hi\""));
        let entries = parse_grid(&grid);
        assert_eq!(pairs(&entries), vec![("Alvi, roll-29", "29"), ("Say \"Hi\"", "7")]);
    }

    #[test]
    fn fractional_numbers_keep_their_digits() {
        assert_eq!(Cell::Number(8.0).render(), "8");
        assert_eq!(Cell::Number(8.5).render(), "8.5");
        assert!(Cell::Number(f64::NAN).is_blank());
    }
}
