/// A whole worksheet: a header row naming the columns and the data rows below it.
///
/// Every row holds exactly one cell per column. Rows coming from the provider
/// are padded with blank cells, so a missing value and an empty value look the
/// same.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// One data row of a [`Table`], addressed by column name.
#[derive(Clone, Copy, Debug)]
pub struct Record<'a> {
    columns: &'a [String],
    values: &'a [String],
}

impl<'a> Record<'a> {
    /// `None` when the table has no such column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let index = self.columns.iter().position(|name| name == column)?;
        self.values.get(index).map(String::as_str)
    }
}

impl Table {
    #[must_use]
    pub fn new<I: IntoIterator<Item = S>, S: Into<String>>(columns: I) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Builds a table from raw cell values where the first row is the header.
    #[must_use]
    pub fn from_values(values: Vec<Vec<String>>) -> Self {
        let mut values = values.into_iter();
        let Some(columns) = values.next() else {
            return Self::default();
        };
        let width = columns.len();
        let rows = values
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// The header row followed by every data row, ready to be written back.
    #[must_use]
    pub fn to_values(&self) -> Vec<Vec<String>> {
        if self.columns.is_empty() {
            return Vec::new();
        }
        core::iter::once(self.columns.clone())
            .chain(self.rows.iter().cloned())
            .collect()
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }

    /// Number of data rows, the header excluded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of one column, top to bottom. Empty when the column does not exist.
    pub fn column_values<'a>(&'a self, column: &str) -> impl Iterator<Item = &'a str> + 'a {
        let index = self.column_index(column);
        self.rows
            .iter()
            .filter_map(move |row| index.map(|index| row[index].as_str()))
    }

    #[must_use]
    pub fn contains(&self, column: &str, value: &str) -> bool {
        self.column_values(column).any(|cell| cell == value)
    }

    /// The first row whose `column` cell equals `value`.
    #[must_use]
    pub fn find(&self, column: &str, value: &str) -> Option<Record<'_>> {
        let index = self.column_index(column)?;
        self.rows
            .iter()
            .find(|row| row[index] == value)
            .map(|values| Record {
                columns: &self.columns,
                values,
            })
    }

    /// Appends a row. Columns the table does not have yet are added to the
    /// header, and cells the record does not mention stay blank.
    pub fn push_record(&mut self, record: &[(&str, &str)]) {
        for (column, _) in record {
            if !self.has_column(column) {
                self.columns.push((*column).to_owned());
                for row in &mut self.rows {
                    row.push(String::new());
                }
            }
        }
        let mut row = vec![String::new(); self.columns.len()];
        for (column, value) in record {
            if let Some(index) = self.column_index(column) {
                (*value).clone_into(&mut row[index]);
            }
        }
        self.rows.push(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|cell| (*cell).to_owned()).collect())
            .collect()
    }

    #[test]
    fn short_rows_are_padded_with_blanks() {
        let table = Table::from_values(values(&[&["no", "名前", "座席"], &["s001", "Taro"]]));
        let record = table.find("no", "s001").expect("row");
        assert_eq!(record.get("座席"), Some(""));
        assert_eq!(record.get("missing"), None);
        assert_eq!(
            table.to_values(),
            values(&[&["no", "名前", "座席"], &["s001", "Taro", ""]])
        );
    }

    #[test]
    fn empty_sheet_has_no_columns() {
        let table = Table::from_values(Vec::new());
        assert!(table.columns().is_empty());
        assert!(table.is_empty());
        assert!(!table.contains("名前", "Taro"));
        assert!(table.to_values().is_empty());
    }

    #[test]
    fn push_record_extends_the_header() {
        let mut table = Table::new(["名前", "メモ"]);
        table.push_record(&[("名前", "Hanako"), ("座席", "9")]);
        table.push_record(&[("名前", "Taro")]);
        assert_eq!(table.columns(), ["名前", "メモ", "座席"]);
        assert_eq!(
            table.to_values(),
            values(&[
                &["名前", "メモ", "座席"],
                &["Hanako", "", "9"],
                &["Taro", "", ""],
            ])
        );
        assert_eq!(table.column_values("座席").collect::<Vec<_>>(), ["9", ""]);
    }
}
