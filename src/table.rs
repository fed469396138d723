//! Delimited-file loader.

use std::io;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

/// An in-memory table: header names plus one row of string cells per record.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    source: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Reads a delimited file with a header row.
    ///
    /// A missing file, a ragged row or invalid UTF-8 is returned as `Error::Read`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let map_err = |source| Error::Read {
            path: path.to_path_buf(),
            source,
        };

        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_path(path)
            .map_err(map_err)?;
        let table = Self::from_csv(reader, path.display().to_string()).map_err(map_err)?;
        debug!(
            path = %path.display(),
            rows = table.len(),
            columns = table.headers.len(),
            "loaded table"
        );
        Ok(table)
    }

    /// Reads a table from any reader; `source` names it in error messages.
    pub fn from_reader<R: io::Read>(reader: R, source: &str) -> Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);
        Self::from_csv(reader, source.to_string()).map_err(|source_err| Error::Read {
            path: source.into(),
            source: source_err,
        })
    }

    fn from_csv<R: io::Read>(
        mut reader: csv::Reader<R>,
        source: String,
    ) -> std::result::Result<Self, csv::Error> {
        let headers = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self {
            source,
            headers,
            rows,
        })
    }

    /// Name used in error messages, usually the file path.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::MissingColumn {
                table: self.source.clone(),
                column: name.to_string(),
            })
    }

    /// All cells of one column, in row order, exactly as they appear in the file.
    pub fn column(&self, name: &str) -> Result<Vec<&str>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    /// Like [`Table::column`] with surrounding whitespace removed, for cells that are
    /// parsed or compared rather than copied through.
    pub fn values(&self, name: &str) -> Result<Vec<&str>> {
        Ok(self.column(name)?.into_iter().map(str::trim).collect())
    }
}
