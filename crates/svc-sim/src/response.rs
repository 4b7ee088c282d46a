//! Header-aware reader for CLI output.
//!
//! [`CliResponse`] rebuilds records from the text produced by
//! [`crate::format`]. With a header, every following row becomes one record
//! keyed by the header cells. Without one, rows are `field value` pairs and
//! a blank line starts a new record. Repeated field names collect into a
//! list, which is how per-copy and per-port blocks come back.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// A field value: one string, or several when the name repeated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// The field appeared once.
    Single(String),
    /// The field appeared more than once, in order.
    Multi(Vec<String>),
}

impl FieldValue {
    /// The first (or only) value.
    #[must_use]
    pub fn first(&self) -> &str {
        match self {
            Self::Single(v) => v,
            Self::Multi(vs) => vs.first().map_or("", String::as_str),
        }
    }

    /// Every value, in order.
    #[must_use]
    pub fn all(&self) -> Vec<&str> {
        match self {
            Self::Single(v) => vec![v.as_str()],
            Self::Multi(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    fn append(&mut self, value: String) {
        match self {
            Self::Single(existing) => {
                let first = std::mem::take(existing);
                *self = Self::Multi(vec![first, value]);
            }
            Self::Multi(vs) => vs.push(value),
        }
    }
}

/// One reconstructed record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// The first value of a field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(FieldValue::first)
    }

    /// The raw field value.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Field names, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    fn append(&mut self, key: &str, value: &str) {
        let (key, value) = (key.trim(), value.trim().to_string());
        match self.fields.get_mut(key) {
            Some(existing) => existing.append(value),
            None => {
                self.fields.insert(key.to_string(), FieldValue::Single(value));
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Parsed CLI output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliResponse {
    records: Vec<Record>,
}

impl CliResponse {
    /// Parse `stdout` split on `delim`.
    ///
    /// # Errors
    ///
    /// With `with_header`, returns [`Error::BackendApi`] when a row has a
    /// different number of cells than the header.
    pub fn parse(stdout: &str, delim: &str, with_header: bool) -> Result<Self> {
        // Lines are not trimmed; under a space delimiter trailing empty
        // cells are spaces.
        let rows: Vec<Vec<&str>> = stdout
            .trim_start_matches(['\r', '\n'])
            .lines()
            .map(|line| {
                let line = line.strip_suffix('\r').unwrap_or(line);
                if line.is_empty() {
                    Vec::new()
                } else {
                    line.split(delim).collect()
                }
            })
            .collect();

        let records = if with_header {
            Self::parse_with_header(&rows)?
        } else {
            Self::parse_sections(&rows, delim)
        };
        Ok(Self { records })
    }

    fn parse_with_header(rows: &[Vec<&str>]) -> Result<Vec<Record>> {
        let Some((header, body)) = rows.split_first() else {
            return Ok(Vec::new());
        };
        let mut records = Vec::with_capacity(body.len());
        for row in body.iter().filter(|row| !row.is_empty()) {
            if row.len() != header.len() {
                return Err(Error::BackendApi {
                    data: format!(
                        "Unexpected CLI response: header/row mismatch. header: {header:?}, row: {row:?}"
                    ),
                });
            }
            let mut record = Record::default();
            for (key, value) in header.iter().zip(row) {
                record.append(key, value);
            }
            records.push(record);
        }
        Ok(records)
    }

    fn parse_sections(rows: &[Vec<&str>], delim: &str) -> Vec<Record> {
        let mut records = Vec::new();
        let mut current = Record::default();
        for row in rows {
            if let Some((key, rest)) = row.split_first() {
                current.append(key, &rest.join(delim));
            } else if !current.is_empty() {
                records.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            records.push(current);
        }
        records
    }

    /// The parsed records.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing was parsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The first record, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Record> {
        self.records.first()
    }

    /// Project each record onto `keys`. Missing fields become empty strings.
    #[must_use]
    pub fn select(&self, keys: &[&str]) -> Vec<Vec<String>> {
        self.records
            .iter()
            .map(|r| {
                keys.iter()
                    .map(|k| r.get(k).unwrap_or_default().to_string())
                    .collect()
            })
            .collect()
    }
}
