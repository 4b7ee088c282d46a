//! Tabular response formatting.
//!
//! The array prints listings as delimiter-joined rows with an optional
//! header row, and single objects as transposed `field value` pairs. The
//! driver-side parser reconstructs records from exactly this shape, so the
//! rendering here is the wire format.

use crate::command::Command;
use crate::error::{Error, Result};

/// Units accepted by `-unit`, in ascending order.
const UNITS: [&str; 6] = ["b", "kb", "mb", "gb", "tb", "pb"];

/// Suffixes used for human-readable capacities.
const SUFFIXES: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// Output options taken from `-delim` and `-nohdr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    /// Cell delimiter.
    pub delim: String,
    /// Drop the header row (or, for objects, the field names).
    pub nohdr: bool,
}

impl FormatOptions {
    /// Read the options from a parsed command.
    #[must_use]
    pub fn from_command(cmd: &Command) -> Self {
        Self {
            delim: cmd.value("delim").unwrap_or(" ").to_string(),
            nohdr: cmd.has("nohdr"),
        }
    }

    /// Use a custom delimiter.
    #[must_use]
    pub fn with_delim(mut self, delim: impl Into<String>) -> Self {
        self.delim = delim.into();
        self
    }

    /// Drop headers.
    #[must_use]
    pub const fn without_header(mut self) -> Self {
        self.nohdr = true;
        self
    }
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            delim: " ".to_string(),
            nohdr: false,
        }
    }
}

/// A `-filtervalue key=value` restriction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    key: String,
    value: String,
}

impl Filter {
    /// Parse `key=value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when there is no `=`.
    pub fn parse(raw: &str) -> Result<Self> {
        let (key, value) = raw
            .split_once('=')
            .ok_or_else(|| Error::invalid_input(format!("filtervalue {raw} is not key=value")))?;
        Ok(Self {
            key: key.to_string(),
            value: crate::command::unquote(value).to_string(),
        })
    }

    /// Read `-filtervalue` from a command, if given.
    pub fn from_command(cmd: &Command) -> Result<Option<Self>> {
        cmd.value("filtervalue").map(Self::parse).transpose()
    }

    /// The column being filtered on.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether a row, read against `header`, satisfies the filter.
    ///
    /// A column missing from the header never matches.
    #[must_use]
    pub fn matches(&self, header: &[String], row: &[String]) -> bool {
        header
            .iter()
            .position(|h| *h == self.key)
            .and_then(|idx| row.get(idx))
            .is_some_and(|cell| *cell == self.value)
    }
}

/// A listing: a header row followed by data rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Create a table with the given header.
    pub fn new<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rows: vec![header.into_iter().map(Into::into).collect()],
        }
    }

    /// Append a data row.
    pub fn push<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    /// The header row, empty once rows were cleared.
    #[must_use]
    pub fn header(&self) -> &[String] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// The data rows.
    #[must_use]
    pub fn body(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or(&[])
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    /// Whether there are no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keep only the data rows matching `filter`.
    pub fn retain(&mut self, filter: &Filter) {
        if self.rows.is_empty() {
            return;
        }
        let header = self.rows[0].clone();
        let mut idx = 0;
        self.rows.retain(|row| {
            idx += 1;
            idx == 1 || filter.matches(&header, row)
        });
    }

    /// Remove one field from the header only, leaving data rows wider.
    pub fn drop_header_field(&mut self, index: usize) {
        if let Some(header) = self.rows.first_mut() {
            if index < header.len() {
                header.remove(index);
            }
        }
    }

    /// Remove one column from every row.
    pub fn drop_column(&mut self, index: usize) {
        for row in &mut self.rows {
            if index < row.len() {
                row.remove(index);
            }
        }
    }

    /// Remove every row, header included.
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Render to the wire format.
    #[must_use]
    pub fn render(&self, opts: &FormatOptions) -> String {
        let skip = usize::from(opts.nohdr);
        self.rows
            .iter()
            .skip(skip)
            .map(|row| row.join(&opts.delim))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A single object rendered as `field value` rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectView {
    fields: Vec<(String, String)>,
}

impl ObjectView {
    /// Create an empty view.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field. Field names may repeat (e.g. one block per copy).
    pub fn push(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.push((field.into(), value.into()));
    }

    /// Remove every occurrence of a field.
    pub fn remove(&mut self, field: &str) {
        self.fields.retain(|(name, _)| name != field);
    }

    /// Replace the value of the first occurrence of a field.
    pub fn set(&mut self, field: &str, value: impl Into<String>) {
        if let Some(entry) = self.fields.iter_mut().find(|(name, _)| name == field) {
            entry.1 = value.into();
        }
    }

    /// The first value of a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the view has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Render to the wire format. With `nohdr` only values are printed.
    #[must_use]
    pub fn render(&self, opts: &FormatOptions) -> String {
        self.fields
            .iter()
            .map(|(field, value)| {
                if opts.nohdr {
                    value.clone()
                } else {
                    format!("{field}{}{value}", opts.delim)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Convert `size` in `unit` to bytes by repeated scaling by 1024.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] when the size is not a non-negative
/// integer or the unit is unknown.
pub fn units_to_bytes(size: &str, unit: &str) -> Result<u64> {
    let mut num: u64 = size
        .parse()
        .map_err(|_| Error::invalid_input(format!("size {size} is not a number")))?;
    let unit = unit.to_ascii_lowercase();
    let steps = UNITS
        .iter()
        .position(|u| *u == unit)
        .ok_or_else(|| Error::invalid_input(format!("unknown unit {unit}")))?;
    for _ in 0..steps {
        num = num
            .checked_mul(1024)
            .ok_or_else(|| Error::invalid_input(format!("size {size}{unit} overflows")))?;
    }
    Ok(num)
}

/// Render a byte count with a unit suffix, dividing by 1024 while the
/// value is above 1024. The result is truncated to an integer.
#[must_use]
pub fn bytes_to_human(bytes: u64) -> String {
    let mut num = bytes as f64;
    let mut idx = 0;
    while num > 1024.0 && idx < SUFFIXES.len() - 1 {
        num /= 1024.0;
        idx += 1;
    }
    format!("{}{}", num as u64, SUFFIXES[idx])
}

/// Render a capacity as raw bytes or in human-readable form.
#[must_use]
pub fn capacity(bytes: u64, raw: bool) -> String {
    if raw {
        bytes.to_string()
    } else {
        bytes_to_human(bytes)
    }
}

/// `yes`/`no` rendering.
#[must_use]
pub const fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// `on`/`off` rendering.
#[must_use]
pub const fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}
