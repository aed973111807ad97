//! CDO grid description (`griddes`) text.
//!
//! A description is a list of `key = value` lines. Keys are case-insensitive,
//! values are numbers, whitespace-separated number lists or (optionally
//! quoted) text. Lines starting with `#` are comments, and lines without `=`
//! continue the number list of the previous key, which is how CDO writes long
//! `xvals`/`yvals` blocks.

use std::fmt;
use tracing::warn;

/// A single value in a grid description.
#[derive(Debug, Clone, PartialEq)]
pub enum GridValue {
    /// One number.
    Number(f64),
    /// Several numbers.
    List(Vec<f64>),
    /// Anything that is not numeric.
    Text(String),
}

impl GridValue {
    /// The value as a single number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            GridValue::Number(n) => Some(*n),
            GridValue::List(values) if values.len() == 1 => Some(values[0]),
            _ => None,
        }
    }

    /// The value as a number list; a single number is a list of one.
    pub fn to_list(&self) -> Option<Vec<f64>> {
        match self {
            GridValue::Number(n) => Some(vec![*n]),
            GridValue::List(values) => Some(values.clone()),
            GridValue::Text(_) => None,
        }
    }

    /// The value as text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            GridValue::Text(text) => Some(text),
            _ => None,
        }
    }

    fn parse(raw: &str) -> Self {
        let unquoted = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();
        match parse_numbers(unquoted) {
            Some(mut numbers) if numbers.len() == 1 => GridValue::Number(numbers.remove(0)),
            Some(numbers) if !numbers.is_empty() => GridValue::List(numbers),
            _ => GridValue::Text(unquoted.to_string()),
        }
    }
}

impl From<f64> for GridValue {
    fn from(value: f64) -> Self {
        GridValue::Number(value)
    }
}

impl From<usize> for GridValue {
    fn from(value: usize) -> Self {
        GridValue::Number(value as f64)
    }
}

impl From<Vec<f64>> for GridValue {
    fn from(values: Vec<f64>) -> Self {
        GridValue::List(values)
    }
}

impl From<&str> for GridValue {
    fn from(text: &str) -> Self {
        GridValue::Text(text.to_string())
    }
}

impl From<String> for GridValue {
    fn from(text: String) -> Self {
        GridValue::Text(text)
    }
}

impl fmt::Display for GridValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridValue::Number(n) => write!(f, "{n}"),
            GridValue::List(values) => {
                let joined: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", joined.join(" "))
            }
            GridValue::Text(text) => {
                if text.is_empty() || text.contains(char::is_whitespace) {
                    write!(f, "\"{text}\"")
                } else {
                    write!(f, "{text}")
                }
            }
        }
    }
}

fn parse_numbers(text: &str) -> Option<Vec<f64>> {
    text.split_whitespace().map(|token| token.parse::<f64>().ok()).collect()
}

/// An ordered set of griddes key/value pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridDescription {
    entries: Vec<(String, GridValue)>,
}

impl GridDescription {
    /// Create an empty description.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode griddes text.
    ///
    /// Lines that are neither `key = value` pairs nor number continuations
    /// are skipped with a warning.
    pub fn parse(text: &str) -> Self {
        let mut description = Self::new();
        let mut last_key: Option<String> = None;

        for (line_no, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match line.split_once('=') {
                Some((key, value)) => {
                    let key = key.trim().to_lowercase();
                    if key.is_empty() {
                        warn!(line = line_no + 1, "griddes line without key skipped: {line}");
                        last_key = None;
                        continue;
                    }
                    description.insert(key.clone(), GridValue::parse(value));
                    last_key = Some(key);
                }
                None => {
                    let continued = last_key
                        .as_deref()
                        .and_then(|key| description.extend_list(key, line).then_some(()));
                    if continued.is_none() {
                        warn!(
                            line = line_no + 1,
                            "griddes line is not a key = value pair, skipped: {line}"
                        );
                    }
                }
            }
        }

        description
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&GridValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace `key`, keeping the position of an existing entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<GridValue>) {
        let key = key.into().to_lowercase();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<GridValue> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// The `gridtype` entry as text.
    pub fn gridtype(&self) -> Option<&str> {
        self.get("gridtype").and_then(GridValue::as_text)
    }

    /// Iterate over the entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &GridValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn extend_list(&mut self, key: &str, line: &str) -> bool {
        let Some(more) = parse_numbers(line) else {
            return false;
        };
        let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == key) else {
            return false;
        };
        let mut values = match &entry.1 {
            GridValue::Number(n) => vec![*n],
            GridValue::List(values) => values.clone(),
            GridValue::Text(_) => return false,
        };
        values.extend(more);
        entry.1 = GridValue::List(values);
        true
    }
}

impl fmt::Display for GridDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.entries {
            writeln!(f, "{key:<12} = {value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_lines() {
        let desc = GridDescription::parse("gridtype = lonlat\nxsize=4\nxinc = 0.5\n");
        assert_eq!(desc.gridtype(), Some("lonlat"));
        assert_eq!(desc.get("xsize"), Some(&GridValue::Number(4.0)));
        assert_eq!(desc.get("xinc").and_then(GridValue::as_f64), Some(0.5));
    }

    #[test]
    fn lowercases_keys_and_skips_comments() {
        let desc = GridDescription::parse("# a comment = with equals\nGRIDtype = lonlat\n");
        assert_eq!(desc.len(), 1);
        assert_eq!(desc.gridtype(), Some("lonlat"));
    }

    #[test]
    fn unquotes_text_and_splits_lists() {
        let desc = GridDescription::parse(
            "proj4 = \"+proj=lcc +lat_0=63\"\nstandard_parallel = 63. 63.\nxunits = \"m\"\n",
        );
        assert_eq!(
            desc.get("proj4").and_then(GridValue::as_text),
            Some("+proj=lcc +lat_0=63")
        );
        assert_eq!(desc.get("standard_parallel"), Some(&GridValue::List(vec![63.0, 63.0])));
        assert_eq!(desc.get("xunits").and_then(GridValue::as_text), Some("m"));
    }

    #[test]
    fn continuation_lines_extend_lists() {
        let desc = GridDescription::parse("xvals = 1 2 3\n 4 5\n 6\nysize = 2\n");
        assert_eq!(
            desc.get("xvals").and_then(GridValue::to_list),
            Some(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
        );
        assert_eq!(desc.get("ysize").and_then(GridValue::as_f64), Some(2.0));
    }

    #[test]
    fn stray_words_are_skipped() {
        let desc = GridDescription::parse("Key\ngridtype = lonlat\n");
        assert_eq!(desc.len(), 1);
    }

    #[test]
    fn display_parses_back_to_same_description() {
        let mut desc = GridDescription::new();
        desc.insert("gridtype", "projection");
        desc.insert("xfirst", -922442.2);
        desc.insert("standard_parallel", vec![63.0, 63.0]);
        desc.insert("proj4", "+proj=lcc +lat_0=63 +lon_0=15");

        let reparsed = GridDescription::parse(&desc.to_string());
        assert_eq!(reparsed, desc);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut desc = GridDescription::parse("gridtype = lonlat\nxsize = 2\n");
        desc.insert("GRIDTYPE", "gaussian");
        assert_eq!(desc.iter().next().map(|(k, _)| k), Some("gridtype"));
        assert_eq!(desc.gridtype(), Some("gaussian"));
        assert!(desc.remove("xsize").is_some());
        assert!(!desc.contains("xsize"));
    }
}
