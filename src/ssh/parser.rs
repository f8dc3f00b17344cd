// ABOUTME: Order-preserving parser and serializer for the OpenSSH client config format
// ABOUTME: Keeps comments, blank lines and directive order so a load/dump cycle is lossless

use crate::error::{StoreError, StoreResult};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

const INDENT: &str = "    ";

/// A directive value. Repeating a directive under one Host turns it into a list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionValue {
    Scalar(String),
    List(Vec<String>),
}

impl OptionValue {
    /// Every value in collection order; a scalar yields one item.
    pub fn values(&self) -> &[String] {
        match self {
            OptionValue::Scalar(value) => std::slice::from_ref(value),
            OptionValue::List(values) => values,
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            OptionValue::Scalar(value) => Some(value),
            OptionValue::List(_) => None,
        }
    }

    fn push(&mut self, value: String) {
        match self {
            OptionValue::Scalar(first) => {
                let first = std::mem::take(first);
                *self = OptionValue::List(vec![first, value]);
            }
            OptionValue::List(values) => values.push(value),
        }
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Scalar(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Scalar(value)
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.values().join(","))
    }
}

/// Insertion-ordered directive map. Keys are stored lowercase and looked up
/// case-insensitively.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Options {
    entries: Vec<(String, OptionValue)>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.position(key).map(|i| &self.entries[i].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Sets `key`, replacing any previous value (scalar or list) in place.
    /// New keys go to the end.
    pub fn insert(&mut self, key: &str, value: impl Into<OptionValue>) {
        let value = value.into();
        match self.position(key) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((key.to_lowercase(), value)),
        }
    }

    /// Adds one occurrence of `key`, promoting an existing scalar to a list.
    pub fn append(&mut self, key: &str, value: String) {
        match self.position(key) {
            Some(i) => self.entries[i].1.push(value),
            None => self.entries.push((key.to_lowercase(), OptionValue::Scalar(value))),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<OptionValue> {
        self.position(key).map(|i| self.entries.remove(i).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(key))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostEntry {
    pub host: String,     // Raw pattern after `Host`, possibly several aliases
    pub options: Options,
    pub index: usize,     // Sequence position, used when appending
}

impl HostEntry {
    pub fn new(host: String, options: Options, index: usize) -> Self {
        Self { host, options, index }
    }

    pub fn is_wildcard(&self) -> bool {
        self.host == "*"
    }
}

/// One structural unit of the config file, in file order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Record {
    Entry(HostEntry),
    Comment(String),
    EmptyLine,
    /// A directive outside any open Host block, kept verbatim. `owner` is the
    /// index of the Host entry whose block it still belongs to (a line after a
    /// comment or blank line inside that block); top-level lines and `Match`
    /// blocks have none.
    Directive { line: String, owner: Option<usize> },
}

impl Record {
    pub fn as_entry(&self) -> Option<&HostEntry> {
        match self {
            Record::Entry(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn as_entry_mut(&mut self) -> Option<&mut HostEntry> {
        match self {
            Record::Entry(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn host(&self) -> Option<&str> {
        self.as_entry().map(|entry| entry.host.as_str())
    }

    pub fn is_owned_by(&self, index: usize) -> bool {
        matches!(self, Record::Directive { owner: Some(owner), .. } if *owner == index)
    }
}

/// Reads `path` into a record sequence, creating the file (and its parent
/// directories) when it does not exist yet.
pub fn load(path: &Path) -> StoreResult<Vec<Record>> {
    if !path.exists() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        File::create(path).map_err(|e| StoreError::io(path, e))?;
        tracing::debug!("Created empty SSH config at {}", path.display());
    }

    let content = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    let records = parse_config_content(&content);
    tracing::debug!(
        records = records.len(),
        "Loaded SSH config from {}",
        path.display()
    );

    Ok(records)
}

pub fn parse_config_content(content: &str) -> Vec<Record> {
    let mut records = Vec::new();
    let mut current: Option<HostEntry> = None;
    // Block the next orphan directive belongs to; survives comments and blank lines
    let mut block: Option<usize> = None;

    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            close_entry(&mut records, &mut current);
            records.push(Record::EmptyLine);
            continue;
        }

        if trimmed.starts_with('#') {
            close_entry(&mut records, &mut current);
            records.push(Record::Comment(line.to_string()));
            continue;
        }

        let (key, value) = split_directive(trimmed);

        if key.eq_ignore_ascii_case("host") {
            close_entry(&mut records, &mut current);
            // Nothing else is pushed while an entry is open, so this is its final slot
            current = Some(HostEntry::new(value.to_string(), Options::new(), records.len()));
            block = Some(records.len());
            continue;
        }

        if key.eq_ignore_ascii_case("match") {
            close_entry(&mut records, &mut current);
            block = None;
            records.push(Record::Directive {
                line: line.to_string(),
                owner: None,
            });
            continue;
        }

        match current.as_mut() {
            Some(entry) => entry.options.append(key, value.to_string()),
            None => records.push(Record::Directive {
                line: line.to_string(),
                owner: block,
            }),
        }
    }

    close_entry(&mut records, &mut current);
    records
}

fn close_entry(records: &mut Vec<Record>, current: &mut Option<HostEntry>) {
    if let Some(entry) = current.take() {
        records.push(Record::Entry(entry));
    }
}

/// Splits `Key value` or `Key=value` at the first separator.
fn split_directive(line: &str) -> (&str, &str) {
    let end = line
        .find(|c: char| c.is_whitespace() || c == '=')
        .unwrap_or(line.len());
    let (key, rest) = line.split_at(end);
    let rest = rest.trim_start();
    let rest = rest.strip_prefix('=').unwrap_or(rest);

    (key, rest.trim())
}

/// Renders the sequence back to config text. `None` means there is nothing to
/// persist, which is not the same as persisting an empty file.
pub fn dump(records: &[Record]) -> Option<String> {
    if records.is_empty() {
        return None;
    }

    let mut out = String::new();
    for record in records {
        match record {
            Record::Comment(text) | Record::Directive { line: text, .. } => {
                out.push_str(text);
                out.push('\n');
            }
            Record::EmptyLine => out.push('\n'),
            Record::Entry(entry) => render_entry(&mut out, entry),
        }
    }

    Some(out)
}

fn render_entry(out: &mut String, entry: &HostEntry) {
    if entry.host.is_empty() {
        out.push_str("Host\n");
    } else {
        out.push_str(&format!("Host {}\n", entry.host));
    }

    for (key, value) in entry.options.iter() {
        for item in value.values() {
            if item.is_empty() {
                out.push_str(&format!("{INDENT}{key}\n"));
            } else {
                out.push_str(&format!("{INDENT}{key} {item}\n"));
            }
        }
    }
}

/// Writes the dumped sequence to `path`. Returns `Ok(false)` without touching
/// the file when there is nothing to persist.
pub fn write_to_file(path: &Path, records: &[Record]) -> StoreResult<bool> {
    let Some(content) = dump(records) else {
        tracing::debug!("Nothing to write to {}", path.display());
        return Ok(false);
    };

    let file = File::create(path).map_err(|e| StoreError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(content.as_bytes())
        .and_then(|_| writer.flush())
        .map_err(|e| StoreError::io(path, e))?;

    Ok(true)
}
