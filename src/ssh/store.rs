// ABOUTME: In-memory host store over the parsed SSH config record sequence
// ABOUTME: Provides add, clone, update (exact or regex), delete, search and listing with explicit write-back

use super::options::{HostOptions, OptionEdit};
use super::parser::{self, HostEntry, Options, Record};
use crate::error::{StoreError, StoreResult};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Owns the record sequence of one SSH config file for the lifetime of the
/// process. Mutations stay in memory until [`HostStore::save`].
#[derive(Debug)]
pub struct HostStore {
    path: PathBuf,
    records: Vec<Record>,
    next_index: usize,
    cleared: bool,
}

impl HostStore {
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let records = parser::load(&path)?;
        Ok(Self::from_records(path, records))
    }

    pub fn from_records(path: impl Into<PathBuf>, records: Vec<Record>) -> Self {
        let next_index = records
            .iter()
            .filter_map(Record::as_entry)
            .map(|entry| entry.index + 1)
            .max()
            .unwrap_or(0)
            .max(records.len());

        Self {
            path: path.into(),
            records,
            next_index,
            cleared: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Options of the `Host *` block, if the file has one.
    pub fn defaults(&self) -> Option<&Options> {
        self.entries()
            .find(|entry| entry.is_wildcard())
            .map(|entry| &entry.options)
    }

    pub fn find_host(&self, name: &str) -> Option<&HostEntry> {
        self.entries().find(|entry| entry.host == name)
    }

    /// Exact lookup, or with `regex` also a start-anchored pattern match.
    pub fn contains_host(&self, name: &str, regex: bool) -> StoreResult<bool> {
        if self.find_host(name).is_some() {
            return Ok(true);
        }
        if !regex {
            return Ok(false);
        }

        let pattern = compile_pattern(name)?;
        Ok(self
            .entries()
            .any(|entry| matches_from_start(&pattern, &entry.host)))
    }

    pub fn add_host(&mut self, name: &str, options: &HostOptions) -> StoreResult<()> {
        if self.find_host(name).is_some() {
            return Err(StoreError::HostAlreadyExists(name.to_string()));
        }

        self.append_entry(name, options.to_options());
        Ok(())
    }

    /// Copies `name`'s options, and any directives its block carries after a
    /// comment, into a new `clone_name` entry. With `keep_original` unset the
    /// source entry is removed afterwards.
    pub fn clone_host(&mut self, name: &str, clone_name: &str, keep_original: bool) -> StoreResult<()> {
        let position = self
            .position_of(name)
            .ok_or_else(|| StoreError::HostNotFound(name.to_string()))?;

        if name == clone_name || self.find_host(clone_name).is_some() {
            return Err(StoreError::HostAlreadyExists(clone_name.to_string()));
        }

        let end = self.block_end(position);
        let options = self.records[position]
            .as_entry()
            .map(|entry| entry.options.clone())
            .unwrap_or_default();
        let tail = self.records[position + 1..end].to_vec();

        let index = self.append_entry(clone_name, options);
        self.records.extend(tail.into_iter().map(|record| match record {
            Record::Directive { line, owner: Some(_) } => Record::Directive {
                line,
                owner: Some(index),
            },
            record => record,
        }));

        if !keep_original {
            self.delete_host(name)?;
        }
        Ok(())
    }

    /// Removes the first entry named `name` together with the directives its
    /// block carries after a comment or blank line.
    pub fn delete_host(&mut self, name: &str) -> StoreResult<()> {
        let position = self
            .position_of(name)
            .ok_or_else(|| StoreError::HostNotFound(name.to_string()))?;

        let end = self.block_end(position);
        self.records.drain(position..end);
        tracing::debug!("Deleted host '{}' ({} records)", name, end - position);
        Ok(())
    }

    /// Drops every record, comments and blank lines included.
    pub fn delete_all_hosts(&mut self) {
        self.records.clear();
        self.next_index = 0;
        self.cleared = true;
        tracing::debug!("Deleted all records");
    }

    /// Applies `options` to the entry named `pattern`, or with `use_regex` to
    /// every entry whose host matches `pattern` from its first character.
    /// Returns the number of entries updated.
    pub fn update_host(&mut self, pattern: &str, options: &HostOptions, use_regex: bool) -> StoreResult<usize> {
        if !use_regex {
            let entry = self
                .entries_mut()
                .find(|entry| entry.host == pattern)
                .ok_or_else(|| StoreError::HostNotFound(pattern.to_string()))?;
            apply_edits(entry, options);
            tracing::debug!("Updated host '{}'", pattern);
            return Ok(1);
        }

        let regex = compile_pattern(pattern)?;
        let mut updated = 0;
        for entry in self.entries_mut() {
            if matches_from_start(&regex, &entry.host) {
                apply_edits(entry, options);
                updated += 1;
            }
        }

        if updated == 0 {
            return Err(StoreError::HostNotFound(pattern.to_string()));
        }
        tracing::debug!("Updated {} hosts matching '{}'", updated, pattern);
        Ok(updated)
    }

    /// Entries whose host contains `substring` (case-sensitive).
    pub fn search_host(&self, substring: &str) -> Vec<&HostEntry> {
        self.entries()
            .filter(|entry| entry.host.contains(substring))
            .collect()
    }

    /// Read view of the sequence. `only_servers` keeps host entries other
    /// than `Host *`; `ordered` sorts by host, non-entries first.
    pub fn list_entries(&self, ordered: bool, only_servers: bool) -> Vec<&Record> {
        let mut records: Vec<&Record> = self
            .records
            .iter()
            .filter(|record| {
                !only_servers || record.as_entry().is_some_and(|entry| !entry.is_wildcard())
            })
            .collect();

        if ordered {
            records.sort_by(|a, b| a.host().unwrap_or("").cmp(b.host().unwrap_or("")));
        }
        records
    }

    /// Writes the sequence back to the config file. An empty sequence is only
    /// written (as an empty file) after an explicit [`HostStore::delete_all_hosts`].
    pub fn save(&mut self) -> StoreResult<bool> {
        if self.records.is_empty() && self.cleared {
            fs::write(&self.path, "").map_err(|e| StoreError::io(&self.path, e))?;
            self.cleared = false;
            tracing::info!("Cleared SSH config {}", self.path.display());
            return Ok(true);
        }

        let written = parser::write_to_file(&self.path, &self.records)?;
        if written {
            self.cleared = false;
            tracing::info!(
                records = self.records.len(),
                "Wrote SSH config {}",
                self.path.display()
            );
        }
        Ok(written)
    }

    /// Copies the on-disk config file to `target`.
    pub fn backup(&self, target: &Path) -> StoreResult<u64> {
        let bytes = fs::copy(&self.path, target).map_err(|e| StoreError::io(target, e))?;
        tracing::info!("Backed up {} to {}", self.path.display(), target.display());
        Ok(bytes)
    }

    fn entries(&self) -> impl Iterator<Item = &HostEntry> {
        self.records.iter().filter_map(Record::as_entry)
    }

    fn entries_mut(&mut self) -> impl Iterator<Item = &mut HostEntry> {
        self.records.iter_mut().filter_map(Record::as_entry_mut)
    }

    fn position_of(&self, name: &str) -> Option<usize> {
        self.records.iter().position(|record| record.host() == Some(name))
    }

    // Exclusive end of the entry's block: through its last owned directive,
    // with any comments and blank lines in between
    fn block_end(&self, position: usize) -> usize {
        let Some(index) = self.records[position].as_entry().map(|entry| entry.index) else {
            return position + 1;
        };

        let mut end = position + 1;
        for (offset, record) in self.records[position + 1..].iter().enumerate() {
            match record {
                Record::Comment(_) | Record::EmptyLine => {}
                record if record.is_owned_by(index) => end = position + offset + 2,
                _ => break,
            }
        }
        end
    }

    fn append_entry(&mut self, name: &str, options: Options) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        self.records
            .push(Record::Entry(HostEntry::new(name.to_string(), options, index)));
        tracing::debug!("Added host '{}' at index {}", name, index);
        index
    }
}

fn compile_pattern(pattern: &str) -> StoreResult<Regex> {
    Regex::new(pattern).map_err(|source| StoreError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

// Leftmost search, so any match at 0 is the one returned
fn matches_from_start(regex: &Regex, host: &str) -> bool {
    regex.find(host).is_some_and(|m| m.start() == 0)
}

// Set replaces whole values, lists included
fn apply_edits(entry: &mut HostEntry, options: &HostOptions) {
    for (key, edit) in options.iter() {
        match edit {
            OptionEdit::Set(value) => entry.options.insert(key, value.as_str()),
            OptionEdit::Remove => {
                entry.options.remove(key);
            }
        }
    }
}
