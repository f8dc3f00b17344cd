// ABOUTME: Option payloads handed to the host store for add and update operations
// ABOUTME: Normalizes keys, quotes identity files and turns the DELETED sentinel into a removal

use super::parser::Options;

/// Legacy identity-file value meaning "remove the directive".
pub const DELETED_SIGN: &str = "DELETED";

// Directives whose values are written wrapped in double quotes
const QUOTED_KEYS: &[&str] = &["identityfile"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionEdit {
    Set(String),
    Remove,
}

/// What to do with a host's identity file when building a payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum IdentityFile {
    #[default]
    Unchanged,
    Set(String),
    Remove,
}

impl IdentityFile {
    /// Interprets a command-line value: empty means unchanged, `DELETED` means remove.
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            None | Some("") => IdentityFile::Unchanged,
            Some(DELETED_SIGN) => IdentityFile::Remove,
            Some(path) => IdentityFile::Set(path.to_string()),
        }
    }
}

/// Ordered set of directive edits, keyed by lowercase directive name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostOptions {
    edits: Vec<(String, OptionEdit)>,
}

impl HostOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload for a host reached at `user@hostname:port`, followed by the
    /// identity file and any `Key=Value` custom options.
    pub fn for_connection(
        hostname: &str,
        user: &str,
        port: u16,
        identity: IdentityFile,
        custom: &[String],
    ) -> Self {
        let mut options = Self::new();
        options.set("hostname", hostname);
        options.set("user", user);
        options.set("port", &port.to_string());

        match identity {
            IdentityFile::Unchanged => {}
            IdentityFile::Set(path) => options.set("identityfile", &path),
            IdentityFile::Remove => options.remove("identityfile"),
        }

        for option in custom {
            match parse_assignment(option) {
                Some((key, value)) => options.set(&key, &value),
                None => tracing::warn!("Ignoring custom option without '=': {}", option),
            }
        }

        options
    }

    /// Sets `key` to `value`. A later edit of the same key replaces the earlier one.
    pub fn set(&mut self, key: &str, value: &str) {
        let key = key.to_lowercase();
        let edit = if key == "identityfile" && value == DELETED_SIGN {
            OptionEdit::Remove
        } else {
            OptionEdit::Set(quote_value(&key, value))
        };
        self.push(key, edit);
    }

    pub fn remove(&mut self, key: &str) {
        self.push(key.to_lowercase(), OptionEdit::Remove);
    }

    pub fn get(&self, key: &str) -> Option<&OptionEdit> {
        self.edits
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(key))
            .map(|(_, edit)| edit)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionEdit)> {
        self.edits.iter().map(|(key, edit)| (key.as_str(), edit))
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// The `Set` edits as a directive map, for creating a new entry.
    pub fn to_options(&self) -> Options {
        let mut options = Options::new();
        for (key, edit) in self.iter() {
            if let OptionEdit::Set(value) = edit {
                options.insert(key, value.as_str());
            }
        }
        options
    }

    fn push(&mut self, key: String, edit: OptionEdit) {
        match self.edits.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, existing)) => *existing = edit,
            None => self.edits.push((key, edit)),
        }
    }
}

/// Splits `Key=Value` at the first `=`, lowercasing the key.
pub fn parse_assignment(option: &str) -> Option<(String, String)> {
    let (key, value) = option.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_lowercase(), value.to_string()))
}

/// Wraps values of quoted directives in double quotes, stripping any quotes
/// already present so repeated edits stay stable.
pub fn quote_value(key: &str, value: &str) -> String {
    if QUOTED_KEYS.contains(&key) {
        format!("\"{}\"", value.trim_matches('"'))
    } else {
        value.to_string()
    }
}
