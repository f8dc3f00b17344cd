// ABOUTME: Resolves the default user and port for new entries
// ABOUTME: Values from the `Host *` block win over the OS user and port 22

use crate::ssh::Options;

pub const DEFAULT_PORT: u16 = 22;

#[derive(Debug, Clone, Copy)]
pub struct Defaults<'a> {
    wildcard: Option<&'a Options>,
}

impl<'a> Defaults<'a> {
    pub fn new(wildcard: Option<&'a Options>) -> Self {
        Self { wildcard }
    }

    pub fn user(&self) -> String {
        self.lookup("user").unwrap_or_else(whoami::username)
    }

    /// A non-numeric `Port` under `Host *` is ignored.
    pub fn port(&self) -> u16 {
        self.lookup("port")
            .and_then(|port| port.parse().ok())
            .unwrap_or(DEFAULT_PORT)
    }

    fn lookup(&self, key: &str) -> Option<String> {
        self.wildcard
            .and_then(|options| options.get(key))
            .and_then(|value| value.values().first().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_wildcard() {
        let defaults = Defaults::new(None);

        assert_eq!(defaults.port(), DEFAULT_PORT);
        assert_eq!(defaults.user(), whoami::username());
    }

    #[test]
    fn test_defaults_from_wildcard_options() {
        let mut options = Options::new();
        options.insert("User", "customuser");
        options.insert("Port", "2222");
        let defaults = Defaults::new(Some(&options));

        assert_eq!(defaults.user(), "customuser");
        assert_eq!(defaults.port(), 2222);
    }

    #[test]
    fn test_non_numeric_port_falls_back() {
        let mut options = Options::new();
        options.insert("port", "ssh");

        assert_eq!(Defaults::new(Some(&options)).port(), DEFAULT_PORT);
    }
}
