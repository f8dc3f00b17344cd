// ABOUTME: Parser for user@host:port connection strings given on the command line
// ABOUTME: Missing user or port fall back to the caller-supplied defaults

use anyhow::{Context, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionUri {
    pub user: String,
    pub host: String,
    pub port: u16,
}

pub fn parse(uri: &str, default_user: &str, default_port: u16) -> Result<ConnectionUri> {
    let (user, host_port) = match uri.rsplit_once('@') {
        Some((user, rest)) if !user.is_empty() => (user.to_string(), rest),
        Some((_, rest)) => (default_user.to_string(), rest),
        None => (default_user.to_string(), uri),
    };

    let (host, port) = match host_port.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .ok()
                .context("port must be numeric")?;
            (host, port)
        }
        None => (host_port, default_port),
    };

    if host.is_empty() {
        anyhow::bail!("host cannot be empty in '{}'", uri);
    }

    Ok(ConnectionUri {
        user,
        host: host.to_string(),
        port,
    })
}
