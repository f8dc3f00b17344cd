// ABOUTME: Command-line entry point for storm: add, edit, update, delete, list and search SSH hosts
// ABOUTME: Thin glue over the host store; all formatting of results happens here

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use storm::config::Config;
use storm::defaults::Defaults;
use storm::ssh::options::parse_assignment;
use storm::ssh::uri::{self, ConnectionUri};
use storm::ssh::{HostEntry, HostOptions, HostStore, IdentityFile, Record};
use tracing_subscriber::EnvFilter;

// Shown in the host summary line rather than as custom options
const SUMMARY_KEYS: &[&str] = &["user", "hostname", "port"];

#[derive(Parser)]
#[command(name = "storm")]
#[command(about = "Manage your SSH client config", long_about = None)]
struct Cli {
    /// SSH config file to operate on (defaults to ssh.config_path from the storm config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Adds a new entry to sshconfig
    Add {
        name: String,
        connection_uri: String,
        #[arg(long = "id_file", visible_alias = "id-file")]
        id_file: Option<String>,
        /// Extra directive as KEY=VALUE, repeatable
        #[arg(short = 'o', long = "option")]
        options: Vec<String>,
    },
    /// Clones an entry under a new name
    Clone { name: String, clone_name: String },
    /// Renames an entry
    Move { name: String, entry_name: String },
    /// Edits the related entry in sshconfig
    Edit {
        name: String,
        connection_uri: String,
        #[arg(long = "id_file", visible_alias = "id-file")]
        id_file: Option<String>,
        #[arg(short = 'o', long = "option")]
        options: Vec<String>,
    },
    /// Updates every entry whose name matches a regular expression from its start
    Update {
        name: String,
        #[arg(long = "id_file", visible_alias = "id-file")]
        id_file: Option<String>,
        #[arg(short = 'o', long = "option")]
        options: Vec<String>,
    },
    /// Deletes a single host
    Delete { name: String },
    /// Lists all hosts from sshconfig
    List,
    /// Searches entries by given search text
    Search { search_text: String },
    /// Deletes all hosts from sshconfig
    #[command(name = "delete_all", visible_alias = "delete-all")]
    DeleteAll,
    /// Backs up the ssh config into the target file
    Backup { target_file: PathBuf },
    /// Prints the storm version
    Version,
}

fn main() -> ExitCode {
    init_tracing();

    let config = Config::default_config_path()
        .map(|path| Config::load_or_create(&path))
        .unwrap_or_default();
    let cli = Cli::parse_from(config.expand_aliases(std::env::args().collect()));

    match run(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("STORM_LOG").unwrap_or_else(|_| EnvFilter::new("storm=warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli, config: &Config) -> Result<()> {
    let command = match cli.command {
        Commands::Version => {
            println!("{}", storm::VERSION);
            return Ok(());
        }
        command => command,
    };

    let path = match cli.config {
        Some(path) => path,
        None => config.ssh_config_path()?,
    };
    let mut store = open_store(&path)?;

    match command {
        Commands::Add { name, connection_uri, id_file, options } => {
            validate_name(&name)?;
            let target = resolve_uri(&store, &connection_uri)?;
            let options = connection_options(&target, id_file.as_deref(), &options);

            store.add_host(&name, &options)?;
            store.save()?;
            success(&format!(
                "{name} added to your ssh config. you can connect it by typing \"ssh {name}\"."
            ));
        }
        Commands::Clone { name, clone_name } => {
            validate_name(&name)?;
            store.clone_host(&name, &clone_name, true)?;
            store.save()?;
            success(&format!(
                "{clone_name} added to your ssh config. you can connect it by typing \"ssh {clone_name}\"."
            ));
        }
        Commands::Move { name, entry_name } => {
            validate_name(&name)?;
            store.clone_host(&name, &entry_name, false)?;
            store.save()?;
            success(&format!(
                "{entry_name} moved in ssh config. you can connect it by typing \"ssh {entry_name}\"."
            ));
        }
        Commands::Edit { name, connection_uri, id_file, options } => {
            // Multi-alias hosts are given comma-separated on the command line
            let name = name.replace(',', " ");
            let target = resolve_uri(&store, &connection_uri)?;
            let options = connection_options(&target, id_file.as_deref(), &options);

            store.update_host(&name, &options, false)?;
            store.save()?;
            success(&format!("\"{name}\" updated successfully."));
        }
        Commands::Update { name, id_file, options } => {
            let settings = update_options(id_file.as_deref(), &options)?;

            let updated = store.update_host(&name, &settings, true)?;
            store.save()?;
            tracing::debug!("{} entries matched '{}'", updated, name);
            success(&format!("\"{name}\" updated successfully."));
        }
        Commands::Delete { name } => {
            store.delete_host(&name)?;
            store.save()?;
            success(&format!("hostname \"{name}\" deleted successfully."));
        }
        Commands::List => print!("{}", render_list(&store)),
        Commands::Search { search_text } => print!("{}", render_search(&store, &search_text)),
        Commands::DeleteAll => {
            store.delete_all_hosts();
            store.save()?;
            success("all entries deleted.");
        }
        Commands::Backup { target_file } => {
            store.backup(&target_file)?;
        }
        Commands::Version => println!("{}", storm::VERSION),
    }

    Ok(())
}

fn open_store(path: &Path) -> Result<HostStore> {
    HostStore::open(path)
        .with_context(|| format!("Failed to load SSH config: {}", path.display()))
}

fn success(message: &str) {
    println!("success {message}");
}

fn validate_name(name: &str) -> Result<()> {
    if name.contains('@') {
        anyhow::bail!("invalid value: \"@\" cannot be used in name.");
    }
    Ok(())
}

fn resolve_uri(store: &HostStore, connection_uri: &str) -> Result<ConnectionUri> {
    let defaults = Defaults::new(store.defaults());
    uri::parse(connection_uri, &defaults.user(), defaults.port())
}

fn connection_options(target: &ConnectionUri, id_file: Option<&str>, custom: &[String]) -> HostOptions {
    HostOptions::for_connection(
        &target.host,
        &target.user,
        target.port,
        IdentityFile::from_arg(id_file),
        custom,
    )
}

fn update_options(id_file: Option<&str>, custom: &[String]) -> Result<HostOptions> {
    let mut settings = HostOptions::new();
    if let Some(id_file) = id_file.filter(|id_file| !id_file.is_empty()) {
        settings.set("identityfile", id_file);
    }

    for option in custom {
        let (key, value) = parse_assignment(option)
            .with_context(|| format!("invalid option '{option}': expected KEY=VALUE"))?;
        settings.set(&key, &value);
    }

    Ok(settings)
}

fn summary(entry: &HostEntry, defaults: &Defaults) -> String {
    let user = entry
        .options
        .get("user")
        .map(ToString::to_string)
        .unwrap_or_else(|| defaults.user());
    let hostname = entry
        .options
        .get("hostname")
        .map(ToString::to_string)
        .unwrap_or_else(|| "[hostname_not_specified]".to_string());
    let port = entry
        .options
        .get("port")
        .map(ToString::to_string)
        .unwrap_or_else(|| defaults.port().to_string());

    format!("{} -> {}@{}:{}", entry.host, user, hostname, port)
}

fn render_list(store: &HostStore) -> String {
    let defaults = Defaults::new(store.defaults());
    let mut out = String::from("Listing entries:\n\n");
    let mut general = String::new();

    for entry in store.list_entries(true, false).into_iter().filter_map(Record::as_entry) {
        if entry.is_wildcard() {
            general.push_str("   (*) General options:\n");
            for (key, value) in entry.options.iter() {
                general.push_str(&format!("\t  {}: {}\n", key, value.values().join(", ")));
            }
            continue;
        }

        out.push_str(&format!("    {}", summary(entry, &defaults)));
        let custom: Vec<String> = entry
            .options
            .iter()
            .filter(|(key, _)| !SUMMARY_KEYS.contains(key))
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        if !custom.is_empty() {
            out.push_str(&format!("\n\t[custom options] {}", custom.join(" ")));
        }
        out.push_str("\n\n");
    }

    out.push_str(&general);
    out
}

fn render_search(store: &HostStore, search_text: &str) -> String {
    let results = store.search_host(search_text);
    if results.is_empty() {
        return "no results found.\n".to_string();
    }

    let defaults = Defaults::new(store.defaults());
    let mut out = format!("Listing results for {search_text}:\n");
    for entry in results {
        out.push_str(&format!("    {}\n", summary(entry, &defaults)));
    }
    out
}
