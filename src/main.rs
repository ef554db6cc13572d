// MIT License - Copyright (c) 2026 Peter Wright
// Command-line front end

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use stb_lirc::{ClientConfig, KeyPress, LircClient, RemoteController, ReplyPacket, Settings};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "stb")]
#[command(about = "Drive set-top-box remote controls through lircd")]
struct Cli {
    /// Path to the settings file (default: $STB_CONFIG_FILE_PATH or ~/.hc/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// lircd socket path, overriding lirc.socket_path
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    /// Read timeout in milliseconds, overriding lirc.read_timeout_ms
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    #[command(flatten)]
    Lirc(LircCmd),
    /// Read or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Subcommands that talk to lircd.
#[derive(Subcommand)]
enum LircCmd {
    /// Simulate a button press by sending an IR signal
    Press {
        key: String,
        /// Remote name (default: remote.name)
        remote: Option<String>,
        /// Number of presses
        #[arg(short, long, default_value_t = 1)]
        repeat: u32,
        /// Delay between presses in milliseconds (default: remote.interpress_delay_ms)
        #[arg(short, long)]
        delay_ms: Option<u64>,
    },
    /// Start repeating a key until send-stop (SEND_START)
    SendStart { key: String, remote: Option<String> },
    /// Stop repeating a key (SEND_STOP)
    SendStop { key: String, remote: Option<String> },
    /// List remotes, or the keys of one remote
    List { remote: Option<String> },
    /// Print the lircd version
    Version,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print a section or the value of section.key
    Get { key: String },
    /// Set section.key to a value
    Set { key: String, value: String },
    /// Remove section.key, or a whole section when there is no dot
    Delete { key: String },
    /// Restore the built-in defaults
    Reset,
    /// Print the whole settings file
    Output,
    /// Print which settings file is in use
    Info,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_settings(cli: &Cli) -> Result<Settings> {
    let settings = match &cli.config {
        Some(path) => Settings::load(path),
        None => Settings::load_default(),
    };
    settings.context("Failed to load settings")
}

fn client_config(cli: &Cli, settings: &Settings) -> Result<ClientConfig> {
    let mut config = ClientConfig::from_settings(settings).context("Invalid settings")?;
    if let Some(socket) = &cli.socket {
        config.socket_path = socket.clone();
    }
    if let Some(ms) = cli.timeout_ms {
        config.read_timeout = Duration::from_millis(ms);
    }
    Ok(config)
}

fn resolve_remote(arg: &Option<String>, config: &ClientConfig) -> Result<String> {
    match arg {
        Some(remote) => Ok(remote.clone()),
        None if !config.remote_name.is_empty() => Ok(config.remote_name.clone()),
        None => anyhow::bail!("No remote given and remote.name is not set"),
    }
}

fn print_presses(presses: &[KeyPress], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(presses)?);
        return Ok(());
    }
    for press in presses {
        if press.success {
            println!("Emitted {} successfully", press.key);
        } else {
            println!("Error while trying to transmit {}", press.key);
            for line in &press.data {
                println!("  {}", line);
            }
        }
    }
    Ok(())
}

fn print_reply(reply: &ReplyPacket, json: bool) -> Result<()> {
    if json {
        let value = serde_json::json!({
            "command": reply.command,
            "success": reply.success,
            "data": reply.data,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }
    if !reply.success {
        println!("lircd returned ERROR for {}", reply.command);
    }
    for line in &reply.data {
        println!("{}", line);
    }
    Ok(())
}

/// Apply a `config` subcommand, writing user-facing output to `out`.
/// Returns false when the requested key or section does not exist.
fn config_command(
    settings: &mut Settings,
    action: &ConfigAction,
    out: &mut impl Write,
) -> Result<bool> {
    match action {
        ConfigAction::Get { key } => match settings.get(key) {
            Some(value) => writeln!(out, "{}", value.trim_end())?,
            None => {
                writeln!(out, "{} is not set", key)?;
                return Ok(false);
            }
        },
        ConfigAction::Set { key, value } => {
            settings.set(key, value.as_str())?;
            settings.save()?;
            writeln!(out, "Successfully set {} to {}", key, value)?;
        }
        ConfigAction::Delete { key } => {
            if !settings.delete(key)? {
                writeln!(out, "{} is not set", key)?;
                return Ok(false);
            }
            settings.save()?;
            writeln!(out, "{} was successfully deleted.", key)?;
        }
        ConfigAction::Reset => {
            settings.reset();
            settings.save()?;
            writeln!(out, "Configuration file has been restored to its original state.")?;
        }
        ConfigAction::Output => write!(out, "{}", settings.to_toml_string()?)?,
        ConfigAction::Info => {
            writeln!(out, "Current configuration file path: {}", settings.path().display())?
        }
    }
    debug!("Settings file: {}", settings.path().display());
    Ok(true)
}

async fn lirc_command(cli: &Cli, command: &LircCmd) -> Result<bool> {
    let settings = load_settings(cli)?;
    let config = client_config(cli, &settings)?;
    let client = Arc::new(
        LircClient::from_config(&config)
            .await
            .context("Failed to connect to lircd")?,
    );

    let ok = match command {
        LircCmd::Press {
            key,
            remote,
            repeat,
            delay_ms,
        } => {
            let remote = RemoteController::new(client.clone(), resolve_remote(remote, &config)?);
            let delay = delay_ms
                .map(Duration::from_millis)
                .unwrap_or(config.interpress_delay);
            let presses = remote.press(key, *repeat, delay).await?;
            print_presses(&presses, cli.json)?;
            presses.iter().all(|p| p.success)
        }
        LircCmd::SendStart { key, remote } => {
            let reply = client.send_start(&resolve_remote(remote, &config)?, key).await?;
            print_reply(&reply, cli.json)?;
            reply.success
        }
        LircCmd::SendStop { key, remote } => {
            let reply = client.send_stop(&resolve_remote(remote, &config)?, key).await?;
            print_reply(&reply, cli.json)?;
            reply.success
        }
        LircCmd::List { remote } => {
            let reply = match remote {
                Some(remote) => client.list_remote_keys(remote).await?,
                None => client.list_remotes().await?,
            };
            print_reply(&reply, cli.json)?;
            reply.success
        }
        LircCmd::Version => {
            let reply = client.version().await?;
            print_reply(&reply, cli.json)?;
            reply.success
        }
    };

    client.close().await?;
    Ok(ok)
}

async fn run(cli: Cli) -> Result<bool> {
    match &cli.command {
        Cmd::Config { action } => {
            let mut settings = load_settings(&cli)?;
            config_command(&mut settings, action, &mut std::io::stdout().lock())
        }
        Cmd::Lirc(command) => lirc_command(&cli, command).await,
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or RUST_LOG=stb_lirc=trace).
    // Default: info. Logs go to stderr so status lines on stdout stay clean.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt()
            .without_time()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
