//! CLI interface for Compass.
//!
//! Each subcommand is non-interactive: arguments in, plain text or JSON out.
//!
//! - `compass serve` runs the REST API over the local data directory.
//! - `compass journey ...` reads and deletes stored journeys.
//! - `compass draft ...` edits a working draft that persists between invocations,
//!   then submits it.
//!
//! Journey references take a full UUID or unambiguous prefix. When
//! `server-url` is configured, journey and draft commands talk to that server;
//! otherwise they use local storage directly.

mod draft;
mod format;
mod journey;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::{
    auth,
    client::Client,
    config::Config,
    model::{Journey, Role},
    server,
    storage::Storage,
    store::{ImageHost, JourneyStore},
};

use draft::DraftCommand;
use journey::JourneyCommand;

/// Compass: customer journey reports.
#[derive(Debug, Parser)]
#[command(name = "compass", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    /// Session token for the remote server. Overrides `COMPASS_TOKEN` and the config file.
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r#"Workflow: recording a journey
  1. compass draft new
  2. compass draft set title "iJoin"
     compass draft set npsScore 85
     compass draft set stages[0].touchpoints[0].title "Website"
  3. compass draft add touchpoint 0
     compass draft tag 0 1 cognitive
  4. compass draft check
     → lists every field that still needs work
  5. compass draft submit
     → prints the new journey ID

Editing:
  compass draft edit a3b
  compass draft remove action 0 1 2
  compass draft image 0 0 0 screenshot.png"#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the REST API over the local data directory.
    Serve {
        /// Address to listen on. Defaults to the configured `bind`.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Log in to the configured server and print a session token.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// End the current session on the configured server.
    Logout,

    /// Manage local user accounts.
    User {
        #[command(subcommand)]
        command: UserCommand,
    },

    /// Browse stored journeys.
    Journey {
        #[command(subcommand)]
        command: JourneyCommand,
    },

    /// Build or edit a journey, then submit it.
    Draft {
        #[command(subcommand)]
        command: DraftCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Create an account in the local data directory.
    Add {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Allow this user to create, edit, and delete journeys.
        #[arg(long)]
        admin: bool,
    },
}

/// Where journey reads and writes go.
enum Backend {
    Local(Storage),
    Remote(Client),
}

impl Backend {
    fn store(&self) -> &dyn JourneyStore {
        match self {
            Self::Local(storage) => storage,
            Self::Remote(client) => client,
        }
    }

    fn images(&self) -> &dyn ImageHost {
        match self {
            Self::Local(storage) => storage,
            Self::Remote(client) => client,
        }
    }

    /// Fails unless the current user may modify journeys.
    ///
    /// Local access is trusted; a remote session must belong to an admin.
    fn require_mutation(&self) -> Result<(), String> {
        let Self::Remote(client) = self else {
            return Ok(());
        };
        let user = client
            .me()
            .map_err(|e| format!("failed to check session: {e}"))?;
        if user.role.can_mutate() {
            Ok(())
        } else {
            Err(format!(
                "{} is not an admin; only admins can create or edit journeys",
                user.email
            ))
        }
    }
}

/// Run the CLI, returning an error message on failure.
pub fn run(cli: Cli, config: &Config) -> Result<(), String> {
    let storage = Storage::new(&config.data_dir)
        .map_err(|e| format!("failed to open {}: {e}", config.data_dir.display()))?;

    match cli.command {
        Command::Serve { bind } => cmd_serve(storage, config, bind.as_deref()),
        Command::Login { email, password } => cmd_login(config, &email, &password),
        Command::Logout => cmd_logout(config, cli.token.as_deref()),
        Command::User { command } => match command {
            UserCommand::Add {
                email,
                password,
                admin,
            } => cmd_user_add(&storage, &email, &password, admin),
        },
        Command::Journey { command } => {
            let backend = backend(config, cli.token.as_deref(), &storage)?;
            journey::run(command, &backend)
        }
        Command::Draft { command } => {
            let backend = backend(config, cli.token.as_deref(), &storage)?;
            draft::run(command, &backend, &storage)
        }
    }
}

fn backend(config: &Config, token: Option<&str>, storage: &Storage) -> Result<Backend, String> {
    if config.server_url.is_some() {
        remote(config, config.resolve_token(token)).map(Backend::Remote)
    } else {
        Ok(Backend::Local(storage.clone()))
    }
}

fn cmd_serve(storage: Storage, config: &Config, bind: Option<&str>) -> Result<(), String> {
    let addr = bind.unwrap_or(&config.bind);
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("failed to start runtime: {e}"))?;
    runtime
        .block_on(server::serve(storage, addr, config.max_upload_bytes))
        .map_err(|e| format!("server failed on {addr}: {e}"))
}

fn remote(config: &Config, token: Option<String>) -> Result<Client, String> {
    let url = config.server_url.as_deref().ok_or(
        "no server configured: set server-url in ~/.compass/config.toml or COMPASS_SERVER_URL",
    )?;
    Client::new(url, token).map_err(|e| format!("failed to create client: {e}"))
}

fn cmd_login(config: &Config, email: &str, password: &str) -> Result<(), String> {
    let client = remote(config, None)?;
    let session = client
        .login(email, password)
        .map_err(|e| format!("login failed: {e}"))?;

    println!("{}", session.token);
    eprintln!(
        "Logged in to {} as {} ({}). Export COMPASS_TOKEN or add `token` to the config file.",
        client.base_url(),
        session.user.email,
        session.user.role.as_str()
    );
    Ok(())
}

fn cmd_logout(config: &Config, token: Option<&str>) -> Result<(), String> {
    let token = config
        .resolve_token(token)
        .ok_or("not logged in: no token given")?;
    remote(config, Some(token))?
        .logout()
        .map_err(|e| format!("logout failed: {e}"))?;
    eprintln!("Logged out");
    Ok(())
}

fn cmd_user_add(storage: &Storage, email: &str, password: &str, admin: bool) -> Result<(), String> {
    let role = if admin { Role::Admin } else { Role::User };
    let user = auth::register(storage, email, password, role)
        .map_err(|e| format!("failed to add user: {e}"))?;
    println!("{}", user.id);
    Ok(())
}

/// Resolve a journey reference (full UUID or unambiguous prefix) to a journey.
fn resolve_journey(store: &dyn JourneyStore, reference: &str) -> Result<Journey, String> {
    // Try full UUID first.
    if let Ok(id) = reference.parse::<Uuid>() {
        return store
            .get_journey(id)
            .map_err(|e| format!("failed to load journey: {e}"));
    }

    let summaries = store
        .list_journeys()
        .map_err(|e| format!("failed to list journeys: {e}"))?;

    let matches: Vec<_> = summaries
        .iter()
        .filter(|s| s.id.to_string().starts_with(reference))
        .collect();

    match matches.as_slice() {
        [] => Err(format!("no journey matching '{reference}'")),
        [only] => store
            .get_journey(only.id)
            .map_err(|e| format!("failed to load journey: {e}")),
        many => {
            let ids: Vec<String> = many.iter().map(|s| short_id(s.id)).collect();
            Err(format!(
                "'{reference}' is ambiguous: matches {} journeys: {}",
                many.len(),
                ids.join(", ")
            ))
        }
    }
}

fn short_id(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}
