use std::sync::Arc;

use adminboard::config::{ConfigError, DashboardConfig};
use adminboard::records::{Record, RecordError, derive_columns};
use adminboard::resources::{Resource, ResourceClient};
use adminboard::routes;
use adminboard::session::token_store::{FileStorage, MemoryFlag};
use adminboard::session::transport::ApiRequest;
use adminboard::session::types::{ActionOutcome, LoginOutcome};
use adminboard::session::{SessionClient, SessionContext, SessionError, TokenStore};
use adminboard::summary::{self, DateRange};
use clap::{Parser, Subcommand};
use serde_json::Value;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Session(#[from] SessionError),
    #[error("{0}")]
    Record(#[from] RecordError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("login failed: {0}")]
    LoginFailed(String),
    #[error("not signed in; run `adminboard login` first")]
    NotSignedIn,
    #[error("{0}")]
    ActionFailed(String),
    #[error("invalid edit `{0}`; expected field=value")]
    InvalidEdit(String),
}

#[derive(Parser, Debug)]
#[command(name = "adminboard", about = "Admin dashboard gate server and session CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the dashboard bundle behind the edge gate.
    Serve,
    #[command(flatten)]
    Session(SessionCommand),
}

/// Commands that drive the session client against the file token store.
#[derive(Subcommand, Debug)]
enum SessionCommand {
    Login {
        #[arg(long)]
        identifier: String,
        #[arg(long, env = "ADMINBOARD_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Whoami,
    Logout,
    /// Authorized GET against any backend endpoint, e.g. `/payments`.
    Get {
        endpoint: String,
    },
    /// List a collection as rows.
    List {
        resource: Resource,
    },
    /// Edit fields of one row: `adminboard edit payments p-1 amount=130`.
    Edit {
        resource: Resource,
        id: String,
        #[arg(required = true)]
        edits: Vec<String>,
    },
    Delete {
        resource: Resource,
        id: String,
    },
    /// Payment totals, pay-option shares, and month-over-month growth.
    Stats {
        /// First day of the pay-option window (YYYY-MM-DD).
        #[arg(long, value_parser = parse_day)]
        from: Option<Date>,
        /// Last day of the pay-option window, inclusive.
        #[arg(long, value_parser = parse_day)]
        to: Option<Date>,
    },
    ForgotPassword {
        email: String,
    },
    VerifyOtp {
        otp: String,
    },
    ResetPassword {
        #[arg(long)]
        email: String,
        #[arg(long)]
        otp: String,
        #[arg(long, env = "ADMINBOARD_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = DashboardConfig::from_env()?;

    match cli.command {
        Command::Serve => run_serve(&config).await,
        Command::Session(command) => run_session(&config, command).await,
    }
}

async fn run_serve(config: &DashboardConfig) -> Result<(), CliError> {
    let app = routes::app(config);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    let port = config.port;
    tracing::info!(%port, static_dir = %config.static_dir.display(), "adminboard listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_session(config: &DashboardConfig, command: SessionCommand) -> Result<(), CliError> {
    let storage = Arc::new(FileStorage::new(config.token_store_path.clone()));
    tracing::debug!(path = %storage.path().display(), "token file");
    let tokens = TokenStore::new(storage, Arc::new(MemoryFlag::default()));
    let client = Arc::new(SessionClient::from_config(config, tokens)?);

    match command {
        SessionCommand::Login { identifier, password } => match client.login(&identifier, &password).await? {
            LoginOutcome::Success(user) => {
                eprintln!("signed in as {}", user.email);
                print_json(&serde_json::to_value(&user)?)
            }
            LoginOutcome::Failure(reason) => Err(CliError::LoginFailed(reason)),
        },
        SessionCommand::Whoami => {
            let session = SessionContext::new(client);
            session.initialize().await;
            let user = session.user().ok_or(CliError::NotSignedIn)?;
            print_json(&serde_json::to_value(&user)?)
        }
        SessionCommand::Logout => {
            client.logout().await;
            eprintln!("signed out");
            Ok(())
        }
        SessionCommand::Get { endpoint } => {
            let response = client
                .authenticated_request(ApiRequest::get(endpoint.clone()))
                .await?;
            if !response.is_success() {
                return Err(SessionError::Status { endpoint, status: response.status }.into());
            }
            print_json(&response.json::<Value>()?)
        }
        SessionCommand::List { resource } => {
            let rows = ResourceClient::new(client).list(resource).await?;
            print_rows(&rows);
            Ok(())
        }
        SessionCommand::Edit { resource, id, edits } => {
            let resources = ResourceClient::new(client);
            let current = resources.fetch(resource, &id).await?;
            let columns = derive_columns(&current);
            let pairs = edits
                .iter()
                .map(|edit| edit.split_once('=').ok_or_else(|| CliError::InvalidEdit(edit.clone())))
                .collect::<Result<Vec<_>, _>>()?;
            let updated = current.cast_for_write(&columns, pairs)?;
            let saved = resources.update(resource, &id, &updated).await?;
            print_rows(std::slice::from_ref(&saved));
            Ok(())
        }
        SessionCommand::Delete { resource, id } => {
            ResourceClient::new(client).delete(resource, &id).await?;
            eprintln!("deleted {resource}/{id}");
            Ok(())
        }
        SessionCommand::Stats { from, to } => {
            let rows = ResourceClient::new(client).list(Resource::Payments).await?;
            let today = OffsetDateTime::now_utc().date();
            let stats = summary::payment_summary(&rows, DateRange { from, to }, today);
            print_json(&serde_json::to_value(&stats)?)
        }
        SessionCommand::ForgotPassword { email } => {
            action(client.request_password_reset(&email).await, "reset code sent")
        }
        SessionCommand::VerifyOtp { otp } => action(client.verify_otp(&otp).await, "code verified"),
        SessionCommand::ResetPassword { email, otp, new_password } => {
            action(client.reset_password(&email, &otp, &new_password).await, "password updated")
        }
    }
}

fn action(outcome: ActionOutcome, done: &str) -> Result<(), CliError> {
    match outcome {
        ActionOutcome::Done => {
            eprintln!("{done}");
            Ok(())
        }
        ActionOutcome::Failed(reason) => Err(CliError::ActionFailed(reason)),
    }
}

fn parse_day(raw: &str) -> Result<Date, String> {
    Date::parse(raw, format_description!("[year]-[month]-[day]")).map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn print_rows(rows: &[Record]) {
    let Some(first) = rows.first() else {
        eprintln!("no rows");
        return;
    };
    let columns = derive_columns(first);
    let header: Vec<&str> = columns.iter().map(|c| c.header.as_str()).collect();
    println!("ID\t{}", header.join("\t"));
    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| row.get(&c.field).map(ToString::to_string).unwrap_or_default())
            .collect();
        println!("{}\t{}", row.id().unwrap_or("-"), cells.join("\t"));
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
