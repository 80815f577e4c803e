mod view;

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use chat::{
    ChatGateway, ComposeError, Composer, CredentialError, CredentialStore, DirectGateway, FileStorage, GatewayError,
    KeyValueStorage, RemoteGateway, SessionId, SessionStore, StorageError, StoreConfig, StoreError,
};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::view::Input;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("no API key stored; run `aasha key set <KEY>` or drop --direct")]
    MissingCredential,
    #[error("unknown session: {0}")]
    UnknownSession(SessionId),
    #[error("gateway setup failed: {0}")]
    Gateway(GatewayError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Store(StoreError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Compose(ComposeError),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned HTTP {0}")]
    ServerStatus(u16),
    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl From<StoreError> for CliError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::UnknownSession(id) => Self::UnknownSession(id),
            other => Self::Store(other),
        }
    }
}

impl From<GatewayError> for CliError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::MissingCredential => Self::MissingCredential,
            other => Self::Gateway(other),
        }
    }
}

impl From<ComposeError> for CliError {
    fn from(error: ComposeError) -> Self {
        match error {
            ComposeError::Store(e) => e.into(),
            other => Self::Compose(other),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "aasha", about = "Terminal client for the Aasha chat companion")]
struct Cli {
    #[arg(long, env = "AASHA_DATA_DIR", default_value = ".aasha")]
    data_dir: PathBuf,

    #[arg(long, env = "AASHA_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone)]
struct CliContext {
    data_dir: PathBuf,
    base_url: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the chat server is up and report its model.
    Ping,
    /// Interactive chat session.
    Chat(ChatArgs),
    /// Send one message to the most recent session and print the reply.
    Send(SendArgs),
    Sessions(SessionsCommand),
    Key(KeyCommand),
}

#[derive(Args, Debug)]
struct GatewayArgs {
    /// Call Gemini directly with the stored key instead of the chat server.
    #[arg(long)]
    direct: bool,

    /// System instruction sent with each request (server mode only).
    #[arg(long, env = "AASHA_SYSTEM_PROMPT")]
    system_prompt: Option<String>,
}

#[derive(Args, Debug)]
struct ChatArgs {
    #[command(flatten)]
    gateway: GatewayArgs,
}

#[derive(Args, Debug)]
struct SendArgs {
    message: String,

    #[command(flatten)]
    gateway: GatewayArgs,
}

#[derive(Args, Debug)]
struct SessionsCommand {
    #[command(subcommand)]
    command: SessionsSubcommand,
}

#[derive(Subcommand, Debug)]
enum SessionsSubcommand {
    List,
    New,
    Show { id: Option<String> },
}

#[derive(Args, Debug)]
struct KeyCommand {
    #[command(subcommand)]
    command: KeySubcommand,
}

#[derive(Subcommand, Debug)]
enum KeySubcommand {
    Set { key: String },
    Clear,
    Status,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::WARN)
        .init();

    let cli = Cli::parse();
    let ctx = CliContext { data_dir: cli.data_dir, base_url: cli.base_url };

    match cli.command {
        Command::Ping => run_ping(&ctx).await,
        Command::Chat(args) => run_chat(&ctx, args).await,
        Command::Send(args) => run_send(&ctx, args).await,
        Command::Sessions(sessions) => run_sessions(&ctx, sessions),
        Command::Key(key) => run_key(&ctx, key),
    }
}

async fn run_ping(cli: &CliContext) -> Result<(), CliError> {
    let client = reqwest::Client::new();
    let url = format!("{}/api/chat", cli.base_url.trim_end_matches('/'));
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::ServerStatus(status.as_u16()));
    }
    let body: Value = response.json().await?;
    print_json(&body)
}

// =============================================================================
// LOCAL STATE
// =============================================================================

fn open_storage(cli: &CliContext) -> Result<(Arc<dyn KeyValueStorage>, StoreConfig), CliError> {
    let storage: Arc<dyn KeyValueStorage> = Arc::new(FileStorage::open(cli.data_dir.clone())?);
    Ok((storage, StoreConfig::default()))
}

fn open_store(cli: &CliContext) -> Result<SessionStore, CliError> {
    let (storage, config) = open_storage(cli)?;
    Ok(SessionStore::open(storage, &config)?)
}

fn open_credentials(cli: &CliContext) -> Result<CredentialStore, CliError> {
    let (storage, config) = open_storage(cli)?;
    Ok(CredentialStore::new(storage, &config))
}

fn build_gateway(cli: &CliContext, args: GatewayArgs) -> Result<Box<dyn ChatGateway>, CliError> {
    if args.direct {
        let gateway = DirectGateway::from_credentials(&open_credentials(cli)?)?;
        tracing::info!(model = gateway.model(), "using direct gateway");
        return Ok(Box::new(gateway));
    }
    let mut gateway = RemoteGateway::new(&cli.base_url)?;
    if let Some(prompt) = args.system_prompt {
        gateway = gateway.with_system_prompt(prompt);
    }
    tracing::info!(endpoint = gateway.endpoint(), "using server gateway");
    Ok(Box::new(gateway))
}

// =============================================================================
// CHAT
// =============================================================================

async fn run_send(cli: &CliContext, args: SendArgs) -> Result<(), CliError> {
    let gateway = build_gateway(cli, args.gateway)?;
    let mut store = open_store(cli)?;
    let mut composer = Composer::new();
    let resolution = composer.send(&mut store, gateway.as_ref(), &args.message).await?;
    print!("{}", view::render_resolution(&resolution));
    Ok(())
}

async fn run_chat(cli: &CliContext, args: ChatArgs) -> Result<(), CliError> {
    let gateway = build_gateway(cli, args.gateway)?;
    let mut store = open_store(cli)?;
    let mut composer = Composer::new();

    print!("{}", view::render_session(store.selected()));
    println!("(type /help for commands)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match view::parse_input(&line) {
            Input::Empty => {}
            Input::Quit => break,
            Input::Help => println!("{}", view::HELP),
            Input::List => print!("{}", view::render_session_list(store.sessions(), store.selected_id())),
            Input::New => {
                let session = store.create_session()?;
                print!("{}", view::render_session(session));
            }
            Input::Switch(id) => match store.select(&SessionId::from(id)) {
                Ok(()) => print!("{}", view::render_session(store.selected())),
                Err(StoreError::UnknownSession(id)) => println!("no session with id {id}"),
                Err(e) => return Err(e.into()),
            },
            Input::Unknown(command) => println!("unknown command: {command} (try /help)"),
            Input::Send(text) => {
                let resolution = composer.send(&mut store, gateway.as_ref(), &text).await?;
                print!("{}", view::render_resolution(&resolution));
            }
        }
    }
    Ok(())
}

// =============================================================================
// SESSIONS / KEY
// =============================================================================

fn run_sessions(cli: &CliContext, sessions: SessionsCommand) -> Result<(), CliError> {
    let mut store = open_store(cli)?;
    match sessions.command {
        SessionsSubcommand::List => {
            print!("{}", view::render_session_list(store.sessions(), store.selected_id()));
        }
        SessionsSubcommand::New => {
            let session = store.create_session()?;
            print!("{}", view::render_session(session));
        }
        SessionsSubcommand::Show { id } => {
            let session = match id {
                Some(id) => {
                    let id = SessionId::from(id);
                    store.get(&id).ok_or(CliError::UnknownSession(id))?
                }
                None => store.selected(),
            };
            print!("{}", view::render_session(session));
        }
    }
    Ok(())
}

fn run_key(cli: &CliContext, key: KeyCommand) -> Result<(), CliError> {
    let credentials = open_credentials(cli)?;
    match key.command {
        KeySubcommand::Set { key } => {
            credentials.save(&key)?;
            println!("API key saved");
        }
        KeySubcommand::Clear => {
            credentials.clear()?;
            println!("API key cleared");
        }
        KeySubcommand::Status => {
            let state = if credentials.load()?.is_some() { "set" } else { "not set" };
            println!("API key {state}");
        }
    }
    Ok(())
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
