//! taskdeck — terminal client for a task service with a conversational
//! assistant.
//!
//! The binary is a thin view over the library's stores: it restores the
//! session, runs one subcommand, and renders the resulting store
//! snapshots. Configuration via CLI flags, environment variables, or
//! config file (`~/.config/taskdeck/config.toml`).
//!
//! ```bash
//! taskdeck login --email a@b.com --password secret
//! taskdeck tasks list
//! taskdeck tasks add "Buy milk" --description "Two liters"
//! taskdeck chat "what's left on my list?"
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use taskdeck::chat::ConversationStore;
use taskdeck::client::ApiClient;
use taskdeck::config::{CliArgs, ClientConfig};
use taskdeck::session::storage::FileCredentialStore;
use taskdeck::session::{Route, SessionEvent, SessionStore};
use taskdeck::tasks::TaskStore;
use taskdeck_proto::task::{NewTask, Task, TaskId};
use taskdeck_proto::user::Credentials;

type CliError = Box<dyn std::error::Error>;

#[derive(Parser)]
#[command(
    version,
    about = "Terminal client for a task service with a conversational assistant"
)]
struct Cli {
    #[command(flatten)]
    args: CliArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account and sign in.
    Register {
        /// Email address for the new account.
        #[arg(long)]
        email: String,
        /// Password for the new account.
        #[arg(long)]
        password: String,
    },
    /// Sign in with existing credentials.
    Login {
        /// Email address of the account.
        #[arg(long)]
        email: String,
        /// Account password.
        #[arg(long)]
        password: String,
    },
    /// Sign out and discard the persisted session.
    Logout,
    /// Show the signed-in identity.
    Whoami,
    /// Work with the task list.
    Tasks {
        #[command(subcommand)]
        command: TaskCommand,
    },
    /// Send one message to the assistant.
    Chat {
        /// The message text.
        message: String,
    },
}

#[derive(Subcommand)]
enum TaskCommand {
    /// Fetch and print the task list.
    List,
    /// Create a task.
    Add {
        /// Task title.
        title: String,
        /// Optional longer description.
        #[arg(long)]
        description: Option<String>,
    },
    /// Mark a task complete.
    Done {
        /// Task identifier (as shown by `tasks list`).
        id: String,
    },
    /// Reopen a completed task.
    Reopen {
        /// Task identifier.
        id: String,
    },
    /// Delete a task.
    Rm {
        /// Task identifier.
        id: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // A broken config file degrades to defaults rather than blocking the
    // command.
    let config = match ClientConfig::load(&cli.args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    init_logging(&cli.args.log_level);
    tracing::debug!(base_url = %config.base_url, "taskdeck starting");

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays clean for command output.
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Command, config: &ClientConfig) -> Result<(), CliError> {
    let client = Arc::new(ApiClient::new(
        config.base_url.clone(),
        config.request_timeout,
    ));
    let storage = FileCredentialStore::new(session_file(config)?);
    let (mut session, mut session_events) = SessionStore::new(Arc::clone(&client), storage, 8);
    session.restore();

    match command {
        Command::Register { email, password } => {
            session.register(&Credentials { email, password }).await?;
            if let Some(user) = session.user() {
                println!("Registered and signed in as {}", user.email);
            }
            report_navigation(&mut session_events);
        }
        Command::Login { email, password } => {
            session.login(&Credentials { email, password }).await?;
            if let Some(user) = session.user() {
                println!("Signed in as {}", user.email);
            }
            report_navigation(&mut session_events);
        }
        Command::Logout => {
            session.logout();
            println!("Signed out.");
        }
        Command::Whoami => match session.user() {
            Some(user) => println!("{} ({})", user.email, user.id),
            None => println!("Not signed in."),
        },
        Command::Tasks { command } => run_tasks(command, &client).await?,
        Command::Chat { message } => run_chat(&message, &client, &session, config).await?,
    }

    Ok(())
}

async fn run_tasks(command: TaskCommand, client: &Arc<ApiClient>) -> Result<(), CliError> {
    let mut store = TaskStore::new(Arc::clone(client));

    match command {
        TaskCommand::List => {
            store.fetch_all().await?;
            print_tasks(store.tasks());
        }
        TaskCommand::Add { title, description } => {
            let mut new_task = NewTask::new(title);
            if let Some(description) = description {
                new_task = new_task.with_description(description);
            }
            store.create(new_task).await?;
            if let Some(task) = store.tasks().last() {
                println!("Created \"{}\" ({})", task.title, task.id);
            }
        }
        TaskCommand::Done { id } => {
            store.toggle_complete(&TaskId::new(id), true).await?;
            println!("Marked complete.");
        }
        TaskCommand::Reopen { id } => {
            store.toggle_complete(&TaskId::new(id), false).await?;
            println!("Reopened.");
        }
        TaskCommand::Rm { id } => {
            store.delete(&TaskId::new(id)).await?;
            println!("Deleted.");
        }
    }

    Ok(())
}

async fn run_chat<S: taskdeck::session::storage::CredentialStore>(
    message: &str,
    client: &Arc<ApiClient>,
    session: &SessionStore<S>,
    config: &ClientConfig,
) -> Result<(), CliError> {
    let Some(user) = session.user() else {
        return Err("not signed in — run `taskdeck login` first".into());
    };

    let mut conversation = ConversationStore::new(Arc::clone(client));
    if config.chat_greeting {
        conversation = conversation.with_greeting();
    }

    let result = conversation.send_message(&user.id, message).await;

    // The transcript always has an assistant turn to show, apology
    // included.
    if let Some(reply) = conversation.last_reply() {
        println!("{}", reply.content);
    }
    result?;

    // The stores never interpret annotations; acting on them is the
    // view's job. A non-empty task_updates means the assistant mutated
    // tasks server-side, so refresh our mirror.
    if !conversation.pending_task_updates().is_empty() {
        let mut tasks = TaskStore::new(Arc::clone(client));
        tasks.fetch_all().await?;
        println!();
        print_tasks(tasks.tasks());
    }

    Ok(())
}

fn session_file(config: &ClientConfig) -> Result<PathBuf, CliError> {
    if let Some(path) = &config.session_file {
        return Ok(path.clone());
    }
    FileCredentialStore::default_path()
        .ok_or_else(|| "could not determine a data directory for the session file".into())
}

fn report_navigation(events: &mut mpsc::Receiver<SessionEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            SessionEvent::Navigate(Route::Dashboard) => {
                println!("Try `taskdeck tasks list` or `taskdeck chat \"...\"`.");
            }
            SessionEvent::Navigate(Route::Home) => {}
        }
    }
}

fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks.");
        return;
    }
    for task in tasks {
        let mark = if task.is_completed { "x" } else { " " };
        match &task.description {
            Some(description) => println!("[{mark}] {}  {} — {description}", task.id, task.title),
            None => println!("[{mark}] {}  {}", task.id, task.title),
        }
    }
}
