//! Reachboard in the terminal.
//!
//! Restores or creates a session, loads every analytics domain concurrently
//! and prints the dashboard.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use console::Term;
use dialoguer::{theme::ColorfulTheme, Input, Password};
use futures::future::join_all;
use reachboard_state::{
    Config, DashboardStore, Domain, FetchOrchestrator, FetchPolicy, FetchTicket,
    FileCredentialStore, Gate, MockAuthProvider, MockDataProvider, Session,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod render;

#[derive(Parser)]
#[command(name = "reachboard")]
#[command(about = "Analytics dashboard in the terminal")]
#[command(version)]
struct Cli {
    /// How overlapping fetches of one domain are reconciled (latest, last-writer-wins)
    #[arg(long, global = true)]
    policy: Option<FetchPolicy>,

    /// Fail a domain fetch after this many milliseconds (0 disables)
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Scale factor for the simulated provider latency
    #[arg(long, global = true)]
    latency: Option<f64>,

    /// Where the session token is kept
    #[arg(long, global = true)]
    token_path: Option<PathBuf>,

    /// Verbose logging (state transitions)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the full dashboard, logging in first if needed
    Dashboard {
        #[command(flatten)]
        credentials: CredentialArgs,
    },

    /// Log in and remember the session
    Login {
        #[command(flatten)]
        credentials: CredentialArgs,
    },

    /// Forget the stored session
    Logout,

    /// Fetch specific domains, optionally several times at once
    ///
    /// Example: reachboard fetch channels --repeat 3
    Fetch {
        /// Domains to fetch (summary, channels, audience, content, trends)
        #[arg(required = true)]
        domains: Vec<Domain>,

        /// Overlapping requests to issue per domain
        #[arg(long, default_value_t = 1)]
        repeat: usize,
    },

    /// Show whether a stored session is valid
    Status,
}

#[derive(clap::Args, Default)]
struct CredentialArgs {
    /// Account email (prompted if omitted)
    #[arg(short, long)]
    email: Option<String>,

    /// Password (prompted if omitted)
    #[arg(short, long)]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "info,reachboard_state=debug"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Everything one invocation works with.
struct App {
    store: DashboardStore,
    session: Session,
    orchestrator: FetchOrchestrator,
}

impl App {
    fn new(cli: &Cli) -> Result<Self> {
        let mut config = Config::from_env().context("Failed to load configuration")?;
        if let Some(policy) = cli.policy {
            config.fetch_policy = policy;
        }
        if let Some(ms) = cli.timeout_ms {
            config.fetch_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(latency) = cli.latency {
            if !latency.is_finite() || latency < 0.0 {
                bail!("--latency must be a non-negative number");
            }
            config.mock_latency = latency;
        }
        if let Some(path) = &cli.token_path {
            config.token_path = path.clone();
        }
        tracing::debug!(?config, "configuration loaded");

        let store = DashboardStore::new(config.fetch_policy);
        let session = Session::new(
            store.clone(),
            Arc::new(MockAuthProvider::new().with_latency(config.mock_latency)),
            Arc::new(FileCredentialStore::new(&config.token_path)),
        );
        let orchestrator = FetchOrchestrator::new(
            store.clone(),
            Arc::new(MockDataProvider::new().with_latency(config.mock_latency)),
            config.orchestrator(),
        );

        Ok(Self {
            store,
            session,
            orchestrator,
        })
    }
}

async fn run(cli: Cli) -> Result<()> {
    let app = App::new(&cli)?;

    match cli.command {
        Some(Commands::Dashboard { credentials }) => cmd_dashboard(&app, credentials).await,
        Some(Commands::Login { credentials }) => cmd_login(&app, credentials).await,
        Some(Commands::Logout) => cmd_logout(&app).await,
        Some(Commands::Fetch { domains, repeat }) => cmd_fetch(&app, domains, repeat).await,
        Some(Commands::Status) => cmd_status(&app).await,
        None => cmd_dashboard(&app, CredentialArgs::default()).await,
    }
}

async fn cmd_dashboard(app: &App, credentials: CredentialArgs) -> Result<()> {
    if app.session.start().await != Gate::Dashboard {
        log_in(app, credentials).await?;
    }

    println!("{}", "Loading dashboard...".bright_black());
    app.orchestrator.load_all().await;

    render::dashboard(&app.store.snapshot());
    Ok(())
}

async fn cmd_login(app: &App, credentials: CredentialArgs) -> Result<()> {
    log_in(app, credentials).await
}

async fn cmd_logout(app: &App) -> Result<()> {
    app.session.logout().await;
    println!("{}", "Logged out.".bright_blue());
    Ok(())
}

async fn cmd_fetch(app: &App, domains: Vec<Domain>, repeat: usize) -> Result<()> {
    if app.session.start().await != Gate::Dashboard {
        bail!("not logged in; run `reachboard login` first");
    }

    let mut tickets = Vec::new();
    for domain in &domains {
        for _ in 0..repeat.max(1) {
            tickets.push(app.orchestrator.request_fetch(*domain));
        }
    }
    let issued: Vec<(Domain, u64)> = tickets.iter().map(|t| (t.domain(), t.seq())).collect();
    let outcomes = join_all(tickets.into_iter().map(FetchTicket::completion)).await;
    for ((domain, seq), outcome) in issued.into_iter().zip(outcomes) {
        render::outcome(domain, seq, &outcome);
    }

    let snapshot = app.store.snapshot();
    for domain in domains {
        render::domain(&snapshot, domain);
    }
    Ok(())
}

async fn cmd_status(app: &App) -> Result<()> {
    let gate = app.session.start().await;
    let snapshot = app.store.snapshot();
    render::auth(snapshot.auth(), gate);
    Ok(())
}

async fn log_in(app: &App, credentials: CredentialArgs) -> Result<()> {
    let (email, password) = prompt_credentials(credentials)?;
    match app.session.login(&email, &password).await {
        Ok(user) => {
            println!(
                "{} {}",
                "Signed in as".bright_green(),
                user.email.bright_green().bold()
            );
            Ok(())
        }
        Err(e) => bail!("login failed: {}", e),
    }
}

fn prompt_credentials(args: CredentialArgs) -> Result<(String, String)> {
    let term = Term::stderr();
    let interactive = term.is_term();

    let email = match args.email {
        Some(email) => email,
        None if interactive => Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt("Email")
            .interact_text_on(&term)?,
        None => bail!("--email is required when not running in a terminal"),
    };
    let password = match args.password {
        Some(password) => password,
        None if interactive => Password::with_theme(&ColorfulTheme::default())
            .with_prompt("Password")
            .interact_on(&term)?,
        None => bail!("--password is required when not running in a terminal"),
    };
    Ok((email, password))
}
