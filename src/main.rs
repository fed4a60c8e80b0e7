//! DeployX Console - Entry Point
//!
//! Drives the onboarding flows from a terminal. Navigation requests are
//! logged; command results go to stdout, logs to stderr.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use deployx_console::{
    BootstrapRouter, ConsoleConfig, DashboardController, FileSessionPersistence, HttpControlPlane,
    LoginFlow, LoginForm, NewProject, PlatformStatusProbe, RegisterForm, RegistrationFlow,
    SessionStore, TracingNavigator, TunnelConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "deployx-console", version, about = "DeployX session and onboarding console")]
struct Cli {
    /// DeployX backend URL (overrides DEPLOYX_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Session file (overrides DEPLOYX_SESSION_PATH)
    #[arg(long, global = true)]
    session: Option<PathBuf>,

    /// Log as JSON
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decide the entry screen (register, login or dashboard)
    Bootstrap,

    /// Sign in and persist the session
    Login {
        username: String,
        #[arg(long, env = "DEPLOYX_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account (the first one becomes the administrator)
    Register {
        username: String,
        email: String,
        #[arg(long, env = "DEPLOYX_PASSWORD", hide_env_values = true)]
        password: String,
        /// Password confirmation
        #[arg(long)]
        confirm: String,
    },

    /// Clear the persisted session
    Logout,

    /// Show the current identity
    Whoami,

    /// Load and print the dashboard
    Dashboard,

    /// Provision a Cloudflare tunnel and follow the redirect
    Tunnel {
        domain: String,
        subdomain: String,
        #[arg(long, env = "DEPLOYX_CF_API_TOKEN", hide_env_values = true)]
        api_token: String,
    },

    /// Project management
    Project {
        #[command(subcommand)]
        cmd: ProjectCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ProjectCommand {
    /// Create a project
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Git repository URL
        #[arg(long, default_value = "")]
        repo: String,
    },

    /// Delete a project by id
    Delete { id: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = std::env::var("RUST_LOG")
        .map(|s| match s.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO);

    if cli.json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    let mut config = ConsoleConfig::from_env()?;
    if let Some(url) = cli.api_url {
        config.api_url = url.trim_end_matches('/').to_string();
    }
    if let Some(path) = cli.session {
        config.session_path = path;
    }

    info!("DeployX Console v{} ({})", env!("CARGO_PKG_VERSION"), config.api_url);

    let api = Arc::new(HttpControlPlane::from_config(&config).context("HTTP client setup failed")?);
    let session = SessionStore::rehydrate(Arc::new(FileSessionPersistence::new(&config.session_path)));
    let navigator = Arc::new(TracingNavigator);

    match cli.cmd {
        Command::Bootstrap => {
            let probe = PlatformStatusProbe::new(api.clone());
            let mut router = BootstrapRouter::new(probe, session, navigator);
            let state = router.run().await;
            let path = state.route().map(|r| r.path()).unwrap_or("-");
            println!("{state:?} {path}");
        }

        Command::Login { username, password } => {
            let mut flow = LoginFlow::new(api, session.clone(), navigator);
            flow.submit(LoginForm::new(username, password)).await?;
            println!(
                "Logged in as {}{}",
                session.username().unwrap_or_default(),
                if session.is_superuser() { " (admin)" } else { "" }
            );
        }

        Command::Register {
            username,
            email,
            password,
            confirm,
        } => {
            let mut flow = RegistrationFlow::new(api.clone(), navigator);
            let first_user = flow.detect_first_user(&PlatformStatusProbe::new(api)).await;
            flow.submit(RegisterForm {
                username,
                email,
                password,
                confirm_password: confirm,
            })
            .await?;
            if first_user {
                println!("Administrator account created. Sign in to continue.");
            } else {
                println!("Account created. Sign in to continue.");
            }
        }

        Command::Logout => {
            session.logout();
            println!("Logged out");
        }

        Command::Whoami => match session.username() {
            Some(username) if session.is_authenticated() => {
                let role = if session.is_superuser() { "admin" } else { "user" };
                println!("{username} ({role})");
            }
            _ => bail!("Not logged in"),
        },

        Command::Dashboard => {
            let mut dashboard = DashboardController::new(api, session, navigator).configured(&config);
            let report = dashboard.enter().await?;
            if let Some(absent) = report.tunnel_absent() {
                info!("{}", absent);
            }
            println!("{}", serde_json::to_string_pretty(&dashboard.summary())?);
        }

        Command::Tunnel {
            domain,
            subdomain,
            api_token,
        } => {
            let mut dashboard = DashboardController::new(api, session, navigator).configured(&config);
            dashboard.enter().await?;
            let public_url = dashboard
                .setup_tunnel(TunnelConfig::new(api_token, domain, subdomain))
                .await?;
            if let Some(message) = dashboard.tunnel().state().message() {
                println!("{message}");
            }
            if let Some(redirect) = dashboard.tunnel_mut().take_redirect() {
                redirect.wait().await;
            }
            println!("{public_url}");
        }

        Command::Project { cmd } => {
            if !session.is_authenticated() {
                bail!("Not logged in");
            }
            let mut dashboard = DashboardController::new(api, session, navigator).configured(&config);
            match cmd {
                ProjectCommand::Create {
                    name,
                    description,
                    repo,
                } => {
                    let project = dashboard
                        .create_project(NewProject::from_form(&name, &description, &repo))
                        .await?;
                    println!("{} {}", project.id, project.name);
                }
                ProjectCommand::Delete { id } => {
                    dashboard.delete_project(&id).await?;
                    println!("Deleted {id}");
                }
            }
        }
    }

    Ok(())
}
