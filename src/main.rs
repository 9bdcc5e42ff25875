use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pytutor::logging::{self, LogTarget};
use pytutor::{format_message, Config, Console, ConsoleEntry, Session, TutorClient};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "pytutor")]
#[command(version)]
#[command(about = "Terminal Python tutor: write code, run it, and ask an AI tutor about it")]
struct Cli {
    /// Tutor backend base URL (overrides config and PYTUTOR_BACKEND_URL)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the tutor a single question
    Ask {
        /// Your question
        question: String,
        /// Print the answer as HTML markup
        #[arg(long)]
        html: bool,
    },
    /// Run a Python file on the backend ("-" reads stdin)
    Run {
        file: PathBuf,
        /// Print the console as HTML markup
        #[arg(long)]
        html: bool,
    },
    /// Convert a tutor message on stdin to HTML
    Format,
    /// Write the default config file
    InitConfig {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(url) = &cli.backend_url {
        config.apply_backend_override(url);
    }

    match cli.command {
        None => run_tui(config).await,
        Some(command) => {
            logging::init(&LogTarget::Stderr, "warn")?;
            match command {
                Commands::Ask { question, html } => ask_once(&config, &question, html).await,
                Commands::Run { file, html } => run_once(&config, &file, html).await,
                Commands::Format => format_stdin(),
                Commands::InitConfig { force } => init_config(&config, force),
            }
        }
    }
}

async fn run_tui(config: Config) -> Result<()> {
    let log_path = logging::default_log_path()?;
    logging::init(&LogTarget::File(log_path), "info")?;
    tracing::info!(backend = %config.backend_url, "starting tutor session");

    let client = TutorClient::with_timeout(&config.backend_url, config.request_timeout())?;

    // Install panic hook before entering the alternate screen
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut events = EventHandler::new();
    let mut app = App::new(&config, Arc::new(client), events.sender());

    // Main loop
    let result = loop {
        if let Err(e) = terminal.draw(|frame| ui::render(&mut app, frame)) {
            break Err(e.into());
        }

        let Some(event) = events.next().await else {
            break Ok(());
        };
        handler::handle_event(&mut app, event);

        if app.should_quit {
            break Ok(());
        }
    };

    tui::restore()?;
    tracing::info!("session ended");
    result
}

async fn ask_once(config: &Config, question: &str, html: bool) -> Result<()> {
    let client = TutorClient::with_timeout(&config.backend_url, config.request_timeout())?;
    let mut session = Session::new();

    if !session.ask(&client, question).await {
        bail!("question is empty");
    }

    // The transcript is [question, reply]
    if let Some(reply) = session.messages().last() {
        if html {
            println!("{}", reply.to_html());
        } else {
            println!("{}", reply.text);
        }
    }
    Ok(())
}

async fn run_once(config: &Config, file: &Path, html: bool) -> Result<()> {
    let source = if file.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?
    };

    let client = TutorClient::with_timeout(&config.backend_url, config.request_timeout())?;
    let mut session = Session::new();
    let mut console = Console::new();
    session.run(&client, &source, &mut console).await;

    if html {
        println!("{}", console.to_html());
    } else {
        print_console(&console);
    }
    Ok(())
}

fn print_console(console: &Console) {
    for entry in console.entries() {
        match entry {
            ConsoleEntry::Status(status) => println!("[{}]", status.as_str()),
            ConsoleEntry::Line { kind: pytutor::LineKind::Stdout, text } => println!("{}", text),
            ConsoleEntry::Line { text, .. } => eprintln!("{}", text),
            ConsoleEntry::AiFix(fix) => {
                println!();
                println!("AI Suggestion:");
                println!("{}", fix);
            }
        }
    }
}

fn format_stdin() -> Result<()> {
    let mut text = String::new();
    io::stdin().read_to_string(&mut text)?;
    println!("{}", format_message(text.as_str()));
    Ok(())
}

fn init_config(config: &Config, force: bool) -> Result<()> {
    let path = Config::get_config_path()?;
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    config.save()?;
    println!("Wrote {}", path.display());
    Ok(())
}
