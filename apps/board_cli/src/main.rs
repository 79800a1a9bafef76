use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{ExportFormat, Session};
use shared::{
    domain::{Color, Position, Score},
    protocol::decode_actions,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

mod config;

use config::{load_settings, Settings, DEFAULT_SETTINGS_FILE};

#[derive(Parser, Debug)]
#[command(name = "retro-board", about = "Retrospective target board sessions")]
struct Cli {
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,
    /// Board address; a `session` query parameter reopens that session.
    #[arg(long)]
    url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the session id and share link.
    NewSession,
    /// Apply a JSON array of actions to a fresh session and export the result.
    Replay {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = FormatArg::Text)]
        format: FormatArg,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run a small scripted retrospective and export it.
    Demo {
        #[arg(long, value_enum, default_value_t = FormatArg::Text)]
        format: FormatArg,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for ExportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Text => ExportFormat::Text,
            FormatArg::Json => ExportFormat::Json,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let (settings, file_error) = load_settings(&cli.config);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.log_filter))
        .with_writer(std::io::stderr)
        .init();
    if let Some(error) = file_error {
        warn!(path = %cli.config.display(), %error, "ignoring unreadable settings file");
    }

    let location = match &cli.url {
        Some(raw) => Url::parse(raw).with_context(|| format!("invalid --url '{raw}'"))?,
        None => settings.board_url()?,
    };

    match cli.command {
        Command::NewSession => {
            let session = Session::open(&location, &settings.title);
            println!("session_id={}", session.id());
            println!("share_link={}", session.share_link());
        }
        Command::Replay {
            file,
            format,
            output,
        } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("failed to read action log '{}'", file.display()))?;
            let batch = decode_actions(&raw)
                .with_context(|| format!("'{}' is not a JSON array", file.display()))?;

            let mut session = Session::open(&location, &settings.title);
            let ignored = batch
                .actions
                .into_iter()
                .filter_map(|action| session.dispatch(action))
                .count();
            info!(
                skipped = batch.skipped.len(),
                ignored, "replayed action log"
            );

            emit(&session, &settings, format.into(), output)?;
        }
        Command::Demo { format } => {
            let session = run_demo(&location, &settings)?;
            emit(&session, &settings, format.into(), None)?;
        }
    }

    Ok(())
}

fn emit(
    session: &Session,
    settings: &Settings,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let title = match session.title() {
        "" => settings.title.as_str(),
        title => title,
    };
    let snapshot = session.export();
    match output {
        Some(path) => {
            snapshot.write_to(&path, title, format)?;
            println!("exported to {}", path.display());
        }
        None => print!("{}", snapshot.render(title, format)?),
    }
    Ok(())
}

fn run_demo(location: &Url, settings: &Settings) -> Result<Session> {
    let mut session = Session::open(location, &settings.title);
    session.join_as_facilitator();

    let testing = session.add_goal("Improve testing")?;
    let shipping = session.add_goal("Ship weekly")?;
    let ana = session.add_participant("Ana", Color::new("#3b82f6"))?;
    let bo = session.add_participant("Bo", Color::new("#22c55e"))?;

    session.act_as(&ana)?;
    let marker = session.place_marker(&testing, Score::new(5)?, Color::new("#3b82f6"))?;
    session.pick_marker(&marker)?;
    session.drop_marker(Position::new(80.0, 20.0)?)?;
    session.place_marker(&shipping, Score::new(3)?, Color::new("#3b82f6"))?;

    session.act_as(&bo)?;
    session.place_marker(&testing, Score::new(7)?, Color::new("#22c55e"))?;

    info!(session = %session.id(), "demo board ready");
    Ok(session)
}
