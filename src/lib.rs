pub mod config;
pub mod connection;
pub mod galaxy;
pub mod logging;
pub mod session;

use std::io::Write;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use config::GalaxyConfig;
use galaxy::GalaxyApi;
use session::{GetOptions, Selector, Session};

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(
    name = "galaxy-ie-helpers",
    version,
    about = "Connect to Galaxy through the API"
)]
pub struct Cli {
    /// Action to execute
    #[arg(long, value_enum)]
    pub action: Action,

    /// History ID. The history ID and the dataset ID uniquely identify a dataset.
    /// Defaults to the current Galaxy history.
    #[arg(long = "history-id")]
    pub history_id: Option<String>,

    /// Files/ID numbers to upload/download.
    #[arg(
        long,
        num_args = 1..,
        required_if_eq_any([("action", "get"), ("action", "put")])
    )]
    pub argument: Vec<String>,

    /// hid for the position within the history, name for the dataset name.
    #[arg(
        short = 'i',
        long = "identifier_type",
        value_enum,
        default_value_t = IdentifierType::Hid
    )]
    pub identifier_type: IdentifierType,

    /// Galaxy file format. If not specified Galaxy will try to guess the filetype automatically.
    #[arg(short = 't', long = "filetype", default_value = "auto")]
    pub filetype: String,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Get,
    Put,
    #[value(name = "get_user_history")]
    GetUserHistory,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum IdentifierType {
    #[default]
    Hid,
    Name,
}

/// Turn CLI arguments into a download selector.
pub fn selector_from_args(kind: IdentifierType, args: &[String]) -> Result<Selector> {
    match kind {
        IdentifierType::Hid => args
            .iter()
            .map(|arg| {
                arg.trim()
                    .parse::<u64>()
                    .with_context(|| format!("invalid hid '{arg}'"))
            })
            .collect::<Result<Vec<_>>>()
            .map(Selector::Hids),
        IdentifierType::Name => Ok(Selector::Names(args.to_vec())),
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let config = GalaxyConfig::from_env().context("reading Galaxy configuration")?;
    let session = Session::connect(&config, cli.history_id.as_deref())?;
    let stdout = std::io::stdout();
    dispatch(&cli, &session, &mut stdout.lock())
}

/// Execute the requested action against an established session.
pub fn dispatch<A: GalaxyApi, W: Write>(
    cli: &Cli,
    session: &Session<A>,
    out: &mut W,
) -> Result<()> {
    match cli.action {
        Action::Get => {
            let selector = selector_from_args(cli.identifier_type, &cli.argument)?;
            let fetched = session.get(selector, GetOptions::default())?;
            for file in fetched.files() {
                writeln!(out, "{}", file.path.display())?;
            }
        }
        Action::Put => session.put(cli.argument.as_slice(), &cli.filetype)?,
        Action::GetUserHistory => {
            let contents = session.user_history()?;
            serde_json::to_writer_pretty(&mut *out, &contents)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
