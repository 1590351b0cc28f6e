use anyhow::{Context, Result};
use clap::Parser;
use room404_core::{AutosaveConfig, SaveStatus};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Edit a room404 document, one full content snapshot per input line.
///
/// `:w` saves immediately, `:q` quits without saving, end of input saves
/// and quits.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Document file to edit; created on first save
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Quiet period after the last edit before saving
    #[arg(
        long,
        value_name = "MS",
        env = "ROOM404_DEBOUNCE_MS",
        default_value_t = 1500
    )]
    pub debounce_ms: u64,

    /// Interval between save status refreshes
    #[arg(long, value_name = "MS", env = "ROOM404_POLL_MS", default_value_t = 500)]
    pub poll_ms: u64,

    /// Disable autosave; content is saved only by `:w` or end of input
    #[arg(long, env = "ROOM404_MANUAL")]
    pub manual: bool,
}

impl Args {
    pub fn autosave(&self) -> AutosaveConfig {
        AutosaveConfig::default()
            .with_debounce(Duration::from_millis(self.debounce_ms))
            .with_enabled(!self.manual)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms.max(1))
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Edit(String),
    Save,
    Quit,
}

pub fn parse_line(line: String) -> Command {
    match line.trim_end() {
        ":w" => Command::Save,
        ":q" => Command::Quit,
        _ => Command::Edit(line),
    }
}

pub fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

pub async fn run() -> Result<()> {
    let args = Args::parse();
    init_logging();
    let input = BufReader::new(tokio::io::stdin());
    edit_loop(&args, input, tokio::io::stdout()).await
}

async fn print_status<W: AsyncWrite + Unpin>(out: &mut W, status: SaveStatus) -> Result<()> {
    out.write_all(status.label().as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await?;
    Ok(())
}

/// Feed `input` lines to an editing session over `args.file`, printing
/// every status change to `out`.
pub async fn edit_loop<R, W>(args: &Args, input: R, mut out: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (mut session, store) = room404_session::open(&args.file, args.autosave(), args.poll_interval())
        .with_context(|| format!("failed to open {}", args.file.display()))?;
    let record = store.record();
    tracing::info!(
        path = %args.file.display(),
        version = record.metadata.version,
        autosave = !args.manual,
        "document opened"
    );

    let mut lines = input.lines();
    let mut flush = true;
    loop {
        tokio::select! {
            line = lines.next_line() => match line?.map(parse_line) {
                Some(Command::Edit(content)) => session.edit(content).await,
                Some(Command::Save) => {
                    if let Err(err) = session.save().await {
                        tracing::warn!(error = %err, "save failed");
                    }
                }
                Some(Command::Quit) => {
                    flush = false;
                    break;
                }
                None => break,
            },
            Some(status) = session.next_status() => print_status(&mut out, status).await?,
        }
    }

    if flush {
        session
            .save()
            .await
            .with_context(|| format!("failed to save {}", args.file.display()))?;
    }
    session.close().await;
    while let Some(status) = session.next_status().await {
        print_status(&mut out, status).await?;
    }
    tracing::info!(version = store.record().metadata.version, "session ended");
    Ok(())
}
