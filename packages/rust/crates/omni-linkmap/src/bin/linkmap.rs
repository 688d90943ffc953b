#![allow(missing_docs)]

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use omni_linkmap::{
    DocumentParser, GraphSession, GraphStore, LinkMapSettings, RenderProjector, UiIntent,
    ViewMode, scan_directory, set_linkmap_config_override, to_dot,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "linkmap",
    about = "Markdown link graph: scan, export, lay out and watch a notebook",
    after_help = "Without a subcommand, `linkmap` starts `watch` when `autoStart` is set."
)]
struct Cli {
    /// Notebook root directory.
    #[arg(
        long,
        short = 'r',
        value_name = "DIR",
        default_value = ".",
        global = true
    )]
    root: PathBuf,

    /// Explicit linkmap config file (for example: `.config/omni-dev-fusion/linkmap.yaml`).
    #[arg(long = "conf", short = 'c', value_name = "FILE", global = true)]
    config_file: Option<PathBuf>,

    /// Recognized note extensions (repeatable); overrides `fileTypes`.
    #[arg(long = "file-type", value_name = "EXT", global = true)]
    file_types: Vec<String>,

    /// Output format.
    #[arg(long, short = 'o', value_enum, default_value_t = OutputFormat::Json, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the refresh message for the notebook.
    Graph {
        /// Document to mark as current.
        #[arg(long, value_name = "PATH")]
        current: Option<PathBuf>,
    },
    /// Print the outbound link graph as Graphviz DOT.
    Dot,
    /// Run the layout and print positioned nodes and edges.
    Layout {
        #[arg(long, value_enum, default_value_t = ModeArg::All)]
        mode: ModeArg,
        #[arg(long, value_name = "PATH")]
        current: Option<PathBuf>,
        #[arg(long, default_value_t = 800.0)]
        width: f64,
        #[arg(long, default_value_t = 600.0)]
        height: f64,
    },
    /// Print the resolved settings.
    Settings,
    /// Watch the notebook; one JSON message per line on stdout, UI intents on stdin.
    Watch {
        /// Document to mark as current.
        #[arg(long, value_name = "PATH")]
        current: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum ModeArg {
    All,
    Focus,
}

impl From<ModeArg> for ViewMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::All => ViewMode::All,
            ModeArg::Focus => ViewMode::Focus,
        }
    }
}

fn emit<T: Serialize>(value: &T, output: OutputFormat) -> Result<()> {
    let rendered = match output {
        OutputFormat::Json => serde_json::to_string(value),
        OutputFormat::Pretty => serde_json::to_string_pretty(value),
    }
    .context("failed to serialize CLI output as JSON")?;
    println!("{rendered}");
    Ok(())
}

fn resolve_settings(cli: &Cli) -> Result<LinkMapSettings> {
    if let Some(conf) = &cli.config_file {
        set_linkmap_config_override(conf.clone()).context("failed to apply --conf")?;
    }
    let mut settings = LinkMapSettings::load();
    if !cli.file_types.is_empty() {
        settings.file_types = cli
            .file_types
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_string())
            .collect();
    }
    Ok(settings)
}

async fn open_snapshot(
    settings: &LinkMapSettings,
    root: &Path,
    current: Option<&Path>,
) -> Result<omni_linkmap::GraphSnapshot> {
    let (session, _outputs) = GraphSession::open(settings, Some(root), current, false)
        .await
        .with_context(|| format!("failed to open notebook '{}'", root.display()))?;
    let snapshot = session.snapshot().await?;
    session.close().await?;
    Ok(snapshot)
}

async fn watch(settings: &LinkMapSettings, root: &Path, current: Option<&Path>) -> Result<()> {
    let (session, mut outputs) = GraphSession::open(settings, Some(root), current, true)
        .await
        .with_context(|| format!("failed to watch notebook '{}'", root.display()))?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            Some(output) = outputs.recv() => emit(&output, OutputFormat::Json)?,
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<UiIntent>(&line) {
                    Ok(intent) => session.send(intent).await?,
                    Err(error) => tracing::warn!(
                        event = "linkmap.cli.bad_intent",
                        error = %error,
                        "ignoring malformed intent"
                    ),
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    session.close().await?;
    while let Ok(output) = outputs.try_recv() {
        emit(&output, OutputFormat::Json)?;
    }
    Ok(())
}

async fn execute(cli: &Cli) -> Result<()> {
    let settings = resolve_settings(cli)?;
    let Some(command) = &cli.command else {
        if !settings.auto_start {
            bail!("no subcommand given and `autoStart` is off; see `linkmap --help`");
        }
        tracing::info!(event = "linkmap.cli.auto_start", "autoStart is on; watching");
        return watch(&settings, &cli.root, None).await;
    };
    match command {
        Command::Graph { current } => {
            let snapshot = open_snapshot(&settings, &cli.root, current.as_deref()).await?;
            emit(&snapshot.into_message(), cli.output)
        }
        Command::Dot => {
            let parser = DocumentParser::default();
            let report = scan_directory(&cli.root, &settings.file_types, &parser)
                .with_context(|| format!("failed to scan notebook '{}'", cli.root.display()))?;
            print!("{}", to_dot(&GraphStore::from_scan(report)));
            Ok(())
        }
        Command::Layout {
            mode,
            current,
            width,
            height,
        } => {
            let snapshot = open_snapshot(&settings, &cli.root, current.as_deref()).await?;
            let mut projector = RenderProjector::new(*width, *height);
            projector.set_mode((*mode).into());
            emit(&projector.refresh(snapshot), cli.output)
        }
        Command::Settings => emit(&settings, cli.output),
        Command::Watch { current } => watch(&settings, &cli.root, current.as_deref()).await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("omni_linkmap=info,linkmap=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    execute(&cli).await
}
