//! # Glint - Zone-Aware Syntax Highlighting
//!
//! Command line front end to the glint engine.
//!
//! ## Quick Start
//!
//! ```bash
//! # Tagged spans of a file, language from its extension
//! cargo run -- highlight src/app.py
//!
//! # Same, as JSON
//! cargo run -- highlight page.html --json
//!
//! # Brace under byte offset 42
//! cargo run -- brace src/app.py --offset 42
//!
//! # Definitions, and whether to indent after a line
//! cargo run -- symbols src/app.py
//! cargo run -- indent --language python "if ready:"
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use glint_core::{Command, CommandOutput, Config, Dispatch, Workbench};
use glint_syntax::{HighlightedSpan, MatchResult};
use glint_text::PositionMapper;

/// Glint - zone-aware syntax highlighting and brace matching
#[derive(Parser, Debug)]
#[command(name = "glint")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging (RUST_LOG takes precedence)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Action {
    /// Print the tagged spans of a file
    Highlight {
        file: PathBuf,

        /// Language id or extension (defaults to the file's extension)
        #[arg(short, long)]
        language: Option<String>,

        /// Print JSON instead of one span per line
        #[arg(long)]
        json: bool,
    },

    /// Match the bracket next to a byte offset
    Brace {
        file: PathBuf,

        #[arg(short, long)]
        offset: usize,

        #[arg(short, long)]
        language: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// List definitions found by the grammar's struct patterns
    Symbols {
        file: PathBuf,

        #[arg(short, long)]
        language: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Report whether the line after LINE should be indented
    Indent {
        #[arg(short, long)]
        language: String,

        line: String,
    },

    /// List registered languages and their extensions
    Languages,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .with(log_filter(args.verbose))
        .init();

    tracing::info!("Starting glint v{}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load(),
    };

    let mut bench = Workbench::new(config);
    let stdout = std::io::stdout();
    run(&mut bench, args.command, &mut stdout.lock()).await
}

/// `RUST_LOG` when set, otherwise the level picked by `-v`.
fn log_filter(verbose: u8) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level(verbose).as_str().to_ascii_lowercase()))
}

fn log_level(verbose: u8) -> tracing::Level {
    match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }
}

/// Executes one action, writing its report to `out`.
async fn run(bench: &mut Workbench, action: Action, out: &mut impl Write) -> anyhow::Result<()> {
    match action {
        Action::Highlight {
            file,
            language,
            json,
        } => {
            let (text, language) = read_source(&file, language)?;
            let session = bench.open_session(&language, text.as_str());
            if let Dispatch::Deferred { .. } = bench.request_highlight(session)? {
                bench.run_deferred().await;
            }

            let spans = &bench.session(session)?.overlay().spans;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(spans)?)?;
            } else {
                for span in spans {
                    writeln!(out, "{}", describe_span(&text, span))?;
                }
            }
        }

        Action::Brace {
            file,
            offset,
            language,
            json,
        } => {
            let (text, language) = read_source(&file, language)?;
            let session = bench.open_session(&language, text.as_str());
            let CommandOutput::Brace { result } = bench.dispatch(Command::MatchBrace {
                session,
                cursor: offset,
            })?
            else {
                anyhow::bail!("Unexpected output for brace match");
            };

            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&result)?)?;
            } else {
                writeln!(out, "{}", describe_brace(&text, result))?;
            }
        }

        Action::Symbols {
            file,
            language,
            json,
        } => {
            let (text, language) = read_source(&file, language)?;
            let session = bench.open_session(&language, text.as_str());
            let symbols = bench.symbols(session)?;

            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&symbols)?)?;
            } else {
                for symbol in symbols {
                    writeln!(out, "{:>5}  {}", symbol.line, symbol.label)?;
                }
            }
        }

        Action::Indent { language, line } => {
            writeln!(out, "{}", bench.engine().autoindent_hint(&language, &line))?;
        }

        Action::Languages => {
            let registry = bench.engine().registry();
            for id in registry.languages() {
                if let Some(grammar) = registry.get(id) {
                    writeln!(out, "{:<12} {}", id, grammar.extensions().join(" "))?;
                }
            }
        }
    }

    Ok(())
}

/// Reads a source file and picks its language: the explicit one, or the
/// file's extension.
fn read_source(path: &Path, language: Option<String>) -> anyhow::Result<(String, String)> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let language = language
        .or_else(|| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(str::to_string)
        })
        .with_context(|| format!("Cannot tell the language of {}; use --language", path.display()))?;

    Ok((text, language))
}

fn describe_span(text: &str, span: &HighlightedSpan) -> String {
    let content = text
        .get(span.span.start..span.span.end)
        .unwrap_or_default();
    format!("{}-{} {:<14} {:?}", span.from, span.to, span.span.tag, content)
}

fn describe_brace(text: &str, result: MatchResult) -> String {
    let mapper = PositionMapper::new(text);
    match result {
        MatchResult::Matched { open, close } => format!(
            "matched {} {}",
            mapper.offset_to_coord(open),
            mapper.offset_to_coord(close)
        ),
        MatchResult::Lone { offset } => format!("lone {}", mapper.offset_to_coord(offset)),
        MatchResult::None => "none".to_string(),
    }
}
