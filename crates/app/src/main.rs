use std::fmt;
use std::io::Write;
use std::sync::Arc;

use services::{
    BridgeError, Clock, HostBridges, HostMessageHandler, ReporterConfig, SessionReporter,
    SubmitOutcome,
};
use storage::repository::Storage;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidGameId { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidGameId { raw } => write!(f, "invalid --game value: {raw:?}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

/// Host channel that writes each payload as one JSON line on stdout.
struct StdoutHost;

impl HostMessageHandler for StdoutHost {
    fn post_message(&self, message: &str) -> Result<(), BridgeError> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{message}").map_err(|err| BridgeError::new(err.to_string()))
    }
}

const DEFAULT_DB_FILE: &str = "playtrack.sqlite3";
const DEFAULT_GAME_ID: &str = "demo-game";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    db_url: String,
    game_id: String,
    clear: bool,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- demo    [--db <sqlite_url>] [--game <id>]");
    eprintln!("  cargo run -p app -- backlog [--db <sqlite_url>] [--clear]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:{DEFAULT_DB_FILE}");
    eprintln!("  --game {DEFAULT_GAME_ID}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PLAYTRACK_DB_URL, PLAYTRACK_TARGET_ORIGIN, PLAYTRACK_BACKLOG_KEY,");
    eprintln!("  PLAYTRACK_BACKLOG_LIMIT, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Demo,
    Backlog,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "demo" => Some(Self::Demo),
            "backlog" => Some(Self::Backlog),
            _ => None,
        }
    }
}

impl Args {
    fn parse(
        cmd: Command,
        args: &mut impl Iterator<Item = String>,
        env_db_url: Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = env_db_url
            .filter(|value| !value.trim().is_empty())
            .map_or_else(
                || normalize_sqlite_url(DEFAULT_DB_FILE.into()),
                normalize_sqlite_url,
            );
        let mut game_id = DEFAULT_GAME_ID.to_string();
        let mut clear = false;

        while let Some(arg) = args.next() {
            match (cmd, arg.as_str()) {
                (_, "--db") => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                (Command::Demo, "--game") => {
                    let value = require_value(args, "--game")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidGameId { raw: value });
                    }
                    game_id = value;
                }
                (Command::Backlog, "--clear") => clear = true,
                (_, "--help" | "-h") => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            game_id,
            clear,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    argv.remove(0);

    let mut iter = argv.into_iter();
    let parsed = Args::parse(cmd, &mut iter, std::env::var("PLAYTRACK_DB_URL").ok()).map_err(
        |e| {
            eprintln!("{e}");
            print_usage();
            e
        },
    )?;
    let config = ReporterConfig::from_env().validate()?;

    // Open + migrate SQLite here so the library crates never touch the filesystem layout.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    tracing::debug!(db_url = %parsed.db_url, backlog_key = %config.backlog_key, "storage ready");

    match cmd {
        Command::Demo => {
            let reporter = SessionReporter::with_bridges(
                Clock::default_clock(),
                config,
                HostBridges::none().with_host(Arc::new(StdoutHost)),
                Arc::clone(&storage.backlog),
            );
            play_demo_session(&reporter, &parsed.game_id);

            match reporter.submit_report().await {
                SubmitOutcome::Skipped => eprintln!("demo: session was not submitted"),
                SubmitOutcome::Submitted(report) => {
                    let session_id = report
                        .payload
                        .session_id
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default();
                    eprintln!(
                        "demo: session {session_id} delivered via [{}], stored under {:?}: {}",
                        report.delivery.succeeded().join(", "),
                        reporter.backlog_key(),
                        report.persisted
                    );
                }
            }
            Ok(())
        }
        Command::Backlog => {
            let key = config.backlog_key.as_str();
            if parsed.clear {
                let removed = storage.backlog.clear_pending(key).await?;
                eprintln!("backlog: removed {removed} pending session(s) under {key:?}");
                return Ok(());
            }

            let pending = storage.backlog.list_pending(key).await?;
            let mut out = std::io::stdout().lock();
            for payload in &pending {
                writeln!(out, "{}", serde_json::to_string(payload)?)?;
            }
            eprintln!("backlog: {} pending session(s) under {key:?}", pending.len());
            Ok(())
        }
    }
}

/// A short scripted play-through: two levels, one task each way.
fn play_demo_session(reporter: &SessionReporter, game_id: &str) {
    reporter.initialize(game_id, "demo session");
    reporter.add_metric("difficulty", "easy");
    reporter.add_metric("hints_enabled", true);

    reporter.start_level("level-1");
    reporter.record_task("level-1", "t1", "2 + 2", "4", "4", 1_800, 10);
    reporter.record_task("level-1", "t2", "3 x 3", "9", "6", 2_400, 0);
    reporter.end_level("level-1", true, 4_200, 10);

    reporter.start_level("level-2");
    reporter.record_task("level-2", "t1", "10 - 7", "3", "3", 1_200, 15);
    reporter.end_level("level-2", true, 1_200, 15);

    reporter.add_metric("score", 25);
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // stdout is the host channel in `demo`; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
