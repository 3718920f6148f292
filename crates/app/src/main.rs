mod terminal;

use std::fmt;
use std::io::{self, BufWriter};
use std::sync::Arc;

use rand::Rng;
use services::{
    Clock, FlushMode, PersistenceAdapter, StudyConfig, StudyLoopService, demo_catalog,
    load_catalog,
};
use storage::repository::Storage;
use study_core::market::Liquidity;
use study_core::model::{Answer, Catalog};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidLiquidity { raw: String },
    InvalidCount { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidLiquidity { raw } => write!(f, "invalid --liquidity value: {raw}"),
            ArgsError::InvalidCount { raw } => write!(f, "invalid --participants value: {raw}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- run    [--db <sqlite_url>] [--catalog <json>]");
    eprintln!("                             [--participant <id>] [--email <address|no>]");
    eprintln!("                             [--batched] [--liquidity <b>]");
    eprintln!("  cargo run -p app -- report [--db <sqlite_url>] [--catalog <json>]");
    eprintln!("                             [--liquidity <b>] [--trajectory]");
    eprintln!("  cargo run -p app -- seed   [--db <sqlite_url>] [--catalog <json>]");
    eprintln!("                             [--participants <n>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://study.sqlite3");
    eprintln!("  --catalog built-in demo catalog");
    eprintln!("  --participants 10");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STUDY_DB_URL, STUDY_CATALOG, STUDY_LIQUIDITY, STUDY_RETRY_ATTEMPTS,");
    eprintln!("  STUDY_RETRY_BACKOFF_MS, STUDY_FLUSH_MODE, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run,
    Report,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "run" => Some(Self::Run),
            "report" => Some(Self::Report),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    catalog: Option<String>,
    participant: Option<String>,
    email: Option<String>,
    batched: bool,
    liquidity: Option<Liquidity>,
    trajectory: bool,
    participants: usize,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            db_url: std::env::var("STUDY_DB_URL")
                .ok()
                .map_or_else(|| "sqlite://study.sqlite3".into(), normalize_sqlite_url),
            catalog: std::env::var("STUDY_CATALOG").ok(),
            participant: None,
            email: None,
            batched: false,
            liquidity: None,
            trajectory: false,
            participants: 10,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = normalize_sqlite_url(value);
                }
                "--catalog" => parsed.catalog = Some(require_value(args, "--catalog")?),
                "--participant" => parsed.participant = Some(require_value(args, "--participant")?),
                "--email" => parsed.email = Some(require_value(args, "--email")?),
                "--batched" => parsed.batched = true,
                "--trajectory" => parsed.trajectory = true,
                "--liquidity" => {
                    let value = require_value(args, "--liquidity")?;
                    let liquidity = value
                        .parse::<f64>()
                        .ok()
                        .and_then(|b| Liquidity::new(b).ok())
                        .ok_or_else(|| ArgsError::InvalidLiquidity { raw: value.clone() })?;
                    parsed.liquidity = Some(liquidity);
                }
                "--participants" => {
                    let value = require_value(args, "--participants")?;
                    parsed.participants = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidCount { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }

    fn config(&self) -> Result<StudyConfig, services::ConfigError> {
        let mut config = StudyConfig::from_env()?;
        if self.batched {
            config.flush = FlushMode::Batched;
        }
        if let Some(liquidity) = self.liquidity {
            config.liquidity = liquidity;
        }
        Ok(config)
    }

    fn catalog(&self) -> Result<Catalog, services::ConfigError> {
        match &self.catalog {
            Some(path) => load_catalog(path),
            None => demo_catalog(),
        }
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

fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|error| format!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

fn prompt_line(prompt: &str) -> io::Result<String> {
    use std::io::Write;

    let mut out = io::stdout();
    write!(out, "{prompt}")?;
    out.flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_owned())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: run a session when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Run,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Run,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            io::Error::new(io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing()?;
    let config = parsed.config()?;
    let catalog = Arc::new(parsed.catalog()?);

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    let study = StudyLoopService::new(
        catalog,
        Clock::default_clock(),
        PersistenceAdapter::from_storage(&storage, config.retry),
        config,
    );

    match cmd {
        Command::Run => {
            let participant = match parsed.participant {
                Some(id) => id,
                None => prompt_line("Participant id: ")?,
            };
            let email = match parsed.email {
                Some(email) => email,
                None => prompt_line("Email for results (or \"no\"): ")?,
            };
            let mut session = study.start_session(&participant, &email)?;

            let stdin = io::stdin();
            let mut input = stdin.lock();
            let mut out = io::stdout();
            terminal::run_session(&study, &mut session, &mut input, &mut out).await?;
            Ok(())
        }
        Command::Report => {
            let report = study.report(parsed.trajectory).await?;
            let mut out = BufWriter::new(io::stdout());
            terminal::print_report(&report, &mut out)?;
            std::io::Write::flush(&mut out)?;
            Ok(())
        }
        Command::Seed => {
            let mut rng = rand::rng();
            for n in 1..=parsed.participants {
                let mut session = study.start_session(&format!("seed-{n}"), "no")?;
                while !session.is_complete() {
                    let answer = Answer::from(rng.random_bool(0.5));
                    study.answer_current(&mut session, answer).await?;
                }
            }
            eprintln!(
                "seeded {} participant(s) over {} statement(s) into {}",
                parsed.participants,
                study.controller().catalog().len(),
                parsed.db_url
            );
            Ok(())
        }
    }
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
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
