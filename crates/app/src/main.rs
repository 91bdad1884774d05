use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use exam_core::model::{
    CandidateId, ExamStateKey, ExamSummary, LOW_TIME_THRESHOLD_SECONDS, ParseIdError, SchemeId,
    SessionPhase, format_clock,
};
use services::config::parse_url;
use services::{
    AppServices, Clock, ConfigError, Eligibility, ExamConfig, ExamError, ExamEventKind,
    ExamSessionController, SimulatedPresentation,
};
use storage::repository::ExamStateRepository;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidId { flag: &'static str, source: ParseIdError },
    MissingIdentity { flag: &'static str },
    Config(ConfigError),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidId { flag, source } => write!(f, "invalid {flag} value: {source}"),
            ArgsError::MissingIdentity { flag } => {
                write!(f, "{flag} is required (or set the matching EXAM_* variable)")
            }
            ArgsError::Config(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<ConfigError> for ArgsError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_id<T: FromStr<Err = ParseIdError>>(raw: &str, flag: &'static str) -> Result<T, ArgsError> {
    raw.parse().map_err(|source| ArgsError::InvalidId { flag, source })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  exam run    --candidate <id> --scheme <id> [--db <sqlite_url>] [--portal <url>]");
    eprintln!("  exam status --candidate <id> --scheme <id> [--db <sqlite_url>] [--portal <url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  command run");
    eprintln!("  --db sqlite://exam.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_PORTAL_URL, EXAM_DB_URL, EXAM_CANDIDATE, EXAM_SCHEME,");
    eprintln!("  EXAM_DATE_CHECK (strict|lenient), EXAM_UTC_OFFSET (+HH:MM),");
    eprintln!("  EXAM_PERSIST_WARN_AFTER, RUST_LOG");
}

fn print_commands() {
    println!("Commands:");
    println!("  :start         begin the exam");
    println!("  :next, :prev   move between questions");
    println!("  :goto <n>      jump to question n");
    println!("  :submit        submit (asks for :yes)");
    println!("  :leave         simulate leaving full-screen");
    println!("  :resume        return to full-screen");
    println!("  :retry         retry loading questions");
    println!("  :status        show the current screen again");
    println!("  :quit          close (progress is kept)");
    println!("  anything else  replaces the answer to the current question");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run,
    Status,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "run" => Some(Self::Run),
            "status" => Some(Self::Status),
            _ => None,
        }
    }
}

struct Args {
    config: ExamConfig,
    candidate: CandidateId,
    scheme: SchemeId,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut config = ExamConfig::from_env()?;
        config.db_url = normalize_sqlite_url(config.db_url);
        let mut candidate = std::env::var("EXAM_CANDIDATE")
            .ok()
            .map(|raw| parse_id(&raw, "EXAM_CANDIDATE"))
            .transpose()?;
        let mut scheme = std::env::var("EXAM_SCHEME")
            .ok()
            .map(|raw| parse_id(&raw, "EXAM_SCHEME"))
            .transpose()?;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    config.db_url = normalize_sqlite_url(value);
                }
                "--portal" => {
                    let value = require_value(args, "--portal")?;
                    config.portal_url = Some(parse_url(&value)?);
                }
                "--candidate" => {
                    let value = require_value(args, "--candidate")?;
                    candidate = Some(parse_id(&value, "--candidate")?);
                }
                "--scheme" => {
                    let value = require_value(args, "--scheme")?;
                    scheme = Some(parse_id(&value, "--scheme")?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            config,
            candidate: candidate.ok_or(ArgsError::MissingIdentity {
                flag: "--candidate",
            })?,
            scheme: scheme.ok_or(ArgsError::MissingIdentity { flag: "--scheme" })?,
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

//
// ─── TERMINAL INPUT ────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Start,
    Next,
    Previous,
    GoTo(usize),
    Submit,
    Confirm,
    Leave,
    Resume,
    Retry,
    Status,
    Help,
    Quit,
    Answer(String),
    Invalid(String),
}

impl Input {
    fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let Some(command) = trimmed.strip_prefix(':') else {
            return Self::Answer(line.trim_end_matches(['\r', '\n']).to_string());
        };
        let mut parts = command.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("start"), None) => Self::Start,
            (Some("next" | "n"), None) => Self::Next,
            (Some("prev" | "p"), None) => Self::Previous,
            (Some("goto" | "g"), Some(n)) => match n.parse::<usize>() {
                Ok(n) if n > 0 => Self::GoTo(n - 1),
                _ => Self::Invalid(trimmed.to_string()),
            },
            (Some("submit"), None) => Self::Submit,
            (Some("yes"), None) => Self::Confirm,
            (Some("leave"), None) => Self::Leave,
            (Some("resume"), None) => Self::Resume,
            (Some("retry"), None) => Self::Retry,
            (Some("status"), None) => Self::Status,
            (Some("help" | "h"), None) => Self::Help,
            (Some("quit" | "q"), None) => Self::Quit,
            _ => Self::Invalid(trimmed.to_string()),
        }
    }
}

//
// ─── RENDERING ─────────────────────────────────────────────────────────────────
//

fn print_summary(summary: &ExamSummary) {
    println!(
        "Theory exam: {}, {}",
        summary.question_label(),
        summary.duration_label()
    );
    for line in summary.unit_lines() {
        println!("  {line}");
    }
}

fn render_question(ctl: &ExamSessionController) {
    let Some(question) = ctl.current_question() else {
        return;
    };
    let markers: String = ctl
        .question_markers()
        .iter()
        .map(|m| match (m.current, m.answered) {
            (true, _) => '>',
            (false, true) => '#',
            (false, false) => '.',
        })
        .collect();
    let low = if ctl.is_low_time() { " (low)" } else { "" };
    println!();
    println!(
        "[{}{low}] Question {}/{}  {markers}",
        ctl.clock_label(),
        ctl.current_index() + 1,
        ctl.question_count()
    );
    if let Some(unit) = ctl.current_unit() {
        println!("Unit {}: {}", unit.order, unit.title);
    }
    println!("{}", question.text);
    println!("Answer: {}", ctl.current_answer());
}

fn render(ctl: &ExamSessionController) {
    match ctl.phase() {
        SessionPhase::CheckingEligibility | SessionPhase::Loading => {}
        SessionPhase::Denied => {
            if let Some(denial) = ctl.denial() {
                println!("Access denied: {}", denial.message());
            }
        }
        SessionPhase::LoadFailed => {
            println!(
                "Could not load the exam: {}",
                ctl.load_error().unwrap_or("unknown error")
            );
            println!("Type :retry to try again.");
        }
        SessionPhase::NotStarted => {
            if let Some(schedule) = ctl.schedule() {
                println!(
                    "Scheduled {} {} in {}",
                    schedule.date, schedule.time, schedule.room
                );
            }
            if let Some(summary) = ctl.summary() {
                print_summary(&summary);
            }
            println!("Type :start to begin. The exam runs in full-screen.");
        }
        SessionPhase::Active => {
            if ctl.persistence_warning() {
                println!("Warning: progress is not being saved; reloading may lose answers.");
            }
            render_question(ctl);
        }
        SessionPhase::PausedIntegrity => {
            if ctl.fullscreen_prompt() {
                println!("Full-screen is required to continue. Type :resume.");
            } else {
                println!(
                    "Exam paused: full-screen was left ({} times). Type :resume.",
                    ctl.integrity_pauses()
                );
            }
        }
        SessionPhase::Submitting => match ctl.submit_error() {
            Some(err) => println!("Submission failed: {err}. Type :submit to retry."),
            None => println!("Submitting answers..."),
        },
        SessionPhase::Submitted => {
            let id = ctl.receipt().map_or("-", |r| r.submission_id.as_str());
            println!("Answers submitted (receipt {id}). You may close this window.");
        }
    }
}

/// Periodic clock announcements: every minute, every 30s when low, each of the
/// last ten seconds.
fn should_announce(seconds_left: u32) -> bool {
    seconds_left % 60 == 0
        || (seconds_left < LOW_TIME_THRESHOLD_SECONDS && seconds_left % 30 == 0)
        || seconds_left <= 10
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Apply one line of input. Returns whether a submit confirmation is pending.
async fn apply(
    ctl: &mut ExamSessionController,
    presentation: &SimulatedPresentation,
    input: Input,
    confirming: bool,
) -> bool {
    let navigates = matches!(input, Input::Next | Input::Previous | Input::GoTo(_));
    let outcome: Result<(), ExamError> = match input {
        Input::Start => ctl.start().await,
        Input::Next => ctl.next().map(|_| ()),
        Input::Previous => ctl.previous().map(|_| ()),
        Input::GoTo(index) => ctl.go_to(index).map(|_| ()),
        Input::Submit => match ctl.submit_prompt() {
            Some(prompt) => {
                println!("{} Type :yes to confirm.", prompt.message());
                return true;
            }
            None => ctl.submit().await.map(|_| ()),
        },
        Input::Confirm if confirming => ctl.submit().await.map(|_| ()),
        Input::Confirm => {
            println!("Nothing to confirm.");
            Ok(())
        }
        Input::Leave => {
            presentation.leave();
            Ok(())
        }
        Input::Resume => ctl.reengage().await,
        Input::Retry => ctl.retry_load().await.map(|_| ()),
        Input::Status => {
            render(ctl);
            Ok(())
        }
        Input::Help => {
            print_commands();
            Ok(())
        }
        Input::Answer(text) => ctl.edit_answer(text).await,
        Input::Invalid(raw) => {
            println!("Unrecognised command: {raw} (:help lists commands)");
            Ok(())
        }
        Input::Quit => Ok(()),
    };

    match outcome {
        Ok(()) if navigates => render_question(ctl),
        Ok(()) => {}
        Err(err) => println!("{err}"),
    }
    false
}

async fn run_session(services: &AppServices, args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let presentation = Arc::new(SimulatedPresentation::new());
    let mut ctl = services.controller(args.candidate, args.scheme, presentation.clone());
    ctl.open().await?;
    render(&ctl);
    if !ctl.phase().is_terminal() {
        println!("Type :help for commands.");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut confirming = false;
    while !ctl.phase().is_terminal() {
        let before = ctl.phase();
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let input = Input::parse(&line);
                if input == Input::Quit {
                    break;
                }
                confirming = apply(&mut ctl, &presentation, input, confirming).await;
            }
            Some(event) = ctl.next_event() => {
                ctl.handle_event(event).await;
                if ctl.phase() == before
                    && event.kind() == ExamEventKind::Tick
                    && should_announce(ctl.time_left_seconds())
                {
                    println!("[{}] remaining", ctl.clock_label());
                }
            }
        }
        if ctl.phase() != before {
            confirming = false;
            render(&ctl);
        }
    }

    ctl.close();
    Ok(())
}

async fn show_status(services: &AppServices, args: Args) -> Result<(), Box<dyn std::error::Error>> {
    match services.gate().check(&args.candidate).await {
        Eligibility::Denied(denial) => {
            println!("Denied ({}): {}", denial.reason(), denial.message());
            return Ok(());
        }
        Eligibility::Approved(schedule) => println!(
            "Eligible: {} {} in {}",
            schedule.date, schedule.time, schedule.room
        ),
    }

    let set = services.loader().load(&args.scheme).await?;
    print_summary(&set.summary());

    let key = ExamStateKey::for_exam(&args.candidate, &args.scheme);
    match services.storage().exam_states.get_state(&key).await {
        Ok(Some(state)) => println!(
            "Saved progress: {} left, {} answered",
            format_clock(state.time_left_seconds()),
            state.answers().answered_count()
        ),
        Ok(None) => println!("No saved progress."),
        Err(err) => println!("Saved progress is unreadable: {err}"),
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: run the exam when no subcommand is provided.
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
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let args = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so services stay pure.
    prepare_sqlite_file(&args.config.db_url)?;
    let services = AppServices::from_config(args.config.clone(), Clock::default_clock()).await?;

    match cmd {
        Command::Run => run_session(&services, args).await,
        Command::Status => show_status(&services, args).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_answers() {
        assert_eq!(Input::parse(":start"), Input::Start);
        assert_eq!(Input::parse("  :goto 3 "), Input::GoTo(2));
        assert_eq!(Input::parse(":goto 0"), Input::Invalid(":goto 0".into()));
        assert_eq!(Input::parse(":q"), Input::Quit);
        assert_eq!(
            Input::parse("Normalisation removes redundancy\r"),
            Input::Answer("Normalisation removes redundancy".into())
        );
        assert_eq!(Input::parse(":dance"), Input::Invalid(":dance".into()));
    }

    #[test]
    fn announces_minutes_and_the_final_seconds() {
        assert!(should_announce(600));
        assert!(!should_announce(599));
        assert!(should_announce(270));
        assert!(!should_announce(275));
        assert!(should_announce(7));
    }

    #[test]
    fn memory_db_needs_no_file() {
        assert!(prepare_sqlite_file("sqlite::memory:").is_ok());
        assert!(prepare_sqlite_file("postgres://x").is_err());
    }
}
