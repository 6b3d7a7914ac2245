use std::fmt;
use std::sync::Arc;

use quiz_core::model::{Category, HistoryStats, Question, SessionMode, TestResult};
use services::{
    AdvanceResult, AppServices, Clock, CompletionReport, ExamLoopService, ExplanationService,
    QuizConfig, SessionError, SessionEvent, SessionState,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidCategory { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidCategory { raw } => {
                write!(f, "unknown category: {raw} (see `categories`)")
            }
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
    eprintln!("  drive-theory practice [--category <name>] [--db <sqlite_url>]");
    eprintln!("  drive-theory exam                         [--db <sqlite_url>]");
    eprintln!("  drive-theory history                      [--db <sqlite_url>]");
    eprintln!("  drive-theory clear-history                [--db <sqlite_url>]");
    eprintln!("  drive-theory tip --category <name>");
    eprintln!("  drive-theory categories");
    eprintln!();
    eprintln!("During a session: type an option number to answer, Enter for the next");
    eprintln!("question, `?` for a detailed explanation, `q` to quit.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_BANK_PATH, QUIZ_EXAM_SIZE, QUIZ_EXAM_DURATION_SECS,");
    eprintln!("  QUIZ_PASS_THRESHOLD, QUIZ_SAVE_PRACTICE, QUIZ_AI_API_KEY, QUIZ_AI_BASE_URL,");
    eprintln!("  QUIZ_AI_MODEL, QUIZ_AI_TIMEOUT_SECS, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Practice,
    Exam,
    History,
    ClearHistory,
    Tip,
    Categories,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "practice" => Some(Self::Practice),
            "exam" => Some(Self::Exam),
            "history" => Some(Self::History),
            "clear-history" => Some(Self::ClearHistory),
            "tip" => Some(Self::Tip),
            "categories" => Some(Self::Categories),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    db_url: Option<String>,
    category: Option<Category>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = Some(value);
                }
                "--category" => {
                    let value = require_value(args, "--category")?;
                    let category = value
                        .parse::<Category>()
                        .map_err(|_| ArgsError::InvalidCategory { raw: value.clone() })?;
                    parsed.category = Some(category);
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
    format!("sqlite://{}?mode=rwc", absolute.display())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();

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

    let mut iter = argv.into_iter().skip(1);
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let mut config = QuizConfig::from_env()?;
    if let Some(db_url) = parsed.db_url {
        config.database_url = normalize_sqlite_url(db_url);
    }

    match cmd {
        Command::Categories => {
            for category in Category::ALL {
                println!("{category}");
            }
            Ok(())
        }
        Command::Tip => {
            let category = parsed
                .category
                .ok_or(ArgsError::MissingValue { flag: "--category" })?;
            let (services, _events) = AppServices::in_memory(config, Clock::default_clock()).await;
            println!("{}", services.explanations().study_tip(category).await);
            Ok(())
        }
        Command::History => {
            let (services, _events) =
                AppServices::new_sqlite(config, Clock::default_clock()).await?;
            let results = services.results();
            print_history(&results.results().await, &results.stats().await);
            Ok(())
        }
        Command::ClearHistory => {
            let (services, _events) =
                AppServices::new_sqlite(config, Clock::default_clock()).await?;
            services.results().clear().await?;
            println!("History cleared.");
            Ok(())
        }
        Command::Practice | Command::Exam => {
            let (services, events) =
                AppServices::new_sqlite(config, Clock::default_clock()).await?;
            let exam_loop = services.exam_loop();
            if cmd == Command::Exam {
                exam_loop.start_exam().await?;
            } else {
                exam_loop.start_practice(parsed.category).await?;
            }
            if !services.explanations_enabled() {
                tracing::info!("QUIZ_AI_API_KEY not set; `?` falls back to canned text");
            }
            drive_session(exam_loop, services.explanations(), events).await
        }
    }
}

/// Interactive loop: stdin commands, timer events and finished explanations.
async fn drive_session(
    exam_loop: Arc<ExamLoopService>,
    explanations: ExplanationService,
    mut events: UnboundedReceiver<SessionEvent>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (explained_tx, mut explained_rx) = mpsc::unbounded_channel::<String>();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    render_question(&exam_loop).await;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    exam_loop.abort().await;
                    return Ok(());
                };
                let report = handle_input(
                    line.trim(),
                    &exam_loop,
                    &explanations,
                    &explained_tx,
                )
                .await?;
                match report {
                    InputOutcome::Continue => {}
                    InputOutcome::Quit => return Ok(()),
                    InputOutcome::Finished(report) => {
                        print_report(&report);
                        return Ok(());
                    }
                }
            }
            Some(event) = events.recv() => match event {
                SessionEvent::Tick { remaining_secs, .. } => {
                    if remaining_secs % 60 == 0 || remaining_secs <= 10 {
                        println!("[{} remaining]", format_duration(remaining_secs));
                    }
                }
                SessionEvent::Expired(report) => {
                    println!("Time is up!");
                    print_report(&report);
                    return Ok(());
                }
            },
            Some(text) = explained_rx.recv() => {
                println!();
                println!("Expert explanation: {text}");
            }
        }
    }
}

enum InputOutcome {
    Continue,
    Quit,
    Finished(CompletionReport),
}

/// Run one line of input. A session that ended under the user (the exam
/// timer ran out) is not an error: the loop keeps waiting for its report.
async fn handle_input(
    input: &str,
    exam_loop: &Arc<ExamLoopService>,
    explanations: &ExplanationService,
    explained_tx: &UnboundedSender<String>,
) -> Result<InputOutcome, SessionError> {
    match dispatch_input(input, exam_loop, explanations, explained_tx).await {
        Err(SessionError::NotInProgress) => {
            println!("The session has ended; waiting for the final result...");
            Ok(InputOutcome::Continue)
        }
        other => other,
    }
}

async fn dispatch_input(
    input: &str,
    exam_loop: &Arc<ExamLoopService>,
    explanations: &ExplanationService,
    explained_tx: &UnboundedSender<String>,
) -> Result<InputOutcome, SessionError> {
    match input {
        "q" | "quit" => {
            exam_loop.abort().await;
            println!("Session abandoned; nothing was recorded.");
            Ok(InputOutcome::Quit)
        }
        "?" => {
            match exam_loop.request_explanation(explanations).await {
                Ok(pending) => {
                    println!("Asking the expert...");
                    let exam_loop = Arc::clone(exam_loop);
                    let tx = explained_tx.clone();
                    tokio::spawn(async move {
                        if let Some(text) = exam_loop.apply_explanation(pending).await {
                            let _ = tx.send(text);
                        }
                    });
                }
                Err(SessionError::NotAnswered) => println!("Answer the question first."),
                Err(err) => return Err(err),
            }
            Ok(InputOutcome::Continue)
        }
        "" | "n" | "next" => match exam_loop.advance().await? {
            AdvanceResult::Next { .. } => {
                render_question(exam_loop).await;
                Ok(InputOutcome::Continue)
            }
            AdvanceResult::Completed(report) => Ok(InputOutcome::Finished(report)),
        },
        other => {
            let Ok(choice) = other.parse::<usize>() else {
                println!("Type an option number, Enter, `?` or `q`.");
                return Ok(InputOutcome::Continue);
            };
            match exam_loop.answer(choice.wrapping_sub(1)).await {
                Ok(feedback) => {
                    let snapshot = exam_loop.snapshot().await;
                    if snapshot.mode == Some(SessionMode::Practice) {
                        if feedback.is_correct {
                            println!("Correct!");
                        } else {
                            let correct = snapshot
                                .question
                                .as_ref()
                                .and_then(|q| q.option(feedback.correct_index))
                                .unwrap_or_default();
                            println!("Incorrect. The answer is: {correct}");
                        }
                        if let Some(explanation) = feedback.explanation {
                            println!("{explanation}");
                        }
                        println!("(Enter for next, `?` for a detailed explanation)");
                    } else {
                        println!("Answer recorded. Press Enter for the next question.");
                    }
                }
                Err(SessionError::InvalidOption { len, .. }) => {
                    println!("Pick an option between 1 and {len}.");
                }
                Err(SessionError::AlreadyAnswered { .. }) => {
                    println!("Already answered. Press Enter for the next question.");
                }
                Err(err) => return Err(err),
            }
            Ok(InputOutcome::Continue)
        }
    }
}

async fn render_question(exam_loop: &ExamLoopService) {
    let snapshot = exam_loop.snapshot().await;
    if snapshot.state != SessionState::InProgress {
        return;
    }
    let Some(question) = snapshot.question.as_ref() else {
        return;
    };
    println!();
    let timer = snapshot
        .time_remaining_secs
        .map(|secs| format!("  [{}]", format_duration(secs)))
        .unwrap_or_default();
    println!(
        "Question {} of {}  ({}){timer}",
        snapshot.index + 1,
        snapshot.total,
        question.category()
    );
    print_question(question);
}

fn print_question(question: &Question) {
    println!("{}", question.text());
    if let Some(image) = question.image_url() {
        println!("  (image: {image})");
    }
    for (i, option) in question.options().iter().enumerate() {
        println!("  {}. {option}", i + 1);
    }
}

fn print_report(report: &CompletionReport) {
    let outcome = &report.outcome;
    println!();
    println!(
        "{} finished: {}/{} in {}",
        capitalize(&outcome.mode.to_string()),
        outcome.score,
        outcome.total,
        format_duration(outcome.time_taken_secs)
    );
    if outcome.mode == SessionMode::MockTest {
        println!("{}", if outcome.passed { "PASSED" } else { "FAILED" });
    }
    if let Some(warning) = &report.persist_warning {
        println!("Warning: result not saved ({warning})");
    }
}

fn print_history(results: &[TestResult], stats: &HistoryStats) {
    if results.is_empty() {
        println!("No tests taken yet.");
        return;
    }
    println!(
        "Tests taken: {}  passed: {}  pass rate: {}%  average score: {}%",
        stats.tests_taken, stats.tests_passed, stats.pass_rate_percent, stats.average_score_percent
    );
    for result in results {
        println!(
            "{}  {:>3}/{:<3}  {}  {}",
            result.date(),
            result.score(),
            result.total(),
            if result.passed() { "pass" } else { "fail" },
            format_duration(result.time_taken_secs())
        );
    }
}

fn format_duration(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{ExamSettings, QuestionBank};
    use services::ResultStore;
    use std::time::Duration;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_owned());
        Args::parse(&mut iter)
    }

    #[test]
    fn parses_category_and_db() {
        let args = parse(&["--category", "motorway rules", "--db", "quiz.sqlite3"]).unwrap();
        assert_eq!(args.category, Some(Category::MotorwayRules));
        assert_eq!(args.db_url.as_deref(), Some("quiz.sqlite3"));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(matches!(
            parse(&["--category"]),
            Err(ArgsError::MissingValue { flag: "--category" })
        ));
        assert!(matches!(
            parse(&["--category", "Juggling"]),
            Err(ArgsError::InvalidCategory { .. })
        ));
        assert!(matches!(parse(&["--db", " "]), Err(ArgsError::InvalidDbUrl { .. })));
        assert!(matches!(parse(&["--fast"]), Err(ArgsError::UnknownArg(_))));
    }

    #[test]
    fn sqlite_urls_are_normalized() {
        assert_eq!(
            normalize_sqlite_url("sqlite::memory:".into()),
            "sqlite::memory:"
        );
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/q.db".into()),
            "sqlite:///tmp/q.db"
        );
        assert_eq!(
            normalize_sqlite_url("/tmp/q.db".into()),
            "sqlite:///tmp/q.db?mode=rwc"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn input_after_timer_expiry_waits_for_the_report() {
        let (exam_loop, mut events) = ExamLoopService::new(
            ExamSettings::new(5, 1, 0.86, false).unwrap(),
            Clock::default_clock(),
            QuestionBank::builtin(),
            ResultStore::in_memory(),
        );
        let exam_loop = Arc::new(exam_loop);
        let explanations = ExplanationService::disabled();
        let (tx, _rx) = mpsc::unbounded_channel();
        exam_loop.start_exam().await.unwrap();

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(exam_loop.snapshot().await.state, SessionState::Completed);

        for input in ["", "?", "1"] {
            let outcome = handle_input(input, &exam_loop, &explanations, &tx).await;
            assert!(matches!(outcome, Ok(InputOutcome::Continue)));
        }
        assert!(matches!(events.recv().await, Some(SessionEvent::Expired(_))));
    }

    #[test]
    fn durations_render_as_minutes_and_seconds() {
        assert_eq!(format_duration(3420), "57:00");
        assert_eq!(format_duration(65), "01:05");
        assert_eq!(capitalize("mock test"), "Mock test");
    }
}
