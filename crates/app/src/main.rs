mod input;
mod render;

use std::fmt;
use std::path::PathBuf;

use quiz_core::model::{BankId, DEFAULT_DURATION_MINUTES, SessionState};
use services::{AssessmentLoopService, AssessmentRun, AttemptHistoryService, Clock};
use storage::{QuestionBank, Storage, load_banks, parse_banks, seed_banks};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt as log_fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::input::{Command, HELP};

const SAMPLE_BANKS: &str = include_str!("../data/sample_bank.json");
const HISTORY_LIMIT: u32 = 5;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidBankId { raw: String },
    InvalidMinutes { raw: String },
    EmptyDuration,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidBankId { raw } => write!(f, "invalid --bank-id value: {raw}"),
            ArgsError::InvalidMinutes { raw } => {
                write!(f, "invalid --default-minutes value: {raw}")
            }
            ArgsError::EmptyDuration => write!(f, "--duration must not be empty"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug)]
struct NoBanks;

impl fmt::Display for NoBanks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no question banks to run")
    }
}

impl std::error::Error for NoBanks {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!(
        "  cargo run -p app -- [--bank <path>] [--bank-id <id>] [--duration <label>] [--default-minutes <n>]"
    );
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --bank            built-in sample banks");
    eprintln!("  --bank-id         first bank in the file");
    eprintln!("  --duration        the bank's own label");
    eprintln!("  --default-minutes {DEFAULT_DURATION_MINUTES}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_BANK_PATH, QUIZ_DURATION, QUIZ_DEFAULT_MINUTES, RUST_LOG");
}

#[derive(Debug)]
struct Args {
    bank_path: Option<PathBuf>,
    bank_id: Option<BankId>,
    duration: Option<String>,
    default_minutes: u32,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut bank_path = std::env::var("QUIZ_BANK_PATH").ok().map(PathBuf::from);
        let mut duration = std::env::var("QUIZ_DURATION")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let mut default_minutes = std::env::var("QUIZ_DEFAULT_MINUTES")
            .ok()
            .and_then(|value| value.trim().parse::<u32>().ok())
            .unwrap_or(DEFAULT_DURATION_MINUTES);
        let mut bank_id = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--bank" => bank_path = Some(PathBuf::from(require_value(args, "--bank")?)),
                "--bank-id" => {
                    let value = require_value(args, "--bank-id")?;
                    let parsed = value
                        .parse::<BankId>()
                        .map_err(|_| ArgsError::InvalidBankId { raw: value.clone() })?;
                    bank_id = Some(parsed);
                }
                "--duration" => {
                    let value = require_value(args, "--duration")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::EmptyDuration);
                    }
                    duration = Some(value);
                }
                "--default-minutes" => {
                    let value = require_value(args, "--default-minutes")?;
                    default_minutes = value
                        .trim()
                        .parse()
                        .map_err(|_| ArgsError::InvalidMinutes { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            bank_path,
            bank_id,
            duration,
            default_minutes,
        })
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout belongs to the assessment screen.
    let stderr_layer = log_fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .init();
}

fn read_banks(args: &Args) -> Result<Vec<QuestionBank>, Box<dyn std::error::Error>> {
    let banks = match &args.bank_path {
        Some(path) => load_banks(path)?,
        None => parse_banks(SAMPLE_BANKS)?,
    };
    if banks.is_empty() {
        return Err(NoBanks.into());
    }
    Ok(banks)
}

fn print_question(run: &AssessmentRun) {
    let screen = run.controller().with_session(render::question_screen);
    println!("{screen}");
}

async fn present_result(
    service: &AssessmentLoopService,
    history: &AttemptHistoryService,
    run: &mut AssessmentRun,
) {
    let Some(result) = run.controller().result() else {
        return;
    };
    println!("{}", render::result_screen(&result));

    // Retention is best effort; the result above is already on screen.
    if let Err(err) = service.finalize(run).await {
        tracing::warn!(error = %err, "attempt not retained");
        return;
    }
    match history.list_recent(run.bank_id(), HISTORY_LIMIT).await {
        Ok(items) => print!("{}", render::history_screen(run.title(), &items)),
        Err(err) => tracing::warn!(error = %err, "history unavailable"),
    }
}

/// Apply one command. Returns `false` when the user asked to leave.
fn apply(run: &mut AssessmentRun, command: Command) -> bool {
    let controller = run.controller_mut();
    let position = controller.current_index();
    let changed = match command {
        Command::Select(option) => controller.select_option(position, option),
        Command::Confirm => controller.confirm_answer(position),
        Command::Next => controller.next(),
        Command::Previous => controller.previous(),
        Command::Goto(index) => controller.jump_to(index),
        Command::Submit => {
            if !controller.submit() {
                println!("Confirm an answer for every question before submitting.");
            }
            // The completion watch renders the result.
            return true;
        }
        Command::Retake => {
            if controller.reset() {
                print_question(run);
            } else {
                println!("Retake is available once the assessment is finished.");
            }
            return true;
        }
        Command::Status => {
            let progress = controller.progress();
            println!(
                "{}/{} answered, {} left",
                progress.answered,
                progress.total,
                quiz_core::time::format_countdown(progress.remaining_seconds)
            );
            return true;
        }
        Command::Help => {
            println!("{HELP}");
            return true;
        }
        Command::Quit => return false,
    };

    if changed {
        print_question(run);
    } else if run.controller().is_completed() {
        println!("This attempt is finished. Type r to retake or q to leave.");
    } else {
        println!("Not available right now.");
    }
    true
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let banks = read_banks(&args)?;
    let bank_id = args.bank_id.unwrap_or(banks[0].id);

    let storage = Storage::in_memory();
    let seeded = seed_banks(storage.banks.as_ref(), &banks).await?;
    tracing::info!(banks = seeded, %bank_id, "question banks ready");

    let clock = Clock::default_clock();
    let mut service = AssessmentLoopService::new(
        clock,
        std::sync::Arc::clone(&storage.banks),
        std::sync::Arc::clone(&storage.attempts),
    )
    .with_default_minutes(args.default_minutes);
    if let Some(label) = args.duration.as_deref() {
        service = service.with_duration_label(label);
    }
    let history = AttemptHistoryService::new(std::sync::Arc::clone(&storage.attempts));

    let mut run = service.start(bank_id).await?.with_exit_hook(|report| {
        println!(
            "Left with {}/{} answered and {} remaining. Nothing was saved.",
            report.answered,
            report.total,
            quiz_core::time::format_countdown(report.remaining_seconds)
        );
    });
    let mut completion = run.controller().completion_watch();

    println!("{}", run.title());
    println!("{HELP}");
    print_question(&run);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            changed = completion.changed() => {
                if changed.is_err() {
                    break;
                }
                if *completion.borrow_and_update() == SessionState::Completed {
                    present_result(&service, &history, &mut run).await;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match line.parse::<Command>() {
                    Ok(command) => {
                        if !apply(&mut run, command) {
                            break;
                        }
                    }
                    Err(err) => println!("{err}"),
                }
            }
        }
    }

    run.exit();
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
