use std::fmt;
use std::str::FromStr;

/// One line of user input at the assessment prompt.
///
/// Question and option numbers are 1-based on the terminal and converted to
/// 0-based positions here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Select(usize),
    Confirm,
    Next,
    Previous,
    Goto(usize),
    Submit,
    Retake,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    Empty,
    Unknown(String),
    MissingNumber { command: &'static str },
    InvalidNumber { raw: String },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::Empty => write!(f, "type a command (h for help)"),
            InputError::Unknown(raw) => write!(f, "unknown command: {raw}"),
            InputError::MissingNumber { command } => write!(f, "{command} requires a number"),
            InputError::InvalidNumber { raw } => {
                write!(f, "expected a number starting at 1, got: {raw}")
            }
        }
    }
}

impl std::error::Error for InputError {}

fn one_based(raw: &str) -> Result<usize, InputError> {
    match raw.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(InputError::InvalidNumber {
            raw: raw.to_string(),
        }),
    }
}

impl FromStr for Command {
    type Err = InputError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let Some(head) = parts.next() else {
            return Err(InputError::Empty);
        };
        let arg = parts.next();
        let head = head.to_ascii_lowercase();

        // A bare number picks an option.
        if head.chars().all(|c| c.is_ascii_digit()) {
            return one_based(&head).map(Command::Select);
        }

        match head.as_str() {
            "s" | "select" => {
                let raw = arg.ok_or(InputError::MissingNumber { command: "select" })?;
                one_based(raw).map(Command::Select)
            }
            "g" | "goto" => {
                let raw = arg.ok_or(InputError::MissingNumber { command: "goto" })?;
                one_based(raw).map(Command::Goto)
            }
            "c" | "confirm" => Ok(Command::Confirm),
            "n" | "next" => Ok(Command::Next),
            "p" | "prev" | "previous" => Ok(Command::Previous),
            "submit" => Ok(Command::Submit),
            "r" | "retake" => Ok(Command::Retake),
            "t" | "status" => Ok(Command::Status),
            "h" | "help" | "?" => Ok(Command::Help),
            "q" | "quit" | "exit" => Ok(Command::Quit),
            _ => Err(InputError::Unknown(line.trim().to_string())),
        }
    }
}

pub const HELP: &str = "\
Commands:
  <n> | s <n>   select option n for the current question
  c             confirm (lock) the selected option
  n / p         next / previous question
  g <n>         go to question n
  submit        submit once every question is confirmed
  t             show progress and time left
  r             retake a finished assessment
  q             leave the assessment";
