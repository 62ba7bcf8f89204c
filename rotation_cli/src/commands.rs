//! Line commands for the interactive session

use std::str::FromStr;

/// One line typed at the `live` prompt
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Use a skill now
    Use(String),
    /// Wait out locks, then use a skill
    Queue(String),
    Wait(f64),
    /// Wait until the next mana tick
    WaitForMana,
    JumpTo(f64),
    Toggle(String),
    Undo,
    /// Drop trailing waits
    Trim,
    Status,
    Skills,
    /// Show state as of a display time without touching the session
    At(f64),
    Save(String),
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  use <skill>      use a skill if it is ready
  queue <skill>    wait until a skill is usable, then use it
  wait <secs>      advance time
  mp               wait for the next mana tick
  jump <time>      advance to a display time
  toggle <name>    switch a toggleable resource on or off
  undo             remove the last action
  trim             remove trailing waits
  status           show time, mana and active statuses
  skills           list skill availability
  at <time>        show state at an earlier display time
  save <path>      write the record as JSON
  help             this text
  quit";

fn number(arg: Option<&str>, what: &str) -> Result<f64, String> {
    let raw = arg.ok_or_else(|| format!("{} needs a number", what))?;
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("'{}' is not a number", raw))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("'{}' is not a finite number", raw))
    }
}

fn name(arg: Option<&str>, what: &str) -> Result<String, String> {
    arg.map(str::to_string)
        .ok_or_else(|| format!("{} needs a name", what))
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or("");
        let arg = words.next();
        match verb.to_lowercase().as_str() {
            "use" | "u" => name(arg, "use").map(Command::Use),
            "queue" | "q" => name(arg, "queue").map(Command::Queue),
            "wait" | "w" => {
                let secs = number(arg, "wait")?;
                if secs < 0.0 {
                    return Err("cannot wait a negative time".to_string());
                }
                Ok(Command::Wait(secs))
            }
            "mp" => Ok(Command::WaitForMana),
            "jump" => number(arg, "jump").map(Command::JumpTo),
            "toggle" => name(arg, "toggle").map(Command::Toggle),
            "undo" => Ok(Command::Undo),
            "trim" => Ok(Command::Trim),
            "status" | "s" => Ok(Command::Status),
            "skills" => Ok(Command::Skills),
            "at" => number(arg, "at").map(Command::At),
            "save" => name(arg, "save").map(Command::Save),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            "" => Err("empty command".to_string()),
            other => Err(format!("unknown command '{}'", other)),
        }
    }
}
