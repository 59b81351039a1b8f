//! Line-oriented interactive shell over a [`Session`].

use std::io::{BufRead, Write};
use tracing::{debug, info};

use crate::report::Report;
use crate::session::Session;
use crate::units::{coerce_number, parse_size, DisplayUnit};
use crate::variables::{Variable, ALL_VARIABLES};

pub const HELP: &str = "\
Commands:
  SET <variable> <value> [unit]   set a variable (unit: B, KB, MB, GB; defaults to its current unit)
  GET <variable>                  show one variable
  UNIT <variable> <unit>          change the display unit of a variable
  RAM <value> [unit]              set server RAM (unit defaults to GB)
  RAM OFF                         forget server RAM
  TOTALS                          show memory totals
  WARNINGS                        show active warnings
  SHOW                            full report
  DESCRIBE <variable>             explain a variable
  FORMAT <bytes>                  format a byte count
  RESET                           restore starting values
  HELP                            this text
  QUIT                            leave";

#[derive(Debug, PartialEq, Clone)]
pub enum Command {
    Set(Variable, String, Option<DisplayUnit>),
    Get(Variable),
    Unit(Variable, DisplayUnit),
    Ram(String, Option<DisplayUnit>),
    RamOff,
    Totals,
    Warnings,
    Show,
    Describe(Variable),
    Format(String),
    Reset,
    Help,
    Quit,
    Unknown(String),
}

pub struct CommandParser;

impl CommandParser {
    pub fn parse(input: &str) -> Command {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let var = |s: &str| s.parse::<Variable>().ok();
        let unit = |s: &str| s.parse::<DisplayUnit>().ok();
        match parts.as_slice() {
            [command, rest @ ..] => match (command.to_uppercase().as_str(), rest) {
                ("SET", [name, value]) => match var(*name) {
                    Some(v) => Command::Set(v, value.to_string(), None),
                    None => Command::Unknown(input.trim().to_string()),
                },
                ("SET", [name, value, u]) => match (var(*name), unit(*u)) {
                    (Some(v), Some(u)) => Command::Set(v, value.to_string(), Some(u)),
                    _ => Command::Unknown(input.trim().to_string()),
                },
                ("GET", [name]) => var(*name).map(Command::Get).unwrap_or_else(|| Command::Unknown(input.trim().to_string())),
                ("UNIT", [name, u]) => match (var(*name), unit(*u)) {
                    (Some(v), Some(u)) => Command::Unit(v, u),
                    _ => Command::Unknown(input.trim().to_string()),
                },
                ("RAM", [off]) if off.eq_ignore_ascii_case("off") => Command::RamOff,
                ("RAM", [value]) => Command::Ram(value.to_string(), None),
                ("RAM", [value, u]) => match unit(*u) {
                    Some(u) => Command::Ram(value.to_string(), Some(u)),
                    None => Command::Unknown(input.trim().to_string()),
                },
                ("TOTALS", []) => Command::Totals,
                ("WARNINGS", []) => Command::Warnings,
                ("SHOW", []) | ("REPORT", []) => Command::Show,
                ("DESCRIBE", [name]) => {
                    var(*name).map(Command::Describe).unwrap_or_else(|| Command::Unknown(input.trim().to_string()))
                }
                ("FORMAT", [value]) => Command::Format(value.to_string()),
                ("RESET", []) => Command::Reset,
                ("HELP", []) | ("?", []) => Command::Help,
                ("QUIT", []) | ("EXIT", []) => Command::Quit,
                _ => Command::Unknown(input.trim().to_string()),
            },
            [] => Command::Unknown(String::new()),
        }
    }
}

/// Result of one command: text to print and whether the shell should stop.
#[derive(Debug, PartialEq)]
pub struct Reply {
    pub output: String,
    pub quit: bool,
}

impl Reply {
    fn text(output: impl Into<String>) -> Self {
        Self { output: output.into(), quit: false }
    }
}

pub struct Shell {
    session: Session,
}

impl Shell {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn execute(&mut self, command: Command) -> Reply {
        match command {
            Command::Set(var, raw, unit) => {
                let unit = unit.or_else(|| attached_unit(&raw)).unwrap_or_else(|| self.session.unit(var));
                self.session.set_input(var, &raw, unit);
                Reply::text(self.describe_value(var))
            }
            Command::Get(var) => Reply::text(self.describe_value(var)),
            Command::Unit(var, unit) => {
                self.session.set_unit(var, unit);
                Reply::text(self.describe_value(var))
            }
            Command::Ram(raw, unit) => {
                let unit = unit.or_else(|| attached_unit(&raw)).unwrap_or(DisplayUnit::Gigabyte);
                self.session.set_server_memory(&raw, unit);
                let bytes = self.session.server_memory_bytes().unwrap_or(0.0);
                Reply::text(format!("server RAM = {}", self.session.format_bytes(bytes)))
            }
            Command::RamOff => {
                self.session.clear_server_memory();
                Reply::text("server RAM cleared")
            }
            Command::Totals => {
                let t = self.session.totals();
                let s = &self.session;
                Reply::text(format!(
                    "global buffers:        {}\nper connection:        {}\nall connections ({}): {}\ntotal:                 {}",
                    s.format_bytes(t.global_buffers as f64),
                    s.format_bytes(t.per_connection_buffers as f64),
                    s.get(Variable::MaxConnections),
                    s.format_bytes(t.total_per_connection as f64),
                    s.format_bytes(t.total as f64),
                ))
            }
            Command::Warnings => {
                let warnings = self.session.warnings();
                if warnings.is_empty() {
                    Reply::text("no warnings")
                } else {
                    Reply::text(warnings.iter().map(|w| format!("! {w}")).collect::<Vec<_>>().join("\n"))
                }
            }
            Command::Show => Reply::text(Report::from_session(&self.session).render_text().trim_end().to_string()),
            Command::Describe(var) => Reply::text(format!("{}: {}", var, var.description())),
            Command::Format(raw) => {
                let bytes = parse_size(&raw).map(|s| s.to_bytes(DisplayUnit::Byte)).unwrap_or_else(|_| coerce_number(&raw));
                Reply::text(self.session.format_bytes(bytes))
            }
            Command::Reset => {
                self.session.reset();
                Reply::text("reset to starting values")
            }
            Command::Help => Reply::text(format!("{HELP}\n\nVariables: {}", variable_names())),
            Command::Quit => Reply { output: String::new(), quit: true },
            Command::Unknown(input) if input.is_empty() => Reply::text(""),
            Command::Unknown(input) => Reply::text(format!("error: cannot understand '{input}' (try HELP)")),
        }
    }

    fn describe_value(&self, var: Variable) -> String {
        let s = &self.session;
        if var.is_count() {
            return format!("{} = {}", var, s.get(var));
        }
        format!("{} = {} {} ({} bytes)", var, s.display_value(var), s.unit(var), s.get(var))
    }

    /// Reads commands until QUIT or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut out: W) -> std::io::Result<()> {
        info!("Interactive session started");
        writeln!(out, "MySQL memory calculator. Type HELP for commands.")?;
        write!(out, "> ")?;
        out.flush()?;
        for line in input.lines() {
            let line = line?;
            let command = CommandParser::parse(&line);
            debug!(?command, "shell command");
            let reply = self.execute(command);
            if reply.quit {
                break;
            }
            if !reply.output.is_empty() {
                writeln!(out, "{}", reply.output)?;
            }
            write!(out, "> ")?;
            out.flush()?;
        }
        writeln!(out)?;
        info!("Interactive session ended");
        Ok(())
    }
}

/// Unit written straight after the number, as in `512MB`.
fn attached_unit(raw: &str) -> Option<DisplayUnit> {
    parse_size(raw).ok().and_then(|s| s.unit)
}

fn variable_names() -> String {
    ALL_VARIABLES.iter().map(|v| v.name()).collect::<Vec<_>>().join(", ")
}
