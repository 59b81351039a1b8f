use std::path::PathBuf;
use thiserror::Error;

use crate::units::{parse_size, SizeInput, UnitError};
use crate::variables::{Variable, VariableError};

pub const USAGE: &str = "\
Usage: mysql-memcalc [OPTIONS]

Options:
  --set <variable>=<value>[unit]  Override a variable (repeatable). Bare numbers use
                                  the variable's default unit; max_connections is a count.
  --server-memory <size>          Server RAM for the 80% check, e.g. 16GB (bare numbers are GB)
  --detect-memory                 Use this machine's RAM as the server RAM
  --config <path>                 Read settings from <path> instead of memcalc.toml
  --json                          Print the report as JSON
  -i, --interactive               Start the interactive shell
  --init-config                   Write a commented memcalc.toml and exit
  -V, --version                   Print version
  -h, --help                      Print this help";

#[derive(Debug, Error, PartialEq)]
pub enum CliError {
    #[error("option '{0}' needs a value")]
    MissingValue(String),
    #[error("expected <variable>=<value>, got '{0}'")]
    MalformedAssignment(String),
    #[error(transparent)]
    Variable(#[from] VariableError),
    #[error("bad value for {option}: {source}")]
    BadValue {
        option: String,
        #[source]
        source: UnitError,
    },
    #[error("unknown option '{0}'")]
    UnknownOption(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub variable: Variable,
    /// Raw text after `=`, validated but coerced by the session.
    pub raw: String,
    pub size: SizeInput,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunOptions {
    pub config_path: Option<PathBuf>,
    pub assignments: Vec<Assignment>,
    pub server_memory: Option<SizeInput>,
    pub detect_memory: bool,
    pub json: bool,
    pub interactive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CliAction {
    PrintVersion,
    PrintHelp,
    InitConfig,
    Run(RunOptions),
}

pub fn parse_args<I, S>(args: I) -> Result<CliAction, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut version_flag = false;
    let mut help_flag = false;
    let mut init_config = false;
    let mut opts = RunOptions::default();

    let mut args = args.into_iter().map(Into::into);
    while let Some(arg) = args.next() {
        // `--opt=value` and `--opt value` are both accepted
        let (flag, inline) = match arg.split_once('=') {
            Some((f, v)) if f.starts_with("--") => (f.to_string(), Some(v.to_string())),
            _ => (arg.clone(), None),
        };
        let mut value = |name: &str| -> Result<String, CliError> {
            inline.clone().or_else(|| args.next()).ok_or_else(|| CliError::MissingValue(name.to_string()))
        };
        match flag.as_str() {
            "--version" | "-V" | "-version" => version_flag = true,
            "--help" | "-h" => help_flag = true,
            "--init-config" => init_config = true,
            "--json" => opts.json = true,
            "--interactive" | "-i" => opts.interactive = true,
            "--detect-memory" => opts.detect_memory = true,
            "--config" => opts.config_path = Some(PathBuf::from(value("--config")?)),
            "--server-memory" => {
                let v = value("--server-memory")?;
                let size = parse_size(&v)
                    .map_err(|source| CliError::BadValue { option: "--server-memory".into(), source })?;
                opts.server_memory = Some(size);
            }
            "--set" => opts.assignments.push(parse_assignment(&value("--set")?)?),
            other => return Err(CliError::UnknownOption(other.to_string())),
        }
    }

    if version_flag {
        return Ok(CliAction::PrintVersion);
    }
    if help_flag {
        return Ok(CliAction::PrintHelp);
    }
    if init_config {
        return Ok(CliAction::InitConfig);
    }
    Ok(CliAction::Run(opts))
}

pub fn parse_assignment(text: &str) -> Result<Assignment, CliError> {
    let (name, raw) = text.split_once('=').ok_or_else(|| CliError::MalformedAssignment(text.to_string()))?;
    let variable = name.parse::<Variable>()?;
    let raw = raw.trim().to_string();
    let size = parse_size(&raw).map_err(|source| CliError::BadValue { option: variable.name().into(), source })?;
    Ok(Assignment { variable, raw, size })
}

pub fn print_version() {
    println!("mysql-memcalc v{}", env!("CARGO_PKG_VERSION"));
}

pub fn print_help() {
    println!("{USAGE}");
}

pub fn init_config_file() {
    use std::fs;
    use std::path::Path;
    let target = Path::new(crate::config::CONFIG_FILE_NAMES[0]);
    if target.exists() {
        eprintln!("memcalc.toml already exists; aborting --init-config");
        return;
    }
    if let Err(e) = fs::write(target, crate::config::DEFAULT_CONFIG_TEMPLATE) {
        eprintln!("Failed to write memcalc.toml: {e}");
    } else {
        println!("Created memcalc.toml");
    }
}
