use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use memcalc::cli::{self, CliAction, RunOptions};
use memcalc::config::{load_config, EffectiveConfig, OutputFormat};
use memcalc::repl::Shell;
use memcalc::report::Report;
use memcalc::session::{ServerMemory, Session};
use memcalc::units::DisplayUnit;
use memcalc::utils::{detect_total_memory, format_ram_mb, host_summary};

fn main() -> Result<()> {
    let opts = match cli::parse_args(std::env::args().skip(1)) {
        Ok(CliAction::PrintVersion) => {
            cli::print_version();
            return Ok(());
        }
        Ok(CliAction::PrintHelp) => {
            cli::print_help();
            return Ok(());
        }
        Ok(CliAction::InitConfig) => {
            cli::init_config_file();
            return Ok(());
        }
        Ok(CliAction::Run(opts)) => opts,
        Err(e) => {
            eprintln!("error: {e}\n\n{}", cli::USAGE);
            std::process::exit(2);
        }
    };

    let cfg = load_config(opts.config_path.as_deref());
    let _log_guard = init_logging(&cfg);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %host_summary(),
        config = %cfg.source.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "built-in defaults".into()),
        "mysql-memcalc starting"
    );

    let session = build_session(&cfg, &opts);

    if opts.interactive {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        Shell::new(session).run(stdin.lock(), stdout.lock()).context("interactive shell")?;
        return Ok(());
    }

    let report = Report::from_session(&session);
    info!(total = report.totals.total, warnings = report.warnings.len(), "Memory estimate computed");
    if opts.json || cfg.output == OutputFormat::Json {
        println!("{}", report.to_json().context("serialize report")?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}

/// Applies file settings, then command-line overrides.
fn build_session(cfg: &EffectiveConfig, opts: &RunOptions) -> Session {
    let mut server_memory = cfg.server_memory;
    if opts.detect_memory || cfg.detect_memory {
        match detect_total_memory() {
            Some(bytes) => {
                info!(ram = %format_ram_mb(bytes / (1024 * 1024)), "Using detected host memory");
                server_memory = Some(ServerMemory::from_bytes(bytes));
            }
            None => warn!("Unable to determine RAM size"),
        }
    }
    if let Some(size) = opts.server_memory {
        server_memory = Some(ServerMemory { value: size.value, unit: size.unit.unwrap_or(DisplayUnit::Gigabyte) });
    }

    let mut session = Session::new(cfg.variables, server_memory);
    for a in &opts.assignments {
        let unit = a.size.unit.unwrap_or_else(|| session.unit(a.variable));
        session.set_input(a.variable, &a.raw, unit);
    }
    session
}

fn init_logging(cfg: &EffectiveConfig) -> Option<WorkerGuard> {
    let stderr_layer = fmt::layer().with_target(false).with_writer(std::io::stderr).compact();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(env_filter).with(stderr_layer);

    if !cfg.log_to_file {
        registry.init();
        return None;
    }

    let logs_dir = cfg.log_dir.as_path();
    match std::fs::create_dir_all(logs_dir) {
        Ok(()) => {
            if cfg.clean_log_on_start {
                let log_path = logs_dir.join("latest.log");
                if let Ok(f) =
                    std::fs::OpenOptions::new().create(true).write(true).truncate(true).open(&log_path)
                {
                    drop(f);
                }
            }
            let file_appender = rolling::never(logs_dir, "latest.log");
            let (file_nb, guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = fmt::layer().with_ansi(false).with_target(false).with_writer(file_nb).compact();
            registry.with(file_layer).init();
            Some(guard)
        }
        Err(e) => {
            eprintln!("File logging disabled (cannot create {}): {}", logs_dir.display(), e);
            registry.init();
            None
        }
    }
}
