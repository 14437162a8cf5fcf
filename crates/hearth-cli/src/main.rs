//! `hearth` – interactive shell over the agent memory core.
//!
//! This binary:
//!
//! 1. Loads `~/.hearth/config.toml` (running a short first-run setup when the
//!    file is absent) and applies `HEARTH_*` environment overrides.
//! 2. Opens the global configuration directory lazily through
//!    [`hearth_memory::LazyMemory`]; the store is only built on first use.
//! 3. Starts the heartbeat scheduler over `heartbeat.md` when enabled.
//! 4. Drops the user into the REPL.  Ctrl-C exits immediately; every store
//!    write is already durable when it returns.

mod config;
mod repl;
mod telemetry;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use hearth_heartbeat::{ChannelTrigger, HeartbeatScheduler};
use hearth_memory::LazyMemory;

/// Capacity of the proactive prompt queue drained by the REPL.
const PROMPT_QUEUE: usize = 16;

fn main() {
    print_banner();

    let first_run = matches!(config::load(), Ok(None));
    if first_run {
        run_first_run_setup();
    }
    let cfg = match config::load_or_default() {
        Ok(cfg) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };

    let telemetry_guard =
        telemetry::init_tracing("hearth", cfg.log_format, cfg.otlp_endpoint.as_deref());
    if telemetry_guard.is_exporting() {
        info!(endpoint = ?cfg.otlp_endpoint, "exporting spans over OTLP");
    }

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        shutdown_clone.store(true, Ordering::SeqCst);
        println!();
        println!("{}", "⚠  Interrupted – exiting hearth.".yellow().bold());
        std::process::exit(130);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {}", "Failed to start async runtime".red(), e);
            std::process::exit(1);
        }
    };

    let dir = config::memory_dir(&cfg);
    println!("  Memory directory: {}", dir.display().to_string().bold());
    let memory = LazyMemory::new(&dir, cfg.context_window);

    let (trigger, prompts) = ChannelTrigger::new(PROMPT_QUEUE);
    let scheduler = match HeartbeatScheduler::new(&dir, Arc::new(trigger)) {
        Ok(scheduler) => Some(scheduler),
        Err(e) => {
            println!("{}: {}", "Heartbeat disabled".yellow(), e);
            None
        }
    };

    if let Some(scheduler) = &scheduler
        && cfg.heartbeat_enabled
    {
        let minutes = cfg.heartbeat_interval_minutes;
        if runtime.block_on(async { scheduler.start_minutes(minutes) }) {
            info!(minutes, "heartbeat enabled at startup");
            println!("  Heartbeat: every {} min", minutes.to_string().bold());
        } else {
            println!("  Heartbeat: {}", "not started (invalid interval)".yellow());
        }
    } else {
        println!("  Heartbeat: {}", "off".dimmed());
    }

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    let session = repl::Session {
        cfg,
        memory,
        scheduler,
        prompts,
        runtime,
    };
    repl::run(session, shutdown);
}

// ─────────────────────────────────────────────────────────────────────────────
// First-run setup
// ─────────────────────────────────────────────────────────────────────────────

fn run_first_run_setup() {
    println!();
    println!("  No configuration found.  Let's set up hearth.\n");

    let mut cfg = config::Config::default();

    let enabled = prompt_line("  Run the heartbeat scheduler at startup? [Y/n]: ", "y");
    cfg.heartbeat_enabled = !enabled.trim().eq_ignore_ascii_case("n");

    if cfg.heartbeat_enabled {
        let minutes = prompt_line(
            &format!(
                "  Heartbeat interval in minutes [{}]: ",
                cfg.heartbeat_interval_minutes
            ),
            &cfg.heartbeat_interval_minutes.to_string(),
        );
        if let Ok(m) = minutes.trim().parse::<u64>()
            && m > 0
        {
            cfg.heartbeat_interval_minutes = m;
        }
    }

    match config::save(&cfg) {
        Ok(()) => println!(
            "\n  {} Config saved to {}\n",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
}

fn print_banner() {
    println!();
    println!("{}", r#"   __                 __  __ "#.bold().yellow());
    println!("{}", r#"  / /  ___ ___ _____ / /_/ / "#.bold().yellow());
    println!("{}", r#" / _ \/ -_) _ `/ __// __/ _ \"#.bold().yellow());
    println!("{}", r#"/_//_/\__/\_,_/_/   \__/_//_/"#.bold().yellow());
    println!();
    println!(
        "  {} {}",
        "hearth".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Persistent agent memory with a heartbeat");
    println!();
}

fn prompt_line(msg: &str, default: &str) -> String {
    use std::io::{BufRead, Write};
    print!("{}", msg);
    std::io::stdout().flush().ok();
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(_) => {
            let t = line.trim().to_string();
            if t.is_empty() { default.to_string() } else { t }
        }
        Err(_) => default.to_string(),
    }
}
