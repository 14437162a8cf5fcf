//! REPL – the interactive `hearth` shell.
//!
//! Supported slash-commands:
//!   /help                              – show this list
//!   /context                           – print the assembled memory context
//!   /soul [append|replace <text>]      – show or edit the identity document
//!   /user [append|replace <text>]      – show or edit the user-facts document
//!   /remember <text> [#tag …]          – save a long-term entry
//!   /search <query>                    – search the recent context window
//!   /history <query>                   – search the whole long-term log
//!   /heartbeat start [min]|stop|check|status
//!   /status                            – directory, entry count, scheduler state
//!   /quit | /exit                      – leave the shell
//!
//! Proactive prompts queued by the heartbeat are printed before each prompt.

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use hearth_heartbeat::{CheckOutcome, HeartbeatScheduler};
use hearth_memory::{LazyMemory, MemoryFacade, tools};
use hearth_types::{
    DocumentKind, ManageMemoryRequest, MemoryKind, MemoryOperation, ProactivePrompt,
    SearchMemoryRequest, WriteMode,
};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use crate::config::Config;

/// A parsed slash-command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Context,
    Show(DocumentKind),
    Write {
        kind: DocumentKind,
        mode: WriteMode,
        text: String,
    },
    Remember {
        content: String,
        tags: Vec<String>,
    },
    Search(String),
    History(String),
    Heartbeat(HeartbeatCommand),
    Status,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatCommand {
    Start(Option<u64>),
    Stop,
    Check,
    Status,
}

/// Parse one input line.  `Err` carries a usage message.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match head {
        "/help" => Ok(Command::Help),
        "/context" => Ok(Command::Context),
        "/soul" => parse_document(DocumentKind::Soul, rest),
        "/user" => parse_document(DocumentKind::User, rest),
        "/remember" => {
            let (content, tags) = split_trailing_tags(rest);
            if content.is_empty() {
                return Err("Usage: /remember <text> [#tag …]".to_string());
            }
            Ok(Command::Remember { content, tags })
        }
        "/search" => require_arg(rest, "/search <query>").map(Command::Search),
        "/history" => require_arg(rest, "/history <query>").map(Command::History),
        "/heartbeat" => parse_heartbeat(rest).map(Command::Heartbeat),
        "/status" => Ok(Command::Status),
        "/quit" | "/exit" => Ok(Command::Quit),
        other => Err(format!(
            "Unknown command '{other}'. Type /help for a list of commands."
        )),
    }
}

fn require_arg(rest: &str, usage: &str) -> Result<String, String> {
    if rest.is_empty() {
        Err(format!("Usage: {usage}"))
    } else {
        Ok(rest.to_string())
    }
}

fn parse_document(kind: DocumentKind, rest: &str) -> Result<Command, String> {
    if rest.is_empty() {
        return Ok(Command::Show(kind));
    }
    let usage = || format!("Usage: /{kind} [append|replace <text>]");
    let (mode, text) = rest.split_once(char::is_whitespace).ok_or_else(usage)?;
    let mode = mode.parse::<WriteMode>().map_err(|_| usage())?;
    let text = text.trim();
    if text.is_empty() {
        return Err(usage());
    }
    Ok(Command::Write {
        kind,
        mode,
        text: text.to_string(),
    })
}

fn parse_heartbeat(rest: &str) -> Result<HeartbeatCommand, String> {
    const USAGE: &str = "Usage: /heartbeat start [minutes]|stop|check|status";
    let mut words = rest.split_whitespace();
    let command = match words.next() {
        None | Some("status") => HeartbeatCommand::Status,
        Some("start") => match words.next() {
            None => HeartbeatCommand::Start(None),
            Some(m) => match m.parse::<u64>() {
                Ok(minutes) if minutes > 0 => HeartbeatCommand::Start(Some(minutes)),
                _ => return Err(format!("Invalid interval '{m}'. {USAGE}")),
            },
        },
        Some("stop") => HeartbeatCommand::Stop,
        Some("check") => HeartbeatCommand::Check,
        Some(_) => return Err(USAGE.to_string()),
    };
    if words.next().is_some() {
        return Err(USAGE.to_string());
    }
    Ok(command)
}

/// Split trailing `#tag` words off `text`.
pub fn split_trailing_tags(text: &str) -> (String, Vec<String>) {
    let words: Vec<&str> = text.split_whitespace().collect();
    let body_len = words
        .iter()
        .rposition(|w| !(w.len() > 1 && w.starts_with('#')))
        .map_or(0, |i| i + 1);
    let tags = words[body_len..]
        .iter()
        .map(|w| w.trim_start_matches('#').to_string())
        .collect();
    (words[..body_len].join(" "), tags)
}

/// Everything the shell needs to execute commands.
pub struct Session {
    pub cfg: Config,
    pub memory: LazyMemory,
    pub scheduler: Option<HeartbeatScheduler>,
    pub prompts: mpsc::Receiver<ProactivePrompt>,
    pub runtime: Runtime,
}

impl Session {
    fn facade(&self) -> Option<Arc<MemoryFacade>> {
        match self.memory.get() {
            Ok(facade) => Some(facade),
            Err(e) => {
                println!("{}: {}", "Memory unavailable".red(), e);
                None
            }
        }
    }

    /// Print queued proactive prompts.
    pub fn drain_prompts(&mut self) {
        while let Ok(prompt) = self.prompts.try_recv() {
            let at = prompt.created_at.with_timezone(&chrono::Local);
            println!(
                "\n  {} {}",
                "♥ heartbeat".magenta().bold(),
                at.format("%H:%M:%S").to_string().dimmed()
            );
            for line in prompt.prompt.lines() {
                println!("    {line}");
            }
            println!();
        }
    }
}

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(mut session: Session, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        session.drain_prompts();

        print!("{} ", "hearth>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match parse_command(input) {
            Ok(Command::Quit) => {
                println!("  Goodbye.");
                break;
            }
            Ok(command) => execute(&session, command),
            Err(msg) => println!("  {}", msg.yellow()),
        }
    }

    if let Some(scheduler) = &session.scheduler {
        scheduler.stop();
    }
}

fn execute(session: &Session, command: Command) {
    match command {
        Command::Help => cmd_help(),
        Command::Context => cmd_context(session),
        Command::Show(kind) => cmd_show(session, kind),
        Command::Write { kind, mode, text } => cmd_write(session, kind, mode, text),
        Command::Remember { content, tags } => cmd_remember(session, &content, &tags),
        Command::Search(query) => cmd_search(session, query),
        Command::History(query) => cmd_history(session, &query),
        Command::Heartbeat(hb) => cmd_heartbeat(session, hb),
        Command::Status => cmd_status(session),
        Command::Quit => {}
    }
}

fn cmd_help() {
    println!();
    println!("  {}", "Available commands:".bold());
    let rows = [
        ("/context", "Print identity, user facts and recent memories"),
        ("/soul [append|replace <text>]", "Show or edit soul.md"),
        ("/user [append|replace <text>]", "Show or edit user.md"),
        ("/remember <text> [#tag …]", "Save a long-term memory"),
        ("/search <query>", "Search recent memories"),
        ("/history <query>", "Search every long-term memory"),
        ("/heartbeat start [min]", "Start the heartbeat scheduler"),
        ("/heartbeat stop|check|status", "Control the heartbeat scheduler"),
        ("/status", "Show memory and scheduler status"),
        ("/quit | /exit", "Exit hearth"),
    ];
    for (cmd, desc) in rows {
        println!("    {:<32} {}", cmd.cyan(), desc);
    }
    println!();
}

fn cmd_context(session: &Session) {
    let Some(memory) = session.facade() else { return };
    match memory.get_context() {
        Ok(ctx) => {
            println!("\n  {}", "── soul.md ──".bold());
            print_block(&ctx.identity);
            println!("\n  {}", "── user.md ──".bold());
            print_block(&ctx.user_facts);
            println!("\n  {}", "── recent memories ──".bold());
            if ctx.recent_long_term.is_empty() {
                println!("    {}", "(none)".dimmed());
            }
            for entry in &ctx.recent_long_term {
                println!("    • {entry}");
            }
            println!();
        }
        Err(e) => println!("{}: {}", "Failed to load context".red(), e),
    }
}

fn cmd_show(session: &Session, kind: DocumentKind) {
    let Some(memory) = session.facade() else { return };
    match memory.store().read_document(kind) {
        Ok(text) => {
            println!("\n  {}", format!("── {} ──", kind.file_name()).bold());
            print_block(&text);
            println!();
        }
        Err(e) => println!("{}: {}", "Read failed".red(), e),
    }
}

fn cmd_write(session: &Session, kind: DocumentKind, mode: WriteMode, text: String) {
    let Some(memory) = session.facade() else { return };
    let request = ManageMemoryRequest {
        kind: match kind {
            DocumentKind::Soul => MemoryKind::Soul,
            DocumentKind::User => MemoryKind::User,
        },
        operation: match mode {
            WriteMode::Append => MemoryOperation::Append,
            WriteMode::Replace => MemoryOperation::Replace,
        },
        content: text,
    };
    let outcome = tools::manage_memory(&memory, &request);
    if outcome.success {
        println!("  {} {}", "✓".green().bold(), outcome.summary);
    } else {
        println!("  {} {}", "✗".red().bold(), outcome.summary);
    }
}

fn cmd_remember(session: &Session, content: &str, tags: &[String]) {
    let Some(memory) = session.facade() else { return };
    match memory.save_memory(content, tags) {
        Ok(()) if tags.is_empty() => println!("  {} Saved to long-term memory", "✓".green().bold()),
        Ok(()) => println!(
            "  {} Saved to long-term memory {}",
            "✓".green().bold(),
            format!("[{}]", tags.join(", ")).dimmed()
        ),
        Err(e) => println!("  {} {}", "✗".red().bold(), e),
    }
}

fn cmd_search(session: &Session, query: String) {
    let Some(memory) = session.facade() else { return };
    let outcome = tools::search_memory(
        &memory,
        &SearchMemoryRequest {
            query,
            limit: Some(session.cfg.search_limit),
        },
    );
    println!("  {}", outcome.display);
    for result in &outcome.results {
        println!("    • {result}");
    }
}

fn cmd_history(session: &Session, query: &str) {
    let Some(memory) = session.facade() else { return };
    match memory.search_history(query, session.cfg.search_limit) {
        Ok(entries) => {
            println!("  Found {} entries in the full log.", entries.len());
            for entry in &entries {
                let when = entry
                    .created_at
                    .with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M");
                let tags = if entry.tags.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", entry.tags.join(", "))
                };
                println!(
                    "    {} {}{}",
                    when.to_string().dimmed(),
                    entry.content,
                    tags.dimmed()
                );
            }
        }
        Err(e) => println!("{}: {}", "History search failed".red(), e),
    }
}

fn cmd_heartbeat(session: &Session, command: HeartbeatCommand) {
    let Some(scheduler) = &session.scheduler else {
        println!("  {}", "Heartbeat is unavailable (task file could not be created).".yellow());
        return;
    };

    match command {
        HeartbeatCommand::Start(minutes) => {
            let minutes = minutes.unwrap_or(session.cfg.heartbeat_interval_minutes);
            let started = session
                .runtime
                .block_on(async { scheduler.start_minutes(minutes) });
            if started {
                println!("  {} Heartbeat started (every {minutes} min)", "✓".green().bold());
            } else {
                println!("  Heartbeat is already running.");
            }
        }
        HeartbeatCommand::Stop => {
            if scheduler.stop() {
                println!("  {} Heartbeat stopped", "✓".green().bold());
            } else {
                println!("  Heartbeat is not running.");
            }
        }
        HeartbeatCommand::Check => match session.runtime.block_on(scheduler.check()) {
            CheckOutcome::Triggered => println!("  {} Proactive turn requested", "♥".magenta()),
            CheckOutcome::NoTasks => println!(
                "  No active tasks in {}",
                scheduler.task_file().path().display()
            ),
            CheckOutcome::Skipped => println!("  A check is already in progress."),
            CheckOutcome::Failed => println!("  {}", "Heartbeat check failed (see logs).".red()),
        },
        HeartbeatCommand::Status => print_heartbeat_status(scheduler),
    }
}

fn print_heartbeat_status(scheduler: &HeartbeatScheduler) {
    let state = if scheduler.is_active() {
        "active".green()
    } else {
        "stopped".yellow()
    };
    println!("  Heartbeat:  {state}");
    println!("  Task file:  {}", scheduler.task_file().path().display());
    if scheduler.is_checking() {
        println!("  {}", "A check is in progress.".dimmed());
    }
}

fn cmd_status(session: &Session) {
    println!("  Directory:  {}", session.memory.dir().display());
    if let Some(memory) = session.facade() {
        match memory.store().count_long_term() {
            Ok(n) => println!("  Memories:   {n}"),
            Err(e) => println!("  Memories:   {}", e.to_string().red()),
        }
    }
    match &session.scheduler {
        Some(scheduler) => print_heartbeat_status(scheduler),
        None => println!("  Heartbeat:  {}", "unavailable".red()),
    }
}

fn print_block(text: &str) {
    if text.trim().is_empty() {
        println!("    {}", "(empty)".dimmed());
    }
    for line in text.lines() {
        println!("    {line}");
    }
}
