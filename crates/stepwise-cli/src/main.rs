//! `stepwise-cli` – Stepwise Command Line Interface
//!
//! Drives the guidance engine from recorded or typed detector output:
//!
//! 1. Loads `~/.stepwise/config.toml` (defaults when absent) and the
//!    configured instruction content table.
//! 2. `stepwise replay <file> [--json]` runs one session over a JSON-lines
//!    frame file and prints the feedback for every frame.
//! 3. `stepwise schema` prints the JSON Schema of the frame format.
//!    `stepwise init` writes a default config file when none exists.
//! 4. `stepwise` with no arguments drops into an **interactive REPL**.
//! 5. Intercepts **Ctrl-C** to stop a replay or the REPL cleanly.

mod config;
mod frame;
mod replay;
mod repl;

use colored::Colorize;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use stepwise_runtime::{init_tracing, ContentTable};
use stepwise_types::DetectionFrame;

fn main() -> ExitCode {
    // Config is read before tracing so its log format can be honoured;
    // problems are reported once the subscriber is up.
    let (cfg, config_error) = config::resolve();

    // ── Structured logging ────────────────────────────────────────────────
    // The CLI's user-facing output still uses println! for UX consistency.
    let _guard = init_tracing("stepwise", cfg.log_format);
    if let Some(e) = config_error {
        warn!(error = %e, path = %config::config_path().display(), "using default configuration");
    }

    let content = match cfg.content_table() {
        Ok(table) => table,
        Err(e) => {
            warn!(error = %e, "using built-in instruction content");
            ContentTable::default()
        }
    };

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("{}", "⚠  Ctrl-C received – stopping …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match args.as_slice() {
        [] => {
            print_banner();
            println!(
                "  Dedup policy {}. Type {} for a list of commands.\n",
                cfg.dedup_policy.to_string().bold(),
                "/help".bold().cyan()
            );
            repl::run(repl::Repl::new(content, cfg.dedup_policy), shutdown);
            ExitCode::SUCCESS
        }
        ["replay", path] | ["replay", path, "--json"] | ["replay", "--json", path] => {
            let output = if args.contains(&"--json") {
                replay::Output::Json
            } else {
                replay::Output::Human
            };
            match replay::run(Path::new(path), cfg.dedup_policy, &content, output, shutdown) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("{}: {e}", "Replay failed".red());
                    ExitCode::FAILURE
                }
            }
        }
        ["schema"] => {
            let schema = schemars::schema_for!(DetectionFrame);
            match serde_json::to_string_pretty(&schema) {
                Ok(out) => {
                    println!("{out}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("{}: {e}", "Schema encoding failed".red());
                    ExitCode::FAILURE
                }
            }
        }
        ["init"] => init_config(),
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            ExitCode::SUCCESS
        }
        _ => {
            print_usage();
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║               STEPWISE               ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
    println!("  {} {}",
        "Stepwise".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Step-by-step sandwich assembly guidance");
    println!();
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn init_config() -> ExitCode {
    let path = config::config_path();
    if path.exists() {
        println!("  Config already present at {}", path.display().to_string().bold());
        return ExitCode::SUCCESS;
    }
    match config::save(&config::Config::default()) {
        Ok(()) => {
            println!(
                "  {} Config saved to {}",
                "✓".green().bold(),
                path.display().to_string().bold()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {e}", "Error saving config".red());
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    println!("{}", "Usage".bold().underline());
    println!("  {}                        interactive REPL", "stepwise".bold());
    println!("  {} <file> [--json]  replay a JSON-lines frame file", "stepwise replay".bold());
    println!("  {}                 print the frame JSON Schema", "stepwise schema".bold());
    println!("  {}                   write a default ~/.stepwise/config.toml", "stepwise init".bold());
}
