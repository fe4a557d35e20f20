//! REPL – type frames, watch the guidance react.
//!
//! Each non-command line is one frame (see [`crate::frame`]) fed to a
//! single session. Supported slash-commands:
//!   /help         – show this list
//!   /state        – show the session's progress state and hologram
//!   /reset        – start the assembly over
//!   /quit | /exit – exit the CLI

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use stepwise_perception::DedupPolicy;
use stepwise_runtime::{ContentTable, Engine, Session};

use crate::frame;
use crate::replay::render;

/// What the loop should do after one line.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Print(String),
    Nothing,
    Quit,
}

/// Interactive session state.
pub struct Repl {
    engine: Engine,
    session: Session,
    content: ContentTable,
    policy: DedupPolicy,
}

impl Repl {
    pub fn new(content: ContentTable, policy: DedupPolicy) -> Self {
        Self {
            engine: Engine::new(),
            session: Session::new(),
            content,
            policy,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Evaluate one input line.
    pub fn eval(&mut self, line: &str) -> Action {
        let cmd = line.trim();
        if cmd.is_empty() {
            return Action::Nothing;
        }

        match cmd {
            "/help" => Action::Print(help_text()),
            "/state" => {
                let session = self.session();
                let o = session.overlay();
                Action::Print(format!(
                    "  state {}  holo x={:.3} y={:.3} depth={:.1}  updates {}",
                    session.state().to_string().bold(),
                    o.x,
                    o.y,
                    o.depth,
                    session.update_count()
                ))
            }
            "/reset" => {
                self.session.reset();
                Action::Print(format!("{}", "Session reset.".green()))
            }
            "/quit" | "/exit" => Action::Quit,
            other if other.starts_with('/') => Action::Print(format!(
                "{} '{}'. Type {} for available commands.",
                "Unknown command:".red(),
                other.yellow(),
                "/help".bold()
            )),
            input => match frame::parse(input, self.policy) {
                Ok(detections) => {
                    let feedback = self.session.step(&self.engine, &detections, &self.content);
                    Action::Print(render(&feedback))
                }
                Err(e) => Action::Print(format!("{}: {e}", "Bad frame".red())),
            },
        }
    }
}

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(mut repl: Repl, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "stepwise>".bold().cyan());
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

        match repl.eval(&line) {
            Action::Print(out) => println!("{out}"),
            Action::Nothing => {}
            Action::Quit => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
        }
    }
}

fn help_text() -> String {
    [
        format!("{}", "Stepwise Commands".bold().underline()),
        format!("  {}        – labels, e.g. `bread ham`", "<frame>".bold().cyan()),
        format!("  {}          – JSON frame, `{{}}` for an empty one", "{...}".bold().cyan()),
        format!("  {}         – show progress state and hologram", "/state".bold().cyan()),
        format!("  {}         – start the assembly over", "/reset".bold().cyan()),
        format!("  {}  – exit the CLI", "/quit  /exit".bold().cyan()),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_types::ProgressState;

    fn repl() -> Repl {
        colored::control::set_override(false);
        Repl::new(ContentTable::default(), DedupPolicy::default())
    }

    #[test]
    fn frames_drive_the_session() {
        let mut r = repl();
        assert!(matches!(r.eval("{}"), Action::Print(s) if s.contains("bread on the table")));
        r.eval("bread");
        assert_eq!(r.session().state(), ProgressState::Bread);
    }

    #[test]
    fn blank_line_is_ignored() {
        let mut r = repl();
        assert_eq!(r.eval("   \n"), Action::Nothing);
        assert_eq!(r.session().update_count(), 0);
    }

    #[test]
    fn bad_frame_leaves_session_untouched() {
        let mut r = repl();
        assert!(matches!(r.eval("pickle"), Action::Print(s) if s.contains("Bad frame")));
        assert_eq!(r.session().state(), ProgressState::Start);
    }

    #[test]
    fn reset_returns_to_start() {
        let mut r = repl();
        r.eval("{}");
        r.eval("bread");
        r.eval("/reset");
        assert_eq!(r.session().state(), ProgressState::Start);
    }

    #[test]
    fn state_command_reports_state() {
        let mut r = repl();
        r.eval("{}");
        assert!(matches!(r.eval("/state"), Action::Print(s) if s.contains("NOTHING")));
    }

    #[test]
    fn quit_and_unknown_commands() {
        let mut r = repl();
        assert_eq!(r.eval("/exit"), Action::Quit);
        assert!(matches!(r.eval("/fly"), Action::Print(s) if s.contains("Unknown command")));
    }
}
