//! `stepwise replay <file>` – run one session over recorded frames.
//!
//! The file holds one frame per line (see [`crate::frame`]). Blank lines
//! and lines starting with `#` are skipped. A line that fails to parse is
//! reported and skipped rather than treated as an empty frame, which would
//! itself be a meaningful input to the rules.
//!
//! Feedback is written as each frame is evaluated. In [`Output::Json`] mode
//! the output stream carries nothing but one serialized [`Feedback`] per
//! line; skipped lines are only logged.

use colored::Colorize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use stepwise_perception::DedupPolicy;
use stepwise_runtime::{ContentTable, Engine, Feedback, Session};
use stepwise_types::GuideError;

use crate::frame;

/// How each evaluated frame is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    /// Coloured one-line rendering prefixed with the input line number.
    Human,
    /// One JSON-encoded [`Feedback`] per line.
    Json,
}

/// Totals of a finished (or interrupted) replay.
#[derive(Debug)]
pub struct ReplaySummary {
    pub frames: usize,
    pub skipped: usize,
    pub session: Session,
}

/// Feed every frame in `reader` through a fresh session, writing each
/// frame's feedback to `out` as soon as it is decided.
///
/// Stops early once `shutdown` is set; everything before that point has
/// already been written.
pub fn replay<R: BufRead, W: Write>(
    reader: R,
    out: &mut W,
    output: Output,
    policy: DedupPolicy,
    content: &ContentTable,
    shutdown: &AtomicBool,
) -> Result<ReplaySummary, GuideError> {
    let engine = Engine::new();
    let mut session = Session::new();
    let mut frames = 0;
    let mut skipped = 0;

    for (idx, line) in reader.lines().enumerate() {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        let line_no = idx + 1;
        let line = line.map_err(|e| GuideError::Config(format!("Read error on line {line_no}: {e}")))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        match frame::parse(trimmed, policy) {
            Ok(detections) => {
                let feedback = session.step(&engine, &detections, content);
                frames += 1;
                write_feedback(out, output, line_no, &feedback)?;
            }
            Err(e) => {
                warn!(line = line_no, error = %e, "skipping unparsable frame");
                skipped += 1;
                if output == Output::Human {
                    writeln!(out, "{} {} {}", format!("{line_no:>4}").dimmed(), "skipped:".red(), e)
                        .map_err(write_failed)?;
                }
            }
        }
    }

    Ok(ReplaySummary {
        frames,
        skipped,
        session,
    })
}

/// Replay `path` to stdout.
pub fn run(
    path: &Path,
    policy: DedupPolicy,
    content: &ContentTable,
    output: Output,
    shutdown: Arc<AtomicBool>,
) -> Result<(), GuideError> {
    let file = File::open(path).map_err(|e| {
        GuideError::Config(format!("Failed to open {}: {e}", path.display()))
    })?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let summary = replay(BufReader::new(file), &mut out, output, policy, content, &shutdown)?;

    if output == Output::Human {
        writeln!(
            out,
            "\n  {} frame(s), {} skipped, {} update(s), final state {}",
            summary.frames,
            summary.skipped,
            summary.session.update_count(),
            summary.session.state().to_string().bold()
        )
        .map_err(write_failed)?;
    }
    Ok(())
}

fn write_feedback<W: Write>(
    out: &mut W,
    output: Output,
    line_no: usize,
    feedback: &Feedback,
) -> Result<(), GuideError> {
    let written = match output {
        Output::Json => {
            let encoded = serde_json::to_string(feedback)
                .map_err(|e| GuideError::Config(format!("Failed to encode feedback: {e}")))?;
            writeln!(out, "{encoded}")
        }
        Output::Human => writeln!(out, "{} {}", format!("{line_no:>4}").dimmed(), render(feedback)),
    };
    written.map_err(write_failed)
}

fn write_failed(e: io::Error) -> GuideError {
    GuideError::Config(format!("Failed to write replay output: {e}"))
}

/// One-line human rendering of a [`Feedback`].
pub fn render(feedback: &Feedback) -> String {
    let mut out = format!("[{}]", feedback.state.to_string().cyan());
    if let Some(text) = &feedback.text {
        out.push_str(&format!(" {}", text.bold()));
    }
    if let Some(image) = &feedback.image {
        out.push_str(&format!(" ({})", image.dimmed()));
    }
    if let Some(o) = &feedback.overlay {
        out.push_str(&format!(" holo x={:.3} y={:.3} depth={:.1}", o.x, o.y, o.depth));
    }
    if feedback.changed {
        out.push_str(&format!(" {}", format!("#{}", feedback.update_count).green()));
    }
    out
}
