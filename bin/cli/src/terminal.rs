//! Live terminal rendering of a run.

use sqlscout_agent::LiveDisplay;
use std::io::Write;

/// Prints thinking and answer text as it grows.
///
/// Only the unseen suffix is written on each render. The answer gets its own
/// heading the first time it is non-empty.
pub struct TerminalDisplay<W> {
    out: W,
    thinking_shown: usize,
    answer_shown: usize,
}

impl<W: Write + Send> TerminalDisplay<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            thinking_shown: 0,
            answer_shown: 0,
        }
    }

    /// Ends the current output line.
    pub fn finish(&mut self) {
        if self.thinking_shown > 0 || self.answer_shown > 0 {
            let _ = writeln!(self.out);
        }
        let _ = self.out.flush();
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

fn unseen(text: &str, shown: usize) -> &str {
    text.get(shown..).unwrap_or_default()
}

impl<W: Write + Send> LiveDisplay for TerminalDisplay<W> {
    fn render(&mut self, thinking: &str, answer: &str) {
        let new_thinking = unseen(thinking, self.thinking_shown);
        if !new_thinking.is_empty() {
            if self.thinking_shown == 0 {
                let _ = write!(self.out, "Thinking: ");
            }
            let _ = write!(self.out, "{new_thinking}");
            self.thinking_shown = thinking.len();
        }

        let new_answer = unseen(answer, self.answer_shown);
        if !new_answer.is_empty() {
            if self.answer_shown == 0 {
                let separator = if self.thinking_shown > 0 { "\n\n" } else { "" };
                let _ = write!(self.out, "{separator}Answer: ");
            }
            let _ = write!(self.out, "{new_answer}");
            self.answer_shown = answer.len();
        }
        let _ = self.out.flush();
    }
}
