//! Response framing.
//!
//! A reply is zero or more `<reasoning>...</reasoning>` segments followed by a
//! single `<final_response>...</final_response>` segment. [`FramingParser`]
//! consumes the reply one token at a time and keeps the thinking text apart
//! from the answer text. Markers split across tokens are held back until they
//! either complete or prove to be ordinary text, so each byte is scanned a
//! bounded number of times.

use serde::{Deserialize, Serialize};

const REASONING_START: &str = "<reasoning>";
const REASONING_END: &str = "</reasoning>";
const FINAL_START: &str = "<final_response>";
const FINAL_END: &str = "</final_response>";

/// Where the parser is within a framed reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramingPhase {
    /// Outside any segment, before the final answer.
    #[default]
    BeforeReasoning,
    /// Inside a reasoning segment.
    InReasoning,
    /// Inside the final answer segment.
    InFinal,
    /// The final answer is closed. Later input is ignored.
    Done,
}

#[derive(Debug, Clone, Copy)]
enum Marker {
    ReasoningStart,
    ReasoningEnd,
    FinalStart,
    FinalEnd,
}

impl Marker {
    fn text(self) -> &'static str {
        match self {
            Self::ReasoningStart => REASONING_START,
            Self::ReasoningEnd => REASONING_END,
            Self::FinalStart => FINAL_START,
            Self::FinalEnd => FINAL_END,
        }
    }
}

enum MarkerMatch {
    Complete(Marker),
    Partial,
    NoMatch,
}

/// Incremental classifier for framed model output.
#[derive(Debug, Clone, Default)]
pub struct FramingParser {
    phase: FramingPhase,
    pending: String,
    thinking: String,
    answer: String,
}

impl FramingParser {
    /// Creates a parser in the `BeforeReasoning` phase.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one token.
    pub fn push(&mut self, token: &str) {
        if self.phase == FramingPhase::Done {
            return;
        }
        self.pending.push_str(token);
        let pending = std::mem::take(&mut self.pending);
        let mut rest = pending.as_str();

        while !rest.is_empty() && self.phase != FramingPhase::Done {
            let Some(open) = rest.find('<') else {
                self.emit(rest);
                rest = "";
                break;
            };
            self.emit(&rest[..open]);
            rest = &rest[open..];
            match self.match_marker(rest) {
                MarkerMatch::Complete(marker) => {
                    self.enter(marker);
                    rest = &rest[marker.text().len()..];
                }
                MarkerMatch::Partial => break,
                MarkerMatch::NoMatch => {
                    self.emit("<");
                    rest = &rest[1..];
                }
            }
        }

        if self.phase != FramingPhase::Done {
            self.pending = rest.to_string();
        }
    }

    /// Flushes any held-back text at the end of the reply.
    ///
    /// An incomplete marker at the very end is kept as ordinary text.
    pub fn finish(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        self.emit(&pending);
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> FramingPhase {
        self.phase
    }

    /// Returns true once the final answer has started.
    #[must_use]
    pub fn in_final(&self) -> bool {
        matches!(self.phase, FramingPhase::InFinal | FramingPhase::Done)
    }

    /// Returns the thinking text so far, with markers removed.
    #[must_use]
    pub fn thinking(&self) -> &str {
        self.thinking.trim()
    }

    /// Returns the answer text so far.
    #[must_use]
    pub fn answer(&self) -> &str {
        self.answer.trim()
    }

    fn emit(&mut self, text: &str) {
        match self.phase {
            FramingPhase::BeforeReasoning | FramingPhase::InReasoning => {
                self.thinking.push_str(text);
            }
            FramingPhase::InFinal => self.answer.push_str(text),
            FramingPhase::Done => {}
        }
    }

    fn match_marker(&self, rest: &str) -> MarkerMatch {
        let candidates: &[Marker] = match self.phase {
            FramingPhase::InFinal => &[Marker::FinalEnd],
            _ => &[
                Marker::ReasoningStart,
                Marker::ReasoningEnd,
                Marker::FinalStart,
                Marker::FinalEnd,
            ],
        };
        let mut partial = false;
        for &marker in candidates {
            let text = marker.text();
            if rest.starts_with(text) {
                return MarkerMatch::Complete(marker);
            }
            if text.starts_with(rest) {
                partial = true;
            }
        }
        if partial {
            MarkerMatch::Partial
        } else {
            MarkerMatch::NoMatch
        }
    }

    fn enter(&mut self, marker: Marker) {
        self.phase = match (self.phase, marker) {
            (FramingPhase::InFinal, Marker::FinalEnd) => FramingPhase::Done,
            (_, Marker::ReasoningStart) => FramingPhase::InReasoning,
            (_, Marker::ReasoningEnd) => FramingPhase::BeforeReasoning,
            (_, Marker::FinalStart) => FramingPhase::InFinal,
            // A stray close before the answer is stripped.
            (phase, Marker::FinalEnd) => phase,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_chars(input: &str) -> FramingParser {
        let mut parser = FramingParser::new();
        for c in input.chars() {
            parser.push(&c.to_string());
        }
        parser
    }

    #[test]
    fn char_by_char_separates_thinking_and_answer() {
        let parser =
            feed_chars("<reasoning>plan</reasoning><final_response>42</final_response>");

        assert_eq!(parser.thinking(), "plan");
        assert_eq!(parser.answer(), "42");
        assert_eq!(parser.phase(), FramingPhase::Done);
    }

    #[test]
    fn whole_reply_in_one_token() {
        let mut parser = FramingParser::new();
        parser.push("<reasoning>plan</reasoning><final_response>42</final_response>");

        assert_eq!(parser.thinking(), "plan");
        assert_eq!(parser.answer(), "42");
    }

    #[test]
    fn text_after_final_marker_seeds_answer() {
        let mut parser = FramingParser::new();
        parser.push("<reasoning>count rows</reasoning>");
        assert!(!parser.in_final());

        parser.push("<final_response>There are");
        assert!(parser.in_final());
        assert_eq!(parser.answer(), "There are");

        parser.push(" 7 rows.</final_response>");
        assert_eq!(parser.answer(), "There are 7 rows.");
    }

    #[test]
    fn answer_is_frozen_after_end_marker() {
        let mut parser = FramingParser::new();
        parser.push("<final_response>42</final_response> trailing");
        parser.push("<reasoning>late</reasoning>");
        parser.finish();

        assert_eq!(parser.answer(), "42");
        assert_eq!(parser.thinking(), "");
    }

    #[test]
    fn markers_split_across_tokens() {
        let mut parser = FramingParser::new();
        for token in ["<reas", "oning>pl", "an</rea", "soning><final_", "response>4", "2</final_resp", "onse>"] {
            parser.push(token);
        }

        assert_eq!(parser.thinking(), "plan");
        assert_eq!(parser.answer(), "42");
    }

    #[test]
    fn multiple_reasoning_segments_accumulate() {
        let parser = feed_chars(
            "<reasoning>list tables</reasoning>\n<reasoning>inspect schema</reasoning>\n<final_response>done</final_response>",
        );

        assert_eq!(parser.thinking(), "list tables\ninspect schema");
        assert_eq!(parser.answer(), "done");
    }

    #[test]
    fn angle_brackets_in_text_are_kept() {
        let parser = feed_chars("<reasoning>a < b</reasoning><final_response>x <b> y</final_response>");

        assert_eq!(parser.thinking(), "a < b");
        assert_eq!(parser.answer(), "x <b> y");
    }

    #[test]
    fn unframed_text_is_thinking() {
        let mut parser = FramingParser::new();
        parser.push("I could not find that table.");

        assert_eq!(parser.thinking(), "I could not find that table.");
        assert_eq!(parser.answer(), "");
        assert!(!parser.in_final());
    }

    #[test]
    fn finish_flushes_incomplete_marker() {
        let mut parser = FramingParser::new();
        parser.push("<reasoning>check the <rea");
        assert_eq!(parser.thinking(), "check the");

        parser.finish();
        assert_eq!(parser.thinking(), "check the <rea");
    }

    #[test]
    fn multibyte_text_is_preserved() {
        let parser = feed_chars("<reasoning>país</reasoning><final_response>naïve ≤ 3</final_response>");

        assert_eq!(parser.thinking(), "país");
        assert_eq!(parser.answer(), "naïve ≤ 3");
    }
}
