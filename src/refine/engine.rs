//! Normalization and continuity heuristics for generated text.

use crate::refine::history::HistoryBuffer;
use serde::{Deserialize, Serialize};

/// Connective openers that already mark a new thought; text starting
/// with one of these is never given the "Additionally, " prefix.
const CONNECTIVES: [&str; 5] = ["however", "but", "and", "also", "additionally"];

/// Sentence-terminal characters.
const TERMINALS: [char; 3] = ['.', '!', '?'];

/// Tuning for the refine engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RefineConfig {
    /// Maximum entries kept in the rolling history window.
    pub max_history: usize,
    /// How many recent entries form the context string.
    pub context_window: usize,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            max_history: 10,
            context_window: 3,
        }
    }
}

/// Normalizes a text fragment into sentence shape.
///
/// Trims surrounding whitespace, collapses internal whitespace runs to
/// a single space, uppercases the first character, and appends `.` when
/// the text does not already end in `.`, `!` or `?`. Total over any
/// input; the empty string normalizes to `"."`. Idempotent.
pub fn normalize(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut out = String::with_capacity(collapsed.len() + 1);
    let mut chars = collapsed.chars();
    if let Some(first) = chars.next() {
        out.extend(first.to_uppercase());
        out.push_str(chars.as_str());
    }
    if !out.ends_with(TERMINALS) {
        out.push('.');
    }
    out
}

/// Stateful text-continuity engine.
///
/// `refine` consults the history window but never mutates it; the
/// caller's loop records every returned string via [`RefineEngine::record`].
pub struct RefineEngine {
    config: RefineConfig,
    history: HistoryBuffer,
}

impl RefineEngine {
    /// Creates an engine with an empty history window.
    pub fn new(config: RefineConfig) -> Self {
        let history = HistoryBuffer::new(config.max_history);
        Self { config, history }
    }

    /// Refines one generated fragment against recent history.
    ///
    /// Decision ladder, first match wins:
    /// 1. empty history → the normalized text as-is;
    /// 2. normalized text already contained in the context → as-is
    ///    (literal substring dedup — short common phrases can be
    ///    falsely suppressed; that is the contract, not a bug);
    /// 3. context ends with an ellipsis or lacks terminal punctuation →
    ///    treat as a continuation and normalize `context + " " + text`;
    /// 4. text does not open with a connective word → prefix
    ///    `"Additionally, "` to mark a distinct thought;
    /// 5. otherwise the normalized text as-is.
    pub fn refine(&self, raw: &str) -> String {
        let text = normalize(raw);
        let context = self.history.context(self.config.context_window);

        if context.is_empty() {
            return text;
        }

        if context.contains(&text) {
            return text;
        }

        if context.ends_with("...") || !context.ends_with(TERMINALS) {
            // Splice the raw fragment in, so mid-sentence text is not
            // capitalized or terminated before the merge.
            return normalize(&format!("{context} {raw}"));
        }

        let lowered = text.to_lowercase();
        if !CONNECTIVES.iter().any(|word| lowered.starts_with(word)) {
            return format!("Additionally, {text}");
        }

        text
    }

    /// Records a refined string into the history window.
    pub fn record(&mut self, refined: &str) {
        self.history.record(refined.to_string());
    }

    /// Read access to the history window, mainly for diagnostics.
    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }
}
