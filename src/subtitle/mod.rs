pub mod budget;
pub mod parser;
pub mod report;
pub mod srt;

pub use budget::{annotate_budgets, max_chars_for, ScriptClass, DEFAULT_MAX_CHARS};
pub use parser::{normalize_timing_line, parse_cues};
pub use report::{find_overflows, OverflowRecord, QualityReport};
pub use srt::{encode_with_bom, render_cues, BOM};

/// One subtitle block, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    /// The block exactly as it appeared in the input (after newline normalization).
    pub raw: String,
    pub body: CueBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CueBody {
    /// A block with a recognizable timing line.
    Timed(TimedCue),
    /// Anything else; emitted verbatim and never translated.
    Passthrough,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimedCue {
    /// Lines before the timing line (usually the sequence number).
    pub header: Vec<String>,
    /// Timing line with arrow and decimal separator normalized.
    pub timing: String,
    /// Dialogue lines joined with `\n`.
    pub source_text: String,
    /// Character budget; 0 when no budget applies.
    pub max_chars: usize,
    pub translated_text: Option<String>,
}

impl Cue {
    pub fn passthrough(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            body: CueBody::Passthrough,
        }
    }

    pub fn timed(&self) -> Option<&TimedCue> {
        match &self.body {
            CueBody::Timed(timed) => Some(timed),
            CueBody::Passthrough => None,
        }
    }

    pub fn timed_mut(&mut self) -> Option<&mut TimedCue> {
        match &mut self.body {
            CueBody::Timed(timed) => Some(timed),
            CueBody::Passthrough => None,
        }
    }

    /// Whether this cue carries dialogue that should go through translation.
    pub fn is_translatable(&self) -> bool {
        self.timed()
            .map(|t| !t.source_text.trim().is_empty())
            .unwrap_or(false)
    }

    /// Label used in diagnostics: the header lines, or the raw first line.
    pub fn label(&self) -> String {
        match &self.body {
            CueBody::Timed(timed) if !timed.header.is_empty() => timed.header.join(" "),
            CueBody::Timed(timed) => timed.timing.clone(),
            CueBody::Passthrough => self.raw.lines().next().unwrap_or_default().to_string(),
        }
    }

    /// Text that will be written for this cue's dialogue.
    pub fn output_text(&self) -> Option<&str> {
        self.timed().map(|t| {
            t.translated_text
                .as_deref()
                .unwrap_or(t.source_text.as_str())
        })
    }
}

/// Count characters the way reading-speed budgets do: line breaks excluded.
pub fn display_len(text: &str) -> usize {
    text.chars().filter(|c| *c != '\n' && *c != '\r').count()
}

/// Drop blank and whitespace-only lines so text can never split a block in two.
pub fn collapse_blank_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timed_cue(text: &str) -> Cue {
        Cue {
            raw: format!("1\n00:00:01,000 --> 00:00:02,000\n{}", text),
            body: CueBody::Timed(TimedCue {
                header: vec!["1".to_string()],
                timing: "00:00:01,000 --> 00:00:02,000".to_string(),
                source_text: text.to_string(),
                max_chars: 0,
                translated_text: None,
            }),
        }
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("Hola\n\n\t\namigo\n"), "Hola\namigo");
        assert_eq!(collapse_blank_lines("  one line  "), "one line");
        assert_eq!(collapse_blank_lines("\n \n"), "");
    }

    #[test]
    fn test_translatable_requires_text() {
        assert!(timed_cue("Hello").is_translatable());
        assert!(!timed_cue("   ").is_translatable());
        assert!(!Cue::passthrough("just a note").is_translatable());
    }

    #[test]
    fn test_output_text_prefers_translation() {
        let mut cue = timed_cue("Hello");
        assert_eq!(cue.output_text(), Some("Hello"));

        cue.timed_mut().unwrap().translated_text = Some("こんにちは".to_string());
        assert_eq!(cue.output_text(), Some("こんにちは"));
        assert_eq!(Cue::passthrough("x").output_text(), None);
    }

    #[test]
    fn test_label() {
        assert_eq!(timed_cue("Hi").label(), "1");
        assert_eq!(Cue::passthrough("NOTE\nsomething").label(), "NOTE");
    }

    #[test]
    fn test_display_len_ignores_line_breaks() {
        assert_eq!(display_len("ab\ncd"), 4);
        assert_eq!(display_len("日本語\r\nです"), 5);
    }
}
