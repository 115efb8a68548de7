// Reading-speed overflow report
use super::{display_len, Cue};
use serde::Serialize;

/// A cue whose translation is longer than its budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverflowRecord {
    /// Position of the cue in the document (0-based).
    pub position: usize,
    /// Header label of the cue, usually its sequence number.
    pub index: String,
    pub max_chars: usize,
    pub actual_chars: usize,
    pub overflow: usize,
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct QualityReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
    pub checked_cues: usize,
    pub overflows: Vec<OverflowRecord>,
}

impl QualityReport {
    /// Build a report for a translated cue list.
    pub fn from_cues(cues: &[Cue]) -> Self {
        Self {
            source_file: None,
            target_language: None,
            checked_cues: cues
                .iter()
                .filter_map(Cue::timed)
                .filter(|t| t.translated_text.is_some() && t.max_chars > 0)
                .count(),
            overflows: find_overflows(cues),
        }
    }

    pub fn with_source_file(mut self, source_file: impl Into<String>) -> Self {
        self.source_file = Some(source_file.into());
        self
    }

    pub fn with_target_language(mut self, language: impl Into<String>) -> Self {
        self.target_language = Some(language.into());
        self
    }

    pub fn is_clean(&self) -> bool {
        self.overflows.is_empty()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Cues whose translated text exceeds `max_chars`, line breaks not counted.
///
/// Cues without a budget (0) or without a translation are skipped. Nothing in
/// `cues` is modified.
pub fn find_overflows(cues: &[Cue]) -> Vec<OverflowRecord> {
    cues.iter()
        .enumerate()
        .filter_map(|(position, cue)| {
            let timed = cue.timed()?;
            let text = timed.translated_text.as_ref()?;
            if timed.max_chars == 0 {
                return None;
            }

            let actual = display_len(text);
            (actual > timed.max_chars).then(|| OverflowRecord {
                position,
                index: cue.label(),
                max_chars: timed.max_chars,
                actual_chars: actual,
                overflow: actual - timed.max_chars,
                text: text.clone(),
            })
        })
        .collect()
}
