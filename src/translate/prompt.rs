//! Request building for batch translation.

use super::{BatchItem, TranslationContext};
use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;

/// A system instruction plus the user message carrying the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

#[derive(Serialize)]
struct PayloadItem<'a> {
    text: &'a str,
    max_chars: usize,
}

/// Build the request for one batch.
///
/// Items are keyed `"1"`, `"2"`, ... in input order; the reply is expected to
/// use exactly these keys.
pub fn build_prompt(items: &[BatchItem], context: &TranslationContext<'_>) -> Result<Prompt> {
    let payload: BTreeMap<usize, PayloadItem<'_>> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            (
                i + 1,
                PayloadItem {
                    text: &item.text,
                    max_chars: item.max_chars,
                },
            )
        })
        .collect();

    Ok(Prompt {
        system: system_instruction(items.len(), context),
        user: serde_json::to_string_pretty(&payload)?,
    })
}

fn system_instruction(count: usize, context: &TranslationContext<'_>) -> String {
    let language = language_display_name(context.target_language);
    let mut prompt = String::new();

    if context.title.trim().is_empty() {
        prompt.push_str("You are a professional subtitle translator.\n");
    } else {
        prompt.push_str(&format!(
            "You are a professional subtitle translator for \"{}\".\n",
            context.title.trim()
        ));
    }
    prompt.push_str(&format!(
        "Translate the {} subtitle lines in the user message into natural {}.\n",
        count, language
    ));

    if let Some(guide) = context.style_guide.filter(|g| !g.trim().is_empty()) {
        prompt.push_str("\n[STYLE GUIDE]\n");
        prompt.push_str(guide.trim());
        prompt.push('\n');
    }

    if let Some(previous) = context.rolling_context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str("\n[PREVIOUS CONTEXT]\n");
        prompt.push_str("(Already translated dialogue, for continuity only. Do NOT translate it and do NOT include it in your output.)\n");
        prompt.push_str(previous.trim());
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        r#"
Input: a JSON object mapping a key to {{"text": ..., "max_chars": ...}}.

Rules:
1. Reply with a single JSON object whose keys are exactly the input keys ("1" to "{count}") and whose values are the translated strings. No other keys, no commentary.
2. Aim to keep each translation within its "max_chars". Natural, unfragmented phrasing matters more than the limit: going slightly over is acceptable, dropping words mechanically is not.
3. Keep the flow between consecutive lines and preserve tone and emotion, following the style guide and previous context when given.
4. Keep line breaks ("\n") where the source text has them.

Example input:
{{"1": {{"text": "Hello.", "max_chars": 15}}, "2": {{"text": "How are you?", "max_chars": 20}}}}
Example output:
{{"1": "...", "2": "..."}}"#
    ));

    prompt
}

const LANGUAGE_NAMES: &[(&str, &str)] = &[
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("pt-br", "Brazilian Portuguese"),
    ("ru", "Russian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("zh", "Chinese"),
    ("zh-cn", "Simplified Chinese"),
    ("zh-tw", "Traditional Chinese"),
    ("ar", "Arabic"),
    ("hi", "Hindi"),
    ("th", "Thai"),
    ("vi", "Vietnamese"),
    ("id", "Indonesian"),
    ("nl", "Dutch"),
    ("pl", "Polish"),
    ("tr", "Turkish"),
    ("uk", "Ukrainian"),
    ("sv", "Swedish"),
];

/// Expand common language codes for better prompting; free text passes through.
pub fn language_display_name(target_language: &str) -> &str {
    let trimmed = target_language.trim();
    let code = trimmed.to_lowercase().replace('_', "-");
    LANGUAGE_NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or(trimmed)
}
