//! Splits raw subtitle text into ordered cues.
//!
//! Parsing never fails. Blocks that do not look like a timed cue are kept as
//! passthrough cues and written back untouched.

use super::{Cue, CueBody, TimedCue};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// One or more blank (or whitespace-only) lines.
static BLOCK_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("Invalid regex"));

/// A timestamp-ish token on both sides of an arrow: `1,000 --> 00`, `1.000->00`, `1,000 ==> 00`.
static TIMING_ARROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d\s*[-=]+>\s*\d").expect("Invalid regex"));

static ARROW_VARIANT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[-=]+>\s*").expect("Invalid regex"));

/// Minimum lines for a timed block: index, timing, dialogue.
const MIN_BLOCK_LINES: usize = 3;

/// Parse a whole subtitle document into cues.
pub fn parse_cues(input: &str) -> Vec<Cue> {
    let cues: Vec<Cue> = split_blocks(input)
        .into_iter()
        .map(|block| parse_block(&block))
        .collect();

    debug!(
        "Parsed {} cues ({} passthrough)",
        cues.len(),
        cues.iter()
            .filter(|c| matches!(c.body, CueBody::Passthrough))
            .count()
    );

    cues
}

/// Normalize line endings, drop a leading BOM and split on blank lines.
pub fn split_blocks(input: &str) -> Vec<String> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let content = normalize_newlines(input);

    BLOCK_SEPARATOR
        .split(content.trim())
        .filter(|block| !block.trim().is_empty())
        .map(str::to_string)
        .collect()
}

pub fn normalize_newlines(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

/// Parse one block. Anything that is not a well-formed timed cue becomes passthrough.
pub fn parse_block(block: &str) -> Cue {
    let lines: Vec<&str> = block.split('\n').collect();
    if lines.len() < MIN_BLOCK_LINES {
        return Cue::passthrough(block);
    }

    let Some(timing_idx) = lines.iter().position(|line| TIMING_ARROW.is_match(line)) else {
        return Cue::passthrough(block);
    };

    Cue {
        raw: block.to_string(),
        body: CueBody::Timed(TimedCue {
            header: lines[..timing_idx].iter().map(|l| l.to_string()).collect(),
            timing: normalize_timing_line(lines[timing_idx]),
            source_text: lines[timing_idx + 1..].join("\n"),
            max_chars: 0,
            translated_text: None,
        }),
    }
}

/// Canonical arrow (` --> `) and comma decimal separator.
pub fn normalize_timing_line(line: &str) -> String {
    ARROW_VARIANT
        .replace_all(line.trim(), " --> ")
        .replace('.', ",")
}
