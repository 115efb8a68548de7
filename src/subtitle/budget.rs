//! Reading-speed character budgets.
//!
//! A cue may show roughly `duration * rate` characters, capped to about two
//! lines. The rate depends on whether the target language is written in a
//! dense script (one character carries a syllable or word) or a word-based one.

use super::Cue;

/// Budget used when the timing line cannot be read.
pub const DEFAULT_MAX_CHARS: usize = 20;

const DENSE_CHARS_PER_SECOND: f64 = 4.5;
const DENSE_BOUNDS: (usize, usize) = (5, 30);

const WORD_CHARS_PER_SECOND: f64 = 15.0;
const WORD_BOUNDS: (usize, usize) = (15, 80);

const DENSE_NAMES: &[&str] = &[
    "japanese", "korean", "chinese", "mandarin", "cantonese", "日本", "中文", "汉语", "漢語",
    "中国語", "한국",
];

const DENSE_CODES: &[&str] = &["ja", "jp", "jpn", "ko", "kor", "zh", "zho", "chi", "cmn", "yue"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptClass {
    /// Japanese, Korean, Chinese family.
    Dense,
    /// Latin, Cyrillic and other word-based scripts.
    WordBased,
}

impl ScriptClass {
    /// Classify a free-text language identifier ("Japanese", "ja-JP", "zh_TW", "日本語").
    pub fn classify(target_language: &str) -> Self {
        let lang = target_language.trim().to_lowercase();

        if DENSE_NAMES.iter().any(|name| lang.contains(name)) {
            return ScriptClass::Dense;
        }

        let primary = lang.split(['-', '_', ' ']).next().unwrap_or_default();
        if DENSE_CODES.contains(&primary) {
            return ScriptClass::Dense;
        }

        ScriptClass::WordBased
    }

    pub fn chars_per_second(self) -> f64 {
        match self {
            ScriptClass::Dense => DENSE_CHARS_PER_SECOND,
            ScriptClass::WordBased => WORD_CHARS_PER_SECOND,
        }
    }

    /// Inclusive (min, max) budget.
    pub fn bounds(self) -> (usize, usize) {
        match self {
            ScriptClass::Dense => DENSE_BOUNDS,
            ScriptClass::WordBased => WORD_BOUNDS,
        }
    }
}

/// Budget for one timing line. Malformed or non-positive durations fall back to
/// [`DEFAULT_MAX_CHARS`].
pub fn max_chars_for(timing: &str, target_language: &str) -> usize {
    let Some(duration) = cue_duration(timing) else {
        return DEFAULT_MAX_CHARS;
    };
    if !duration.is_finite() || duration <= 0.0 {
        return DEFAULT_MAX_CHARS;
    }

    let class = ScriptClass::classify(target_language);
    let (min, max) = class.bounds();
    let raw = (duration * class.chars_per_second()).floor() as usize;
    raw.clamp(min, max)
}

/// Fill `max_chars` on every translatable cue; other cues keep 0.
pub fn annotate_budgets(cues: &mut [Cue], target_language: &str) {
    for cue in cues.iter_mut() {
        if !cue.is_translatable() {
            continue;
        }
        if let Some(timed) = cue.timed_mut() {
            timed.max_chars = max_chars_for(&timed.timing, target_language);
        }
    }
}

/// Seconds between start and end of a `start --> end [settings]` line.
pub fn cue_duration(timing: &str) -> Option<f64> {
    let (start, end) = timing.split_once("-->")?;
    let start = parse_timestamp(start.trim())?;
    let end = parse_timestamp(end.split_whitespace().next()?)?;
    Some(end - start)
}

/// Parse `HH:MM:SS,mmm`, `HH:MM:SS.mmm`, `MM:SS,mmm` or a bare `HH:MM:SS` into seconds.
pub fn parse_timestamp(token: &str) -> Option<f64> {
    let (clock, fraction) = match token.rsplit_once([',', '.']) {
        Some((clock, fraction)) => (clock, Some(fraction)),
        None => (token, None),
    };

    let parts = clock
        .split(':')
        .map(|p| p.trim().parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;

    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => (0, *m, *s),
        _ => return None,
    };

    let fraction = match fraction {
        Some(f) if !f.is_empty() && f.chars().all(|c| c.is_ascii_digit()) => {
            format!("0.{}", f).parse::<f64>().ok()?
        }
        Some(_) => return None,
        None => 0.0,
    };

    Some(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds as f64 + fraction)
}
