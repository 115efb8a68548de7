/// Default size of the rolling context, in characters.
pub const DEFAULT_CONTEXT_WINDOW: usize = 200;

/// Tail of the most recent batch's translation, fed to the next request.
///
/// Each update replaces the previous tail; nothing accumulates across batches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollingContext {
    window: usize,
    tail: String,
}

impl RollingContext {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            tail: String::new(),
        }
    }

    /// Replace the context with the last `window` characters of `texts`, space-joined.
    pub fn update<S: AsRef<str>>(&mut self, texts: &[S]) {
        let joined = texts
            .iter()
            .map(|t| t.as_ref().split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        self.tail = tail_chars(&joined, self.window).to_string();
    }

    /// `None` before the first batch or when the window is 0.
    pub fn as_deref(&self) -> Option<&str> {
        (!self.tail.is_empty()).then_some(self.tail.as_str())
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

/// Last `n` characters of `text`, never splitting a code point.
pub fn tail_chars(text: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match text.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}
