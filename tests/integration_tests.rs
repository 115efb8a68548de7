//! Integration tests for subtrans
//!
//! These tests run whole translations against in-process language models.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use subtrans::config::Config;
use subtrans::error::{Result, SubtransError};
use subtrans::pipeline::{translate_file, translate_subtitles, RunConfig, RunState};
use subtrans::subtitle::{parse_cues, render_cues, CueBody, BOM};
use subtrans::translate::{BatchStatus, BatchTranslator, LanguageModel, Prompt, RetryPolicy};

/// Model that answers every key with its text upper-cased.
struct EchoModel {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl LanguageModel for EchoModel {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let payload: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(&prompt.user)?;
        let reply: serde_json::Map<String, serde_json::Value> = payload
            .into_iter()
            .map(|(key, item)| {
                let text = item["text"].as_str().unwrap_or_default().to_uppercase();
                (key, serde_json::Value::String(text))
            })
            .collect();
        Ok(serde_json::Value::Object(reply).to_string())
    }

    async fn check_connection(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Echo"
    }

    fn model(&self) -> &str {
        "echo-1"
    }
}

/// Model that is always rate limited.
struct ThrottledModel {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl LanguageModel for ThrottledModel {
    async fn complete(&self, _prompt: &Prompt) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SubtransError::RateLimited("429 Too Many Requests".to_string()))
    }

    async fn check_connection(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Throttled"
    }

    fn model(&self) -> &str {
        "throttled-1"
    }
}

/// Model that always sends back the same reply text.
struct FixedReplyModel {
    reply: &'static str,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl LanguageModel for FixedReplyModel {
    async fn complete(&self, _prompt: &Prompt) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.to_string())
    }

    async fn check_connection(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Fixed"
    }

    fn model(&self) -> &str {
        "fixed-1"
    }
}

fn fixed_translator(reply: &'static str) -> (BatchTranslator, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let model = FixedReplyModel {
        reply,
        calls: calls.clone(),
    };
    (
        BatchTranslator::new(Box::new(model)).with_policy(RetryPolicy::immediate(3)),
        calls,
    )
}

fn echo_translator() -> (BatchTranslator, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let model = EchoModel {
        calls: calls.clone(),
    };
    (
        BatchTranslator::new(Box::new(model)).with_policy(RetryPolicy::immediate(3)),
        calls,
    )
}

fn throttled_translator() -> (BatchTranslator, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let model = ThrottledModel {
        calls: calls.clone(),
    };
    (
        BatchTranslator::new(Box::new(model)).with_policy(RetryPolicy::immediate(3)),
        calls,
    )
}

fn run_config(batch_size: usize) -> RunConfig {
    RunConfig {
        title: "Test Feature".to_string(),
        target_language: "French".to_string(),
        batch_size,
        show_progress: false,
        ..Default::default()
    }
}

const EPISODE: &str = "1
00:00:01,000 --> 00:00:04,000
Where were you last night?

2
00:00:04,500 --> 00:00:06,000
Out.

3
00:00:06,200 --> 00:00:09,800
Out where?
Tell me.

NOTE translator: keep this

4
00:00:10,000 --> 00:00:12,000
Nowhere.
";

// ============================================================================
// Parsing and Rendering Tests
// ============================================================================

mod parsing_tests {
    use super::*;

    #[test]
    fn test_parse_episode() {
        let cues = parse_cues(EPISODE);
        assert_eq!(cues.len(), 5);
        assert!(matches!(cues[3].body, CueBody::Passthrough));
        assert_eq!(cues[2].timed().unwrap().source_text, "Out where?\nTell me.");
    }

    #[test]
    fn test_untranslated_render_keeps_text() {
        let cues = parse_cues(EPISODE);
        let rendered = render_cues(&cues);
        assert_eq!(rendered, format!("{}\n", EPISODE));
    }

    #[test]
    fn test_crlf_and_bom_input() {
        let input = format!("{}{}", BOM, EPISODE.replace('\n', "\r\n"));
        let cues = parse_cues(&input);
        assert_eq!(cues.len(), 5);
        assert_eq!(cues[0].timed().unwrap().header, vec!["1"]);
    }

    #[test]
    fn test_malformed_blocks_become_passthrough() {
        let input = "1\n00:00:01,000 --> 00:00:02,000\n\n\ngarbage line\nmore garbage\n\n2\nno timing here\ntext";
        let cues = parse_cues(input);
        assert!(cues.iter().all(|c| !c.is_translatable()));
    }
}

// ============================================================================
// Pipeline Tests
// ============================================================================

mod pipeline_tests {
    use super::*;

    #[tokio::test]
    async fn test_full_run_translates_every_cue() {
        let (translator, calls) = echo_translator();
        let result = translate_subtitles(EPISODE, &translator, &run_config(2))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(result.cues.len(), 5);
        assert_eq!(result.stats.batches, 2);
        assert_eq!(result.stats.fallback_batches, 0);
        assert!(result.output.contains("\nWHERE WERE YOU LAST NIGHT?\n"));
        assert!(result.output.contains("\nOUT WHERE?\nTELL ME.\n"));
        assert!(result.output.contains("\n\nNOTE translator: keep this\n\n"));
        assert_eq!(result.final_state(), RunState::Done);
    }

    #[tokio::test]
    async fn test_rate_limited_run_falls_back_and_completes() {
        let (translator, calls) = throttled_translator();
        let result = translate_subtitles(EPISODE, &translator, &run_config(2))
            .await
            .unwrap();

        // Two batches, three attempts each
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert_eq!(result.stats.fallback_batches, 2);
        assert!(result
            .batches
            .iter()
            .all(|b| matches!(b.status, BatchStatus::Fallback { .. }) && b.attempts == 3));
        assert_eq!(result.output, format!("{}\n", EPISODE));
        assert!(result.states.contains(&RunState::FellBack));
        assert_eq!(result.final_state(), RunState::Done);
    }

    #[tokio::test]
    async fn test_overflow_reported_not_truncated() {
        let input = "1\n00:00:01,000 --> 00:00:02,000\nthis line is far too long for one second on screen\n";
        let (translator, _) = echo_translator();
        let result = translate_subtitles(input, &translator, &run_config(5))
            .await
            .unwrap();

        // Word-based languages get at least 15 characters
        assert_eq!(result.report.overflows.len(), 1);
        let record = &result.report.overflows[0];
        assert_eq!(record.max_chars, 15);
        assert_eq!(record.actual_chars, 50);
        assert_eq!(record.overflow, 35);
        assert!(result
            .output
            .contains("THIS LINE IS FAR TOO LONG FOR ONE SECOND ON SCREEN"));
    }

    #[tokio::test]
    async fn test_blank_line_in_reply_keeps_cue_count() {
        let input = "1\n00:00:01,000 --> 00:00:03,000\nHello friend\n\n2\n00:00:03,000 --> 00:00:05,000\nBye\n";
        let (translator, _) = fixed_translator(r#"{"1": "Hola\n\namigo", "2": "Adios"}"#);
        let result = translate_subtitles(input, &translator, &run_config(5))
            .await
            .unwrap();

        assert_eq!(parse_cues(&result.output).len(), parse_cues(input).len());
        assert!(result.output.contains("\nHola\namigo\n\n2\n"));
    }

    #[tokio::test]
    async fn test_reply_without_item_keys_is_retried_then_falls_back() {
        let input = "1\n00:00:01,000 --> 00:00:03,000\nHello\n\n2\n00:00:03,000 --> 00:00:05,000\nBye\n";
        let (translator, calls) = fixed_translator(r#"{"result": {"[1]": "Hola", "[2]": "Adios"}}"#);
        let result = translate_subtitles(input, &translator, &run_config(5))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.stats.fallback_batches, 1);
        assert_eq!(result.output, format!("{}\n", input));
        assert_eq!(result.final_state(), RunState::Done);
    }

    #[tokio::test]
    async fn test_wrapped_keyed_reply_is_translated() {
        let input = "1\n00:00:01,000 --> 00:00:03,000\nHello\n\n2\n00:00:03,000 --> 00:00:05,000\nBye\n";
        let (translator, calls) =
            fixed_translator(r#"{"translations": {"1": "Hola", "2": "Adios"}}"#);
        let result = translate_subtitles(input, &translator, &run_config(5))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.stats.fallback_batches, 0);
        assert_eq!(result.stats.substituted_items, 0);
        assert!(result.output.contains("\nHola\n\n2\n"));
        assert!(result.output.ends_with("\nAdios\n\n"));
    }

    #[tokio::test]
    async fn test_empty_document() {
        let (translator, calls) = echo_translator();
        let result = translate_subtitles("", &translator, &run_config(5)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(result.cues.is_empty());
        assert_eq!(result.output, "");
        assert_eq!(result.final_state(), RunState::Done);
    }
}

// ============================================================================
// File Tests
// ============================================================================

mod file_tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_translate_file_writes_bom() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("episode.srt");
        let output = dir.path().join("episode_French.srt");
        std::fs::write(&input, format!("{}{}", BOM, EPISODE.replace('\n', "\r\n"))).unwrap();

        let (translator, _) = echo_translator();
        let result = assert_ok!(translate_file(&input, &output, &translator, &run_config(10)).await);

        let bytes = std::fs::read(&output).unwrap();
        assert!(bytes.starts_with(&[0xEF, 0xBB, 0xBF]));
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        assert!(text.starts_with("1\n00:00:01,000 --> 00:00:04,000\nWHERE WERE YOU LAST NIGHT?\n\n"));
        assert!(!text.contains('\r'));
        assert_eq!(result.output_path.as_deref(), Some(output.as_path()));
        assert!(result.report.source_file.is_some());
    }

    #[tokio::test]
    async fn test_translate_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let (translator, _) = echo_translator();
        let err = assert_err!(
            translate_file(
                &dir.path().join("missing.srt"),
                &dir.path().join("out.srt"),
                &translator,
                &run_config(10),
            )
            .await
        );
        assert!(matches!(err, SubtransError::FileNotFound(_)));
    }
}

// ============================================================================
// Config Tests
// ============================================================================

mod config_tests {
    use super::*;

    #[test]
    fn test_retry_policy_from_config() {
        let mut config = Config::default();
        config.max_attempts = 5;
        config.rate_limit_backoff_ms = 10;
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.rate_limit_delay.as_millis(), 10);
    }
}
