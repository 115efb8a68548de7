use crate::error::{Result, SubtransError};
use crate::subtitle::{
    annotate_budgets, encode_with_bom, parse_cues, render_cues, Cue, CueBody, QualityReport,
};
use crate::translate::context::DEFAULT_CONTEXT_WINDOW;
use crate::translate::{BatchItem, BatchStatus, RollingContext, TranslationContext, Translator};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Immutable settings for one translation run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Title of the work, used only as prompt context.
    pub title: String,
    /// Free-text target language ("Japanese", "fr", "pt-BR").
    pub target_language: String,
    /// Translatable cues per request.
    pub batch_size: usize,
    /// Optional static style guide, sent unchanged with every batch.
    pub style_guide: Option<String>,
    /// Characters of the previous batch carried into the next request.
    pub context_window: usize,
    /// Show a progress bar.
    pub show_progress: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            target_language: "Japanese".to_string(),
            batch_size: 20,
            style_guide: None,
            context_window: DEFAULT_CONTEXT_WINDOW,
            show_progress: true,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(SubtransError::Config(
                "Batch size must be greater than 0".to_string(),
            ));
        }
        if self.target_language.trim().is_empty() {
            return Err(SubtransError::Config(
                "Target language must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Phases of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Parsed,
    Batched,
    Translating,
    Succeeded,
    FellBack,
    ContextUpdated,
    Reassembled,
    Done,
}

impl RunState {
    pub fn can_advance_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Init, Parsed)
                | (Parsed, Batched)
                | (Parsed, Reassembled)
                | (Batched, Translating)
                | (Translating, Succeeded)
                | (Translating, FellBack)
                | (Succeeded, ContextUpdated)
                | (FellBack, ContextUpdated)
                | (ContextUpdated, Batched)
                | (ContextUpdated, Reassembled)
                | (Reassembled, Done)
        )
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunState::Init => "INIT",
            RunState::Parsed => "PARSED",
            RunState::Batched => "BATCHED",
            RunState::Translating => "TRANSLATING",
            RunState::Succeeded => "SUCCESS",
            RunState::FellBack => "FALLBACK",
            RunState::ContextUpdated => "CONTEXT_UPDATED",
            RunState::Reassembled => "REASSEMBLED",
            RunState::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// Records the path a run takes through [`RunState`].
#[derive(Debug)]
struct RunTracker {
    state: RunState,
    history: Vec<RunState>,
}

impl RunTracker {
    fn new() -> Self {
        Self {
            state: RunState::Init,
            history: vec![RunState::Init],
        }
    }

    fn advance(&mut self, next: RunState) -> Result<()> {
        if !self.state.can_advance_to(next) {
            return Err(SubtransError::Transition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        debug!("Run state {} -> {}", self.state, next);
        self.state = next;
        self.history.push(next);
        Ok(())
    }
}

/// What happened to one batch.
#[derive(Debug, Clone)]
pub struct BatchRecord {
    /// 1-based batch number.
    pub number: usize,
    /// Positions of the batch's cues in the document.
    pub cue_positions: Vec<usize>,
    pub status: BatchStatus,
    pub attempts: u32,
    pub substituted: usize,
}

/// Statistics from a translation run.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub total_cues: usize,
    pub translatable_cues: usize,
    pub passthrough_cues: usize,
    pub batches: usize,
    pub fallback_batches: usize,
    /// Items replaced by their source because the reply left them out.
    pub substituted_items: usize,
    pub overflow_cues: usize,
    pub total_time: Duration,
    pub translator: String,
}

/// Result of a translation run.
#[derive(Debug)]
pub struct RunResult {
    /// Rendered subtitle text, without BOM.
    pub output: String,
    pub cues: Vec<Cue>,
    pub report: QualityReport,
    pub batches: Vec<BatchRecord>,
    pub stats: PipelineStats,
    /// Every state the run passed through, `Init` first and `Done` last.
    pub states: Vec<RunState>,
    /// Where the output was written, for file runs.
    pub output_path: Option<PathBuf>,
}

impl RunResult {
    pub fn final_state(&self) -> RunState {
        self.states.last().copied().unwrap_or(RunState::Init)
    }
}

/// Translate a subtitle document held in memory.
///
/// Errors come only from an invalid [`RunConfig`]. Remote failures degrade to
/// source text per batch, and the run always reaches [`RunState::Done`] with
/// the same number of cues, in the same order, as the input.
pub async fn translate_subtitles(
    input: &str,
    translator: &dyn Translator,
    run: &RunConfig,
) -> Result<RunResult> {
    run.validate()?;
    let start_time = Instant::now();
    let mut tracker = RunTracker::new();

    // ═══════════════════════════════════════════════════════════════════════
    // Parse and budget
    // ═══════════════════════════════════════════════════════════════════════
    let mut cues = parse_cues(input);
    annotate_budgets(&mut cues, &run.target_language);
    tracker.advance(RunState::Parsed)?;

    let translatable: Vec<usize> = cues
        .iter()
        .enumerate()
        .filter(|(_, cue)| cue.is_translatable())
        .map(|(position, _)| position)
        .collect();
    let batch_count = translatable.len().div_ceil(run.batch_size);

    info!(
        "Translating {} of {} cues to {} in {} batch(es) of up to {} using {}",
        translatable.len(),
        cues.len(),
        run.target_language,
        batch_count,
        run.batch_size,
        translator.name()
    );

    let progress_bar = if run.show_progress && batch_count > 0 {
        let pb = ProgressBar::new(batch_count as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    // ═══════════════════════════════════════════════════════════════════════
    // Batch loop
    // ═══════════════════════════════════════════════════════════════════════
    let mut context = RollingContext::new(run.context_window);
    let mut batches = Vec::with_capacity(batch_count);

    for (i, positions) in translatable.chunks(run.batch_size).enumerate() {
        let number = i + 1;
        let items: Vec<BatchItem> = positions
            .iter()
            .filter_map(|&p| cues[p].timed())
            .map(|t| BatchItem::new(t.source_text.clone(), t.max_chars))
            .collect();
        tracker.advance(RunState::Batched)?;

        let request_context = TranslationContext {
            title: &run.title,
            target_language: &run.target_language,
            style_guide: run.style_guide.as_deref(),
            rolling_context: context.as_deref(),
        };

        tracker.advance(RunState::Translating)?;
        let batch_start = Instant::now();
        let outcome = translator.translate(&items, &request_context).await;

        // A misbehaving translator must not shift or drop cues.
        let (texts, status, substituted) = if outcome.texts.len() == items.len() {
            (outcome.texts, outcome.status, outcome.substituted)
        } else {
            let reason = format!(
                "translator returned {} texts for {} items",
                outcome.texts.len(),
                items.len()
            );
            (
                items.iter().map(|item| item.text.clone()).collect::<Vec<_>>(),
                BatchStatus::Fallback { reason },
                0,
            )
        };

        match &status {
            BatchStatus::Translated => {
                tracker.advance(RunState::Succeeded)?;
                debug!(
                    "Batch {}/{} done in {}ms ({} attempt(s))",
                    number,
                    batch_count,
                    batch_start.elapsed().as_millis(),
                    outcome.attempts
                );
            }
            BatchStatus::Fallback { reason } => {
                tracker.advance(RunState::FellBack)?;
                warn!(
                    "Batch {}/{} kept source text: {}",
                    number, batch_count, reason
                );
            }
        }

        for (&position, text) in positions.iter().zip(texts.iter()) {
            if let Some(timed) = cues[position].timed_mut() {
                timed.translated_text = Some(text.clone());
            }
        }

        context.update(&texts);
        tracker.advance(RunState::ContextUpdated)?;

        batches.push(BatchRecord {
            number,
            cue_positions: positions.to_vec(),
            status,
            attempts: outcome.attempts,
            substituted,
        });

        if let Some(ref pb) = progress_bar {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress_bar {
        pb.finish_with_message("Translation complete");
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Reassemble and report
    // ═══════════════════════════════════════════════════════════════════════
    let output = render_cues(&cues);
    let report = QualityReport::from_cues(&cues).with_target_language(run.target_language.clone());
    tracker.advance(RunState::Reassembled)?;

    if !report.is_clean() {
        info!(
            "{} cue(s) exceed their reading-speed budget",
            report.overflows.len()
        );
    }

    let stats = PipelineStats {
        total_cues: cues.len(),
        translatable_cues: translatable.len(),
        passthrough_cues: cues
            .iter()
            .filter(|c| matches!(c.body, CueBody::Passthrough))
            .count(),
        batches: batches.len(),
        fallback_batches: batches
            .iter()
            .filter(|b| matches!(b.status, BatchStatus::Fallback { .. }))
            .count(),
        substituted_items: batches.iter().map(|b| b.substituted).sum(),
        overflow_cues: report.overflows.len(),
        total_time: start_time.elapsed(),
        translator: translator.name().to_string(),
    };

    tracker.advance(RunState::Done)?;
    info!(
        "Run complete: {} batch(es), {} fell back, {:.2}s",
        stats.batches,
        stats.fallback_batches,
        stats.total_time.as_secs_f64()
    );

    Ok(RunResult {
        output,
        cues,
        report,
        batches,
        stats,
        states: tracker.history,
        output_path: None,
    })
}

/// Translate a subtitle file and write the result, BOM included.
pub async fn translate_file(
    input: &Path,
    output: &Path,
    translator: &dyn Translator,
    run: &RunConfig,
) -> Result<RunResult> {
    if !input.exists() {
        return Err(SubtransError::FileNotFound(input.display().to_string()));
    }

    let bytes = fs::read(input)?;
    let text = String::from_utf8_lossy(&bytes);

    let mut result = translate_subtitles(&text, translator, run).await?;
    result.report = result
        .report
        .with_source_file(input.display().to_string());

    fs::write(output, encode_with_bom(&result.output))?;
    info!("Wrote {} cues to {:?}", result.stats.total_cues, output);

    result.output_path = Some(output.to_path_buf());
    Ok(result)
}

/// Print a summary of the run results.
pub fn print_summary(result: &RunResult) {
    let stats = &result.stats;
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                     Subtitle Translation Complete             ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    if let Some(ref path) = result.output_path {
        println!("  Output:       {}", path.display());
    }
    println!("  Translator:   {}", stats.translator);
    println!(
        "  Cues:         {} ({} translated, {} passthrough)",
        stats.total_cues, stats.translatable_cues, stats.passthrough_cues
    );
    println!(
        "  Batches:      {} ({} kept source text)",
        stats.batches, stats.fallback_batches
    );
    if stats.substituted_items > 0 {
        println!("  Missing:      {} line(s) kept source text", stats.substituted_items);
    }
    println!("  Time:         {:.2}s", stats.total_time.as_secs_f64());

    if !result.report.overflows.is_empty() {
        println!();
        println!("  Over budget:  {} cue(s)", stats.overflow_cues);
        for record in &result.report.overflows {
            println!(
                "    #{:<6} {:>3}/{:<3} (+{}) {}",
                record.index,
                record.actual_chars,
                record.max_chars,
                record.overflow,
                record.text.replace('\n', " / ")
            );
        }
    }
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}
