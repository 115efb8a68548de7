pub mod config;
pub mod error;
pub mod pipeline;
pub mod subtitle;
pub mod translate;

pub use config::{Config, Provider};
pub use error::{Result, SubtransError};
pub use pipeline::{
    print_summary, translate_file, translate_subtitles, BatchRecord, PipelineStats, RunConfig,
    RunResult, RunState,
};
