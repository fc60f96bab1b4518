//! Compile Simulator
//!
//! There is no build chain behind this. A compile is a fixed table of
//! `(delay, percent, message)` stages played through an injected [`Clock`],
//! followed by writing a placeholder package. The same table paces the
//! browser's progress bar (served at `GET /api/compile/stages`).

pub mod clock;
pub mod package;

use std::time::Duration;

use aiac_common::CompileOptions;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::CompileError;
pub use clock::{Clock, InstantClock, PacedClock, RecordingClock, TokioClock};
pub use package::{build_package, CompiledPackage, TargetPlatform, APK_MIME_TYPE};

/// Message shown when a compile finishes
pub const COMPLETION_MESSAGE: &str = "Compilation completed successfully!";

/// One step of the simulated pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stage {
    pub delay_ms: u64,
    pub percent: u8,
    pub message: &'static str,
}

impl Stage {
    pub fn delay(&self) -> Duration {
        aiac_common::time::millis_to_duration(self.delay_ms)
    }

    pub fn update(&self) -> ProgressUpdate {
        ProgressUpdate {
            percent: self.percent,
            message: self.message.to_string(),
        }
    }
}

/// The full schedule; the last entry is the completion stage
pub const STAGES: &[Stage] = &[
    Stage { delay_ms: 500, percent: 10, message: "Extracting project files..." },
    Stage { delay_ms: 800, percent: 25, message: "Analyzing screens and components..." },
    Stage { delay_ms: 700, percent: 40, message: "Processing blocks..." },
    Stage { delay_ms: 900, percent: 60, message: "Generating resources..." },
    Stage { delay_ms: 800, percent: 75, message: "Packaging application..." },
    Stage { delay_ms: 600, percent: 90, message: "Finalizing package..." },
    Stage { delay_ms: 400, percent: 100, message: COMPLETION_MESSAGE },
];

/// Stages played before the result is available
pub fn pacing_stages() -> &'static [Stage] {
    &STAGES[..STAGES.len() - 1]
}

/// Stage reported once the package exists
pub fn completion_stage() -> &'static Stage {
    &STAGES[STAGES.len() - 1]
}

/// A progress notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressUpdate {
    pub percent: u8,
    pub message: String,
}

/// Play `stages` in order: wait each delay, then emit its update
pub async fn run_schedule<F>(clock: &dyn Clock, stages: &[Stage], mut emit: F)
where
    F: FnMut(ProgressUpdate) + Send,
{
    for stage in stages {
        clock.sleep(stage.delay()).await;
        debug!(percent = stage.percent, message = stage.message, "Compile stage");
        emit(stage.update());
    }
}

/// Check the options a compile needs
pub fn validate_options(options: &CompileOptions) -> Result<TargetPlatform, CompileError> {
    if options.project_name.trim().is_empty() {
        return Err(CompileError::MissingProjectName);
    }
    if options.filename.trim().is_empty() {
        return Err(CompileError::MissingFilename);
    }
    TargetPlatform::parse(&options.target)
}

/// Drives one simulated compile
pub struct CompileSimulator<'a> {
    clock: &'a dyn Clock,
}

impl<'a> CompileSimulator<'a> {
    pub fn new(clock: &'a dyn Clock) -> Self {
        Self { clock }
    }

    /// Validate, play the schedule, and produce the package
    ///
    /// Invalid options fail before any stage is played.
    pub async fn run<F>(
        &self,
        options: &CompileOptions,
        mut on_progress: F,
    ) -> Result<CompiledPackage, CompileError>
    where
        F: FnMut(ProgressUpdate) + Send,
    {
        let target = validate_options(options)?;
        info!(
            project = %options.project_name,
            target = target.release,
            optimize = options.optimize,
            "Starting simulated compile"
        );

        run_schedule(self.clock, pacing_stages(), &mut on_progress).await;

        let completion = completion_stage();
        self.clock.sleep(completion.delay()).await;
        let package = build_package(options, target, &aiac_common::time::local_stamp())?;
        on_progress(completion.update());

        info!(
            project = %options.project_name,
            bytes = package.bytes.len(),
            "Simulated compile finished"
        );
        Ok(package)
    }
}
