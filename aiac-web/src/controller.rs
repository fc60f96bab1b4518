//! Client UI Controller
//!
//! All client state lives in one [`UiState`] value that the view-transition
//! handlers take explicitly. Three views are mutually exclusive:
//!
//! ```text
//!            inspection_succeeded          start_compile
//!   Upload ----------------------> ProjectInfo ------------> Compiling
//!     ^                                 ^                        |
//!     |            reset                |    retry (after        |
//!     +---------------------------------+---- failure) ----------+
//! ```
//!
//! A successful compile stays in Compiling with a download overlay. The
//! browser script (`ui/app.js`) follows the same machine; the `build`
//! command drives this one through a [`CompileBackend`].

use aiac_common::{CompileOptions, ProjectMetadata};
use async_trait::async_trait;
use thiserror::Error;

use crate::error::{ApiError, ApiResult, ValidationError};
use crate::inspector;
use crate::simulator::{
    self, completion_stage, pacing_stages, Clock, CompileSimulator, CompiledPackage, InstantClock,
    ProgressUpdate,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Upload,
    ProjectInfo,
    Compiling,
}

/// Values chosen in the compile form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileForm {
    pub target: String,
    pub optimize: bool,
}

impl Default for CompileForm {
    fn default() -> Self {
        Self {
            target: aiac_common::project::DEFAULT_TARGET.to_string(),
            optimize: false,
        }
    }
}

/// Outcome shown inside the Compiling view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileStatus {
    Running,
    Succeeded(CompiledPackage),
    Failed(String),
}

/// The "missing components" warning panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarningPanel {
    pub title: String,
    pub entries: Vec<String>,
    pub hint: String,
}

impl WarningPanel {
    /// Plain-text rendering, one entry per line
    pub fn render(&self) -> String {
        let mut text = format!("{}\n", self.title);
        for entry in &self.entries {
            text.push_str(&format!("  - {}\n", entry));
        }
        text.push_str(&self.hint);
        text
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot {action} from the {view:?} view")]
    InvalidTransition { action: &'static str, view: View },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Everything the client knows between user actions
#[derive(Debug, Clone)]
pub struct UiState {
    view: View,
    project: Option<ProjectMetadata>,
    project_file_name: Option<String>,
    form: CompileForm,
    progress: Option<ProgressUpdate>,
    compile_status: Option<CompileStatus>,
    notice: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

impl UiState {
    pub fn new() -> Self {
        Self {
            view: View::Upload,
            project: None,
            project_file_name: None,
            form: CompileForm::default(),
            progress: None,
            compile_status: None,
            notice: None,
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn project(&self) -> Option<&ProjectMetadata> {
        self.project.as_ref()
    }

    pub fn project_file_name(&self) -> Option<&str> {
        self.project_file_name.as_deref()
    }

    pub fn form(&self) -> &CompileForm {
        &self.form
    }

    pub fn progress(&self) -> Option<&ProgressUpdate> {
        self.progress.as_ref()
    }

    pub fn compile_status(&self) -> Option<&CompileStatus> {
        self.compile_status.as_ref()
    }

    /// Latest alert-style message, if any
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    fn require(&self, view: View, action: &'static str) -> Result<(), TransitionError> {
        if self.view == view {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition {
                action,
                view: self.view,
            })
        }
    }

    /// Client-side check of the chosen file, before any request
    pub fn select_file(&mut self, name: &str) -> Result<(), TransitionError> {
        self.require(View::Upload, "select a file")?;
        if !inspector::has_archive_extension(name) {
            self.project_file_name = None;
            self.notice = Some(ValidationError::InvalidSelection.to_string());
            return Err(ValidationError::InvalidSelection.into());
        }
        self.project_file_name = Some(name.to_string());
        self.notice = None;
        Ok(())
    }

    pub fn inspection_succeeded(&mut self, metadata: ProjectMetadata) -> Result<(), TransitionError> {
        self.require(View::Upload, "show project info")?;
        self.project_file_name = Some(metadata.filename.clone());
        self.project = Some(metadata);
        self.notice = None;
        self.view = View::ProjectInfo;
        Ok(())
    }

    pub fn inspection_failed(&mut self, message: impl Into<String>) -> Result<(), TransitionError> {
        self.require(View::Upload, "report an upload error")?;
        self.notice = Some(message.into());
        Ok(())
    }

    pub fn set_form(&mut self, target: &str, optimize: bool) -> Result<(), TransitionError> {
        self.require(View::ProjectInfo, "change compile options")?;
        self.form = CompileForm {
            target: target.to_string(),
            optimize,
        };
        Ok(())
    }

    /// Enter Compiling and return the request to send
    pub fn start_compile(&mut self) -> Result<CompileOptions, TransitionError> {
        self.require(View::ProjectInfo, "start a compile")?;
        let project = self.project.as_ref().ok_or(TransitionError::InvalidTransition {
            action: "start a compile",
            view: self.view,
        })?;

        let options = CompileOptions::from_metadata(project, &self.form.target, self.form.optimize);
        self.view = View::Compiling;
        self.progress = None;
        self.compile_status = Some(CompileStatus::Running);
        self.notice = None;
        Ok(options)
    }

    pub fn record_progress(&mut self, update: ProgressUpdate) -> Result<(), TransitionError> {
        self.require(View::Compiling, "record progress")?;
        self.progress = Some(update);
        Ok(())
    }

    pub fn compile_succeeded(&mut self, package: CompiledPackage) -> Result<(), TransitionError> {
        self.require(View::Compiling, "finish a compile")?;
        self.compile_status = Some(CompileStatus::Succeeded(package));
        Ok(())
    }

    pub fn compile_failed(&mut self, message: impl Into<String>) -> Result<(), TransitionError> {
        self.require(View::Compiling, "fail a compile")?;
        let message = message.into();
        self.notice = Some(message.clone());
        self.compile_status = Some(CompileStatus::Failed(message));
        Ok(())
    }

    /// Back to ProjectInfo after a failed compile
    pub fn retry(&mut self) -> Result<(), TransitionError> {
        self.require(View::Compiling, "retry")?;
        if !matches!(self.compile_status, Some(CompileStatus::Failed(_))) {
            return Err(TransitionError::InvalidTransition {
                action: "retry",
                view: self.view,
            });
        }
        self.view = View::ProjectInfo;
        self.progress = None;
        self.compile_status = None;
        self.notice = None;
        Ok(())
    }

    /// Start over with a new upload
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Download offered by the success overlay
    pub fn download(&self) -> Option<&CompiledPackage> {
        match &self.compile_status {
            Some(CompileStatus::Succeeded(package)) if self.view == View::Compiling => Some(package),
            _ => None,
        }
    }

    /// Warning panel derived from the current project
    ///
    /// Recomputed on every call; absent when nothing is missing.
    pub fn missing_components_panel(&self) -> Option<WarningPanel> {
        let project = self.project.as_ref()?;
        if !project.has_missing_components() {
            return None;
        }
        Some(WarningPanel {
            title: format!(
                "Missing components detected ({})",
                project.missing_components.len()
            ),
            entries: project
                .missing_components
                .iter()
                .map(ToString::to_string)
                .collect(),
            hint: "These components are used in blocks but not added to the screen. \
                   Consider adding them in MIT App Inventor before building."
                .to_string(),
        })
    }
}

/// Where the controller sends its requests
#[async_trait]
pub trait CompileBackend: Send + Sync {
    async fn inspect(&self, bytes: Vec<u8>, filename: &str) -> ApiResult<ProjectMetadata>;

    async fn compile(&self, options: CompileOptions) -> ApiResult<CompiledPackage>;
}

/// In-process backend: the inspector and simulator without HTTP
#[derive(Debug, Default)]
pub struct LocalBackend;

#[async_trait]
impl CompileBackend for LocalBackend {
    async fn inspect(&self, bytes: Vec<u8>, filename: &str) -> ApiResult<ProjectMetadata> {
        if bytes.is_empty() {
            return Err(ValidationError::EmptyFile.into());
        }
        inspector::inspect_archive_blocking(bytes, inspector::sanitize_filename(filename)).await
    }

    async fn compile(&self, options: CompileOptions) -> ApiResult<CompiledPackage> {
        // The controller has already paced the stages.
        let clock = InstantClock;
        CompileSimulator::new(&clock)
            .run(&options, |_| {})
            .await
            .map_err(ApiError::from)
    }
}

/// Validate the selection, inspect it, and move to ProjectInfo
///
/// Inspection errors are kept as the state's notice; only transition and
/// selection errors are returned.
pub async fn upload(
    state: &mut UiState,
    backend: &dyn CompileBackend,
    filename: &str,
    bytes: Vec<u8>,
) -> Result<(), TransitionError> {
    state.select_file(filename)?;
    match backend.inspect(bytes, filename).await {
        Ok(metadata) => state.inspection_succeeded(metadata),
        Err(e) => state.inspection_failed(e.to_string()),
    }
}

/// Play the progress schedule, then send the compile request
///
/// The request is issued only after the last pacing delay. The completion
/// stage is reported once the package has arrived.
pub async fn drive_compile<F>(
    state: &mut UiState,
    backend: &dyn CompileBackend,
    clock: &dyn Clock,
    mut on_progress: F,
) -> Result<(), TransitionError>
where
    F: FnMut(&ProgressUpdate) + Send,
{
    let options = state.start_compile()?;

    // View is Compiling for the whole schedule.
    simulator::run_schedule(clock, pacing_stages(), |update| {
        on_progress(&update);
        state.progress = Some(update);
    })
    .await;

    match backend.compile(options).await {
        Ok(package) => {
            let completion = completion_stage().update();
            on_progress(&completion);
            state.record_progress(completion)?;
            state.compile_succeeded(package)
        }
        Err(e) => state.compile_failed(e.to_string()),
    }
}
