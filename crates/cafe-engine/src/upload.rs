//! Upload/analysis widget state machine.
//!
//! Phases run `Empty → FileSelected → Submitting → (Succeeded | error)`
//! and back. The selected file and its preview handle live in one
//! [`Selection`], so "file without preview" cannot be represented, and
//! replacing or clearing the selection drops (and so revokes) the handle.

use crate::analysis::AnalysisResult;
use crate::config::UploadMode;
use crate::conversation::RequestId;
use crate::error::{TransportError, ValidationError};
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Shown when a failure carries no message of its own.
pub const GENERIC_UPLOAD_ERROR: &str = "Something went wrong while uploading the image";

/// An image picked by the user.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// File name without directories.
    pub name: String,
    /// MIME essence, e.g. `image/png`.
    pub mime: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl SelectedFile {
    /// Create a file from raw parts.
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let name = path
            .file_name()
            .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().to_string());
        Ok(Self { name, mime, bytes })
    }

    /// Whether the MIME type is `image/*`.
    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

/// Issues preview handles and counts the live ones.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    live: Arc<AtomicUsize>,
    next_id: Arc<AtomicU64>,
}

impl PreviewRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a preview handle for a file.
    pub fn issue(&self, file: &SelectedFile) -> PreviewHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.live.fetch_add(1, Ordering::SeqCst);
        PreviewHandle {
            url: format!("preview://{id}/{}", file.name),
            live: Arc::clone(&self.live),
        }
    }

    /// Number of handles not yet revoked.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// A revocable view of the selected file. Dropping it revokes it.
#[derive(Debug)]
pub struct PreviewHandle {
    url: String,
    live: Arc<AtomicUsize>,
}

impl PreviewHandle {
    /// Opaque URL identifying the preview.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The file together with its preview.
#[derive(Debug)]
pub struct Selection {
    /// The picked image.
    pub file: SelectedFile,
    /// Preview of `file`, revoked when the selection is dropped.
    pub preview: PreviewHandle,
}

/// Derived phase of the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    /// Nothing selected.
    Empty,
    /// A file is selected and ready to submit.
    FileSelected,
    /// An upload is in flight.
    Submitting,
    /// The last upload succeeded; the form resets shortly.
    Succeeded,
}

/// Work the caller must perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadCommand {
    /// Upload `file` to the analysis endpoint.
    Analyze {
        /// Id to pass back to [`UploadWidget::resolve`].
        request_id: RequestId,
        /// Copy of the selected file.
        file: SelectedFile,
    },
    /// Wait `delay`, then resolve successfully without a result.
    Simulate {
        /// Id to pass back to [`UploadWidget::resolve`].
        request_id: RequestId,
        /// How long the fake upload takes.
        delay: Duration,
    },
    /// Call [`UploadWidget::reset_elapsed`] with `generation` after `after`.
    ScheduleReset {
        /// Selection generation the success belongs to.
        generation: u64,
        /// Delay before the reset fires.
        after: Duration,
    },
}

/// Construction-time settings, usually from [`crate::Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSettings {
    /// Real upload or simulated one.
    pub mode: UploadMode,
    /// Duration of a simulated upload.
    pub simulated_delay: Duration,
    /// How long the success state stays before the form resets.
    pub reset_after: Duration,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            mode: UploadMode::Remote,
            simulated_delay: Duration::from_secs(2),
            reset_after: Duration::from_secs(3),
        }
    }
}

/// The upload widget.
#[derive(Debug)]
pub struct UploadWidget {
    selection: Option<Selection>,
    dragging: bool,
    submitting: bool,
    success: bool,
    error: Option<String>,
    result: Option<AnalysisResult>,
    next_request: RequestId,
    latest: Option<RequestId>,
    generation: u64,
    submitted_generation: u64,
    registry: PreviewRegistry,
    settings: UploadSettings,
}

impl UploadWidget {
    /// Create an empty widget.
    pub fn new(settings: UploadSettings, registry: PreviewRegistry) -> Self {
        Self {
            selection: None,
            dragging: false,
            submitting: false,
            success: false,
            error: None,
            result: None,
            next_request: 1,
            latest: None,
            generation: 0,
            submitted_generation: 0,
            registry,
            settings,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> UploadPhase {
        if self.submitting {
            UploadPhase::Submitting
        } else if self.success {
            UploadPhase::Succeeded
        } else if self.selection.is_some() {
            UploadPhase::FileSelected
        } else {
            UploadPhase::Empty
        }
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.selection.as_ref().map(|s| &s.file)
    }

    pub fn preview_url(&self) -> Option<&str> {
        self.selection.as_ref().map(|s| s.preview.url())
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn mode(&self) -> UploadMode {
        self.settings.mode
    }

    /// Select a file, replacing any previous one.
    ///
    /// Non-image files are rejected with a visible error and leave the
    /// current selection untouched.
    pub fn select_file(&mut self, file: SelectedFile) -> Result<(), ValidationError> {
        if !file.is_image() {
            let err = ValidationError::NotAnImage {
                mime: file.mime.clone(),
            };
            warn!(name = %file.name, mime = %file.mime, "rejected non-image file");
            self.error = Some(err.to_string());
            return Err(err);
        }

        // Revoke the old preview before issuing the new one.
        self.selection = None;
        let preview = self.registry.issue(&file);
        debug!(name = %file.name, url = preview.url(), "file selected");
        self.selection = Some(Selection { file, preview });
        self.error = None;
        self.success = false;
        self.generation += 1;
        Ok(())
    }

    /// Pointer entered the drop target with a payload.
    pub fn drag_enter(&mut self) {
        self.dragging = true;
    }

    /// Pointer is moving over the drop target.
    pub fn drag_over(&mut self) {
        self.dragging = true;
    }

    /// Pointer left the drop target.
    pub fn drag_leave(&mut self) {
        self.dragging = false;
    }

    /// Payload dropped: the first file, if any, is selected.
    pub fn drop_files(
        &mut self,
        files: impl IntoIterator<Item = SelectedFile>,
    ) -> Result<(), ValidationError> {
        self.dragging = false;
        match files.into_iter().next() {
            Some(file) => self.select_file(file),
            None => Ok(()),
        }
    }

    /// Discard the selected file and revoke its preview.
    ///
    /// Also ends a success display early.
    pub fn clear(&mut self) -> bool {
        if self.selection.take().is_none() {
            return false;
        }
        self.success = false;
        self.generation += 1;
        true
    }

    /// Submit the selected file.
    pub fn submit(&mut self) -> Result<UploadCommand, ValidationError> {
        if self.submitting {
            return Err(ValidationError::Busy);
        }
        let Some(selection) = &self.selection else {
            let err = ValidationError::NoFileSelected;
            self.error = Some(err.to_string());
            return Err(err);
        };

        let request_id = self.next_request;
        self.next_request += 1;
        self.latest = Some(request_id);
        self.submitted_generation = self.generation;

        let command = match self.settings.mode {
            UploadMode::Remote => UploadCommand::Analyze {
                request_id,
                file: selection.file.clone(),
            },
            UploadMode::Simulated => UploadCommand::Simulate {
                request_id,
                delay: self.settings.simulated_delay,
            },
        };

        self.submitting = true;
        self.success = false;
        self.error = None;
        self.result = None;
        debug!(request_id, mode = ?self.settings.mode, "upload submitted");
        Ok(command)
    }

    /// Apply the outcome of a submission.
    ///
    /// On success returns the reset to schedule. If the selection changed
    /// while uploading, the result is kept but the new file is not marked
    /// as succeeded and no reset is scheduled.
    pub fn resolve(
        &mut self,
        request_id: RequestId,
        outcome: Result<Option<AnalysisResult>, TransportError>,
    ) -> Option<UploadCommand> {
        if self.latest != Some(request_id) {
            debug!(request_id, latest = ?self.latest, "dropping stale upload response");
            return None;
        }
        self.latest = None;
        self.submitting = false;

        match outcome {
            Ok(result) => {
                self.result = result;
                if self.submitted_generation != self.generation {
                    debug!(request_id, "selection changed during upload; skipping reset");
                    return None;
                }
                self.success = true;
                Some(UploadCommand::ScheduleReset {
                    generation: self.submitted_generation,
                    after: self.settings.reset_after,
                })
            }
            Err(err) => {
                warn!(request_id, error = %err, "analysis failed");
                let message = err.to_string();
                self.error = Some(if message.trim().is_empty() {
                    GENERIC_UPLOAD_ERROR.to_string()
                } else {
                    message
                });
                None
            }
        }
    }

    /// The success display timed out: clear file, preview and success flag.
    ///
    /// Ignored when the selection changed after the reset was scheduled.
    pub fn reset_elapsed(&mut self, generation: u64) -> bool {
        if generation != self.generation || !self.success {
            return false;
        }
        self.success = false;
        self.selection = None;
        self.generation += 1;
        true
    }
}

impl Default for UploadWidget {
    fn default() -> Self {
        Self::new(UploadSettings::default(), PreviewRegistry::new())
    }
}
