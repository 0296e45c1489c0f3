//! The recipe finder: capture -> upload -> navigate -> describe.
//!
//! One [`RecipeFinder`] runs at most one cycle at a time (`&mut self`). Every
//! transition is published on a watch channel so the shell can render it; the
//! modals and spinner are projections of [`FinderState`] (see
//! [`crate::views::FinderView`]).

use std::future::Future;
use std::sync::Arc;

use plate_core::{CaptureId, ImageHash, UploadOutcome};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::gateway::RecipeBackend;
use crate::media::{Capability, CaptureOutcome, ImageHandle, MediaAcquisition, MediaSource};
use crate::routes::{Navigator, Route};

/// Shown when the description request fails.
pub const DESCRIPTION_FALLBACK: &str = "Failed to load description.";
/// Shown when the backend has no description for the photo.
pub const NO_DESCRIPTION: &str = "No description available.";

/// User-visible failure of one cycle. `Display` is the inline error text.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FinderError {
    /// Permission still missing after one request.
    #[error("{}", .0.denied_message())]
    PermissionDenied(Capability),
    /// Backend business rule; the message is passed through verbatim.
    #[error("{0}")]
    Rejected(String),
    /// No usable upload response; `detail` is for logs, not the user.
    #[error("Could not reach the recipe service. Please try again.")]
    Transport { detail: String },
    #[error("Could not read the selected photo. Please try another one.")]
    Media { detail: String },
}

/// Where the finder is in its cycle. Published on every transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FinderState {
    /// Ready for a capture; no modal open.
    Idle,
    /// Source picker (camera / library) is open.
    ChoosingSource,
    /// Waiting on permissions or the picker.
    Capturing {
        source: MediaSource,
    },
    Uploading {
        capture_id: CaptureId,
    },
    /// Upload accepted and navigation issued; description still loading.
    AwaitingDescription {
        image_hash: ImageHash,
    },
    /// Description modal is showing until dismissed.
    Complete {
        image_hash: ImageHash,
        description: String,
    },
    /// Last cycle failed. Behaves like `Idle` for the next capture.
    Failed {
        error: FinderError,
    },
}

impl FinderError {
    /// Underlying cause kept out of the user-visible text, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            FinderError::Transport { detail } | FinderError::Media { detail } => Some(detail),
            FinderError::PermissionDenied(_) | FinderError::Rejected(_) => None,
        }
    }
}

impl FinderState {
    /// True while a cycle is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            FinderState::Capturing { .. }
                | FinderState::Uploading { .. }
                | FinderState::AwaitingDescription { .. }
        )
    }
}

/// How a cycle ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureReport {
    /// Picker closed without a photo; nothing was uploaded.
    Cancelled,
    Failed(FinderError),
    Completed {
        image_hash: ImageHash,
        description: String,
    },
    /// The shell abandoned the cycle; it stopped without further effects.
    Abandoned,
}

/// Lets the shell abandon an in-flight cycle, e.g. when the user leaves the screen.
#[derive(Clone, Debug)]
pub struct AbandonHandle {
    tx: Arc<watch::Sender<u64>>,
}

impl AbandonHandle {
    pub fn abandon(&self) {
        self.tx.send_modify(|generation| *generation += 1);
    }
}

pub struct RecipeFinder {
    backend: Arc<dyn RecipeBackend>,
    media: MediaAcquisition,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<FinderState>,
    abandon: Arc<watch::Sender<u64>>,
}

/// `None` if the abandon signal fired first.
async fn until_abandoned<F: Future>(abandon: &mut watch::Receiver<u64>, fut: F) -> Option<F::Output> {
    tokio::select! {
        out = fut => Some(out),
        _ = abandon.changed() => None,
    }
}

impl RecipeFinder {
    pub fn new(
        backend: Arc<dyn RecipeBackend>,
        media: MediaAcquisition,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (state, _) = watch::channel(FinderState::Idle);
        let (abandon, _) = watch::channel(0u64);
        Self {
            backend,
            media,
            navigator,
            state,
            abandon: Arc::new(abandon),
        }
    }

    pub fn state(&self) -> FinderState {
        self.state.borrow().clone()
    }

    /// Receiver that sees every transition.
    pub fn subscribe(&self) -> watch::Receiver<FinderState> {
        self.state.subscribe()
    }

    pub fn abandon_handle(&self) -> AbandonHandle {
        AbandonHandle {
            tx: self.abandon.clone(),
        }
    }

    fn transition(&self, next: FinderState) {
        let prev = self.state.send_replace(next);
        debug!("finder {:?} -> {:?}", prev, *self.state.borrow());
    }

    /// Called when the finder screen is entered; `open_modal` comes from the route.
    ///
    /// `&mut self` means no cycle is running here, so a busy state is left
    /// over from a cycle whose future was dropped and is overwritten.
    pub fn enter(&mut self, open_modal: bool) {
        if open_modal {
            self.open_source_picker();
        } else if self.state.borrow().is_busy() {
            self.transition(FinderState::Idle);
        }
    }

    pub fn open_source_picker(&mut self) {
        self.transition(FinderState::ChoosingSource);
    }

    /// Closing the source picker is a cancel: back to `Idle`, no error.
    pub fn close_source_picker(&mut self) {
        if *self.state.borrow() == FinderState::ChoosingSource {
            self.transition(FinderState::Idle);
        }
    }

    /// Close the description modal.
    pub fn dismiss_description(&mut self) {
        if matches!(*self.state.borrow(), FinderState::Complete { .. }) {
            self.transition(FinderState::Idle);
        }
    }

    pub fn clear_error(&mut self) {
        if matches!(*self.state.borrow(), FinderState::Failed { .. }) {
            self.transition(FinderState::Idle);
        }
    }

    /// Run one full cycle starting from the given source.
    pub async fn capture(&mut self, source: MediaSource) -> CaptureReport {
        let mut abandon = self.abandon.subscribe();
        if self.state.borrow().is_busy() {
            warn!("previous cycle was dropped mid-flight; starting over");
        }
        info!("capture requested from {source:?}");
        self.transition(FinderState::Capturing { source });

        let outcome = match until_abandoned(&mut abandon, self.media.request_capture(source)).await {
            None => return self.abandoned(),
            Some(outcome) => outcome,
        };

        match outcome {
            Ok(CaptureOutcome::Acquired(handle)) => self.upload_with(handle, &mut abandon).await,
            Ok(CaptureOutcome::Cancelled) => {
                debug!("capture cancelled");
                self.transition(FinderState::Idle);
                CaptureReport::Cancelled
            }
            Ok(CaptureOutcome::PermissionDenied(capability)) => {
                self.fail(FinderError::PermissionDenied(capability))
            }
            Err(e) => {
                warn!("capture failed: {e}");
                self.fail(FinderError::Media {
                    detail: e.to_string(),
                })
            }
        }
    }

    /// Upload a handle acquired elsewhere and finish the cycle.
    pub async fn submit(&mut self, handle: ImageHandle) -> CaptureReport {
        let mut abandon = self.abandon.subscribe();
        self.upload_with(handle, &mut abandon).await
    }

    async fn upload_with(
        &mut self,
        handle: ImageHandle,
        abandon: &mut watch::Receiver<u64>,
    ) -> CaptureReport {
        let capture_id = CaptureId::new();
        info!("capture {capture_id}: uploading {handle:?}");
        self.transition(FinderState::Uploading {
            capture_id: capture_id.clone(),
        });

        let outcome = match until_abandoned(abandon, self.backend.upload_image(handle)).await {
            None => return self.abandoned(),
            Some(outcome) => outcome,
        };

        let image_hash = match outcome {
            UploadOutcome::Success { image_hash } => image_hash,
            UploadOutcome::Rejected { message } => {
                info!("capture {capture_id}: rejected: {message}");
                return self.fail(FinderError::Rejected(message));
            }
            UploadOutcome::TransportError { detail } => {
                warn!("capture {capture_id}: transport error: {detail}");
                return self.fail(FinderError::Transport { detail });
            }
        };

        info!("capture {capture_id}: accepted as {image_hash}");
        self.transition(FinderState::AwaitingDescription {
            image_hash: image_hash.clone(),
        });
        // Navigation never waits on the description.
        self.navigator.navigate(Route::detail(image_hash.clone()));

        let metadata = match until_abandoned(abandon, self.backend.image_metadata(&image_hash)).await {
            None => return self.abandoned(),
            Some(metadata) => metadata,
        };
        let description = match metadata {
            Ok(meta) => meta
                .description
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            Err(e) => {
                warn!("capture {capture_id}: description fetch failed: {e}");
                DESCRIPTION_FALLBACK.to_string()
            }
        };

        self.transition(FinderState::Complete {
            image_hash: image_hash.clone(),
            description: description.clone(),
        });
        CaptureReport::Completed {
            image_hash,
            description,
        }
    }

    fn fail(&self, error: FinderError) -> CaptureReport {
        self.transition(FinderState::Failed {
            error: error.clone(),
        });
        CaptureReport::Failed(error)
    }

    fn abandoned(&self) -> CaptureReport {
        info!("cycle abandoned");
        self.transition(FinderState::Idle);
        CaptureReport::Abandoned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{InMemoryBackend, RecordingNavigator, ScriptedPermissions, ScriptedPicker};
    use crate::media::{PermissionState, PickedAsset, PickerResult};
    use std::time::Duration;

    struct Harness {
        backend: Arc<InMemoryBackend>,
        permissions: Arc<ScriptedPermissions>,
        picker: Arc<ScriptedPicker>,
        navigator: Arc<RecordingNavigator>,
        finder: RecipeFinder,
    }

    fn photo() -> PickerResult {
        PickerResult::Picked(PickedAsset::File {
            file_name: "dish.jpg".into(),
            content_type: "image/jpeg".into(),
            bytes: vec![0xff, 0xd8, 0xff],
        })
    }

    fn harness(permissions: ScriptedPermissions, picks: Vec<PickerResult>) -> Harness {
        let backend = Arc::new(InMemoryBackend::default());
        let permissions = Arc::new(permissions);
        let picker = Arc::new(ScriptedPicker::new(picks));
        let navigator = Arc::new(RecordingNavigator::new());
        let finder = RecipeFinder::new(
            backend.clone(),
            MediaAcquisition::new(permissions.clone(), picker.clone()),
            navigator.clone(),
        );
        Harness {
            backend,
            permissions,
            picker,
            navigator,
            finder,
        }
    }

    fn hash(s: &str) -> ImageHash {
        ImageHash::from_str(s)
    }

    #[tokio::test]
    async fn accepted_upload_navigates_and_shows_description() {
        let mut h = harness(ScriptedPermissions::granted(), vec![photo()]);
        h.backend.push_upload(UploadOutcome::Success {
            image_hash: hash("abc123"),
        });
        h.backend.set_description(&hash("abc123"), Some("A spicy dish"));

        let report = h.finder.capture(MediaSource::Camera).await;

        assert_eq!(
            report,
            CaptureReport::Completed {
                image_hash: hash("abc123"),
                description: "A spicy dish".into()
            }
        );
        assert_eq!(h.navigator.routes(), vec![Route::detail(hash("abc123"))]);
        assert_eq!(
            h.finder.state(),
            FinderState::Complete {
                image_hash: hash("abc123"),
                description: "A spicy dish".into()
            }
        );
        assert_eq!(h.backend.uploads().len(), 1);
        assert_eq!(h.backend.uploads()[0].file_name, "dish.jpg");

        h.finder.dismiss_description();
        assert_eq!(h.finder.state(), FinderState::Idle);
    }

    #[tokio::test]
    async fn rejection_shows_message_and_never_navigates() {
        let mut h = harness(ScriptedPermissions::granted(), vec![photo()]);
        h.backend.push_upload(UploadOutcome::Rejected {
            message: "No food detected".into(),
        });

        let report = h.finder.capture(MediaSource::Library).await;

        let CaptureReport::Failed(error) = report else {
            panic!("expected failure, got {report:?}");
        };
        assert_eq!(error.to_string(), "No food detected");
        assert!(h.navigator.routes().is_empty());
        assert_eq!(h.backend.metadata_calls(), 0);
        assert!(matches!(h.finder.state(), FinderState::Failed { .. }));
    }

    #[tokio::test]
    async fn transport_error_uses_generic_retry_text() {
        let mut h = harness(ScriptedPermissions::granted(), vec![photo()]);
        h.backend.push_upload(UploadOutcome::TransportError {
            detail: "connection refused".into(),
        });

        let report = h.finder.capture(MediaSource::Camera).await;

        let CaptureReport::Failed(error) = report else {
            panic!("expected failure");
        };
        assert_eq!(
            error.to_string(),
            "Could not reach the recipe service. Please try again."
        );
        assert!(h.navigator.routes().is_empty());
    }

    #[tokio::test]
    async fn failed_description_falls_back_after_navigation() {
        let mut h = harness(ScriptedPermissions::granted(), vec![photo()]);
        h.backend.push_upload(UploadOutcome::Success {
            image_hash: hash("h-1"),
        });
        // no metadata registered for h-1: the fetch fails

        let report = h.finder.capture(MediaSource::Camera).await;

        assert_eq!(
            report,
            CaptureReport::Completed {
                image_hash: hash("h-1"),
                description: DESCRIPTION_FALLBACK.into()
            }
        );
        assert_eq!(h.navigator.last(), Some(Route::detail(hash("h-1"))));
    }

    #[tokio::test]
    async fn empty_description_uses_placeholder() {
        let mut h = harness(ScriptedPermissions::granted(), vec![photo()]);
        h.backend.push_upload(UploadOutcome::Success {
            image_hash: hash("h-2"),
        });
        h.backend.set_description(&hash("h-2"), None);

        let report = h.finder.capture(MediaSource::Camera).await;
        assert_eq!(
            report,
            CaptureReport::Completed {
                image_hash: hash("h-2"),
                description: NO_DESCRIPTION.into()
            }
        );
    }

    #[tokio::test]
    async fn cancel_returns_to_idle_without_upload_or_error() {
        let mut h = harness(ScriptedPermissions::granted(), vec![PickerResult::Cancelled]);
        h.finder.enter(true);
        assert_eq!(h.finder.state(), FinderState::ChoosingSource);

        let report = h.finder.capture(MediaSource::Library).await;

        assert_eq!(report, CaptureReport::Cancelled);
        assert_eq!(h.finder.state(), FinderState::Idle);
        assert!(h.backend.uploads().is_empty());
        assert!(h.navigator.routes().is_empty());
    }

    #[tokio::test]
    async fn closing_the_source_picker_is_a_silent_cancel() {
        let mut h = harness(ScriptedPermissions::granted(), vec![]);
        h.finder.open_source_picker();
        h.finder.close_source_picker();
        assert_eq!(h.finder.state(), FinderState::Idle);
        assert_eq!(h.picker.launch_count(), 0);
    }

    #[tokio::test]
    async fn denied_permission_never_opens_the_picker() {
        let permissions = ScriptedPermissions::new().after_request(
            Capability::Camera,
            PermissionState::Unknown,
            PermissionState::Denied,
        );
        let mut h = harness(permissions, vec![photo()]);

        let report = h.finder.capture(MediaSource::Camera).await;

        assert_eq!(
            report,
            CaptureReport::Failed(FinderError::PermissionDenied(Capability::Camera))
        );
        assert_eq!(h.picker.launch_count(), 0);
        assert_eq!(h.permissions.request_count(Capability::Camera), 1);
        assert!(h.backend.uploads().is_empty());
        assert_eq!(
            h.finder.state(),
            FinderState::Failed {
                error: FinderError::PermissionDenied(Capability::Camera)
            }
        );
    }

    #[tokio::test]
    async fn failed_state_accepts_a_new_capture() {
        let mut h = harness(ScriptedPermissions::granted(), vec![photo(), photo()]);
        h.backend.push_upload(UploadOutcome::Rejected {
            message: "not food".into(),
        });
        h.backend.push_upload(UploadOutcome::Success {
            image_hash: hash("second"),
        });
        h.backend.set_description(&hash("second"), Some("Salad"));

        assert!(matches!(
            h.finder.capture(MediaSource::Camera).await,
            CaptureReport::Failed(_)
        ));
        let report = h.finder.capture(MediaSource::Camera).await;
        assert!(matches!(report, CaptureReport::Completed { .. }));
        assert_eq!(h.navigator.routes(), vec![Route::detail(hash("second"))]);
    }

    #[tokio::test]
    async fn abandoned_upload_leaves_idle_and_never_navigates() {
        let mut h = harness(ScriptedPermissions::granted(), vec![photo()]);
        h.backend.stall_uploads();
        let handle = h.finder.abandon_handle();
        let mut states = h.finder.subscribe();

        let abandon_once_uploading = async move {
            while !matches!(*states.borrow_and_update(), FinderState::Uploading { .. }) {
                if states.changed().await.is_err() {
                    return;
                }
            }
            handle.abandon();
        };

        let (report, _) = tokio::time::timeout(
            Duration::from_secs(5),
            async { tokio::join!(h.finder.capture(MediaSource::Camera), abandon_once_uploading) },
        )
        .await
        .unwrap();

        assert_eq!(report, CaptureReport::Abandoned);
        assert_eq!(h.finder.state(), FinderState::Idle);
        assert!(h.navigator.routes().is_empty());
        assert_eq!(h.backend.uploads().len(), 1);
    }

    #[tokio::test]
    async fn abandoning_during_description_keeps_the_navigation() {
        let mut h = harness(ScriptedPermissions::granted(), vec![photo()]);
        h.backend.push_upload(UploadOutcome::Success {
            image_hash: hash("slow"),
        });
        h.backend.stall_metadata();
        let handle = h.finder.abandon_handle();
        let mut states = h.finder.subscribe();

        let abandon_once_describing = async move {
            while !matches!(
                *states.borrow_and_update(),
                FinderState::AwaitingDescription { .. }
            ) {
                if states.changed().await.is_err() {
                    return;
                }
            }
            handle.abandon();
        };

        let (report, _) = tokio::time::timeout(
            Duration::from_secs(5),
            async { tokio::join!(h.finder.capture(MediaSource::Camera), abandon_once_describing) },
        )
        .await
        .unwrap();

        assert_eq!(report, CaptureReport::Abandoned);
        assert_eq!(h.navigator.routes(), vec![Route::detail(hash("slow"))]);
        assert_eq!(h.finder.state(), FinderState::Idle);
    }

    #[test]
    fn only_transport_and_media_errors_carry_detail() {
        let transport = FinderError::Transport {
            detail: "connection refused".into(),
        };
        assert_eq!(transport.detail(), Some("connection refused"));
        assert_eq!(
            FinderError::Media {
                detail: "no such file".into()
            }
            .detail(),
            Some("no such file")
        );
        assert_eq!(FinderError::Rejected("No food detected".into()).detail(), None);
        assert_eq!(FinderError::PermissionDenied(Capability::Camera).detail(), None);
    }

    #[tokio::test]
    async fn dropped_cycle_does_not_block_the_source_picker() {
        let mut h = harness(ScriptedPermissions::granted(), vec![photo()]);
        h.backend.stall_uploads();

        let dropped =
            tokio::time::timeout(Duration::from_millis(50), h.finder.capture(MediaSource::Camera))
                .await;
        assert!(dropped.is_err());
        assert!(matches!(h.finder.state(), FinderState::Uploading { .. }));

        h.finder.enter(true);
        assert_eq!(h.finder.state(), FinderState::ChoosingSource);
        assert!(h.navigator.routes().is_empty());
    }

    #[tokio::test]
    async fn entering_without_modal_clears_a_dropped_cycle() {
        let mut h = harness(ScriptedPermissions::granted(), vec![photo()]);
        h.backend.stall_uploads();

        let _ = tokio::time::timeout(Duration::from_millis(50), h.finder.capture(MediaSource::Camera))
            .await;

        h.finder.enter(false);
        assert_eq!(h.finder.state(), FinderState::Idle);
        h.finder.open_source_picker();
        assert_eq!(h.finder.state(), FinderState::ChoosingSource);
    }

    #[tokio::test]
    async fn abandon_before_a_cycle_does_not_leak_into_it() {
        let mut h = harness(ScriptedPermissions::granted(), vec![photo()]);
        h.finder.abandon_handle().abandon();
        h.backend.push_upload(UploadOutcome::Success {
            image_hash: hash("fresh"),
        });
        h.backend.set_description(&hash("fresh"), Some("Stew"));

        let report = h.finder.capture(MediaSource::Camera).await;
        assert!(matches!(report, CaptureReport::Completed { .. }));
    }

    #[tokio::test]
    async fn submit_uploads_an_existing_handle() {
        let mut h = harness(ScriptedPermissions::granted(), vec![]);
        h.backend.push_upload(UploadOutcome::Success {
            image_hash: hash("direct"),
        });
        h.backend.set_description(&hash("direct"), Some("Pancakes"));

        let handle = ImageHandle::from_bytes("p.jpg", "image/jpeg", vec![1]).unwrap();
        let report = h.finder.submit(handle).await;

        assert!(matches!(report, CaptureReport::Completed { .. }));
        assert_eq!(h.picker.launch_count(), 0);
        assert_eq!(h.navigator.routes(), vec![Route::detail(hash("direct"))]);
    }
}
