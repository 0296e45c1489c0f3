//! In-memory stand-ins for the platform and the backend.
//!
//! Not durable and not clever; good for unit tests, scenario tests and demos.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use plate_core::{
    ImageHash, ImageMetadata, RecipeDetail, RecipeFilter, RecipeSummary, UploadOutcome,
};

use crate::gateway::{GatewayError, RecipeBackend};
use crate::media::{
    Capability, ImageHandle, ImagePicker, MediaError, MediaSource, PermissionService,
    PermissionState, PickerOptions, PickerResult,
};
use crate::routes::{Navigator, Route};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Permission service with a fixed script per capability.
///
/// Unscripted capabilities start `Unknown` and are denied when requested.
#[derive(Default)]
pub struct ScriptedPermissions {
    inner: Mutex<PermissionsInner>,
}

#[derive(Default)]
struct PermissionsInner {
    /// capability -> (status before a request, status after a request)
    script: HashMap<Capability, (PermissionState, PermissionState)>,
    requests: HashMap<Capability, usize>,
}

impl ScriptedPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every capability already granted.
    pub fn granted() -> Self {
        Self::new()
            .after_request(Capability::Camera, PermissionState::Granted, PermissionState::Granted)
            .after_request(
                Capability::MediaLibrary,
                PermissionState::Granted,
                PermissionState::Granted,
            )
    }

    pub fn after_request(
        self,
        capability: Capability,
        current: PermissionState,
        after: PermissionState,
    ) -> Self {
        lock(&self.inner)
            .script
            .insert(capability, (current, after));
        self
    }

    pub fn request_count(&self, capability: Capability) -> usize {
        lock(&self.inner)
            .requests
            .get(&capability)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl PermissionService for ScriptedPermissions {
    async fn status(&self, capability: Capability) -> Result<PermissionState, MediaError> {
        Ok(lock(&self.inner)
            .script
            .get(&capability)
            .map(|(current, _)| *current)
            .unwrap_or(PermissionState::Unknown))
    }

    async fn request(&self, capability: Capability) -> Result<PermissionState, MediaError> {
        let mut inner = lock(&self.inner);
        *inner.requests.entry(capability).or_default() += 1;
        let after = inner
            .script
            .get(&capability)
            .map(|(_, after)| *after)
            .unwrap_or(PermissionState::Denied);
        // A granted prompt sticks for later status checks.
        if let Some(entry) = inner.script.get_mut(&capability) {
            entry.0 = after;
        }
        Ok(after)
    }
}

/// Picker replaying queued results; cancels once the queue is empty.
#[derive(Default)]
pub struct ScriptedPicker {
    inner: Mutex<PickerInner>,
}

#[derive(Default)]
struct PickerInner {
    results: VecDeque<PickerResult>,
    launches: Vec<MediaSource>,
}

impl ScriptedPicker {
    pub fn new(results: impl IntoIterator<Item = PickerResult>) -> Self {
        Self {
            inner: Mutex::new(PickerInner {
                results: results.into_iter().collect(),
                launches: Vec::new(),
            }),
        }
    }

    pub fn launch_count(&self) -> usize {
        lock(&self.inner).launches.len()
    }

    pub fn launches(&self) -> Vec<MediaSource> {
        lock(&self.inner).launches.clone()
    }
}

#[async_trait]
impl ImagePicker for ScriptedPicker {
    async fn launch(
        &self,
        source: MediaSource,
        _options: &PickerOptions,
    ) -> Result<PickerResult, MediaError> {
        let mut inner = lock(&self.inner);
        inner.launches.push(source);
        Ok(inner.results.pop_front().unwrap_or(PickerResult::Cancelled))
    }
}

/// Navigator that remembers every route it was sent to.
#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> Vec<Route> {
        lock(&self.routes).clone()
    }

    pub fn last(&self) -> Option<Route> {
        lock(&self.routes).last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        lock(&self.routes).push(route);
    }
}

/// Upload seen by [`InMemoryBackend`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedUpload {
    pub file_name: String,
    pub content_type: String,
    pub len: usize,
}

/// Backend held in memory.
///
/// Uploads replay queued outcomes (a transport error once the queue is
/// empty). Metadata is served per hash; a hash without metadata fails.
pub struct InMemoryBackend {
    base_url: String,
    inner: Mutex<BackendInner>,
}

#[derive(Default)]
struct BackendInner {
    recipes: Vec<RecipeDetail>,
    uploads: VecDeque<UploadOutcome>,
    metadata: HashMap<ImageHash, ImageMetadata>,
    recorded: Vec<RecordedUpload>,
    list_calls: Vec<RecipeFilter>,
    metadata_calls: usize,
    stall_uploads: bool,
    stall_metadata: bool,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new("http://backend.test")
    }
}

impl InMemoryBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            inner: Mutex::new(BackendInner::default()),
        }
    }

    pub fn with_recipe(self, recipe: RecipeDetail) -> Self {
        lock(&self.inner).recipes.push(recipe);
        self
    }

    pub fn push_upload(&self, outcome: UploadOutcome) {
        lock(&self.inner).uploads.push_back(outcome);
    }

    pub fn set_description(&self, image_hash: &ImageHash, description: Option<&str>) {
        lock(&self.inner).metadata.insert(
            image_hash.clone(),
            ImageMetadata {
                description: description.map(String::from),
            },
        );
    }

    /// Uploads never complete until abandoned.
    pub fn stall_uploads(&self) {
        lock(&self.inner).stall_uploads = true;
    }

    /// Metadata requests never complete until abandoned.
    pub fn stall_metadata(&self) {
        lock(&self.inner).stall_metadata = true;
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        lock(&self.inner).recorded.clone()
    }

    pub fn list_calls(&self) -> Vec<RecipeFilter> {
        lock(&self.inner).list_calls.clone()
    }

    pub fn metadata_calls(&self) -> usize {
        lock(&self.inner).metadata_calls
    }
}

fn matches_tag(wanted: Option<&str>, actual: &str) -> bool {
    match wanted.map(str::trim).filter(|w| !w.is_empty()) {
        Some(w) => w.eq_ignore_ascii_case(actual),
        None => true,
    }
}

#[async_trait]
impl RecipeBackend for InMemoryBackend {
    async fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<RecipeSummary>, GatewayError> {
        let mut inner = lock(&self.inner);
        inner.list_calls.push(filter.clone());
        Ok(inner
            .recipes
            .iter()
            .map(|r| &r.summary)
            .filter(|s| matches_tag(filter.cuisine.as_deref(), &s.cuisine))
            .filter(|s| matches_tag(filter.dietary_preference.as_deref(), &s.dietary_preference))
            .cloned()
            .collect())
    }

    async fn get_recipe(&self, image_hash: &ImageHash) -> Result<RecipeDetail, GatewayError> {
        lock(&self.inner)
            .recipes
            .iter()
            .find(|r| r.image_hash() == image_hash)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("recipe {image_hash}")))
    }

    async fn image_metadata(&self, image_hash: &ImageHash) -> Result<ImageMetadata, GatewayError> {
        let found = {
            let mut inner = lock(&self.inner);
            inner.metadata_calls += 1;
            if inner.stall_metadata {
                None
            } else {
                Some(inner.metadata.get(image_hash).cloned())
            }
        };
        match found {
            None => std::future::pending().await,
            Some(Some(meta)) => Ok(meta),
            Some(None) => Err(GatewayError::Status {
                status: 500,
                body: "metadata unavailable".into(),
            }),
        }
    }

    async fn upload_image(&self, handle: ImageHandle) -> UploadOutcome {
        let next = {
            let mut inner = lock(&self.inner);
            inner.recorded.push(RecordedUpload {
                file_name: handle.file_name().to_string(),
                content_type: handle.content_type().to_string(),
                len: handle.len(),
            });
            if inner.stall_uploads {
                None
            } else {
                Some(inner.uploads.pop_front().unwrap_or(UploadOutcome::TransportError {
                    detail: "no scripted upload outcome".into(),
                }))
            }
        };
        match next {
            Some(outcome) => outcome,
            None => std::future::pending().await,
        }
    }

    fn image_url(&self, image_path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            image_path.trim_start_matches('/')
        )
    }
}
