//! Photo acquisition: permission negotiation, pickers, and normalization into
//! a platform-agnostic [`ImageHandle`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use thiserror::Error;
use tracing::{debug, info};

/// Part name used when the platform does not provide a file name.
pub const DEFAULT_FILE_NAME: &str = "photo.jpg";
/// Content type used when none can be inferred.
pub const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// Failure to turn a picker result into an [`ImageHandle`].
///
/// A denied permission or a cancelled picker is not an error; see [`CaptureOutcome`].
#[derive(Debug, Error)]
pub enum MediaError {
    /// The platform permission service itself failed.
    #[error("permission service failed: {0}")]
    Permission(String),
    #[error("picker failed: {0}")]
    Picker(String),
    /// Only `file://` urls and plain paths can be read.
    #[error("unsupported image uri `{0}`")]
    UnsupportedUri(String),
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("selected image is empty")]
    EmptyImage,
}

/// A device capability guarded by a permission prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    Camera,
    MediaLibrary,
}

impl Capability {
    /// Message shown when the user refuses the capability.
    pub fn denied_message(self) -> &'static str {
        match self {
            Capability::Camera => "Camera permissions are required to take photos.",
            Capability::MediaLibrary => "Media library permissions are required to pick photos.",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Camera => f.write_str("camera"),
            Capability::MediaLibrary => f.write_str("media library"),
        }
    }
}

/// Where the photo comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaSource {
    Camera,
    Library,
}

impl MediaSource {
    pub fn capability(self) -> Capability {
        match self {
            MediaSource::Camera => Capability::Camera,
            MediaSource::Library => Capability::MediaLibrary,
        }
    }
}

/// Permission status for one capability. Queried lazily, never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionState {
    Unknown,
    Granted,
    Denied,
}

#[async_trait]
pub trait PermissionService: Send + Sync {
    /// Current status, without prompting.
    async fn status(&self, capability: Capability) -> Result<PermissionState, MediaError>;
    /// Prompt the user once and report the resulting status.
    async fn request(&self, capability: Capability) -> Result<PermissionState, MediaError>;
}

/// Options handed to the platform picker.
#[derive(Clone, Debug, PartialEq)]
pub struct PickerOptions {
    pub allows_editing: bool,
    /// Crop aspect as width:height.
    pub aspect: (u32, u32),
    /// 0.0..=1.0
    pub quality: f32,
    pub images_only: bool,
}

impl Default for PickerOptions {
    fn default() -> Self {
        Self {
            allows_editing: true,
            aspect: (4, 3),
            quality: 1.0,
            images_only: true,
        }
    }
}

/// What a platform picker hands back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PickedAsset {
    /// Mobile pickers: a local file uri (`file://...` or a plain path).
    Uri {
        uri: String,
        file_name: Option<String>,
        content_type: Option<String>,
    },
    /// Web pickers: the file contents are already in memory.
    File {
        file_name: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PickerResult {
    Cancelled,
    Picked(PickedAsset),
}

#[async_trait]
pub trait ImagePicker: Send + Sync {
    async fn launch(
        &self,
        source: MediaSource,
        options: &PickerOptions,
    ) -> Result<PickerResult, MediaError>;
}

/// A captured or selected photo, ready to upload.
///
/// Not `Clone`: an upload consumes it.
#[derive(PartialEq, Eq)]
pub struct ImageHandle {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ImageHandle {
    pub fn from_bytes(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Self, MediaError> {
        if bytes.is_empty() {
            return Err(MediaError::EmptyImage);
        }
        let file_name = file_name.into();
        let content_type = content_type.into();
        Ok(Self {
            file_name: if file_name.is_empty() {
                DEFAULT_FILE_NAME.to_string()
            } else {
                file_name
            },
            content_type: if content_type.is_empty() {
                DEFAULT_CONTENT_TYPE.to_string()
            } else {
                content_type
            },
            bytes,
        })
    }

    /// Normalize either picker shape into a handle, reading uris from disk.
    pub async fn resolve(asset: PickedAsset) -> Result<Self, MediaError> {
        match asset {
            PickedAsset::File {
                file_name,
                content_type,
                bytes,
            } => Self::from_bytes(file_name, content_type, bytes),
            PickedAsset::Uri {
                uri,
                file_name,
                content_type,
            } => {
                let path = local_path(&uri)?;
                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(|source| MediaError::Read {
                        path: path.clone(),
                        source,
                    })?;
                let content_type = content_type.unwrap_or_else(|| guess_content_type(&path).to_string());
                debug!("read {} bytes from {}", bytes.len(), path.display());
                Self::from_bytes(
                    file_name.unwrap_or_else(|| DEFAULT_FILE_NAME.to_string()),
                    content_type,
                    bytes,
                )
            }
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `(file_name, content_type, bytes)`
    pub fn into_parts(self) -> (String, String, Vec<u8>) {
        (self.file_name, self.content_type, self.bytes)
    }
}

fn local_path(uri: &str) -> Result<PathBuf, MediaError> {
    if uri.starts_with("file:") {
        return Url::parse(uri)
            .ok()
            .and_then(|u| u.to_file_path().ok())
            .ok_or_else(|| MediaError::UnsupportedUri(uri.to_string()));
    }
    if uri.contains("://") || uri.is_empty() {
        return Err(MediaError::UnsupportedUri(uri.to_string()));
    }
    Ok(PathBuf::from(uri))
}

fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// Result of one capture request.
#[derive(Debug, PartialEq, Eq)]
pub enum CaptureOutcome {
    Acquired(ImageHandle),
    /// The user closed the picker. Not an error.
    Cancelled,
    /// The capability was refused; the picker was never opened.
    PermissionDenied(Capability),
}

/// Permission negotiation plus picker invocation.
#[derive(Clone)]
pub struct MediaAcquisition {
    permissions: Arc<dyn PermissionService>,
    picker: Arc<dyn ImagePicker>,
    options: PickerOptions,
}

impl MediaAcquisition {
    pub fn new(permissions: Arc<dyn PermissionService>, picker: Arc<dyn ImagePicker>) -> Self {
        Self {
            permissions,
            picker,
            options: PickerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PickerOptions) -> Self {
        self.options = options;
        self
    }

    /// Check, then request at most once, then launch the picker.
    pub async fn request_capture(&self, source: MediaSource) -> Result<CaptureOutcome, MediaError> {
        let capability = source.capability();

        let current = self.permissions.status(capability).await?;
        debug!("{capability} permission status: {current:?}");

        let granted = match current {
            PermissionState::Granted => true,
            _ => {
                let requested = self.permissions.request(capability).await?;
                debug!("{capability} permission request result: {requested:?}");
                requested == PermissionState::Granted
            }
        };
        if !granted {
            info!("{capability} permission denied; picker not launched");
            return Ok(CaptureOutcome::PermissionDenied(capability));
        }

        debug!("launching {source:?} picker");
        match self.picker.launch(source, &self.options).await? {
            PickerResult::Cancelled => {
                debug!("{source:?} picker cancelled");
                Ok(CaptureOutcome::Cancelled)
            }
            PickerResult::Picked(asset) => {
                let handle = ImageHandle::resolve(asset).await?;
                debug!("acquired {handle:?}");
                Ok(CaptureOutcome::Acquired(handle))
            }
        }
    }
}

/// Permissions for hosts without a prompt, such as a desktop CLI.
#[derive(Clone, Copy, Debug, Default)]
pub struct GrantedPermissions;

#[async_trait]
impl PermissionService for GrantedPermissions {
    async fn status(&self, _capability: Capability) -> Result<PermissionState, MediaError> {
        Ok(PermissionState::Granted)
    }

    async fn request(&self, _capability: Capability) -> Result<PermissionState, MediaError> {
        Ok(PermissionState::Granted)
    }
}

/// Picker that "selects" a fixed file from disk, whatever the source.
#[derive(Clone, Debug)]
pub struct FilePicker {
    path: PathBuf,
}

impl FilePicker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ImagePicker for FilePicker {
    async fn launch(
        &self,
        _source: MediaSource,
        _options: &PickerOptions,
    ) -> Result<PickerResult, MediaError> {
        let file_name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .map(String::from);
        Ok(PickerResult::Picked(PickedAsset::Uri {
            uri: self.path.to_string_lossy().to_string(),
            file_name,
            content_type: None,
        }))
    }
}
