//! HTTP gateway to the recipe backend.

use async_trait::async_trait;
use plate_core::{
    ImageHash, ImageMetadata, RecipeDetail, RecipeFilter, RecipeSummary, UploadOutcome,
    UploadResponse, UPLOAD_FIELD,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode, Url};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ClientConfig, ConfigError};
use crate::media::ImageHandle;

/// Failure of a read call. Uploads report through [`UploadOutcome`] instead.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP 404; the payload names what was looked up.
    #[error("not found: {0}")]
    NotFound(String),
    /// Any other non-2xx status, with the response body.
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
    /// No usable response: connect, timeout or decode failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Operations the client needs from the recipe backend.
#[async_trait]
pub trait RecipeBackend: Send + Sync {
    /// `GET /recipes`, omitting absent filter fields from the query.
    async fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<RecipeSummary>, GatewayError>;

    /// `GET /recipes/{hash}`. Unknown hashes fail with [`GatewayError::NotFound`].
    async fn get_recipe(&self, image_hash: &ImageHash) -> Result<RecipeDetail, GatewayError>;

    /// `GET /image-metadata/{hash}`. Best-effort; callers substitute a fallback.
    async fn image_metadata(&self, image_hash: &ImageHash) -> Result<ImageMetadata, GatewayError>;

    /// `POST /v2/recipefinder` with the photo as the single `file` part.
    ///
    /// Consumes the handle. Never fails: every failure is folded into
    /// [`UploadOutcome::TransportError`].
    async fn upload_image(&self, handle: ImageHandle) -> UploadOutcome;

    /// Absolute url for a recipe's `image_path`.
    fn image_url(&self, image_path: &str) -> String;
}

/// [`RecipeBackend`] over HTTP.
#[derive(Clone, Debug)]
pub struct GatewayClient {
    client: Client,
    base: Url,
}

impl GatewayClient {
    /// Client for the configured backend, with the configured request timeout.
    pub fn new(config: &ClientConfig) -> Result<Self, GatewayError> {
        let base = config.base_url()?;
        let client = Client::builder().timeout(config.timeout()).build()?;
        info!("recipe gateway targeting {base}");
        Ok(Self { client, base })
    }

    /// Use a caller-built client, e.g. one shared with other services.
    pub fn with_client(client: Client, base: Url) -> Self {
        Self { client, base }
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // Checked at construction: http(s) urls always have path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

async fn check_status(resp: Response, what: &str) -> Result<Response, GatewayError> {
    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        return Err(GatewayError::NotFound(what.to_string()));
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(GatewayError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}

#[async_trait]
impl RecipeBackend for GatewayClient {
    async fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<RecipeSummary>, GatewayError> {
        let pairs = filter.query_pairs();
        let mut req = self.client.get(self.endpoint(&["recipes"]));
        if !pairs.is_empty() {
            req = req.query(&pairs);
        }
        debug!("listing recipes with {pairs:?}");

        let resp = check_status(req.send().await?, "recipes").await?;
        let recipes: Option<Vec<RecipeSummary>> = resp.json().await?;
        Ok(recipes.unwrap_or_default())
    }

    async fn get_recipe(&self, image_hash: &ImageHash) -> Result<RecipeDetail, GatewayError> {
        let url = self.endpoint(&["recipes", image_hash.as_str()]);
        let resp = self.client.get(url).send().await?;
        let resp = check_status(resp, &format!("recipe {image_hash}")).await?;
        Ok(resp.json().await?)
    }

    async fn image_metadata(&self, image_hash: &ImageHash) -> Result<ImageMetadata, GatewayError> {
        let url = self.endpoint(&["image-metadata", image_hash.as_str()]);
        let resp = self.client.get(url).send().await?;
        let resp = check_status(resp, &format!("image metadata {image_hash}")).await?;
        Ok(resp.json().await?)
    }

    async fn upload_image(&self, handle: ImageHandle) -> UploadOutcome {
        let url = self.endpoint(&["v2", "recipefinder"]);
        let (file_name, content_type, bytes) = handle.into_parts();
        let size = bytes.len();

        let part = match Part::bytes(bytes).file_name(file_name).mime_str(&content_type) {
            Ok(part) => part,
            Err(e) => {
                return UploadOutcome::TransportError {
                    detail: format!("invalid content type {content_type}: {e}"),
                }
            }
        };
        let form = Form::new().part(UPLOAD_FIELD, part);

        info!("uploading {size} bytes ({content_type}) to {url}");
        let resp = match self.client.post(url).multipart(form).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!("upload got no response: {e}");
                return UploadOutcome::TransportError {
                    detail: format!("no response from server: {e}"),
                };
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("upload returned {status}: {body}");
            let detail = if body.is_empty() {
                status.to_string()
            } else {
                format!("{status}: {body}")
            };
            return UploadOutcome::TransportError { detail };
        }

        match resp.json::<UploadResponse>().await {
            Ok(body) => {
                let outcome = body.into_outcome();
                debug!("upload outcome {outcome:?}");
                outcome
            }
            Err(e) => {
                warn!("upload response decode failed: {e}");
                UploadOutcome::TransportError {
                    detail: format!("unreadable upload response: {e}"),
                }
            }
        }
    }

    fn image_url(&self, image_path: &str) -> String {
        format!(
            "{}/{}",
            self.base.as_str().trim_end_matches('/'),
            image_path.trim_start_matches('/')
        )
    }
}
