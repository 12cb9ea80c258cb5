//! Region editing operations behind session checks
//!
//! Every operation answers with an [`ApiResponse`] carrying an HTTP-style
//! status, so a front-end only has to serialize it. Successful mutations are
//! persisted and trigger a map rebuild before the response is returned.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use lands_core::{MapUpdater, Region, RegionValidator, ValidationResult, WorldDirectory};
use lands_storage::{RegionChange, RegionStore, StoreError};
use serde::Serialize;
use tracing::{error, info};

use crate::error::EditorError;
use crate::session::SessionManager;

/// Structured result of an editor operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    #[serde(skip)]
    pub status: u16,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regions: Option<Vec<Region>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worlds: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl ApiResponse {
    fn success(status: u16) -> Self {
        Self {
            status,
            success: true,
            error: None,
            errors: None,
            region: None,
            regions: None,
            worlds: None,
            token: None,
        }
    }

    pub fn ok() -> Self {
        Self::success(200)
    }

    pub fn created(region: Region) -> Self {
        Self {
            region: Some(region),
            ..Self::success(201)
        }
    }

    pub fn failure(status: u16, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Self::success(status)
        }
    }

    fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// JSON body for the response
    pub fn to_json(&self) -> String {
        // Serializing plain strings and regions cannot fail
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"success":false}"#.to_string())
    }
}

impl From<EditorError> for ApiResponse {
    fn from(err: EditorError) -> Self {
        let status = err.status();
        match err {
            EditorError::Unauthorized => Self::failure(status, "Unauthorized"),
            EditorError::InvalidCredentials => Self::failure(status, "Invalid credentials"),
            EditorError::IdMismatch { .. } => Self::failure(status, "Region ID mismatch"),
            EditorError::Validation(errors) | EditorError::Store(StoreError::Validation(errors)) => {
                Self {
                    errors: Some(errors),
                    ..Self::failure(status, "Validation failed")
                }
            }
            EditorError::BadRequest(message) => Self::failure(status, message),
            EditorError::Store(e) if e.is_recoverable() => Self::failure(status, e.to_string()),
            EditorError::Store(e) => {
                error!(error = %e, "Editor operation failed");
                Self::failure(status, "Internal server error")
            }
        }
    }
}

impl<T: Into<ApiResponse>> From<Result<T, EditorError>> for ApiResponse {
    fn from(result: Result<T, EditorError>) -> Self {
        match result {
            Ok(value) => value.into(),
            Err(e) => e.into(),
        }
    }
}

/// The region editing operations
pub struct EditorService {
    store: Arc<dyn RegionStore>,
    sessions: Arc<SessionManager>,
    map_updater: Arc<dyn MapUpdater>,
    worlds: Arc<dyn WorldDirectory>,
    validator: RegionValidator,
    allowed_worlds: HashSet<String>,
}

impl EditorService {
    pub fn new(
        store: Arc<dyn RegionStore>,
        sessions: Arc<SessionManager>,
        map_updater: Arc<dyn MapUpdater>,
        worlds: Arc<dyn WorldDirectory>,
    ) -> Self {
        Self {
            store,
            sessions,
            map_updater,
            worlds,
            validator: RegionValidator::default(),
            allowed_worlds: HashSet::new(),
        }
    }

    pub fn with_validator(mut self, validator: RegionValidator, allowed_worlds: HashSet<String>) -> Self {
        self.validator = validator;
        self.allowed_worlds = allowed_worlds;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Parse a credentials object, keeping only string-valued fields
    pub fn parse_credentials(body: &str) -> Result<HashMap<String, String>, EditorError> {
        let value: serde_json::Value = serde_json::from_str(body)?;
        let object = value
            .as_object()
            .ok_or_else(|| EditorError::bad_request("credentials must be a JSON object"))?;

        Ok(object
            .iter()
            .filter_map(|(key, value)| value.as_str().map(|v| (key.clone(), v.to_string())))
            .collect())
    }

    /// Parse a region from a request body
    pub fn parse_region(body: &str) -> Result<Region, EditorError> {
        Ok(serde_json::from_str(body)?)
    }

    /// Operations are open to everyone while editor auth is disabled
    fn require_session(&self, token: Option<&str>) -> Result<(), EditorError> {
        if !self.sessions.auth_enabled() {
            return Ok(());
        }
        match token {
            Some(token) if self.sessions.validate_session(token) => Ok(()),
            _ => Err(EditorError::Unauthorized),
        }
    }

    fn validate(&self, region: &Region) -> Result<(), EditorError> {
        match self.validator.validate(region, &self.allowed_worlds) {
            ValidationResult::Success => Ok(()),
            ValidationResult::Failure(errors) => Err(EditorError::Validation(errors)),
        }
    }

    /// Apply and persist one change, then re-render; a failed write leaves the store unchanged
    async fn commit(&self, change: RegionChange) -> Result<(), EditorError> {
        self.store.apply_and_save(change).await?;
        self.map_updater.update_map().await;
        Ok(())
    }

    /// Exchange credentials for a session token
    pub async fn auth(&self, credentials: &HashMap<String, String>) -> ApiResponse {
        match self.sessions.authenticate(credentials) {
            Some(token) => ApiResponse {
                token: Some(token),
                ..ApiResponse::ok()
            },
            None => EditorError::InvalidCredentials.into(),
        }
    }

    /// End the session, if any; always succeeds
    pub async fn logout(&self, token: Option<&str>) -> ApiResponse {
        if let Some(token) = token {
            self.sessions.invalidate_session(token);
        }
        ApiResponse::ok()
    }

    pub async fn list_regions(&self, token: Option<&str>) -> ApiResponse {
        self.try_list_regions(token).await.into()
    }

    pub async fn get_region(&self, token: Option<&str>, id: &str) -> ApiResponse {
        self.try_get_region(token, id).await.into()
    }

    pub async fn create_region(&self, token: Option<&str>, region: Region) -> ApiResponse {
        self.try_create_region(token, region).await.into()
    }

    /// Replace a region wholesale; the body id must match `path_id`
    pub async fn update_region(&self, token: Option<&str>, path_id: &str, region: Region) -> ApiResponse {
        self.try_update_region(token, path_id, region).await.into()
    }

    pub async fn delete_region(&self, token: Option<&str>, id: &str) -> ApiResponse {
        self.try_delete_region(token, id).await.into()
    }

    /// Worlds currently loaded by the host
    pub async fn list_worlds(&self, token: Option<&str>) -> ApiResponse {
        self.try_list_worlds(token).into()
    }

    async fn try_list_regions(&self, token: Option<&str>) -> Result<ApiResponse, EditorError> {
        self.require_session(token)?;
        let regions = self.store.get_all_regions().await?;
        Ok(ApiResponse {
            regions: Some(regions),
            ..ApiResponse::ok()
        })
    }

    async fn try_get_region(&self, token: Option<&str>, id: &str) -> Result<ApiResponse, EditorError> {
        self.require_session(token)?;
        let response = match self.store.get_region(id).await? {
            Some(region) => ApiResponse::ok().with_region(region),
            None => ApiResponse::failure(404, "Region not found"),
        };
        Ok(response)
    }

    async fn try_create_region(&self, token: Option<&str>, region: Region) -> Result<ApiResponse, EditorError> {
        self.require_session(token)?;
        self.validate(&region)?;
        self.commit(RegionChange::Add(region.clone())).await?;

        info!(region_id = %region.id, "Created region");
        Ok(ApiResponse::created(region))
    }

    async fn try_update_region(
        &self,
        token: Option<&str>,
        path_id: &str,
        region: Region,
    ) -> Result<ApiResponse, EditorError> {
        self.require_session(token)?;
        if region.id != path_id {
            return Err(EditorError::IdMismatch {
                path: path_id.to_string(),
                body: region.id,
            });
        }
        self.validate(&region)?;
        self.commit(RegionChange::Update(region.clone())).await?;

        info!(region_id = %region.id, "Updated region");
        Ok(ApiResponse::ok().with_region(region))
    }

    async fn try_delete_region(&self, token: Option<&str>, id: &str) -> Result<ApiResponse, EditorError> {
        self.require_session(token)?;
        self.commit(RegionChange::Delete(id.to_string())).await?;

        info!(region_id = %id, "Deleted region");
        Ok(ApiResponse::ok())
    }

    fn try_list_worlds(&self, token: Option<&str>) -> Result<ApiResponse, EditorError> {
        self.require_session(token)?;
        Ok(ApiResponse {
            worlds: Some(self.worlds.world_names()),
            ..ApiResponse::ok()
        })
    }
}
