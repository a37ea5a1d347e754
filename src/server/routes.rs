//! Request handlers for the selection API

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::AppState;
use crate::core::catalog::Catalog;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::selection::{default_selection, validate_selection, Selection, ValidationOutcome};

#[derive(Debug, Deserialize)]
pub struct GroupSelectionRequest {
    #[serde(default)]
    pub selections: Option<Selection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSelectionRequest {
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub selections: Option<Selection>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultSelectionResponse {
    pub template_id: EntityId,
    pub selections: Selection,
    pub validation: ValidationOutcome,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub currency: String,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        currency: state.config.currency().to_string(),
    })
}

/// POST /api/assembly-groups/validate-selection
pub async fn validate_group_selection(
    State(state): State<AppState>,
    payload: Result<Json<GroupSelectionRequest>, JsonRejection>,
) -> Result<Json<ValidationOutcome>, ApiError> {
    let Json(request) = payload?;
    let selections = request
        .selections
        .ok_or_else(|| ApiError::BadRequest("selections are required".to_string()))?;

    let catalog = load_catalog(&state).await?;
    let groups = catalog.groups_by_ids(&selections.group_ids());
    Ok(Json(validate_selection(&selections, &groups)))
}

/// POST /api/templates/validate-selection
pub async fn validate_template_selection(
    State(state): State<AppState>,
    payload: Result<Json<TemplateSelectionRequest>, JsonRejection>,
) -> Result<Json<ValidationOutcome>, ApiError> {
    let Json(request) = payload?;
    let template_id = request
        .template_id
        .ok_or_else(|| ApiError::BadRequest("templateId is required".to_string()))?;
    let template_id = parse_template_id(&template_id)?;
    let selections = request
        .selections
        .ok_or_else(|| ApiError::BadRequest("selections are required".to_string()))?;

    let catalog = load_catalog(&state).await?;
    let groups = catalog.groups_for_template(&template_id)?;
    Ok(Json(validate_selection(&selections, &groups)))
}

/// GET /api/templates/{id}/default-selection
pub async fn template_default_selection(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DefaultSelectionResponse>, ApiError> {
    let template_id = parse_template_id(&id)?;
    let catalog = load_catalog(&state).await?;
    let groups = catalog.groups_for_template(&template_id)?;

    let selections = default_selection(&groups);
    let validation = validate_selection(&selections, &groups);
    Ok(Json(DefaultSelectionResponse {
        template_id,
        selections,
        validation,
    }))
}

fn parse_template_id(raw: &str) -> Result<EntityId, ApiError> {
    EntityId::parse_as(raw, EntityPrefix::Tmpl)
        .map_err(|e| ApiError::BadRequest(format!("invalid templateId: {}", e)))
}

/// Fresh catalog snapshot per request, read off the async runtime
async fn load_catalog(state: &AppState) -> Result<Catalog, ApiError> {
    let project = state.project.clone();
    let catalog = tokio::task::spawn_blocking(move || Catalog::load(&project))
        .await
        .map_err(|e| ApiError::Internal(format!("catalog task failed: {}", e)))??;
    Ok(catalog)
}
