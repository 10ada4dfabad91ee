// src/web/handlers.rs
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::State;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{AuthenticatedUser, OptionalAuth};
use crate::import::registry::JobRegistry;
use crate::import::ImportPipeline;
use crate::types::ImportJob;
use crate::web::types::{ErrorResponse, StartImportRequest, StartImportResponse};

pub async fn start_import_handler(
    request: Json<StartImportRequest>,
    auth: AuthenticatedUser,
    pipeline: &State<ImportPipeline>,
) -> Result<Json<StartImportResponse>, status::BadRequest<Json<ErrorResponse>>> {
    match request.into_inner().validate(pipeline.defaults()) {
        Ok(import_request) => {
            info!(
                "User {} starting import of pool {} for owner {}",
                auth.email(),
                import_request.source_id,
                import_request.owner_key
            );
            let job_id = pipeline.start(import_request);
            Ok(Json(StartImportResponse { job_id }))
        }
        Err(message) => {
            warn!("Rejected import request from {}: {}", auth.email(), message);
            Err(status::BadRequest(Json(ErrorResponse::new(
                message,
                "INVALID_REQUEST".to_string(),
                vec![
                    "Provide sourceId and ownerKey".to_string(),
                    "Provide destinationTag or destinationListIds".to_string(),
                ],
            ))))
        }
    }
}

pub async fn job_snapshot_handler(
    id: &str,
    registry: &State<JobRegistry>,
) -> Result<Json<ImportJob>, status::NotFound<Json<ErrorResponse>>> {
    Uuid::parse_str(id)
        .ok()
        .and_then(|job_id| registry.snapshot(&job_id))
        .map(Json)
        .ok_or_else(|| {
            status::NotFound(Json(ErrorResponse::new(
                format!("No import job with id: {}", id),
                "JOB_NOT_FOUND".to_string(),
                vec!["Check the job id returned by the start endpoint".to_string()],
            )))
        })
}

pub async fn list_imports_handler(registry: &State<JobRegistry>) -> Json<Vec<ImportJob>> {
    Json(registry.snapshots())
}

pub async fn health_handler(auth: OptionalAuth) -> Json<&'static str> {
    if let Some(user) = auth.user {
        info!("Health check by authenticated user: {}", user.email());
    } else {
        info!("Health check by anonymous user");
    }
    Json("OK")
}
