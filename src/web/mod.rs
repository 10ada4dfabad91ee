// src/web/mod.rs
pub mod handlers;
pub mod types;

pub use types::*;

use std::sync::Arc;

use anyhow::Result;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::response::status;
use rocket::response::stream::{Event, EventStream};
use rocket::serde::json::Json;
use rocket::tokio::time::{interval, Duration};
use rocket::{catchers, get, options, post, routes, Request, Response, State};
use tracing::info;
use uuid::Uuid;

use crate::auth::{AuthConfig, AuthenticatedUser, OptionalAuth};
use crate::clients::ats::AtsClient;
use crate::clients::campaign::CampaignClient;
use crate::clients::token::TokenService;
use crate::database::DatabaseConfig;
use crate::environment::EnvironmentConfig;
use crate::import::registry::JobRegistry;
use crate::import::ImportPipeline;
use crate::settings::ImportSettings;
use crate::types::ImportJob;

// CORS Fairing
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

#[post("/imports", data = "<request>")]
pub async fn start_import(
    request: Json<StartImportRequest>,
    auth: AuthenticatedUser,
    pipeline: &State<ImportPipeline>,
) -> Result<Json<StartImportResponse>, status::BadRequest<Json<ErrorResponse>>> {
    handlers::start_import_handler(request, auth, pipeline).await
}

/// Progress stream: one snapshot immediately, then one per second until the
/// job leaves `running`. Unknown ids get a single `not-found` event.
#[get("/imports/<id>/events")]
pub fn job_events(
    id: String,
    _auth: AuthenticatedUser,
    registry: &State<JobRegistry>,
) -> EventStream![] {
    let registry = registry.inner().clone();
    EventStream! {
        match Uuid::parse_str(&id) {
            Err(_) => yield Event::json(&NotFoundEvent::new(id.clone())),
            Ok(job_id) => {
                let mut timer = interval(Duration::from_secs(1));
                loop {
                    timer.tick().await;
                    match registry.snapshot(&job_id) {
                        Some(job) => {
                            let terminal = job.is_terminal();
                            yield Event::json(&job);
                            if terminal {
                                break;
                            }
                        }
                        None => {
                            yield Event::json(&NotFoundEvent::new(id.clone()));
                            break;
                        }
                    }
                }
            }
        }
    }
}

#[get("/imports/<id>")]
pub async fn job_snapshot(
    id: &str,
    _auth: AuthenticatedUser,
    registry: &State<JobRegistry>,
) -> Result<Json<ImportJob>, status::NotFound<Json<ErrorResponse>>> {
    handlers::job_snapshot_handler(id, registry).await
}

#[get("/imports")]
pub async fn list_imports(
    _auth: AuthenticatedUser,
    registry: &State<JobRegistry>,
) -> Json<Vec<ImportJob>> {
    handlers::list_imports_handler(registry).await
}

#[get("/health")]
pub async fn health(auth: OptionalAuth) -> Json<&'static str> {
    handlers::health_handler(auth).await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

// Error catchers
#[rocket::catch(400)]
pub fn bad_request() -> Json<ErrorResponse> {
    Json(ErrorResponse::new(
        "Invalid request format".to_string(),
        "BAD_REQUEST".to_string(),
        vec![
            "Check your request JSON format".to_string(),
            "Verify all required fields are present".to_string(),
        ],
    ))
}

#[rocket::catch(404)]
pub fn not_found() -> Json<ErrorResponse> {
    Json(ErrorResponse::new(
        "Resource not found".to_string(),
        "NOT_FOUND".to_string(),
        vec!["Check the request path and job id".to_string()],
    ))
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<ErrorResponse> {
    Json(ErrorResponse::new(
        "Internal server error".to_string(),
        "INTERNAL_ERROR".to_string(),
        vec![
            "Try again in a few moments".to_string(),
            "Contact support if the problem persists".to_string(),
        ],
    ))
}

// Main server start function
pub async fn start_web_server(environment: EnvironmentConfig, port: u16) -> Result<()> {
    let mut db_config = DatabaseConfig::new(environment.database_path.clone());
    db_config.init_pool().await?;
    db_config.migrate().await?;
    let pool = db_config.pool()?.clone();

    let auth_config = AuthConfig::from_env()?;
    let client_id = std::env::var("ATS_CLIENT_ID")
        .map_err(|_| anyhow::anyhow!("ATS_CLIENT_ID environment variable not set"))?;
    let api_token = std::env::var("CAMPAIGN_API_TOKEN")
        .map_err(|_| anyhow::anyhow!("CAMPAIGN_API_TOKEN environment variable not set"))?;

    let tokens = TokenService::new(environment.auth_base_url.clone(), client_id, pool)?;
    let ats = AtsClient::new(environment.ats_base_url.clone(), Arc::new(tokens))?;
    let campaign = CampaignClient::new(environment.campaign_base_url.clone(), api_token)?;

    let registry = JobRegistry::new();
    let pipeline = ImportPipeline::new(
        ats,
        campaign,
        registry.clone(),
        ImportSettings::default(),
    );

    info!("Starting TalentSync bulk-import API server");
    info!("Database: {}", environment.database_path.display());
    info!("ATS: {}", environment.ats_base_url);
    info!("Campaign platform: {}", environment.campaign_base_url);
    info!("Server: http://0.0.0.0:{}", port);

    let figment = rocket::Config::figment()
        .merge(("port", port))
        .merge(("address", "0.0.0.0"));

    let _rocket = rocket::custom(figment)
        .attach(Cors)
        .manage(auth_config)
        .manage(registry)
        .manage(pipeline)
        .register("/api", catchers![bad_request, not_found, internal_error])
        .mount(
            "/api",
            routes![
                start_import,
                job_events,
                job_snapshot,
                list_imports,
                health,
                options,
            ],
        )
        .launch()
        .await;

    Ok(())
}
