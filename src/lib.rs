pub mod auth;
pub mod cli;
pub mod clients;
pub mod database;
pub mod environment;
pub mod error;
pub mod import;
pub mod settings;
pub mod types;
pub mod web;

pub use error::PipelineError;
pub use import::ImportPipeline;
pub use web::start_web_server;
