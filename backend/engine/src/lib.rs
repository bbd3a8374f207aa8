#![allow(dead_code)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::EngineError;
pub use services::session_service::SessionEngine;
pub use services::EngineContext;
