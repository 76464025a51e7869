//! HTTP REST API interfaces
//!
//! - `common`: response envelope and the validating JSON extractor
//! - `modules`: handlers and DTOs per resource
//! - `router`: API router with Swagger documentation

pub mod common;
pub mod modules;
pub mod router;

pub use router::{create_api_router, ApiDependencies, ApiDoc};
