//! HTTP surface of the certificate service.
//!
//! - `models` - JSON bodies and OpenAPI request schemas
//! - `multipart_parser` - form uploads to a `GenerationRequest`
//! - `handlers` - endpoints and route registration

pub mod handlers;
pub mod models;
pub mod multipart_parser;


pub use handlers::config;
