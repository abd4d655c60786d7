pub mod api;
pub mod collector;
pub mod error;
pub mod extractor;
pub mod metrics;
pub mod models;
pub mod periods;
