//! HTTP integration: session middleware, identity extractor, login routes
//! and the demo server wiring.

pub mod app;
pub mod authz;
pub mod config;
pub mod context;
pub mod middleware;
