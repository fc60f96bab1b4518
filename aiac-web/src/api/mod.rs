//! HTTP API handlers for aiac-web

pub mod buildinfo;
pub mod compile;
pub mod health;
pub mod ui;
pub mod upload;

pub use buildinfo::get_build_info;
pub use compile::compile_routes;
pub use health::health_routes;
pub use ui::{serve_app_js, serve_index};
pub use upload::upload_routes;
