pub mod cache;
pub mod extract;
pub mod models;
pub mod service;
pub mod stream;
pub mod upload;

pub use service::create_app;
