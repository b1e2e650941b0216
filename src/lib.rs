// Library exports for Yatube
// This allows integration tests and the binary to share modules

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod display;
pub mod error;
pub mod extractors;
pub mod feed;
pub mod follow;
pub mod forms;
pub mod media;
pub mod pagination;
pub mod routes;
pub mod state;
