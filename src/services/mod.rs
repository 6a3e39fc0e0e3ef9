pub mod auth_service;
pub mod catalog;
pub mod download;
pub mod ingest;
pub mod preview;
