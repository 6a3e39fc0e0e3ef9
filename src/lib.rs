pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod routers;
pub mod services;
pub mod session;
pub mod state;
pub mod storage;
pub mod utils;
pub mod views;
