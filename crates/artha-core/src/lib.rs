//! Core artha library (config, credentials, endpoint classification, dispatch).

pub mod client;
pub mod config;
pub mod credentials;
pub mod endpoint;
pub mod error;
pub mod session;
