pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod server;
pub mod suggest;
