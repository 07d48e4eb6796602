pub mod config;
pub mod error;
pub mod genre;
pub mod library;
pub mod metadata;
pub mod player;
pub mod search;
pub mod server;
