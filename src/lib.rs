pub mod admin;
pub mod app;
pub mod cli;
pub mod config;
pub mod credential;
pub mod directory;
pub mod error;
pub mod handlers;
pub mod principal;
pub mod services;

pub use app::{app, AppState};

#[cfg(test)]
pub mod testing;
