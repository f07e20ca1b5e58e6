pub mod api;
pub mod canvas;
pub mod config;
pub mod error;
pub mod models;
pub mod notion;
pub mod services;
pub mod state;
pub mod sync;
