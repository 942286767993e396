pub mod admin;
pub mod allocator;
pub mod app;
pub mod authoring;
pub mod config;
pub mod error;
pub mod event;
pub mod models;
pub mod quiz;
pub mod scoring;
pub mod session;
pub mod storage;
pub mod telegram;

pub use app::App;
pub use config::Config;
pub use error::{BotError, BotResult};
