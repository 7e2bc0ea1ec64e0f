mod assets;

pub mod api;
pub mod commands;
pub mod config;
pub mod format;
pub mod message;
pub mod storage;
pub mod view;

pub use crate::assets::{get_config_dir, get_data_dir};
