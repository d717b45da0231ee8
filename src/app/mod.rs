pub mod config;
pub mod preferences;
pub mod state;
