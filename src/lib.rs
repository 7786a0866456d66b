pub mod actions;
pub mod config;
pub mod locale;
pub mod profile;
pub mod quiz;
pub mod render;
