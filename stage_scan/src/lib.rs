pub mod command_executor;
pub mod config;
pub mod controllers;
pub mod form;
#[cfg(feature = "gui")]
pub mod gui;
pub mod jobs;
pub mod logging;
pub mod record;
pub mod scan;
