//! Bootstrap module for initializing the authgate server
//!
//! This module handles:
//! - Configuration loading
//! - Provider adapter construction and service wiring

pub mod config;
pub mod services;

pub use config::load_config;
pub use services::{init_services, Services};
