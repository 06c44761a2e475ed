pub mod agent;
pub mod config;
pub mod orchestrate;
