// src/lib.rs
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod jenkins;
pub mod orchestrator;
pub mod server;
