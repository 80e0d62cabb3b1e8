//! muz CLI - Command-line interface for muz migrations.
//!
//! This crate provides the `muz` binary: it reads `muz.toml`, discovers
//! migration directories, and applies them through the PostgreSQL or SQLite
//! driver.

#[cfg(not(any(feature = "postgres", feature = "sqlite")))]
compile_error!("muz-cli needs at least one of the `postgres` or `sqlite` features");

pub mod cli;
pub mod commands;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod output;
