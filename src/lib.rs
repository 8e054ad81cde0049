//! Quiz API service
//!
//! A small HTTP service exposing `GET /health`, backed by an optional
//! PostgreSQL pool and shut down gracefully on SIGTERM/SIGINT.

pub mod app;
pub mod config;
pub mod database;
pub mod server;
