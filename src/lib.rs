//! Homedash Library
//!
//! A home dashboard server: cached weather and host statistics, per-user
//! widget storage, and session login, served over HTTP.

pub mod app;
pub mod auth;
pub mod cache;
pub mod cli;
pub mod data;
pub mod logging;
pub mod refresh;
pub mod server;
pub mod store;
