//! Nexus core library: API client, settings, connectivity, model catalog, chat session
//! and history, shared by the CLI and desktop applications.

pub mod api;
pub mod bridge;
pub mod catalog;
pub mod config;
pub mod connectivity;
pub mod controller;
pub mod error;
pub mod history;
pub mod init;
pub mod session;
pub mod settings;

#[cfg(test)]
mod testing;
