//! Taskdeck — terminal client for a task service with a conversational assistant.

pub mod chat;
pub mod client;
pub mod config;
pub mod session;
pub mod tasks;
