//! Shared wire-format definitions for the taskdeck service API.

pub mod chat;
pub mod message;
pub mod task;
pub mod user;
