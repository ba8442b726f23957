//! ticketdeck - terminal table client for Jira backlogs, sprints and sub-tasks
//!
//! This library crate exposes internal modules for integration testing.

pub mod config;
pub mod data;
pub mod integrations;
pub mod tui;
pub mod util;
