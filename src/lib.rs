//! Context Tracker - durable project knowledge from Claude Code sessions.

pub mod ai;
pub mod config;
pub mod git;
pub mod hooks;
pub mod project;
pub mod session;
pub mod storage;
pub mod wiki;
