// ABOUTME: Library root for calloop — re-exports all modules for the binary and integration tests.
// ABOUTME: The binary entry point is in main.rs, which uses this crate as a library.

pub mod agent;
pub mod call;
pub mod config;
pub mod error;
pub mod message;
pub mod prompt;
pub mod session;
pub mod tools;
pub mod window;
