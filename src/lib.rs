//! lotwatch library: listing extraction, render sessions, sinks and the
//! collector loop behind the `lotwatch` binary.

#![allow(clippy::should_implement_trait)]

pub mod cli;
pub mod collector;
pub mod config;
pub mod extract;
pub mod harvest;
pub mod models;
pub mod render;
pub mod sink;
pub mod utils;
