//! Command line plumbing around the survey engine.

pub mod commands;
pub mod dataset;
pub mod logging;
pub mod render;
