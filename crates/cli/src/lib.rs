//! Command-line front end for the specdrive session lifecycle.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod styles;
