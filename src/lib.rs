#![allow(unused_assignments)] // thiserror/miette proc macros trigger false positives

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod identity;
pub mod launch;
pub mod paths;
pub mod ports;
pub mod tags;
pub mod util;
pub mod validate;
