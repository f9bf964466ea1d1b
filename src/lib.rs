//! Bookshelf application library
//!
//! Application modules plus the wiring that boots them on the kernel.
#![recursion_limit = "256"]

pub mod app;
pub mod modules;

pub use app::{migrate, App};
