//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and operations
//! - Frame timing
//! - Process-unique ids
//! - Logging utilities

pub mod math;
pub mod time;
pub mod uid;
pub mod logging;
