//! Unit test harness for throttle-stand.
//!
//! This module organizes unit tests for each component of the library.

mod config_parsing;
mod config_validation;
mod trace_parsing;
