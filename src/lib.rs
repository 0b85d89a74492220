//! skywatch library
//!
//! Current weather for one location, kept fresh by a disk cache and a single
//! refresh timer. The binary wires these modules together; integration tests
//! use them directly.

pub mod cache;
pub mod cli;
pub mod data;
pub mod gateway;
pub mod refresh;
pub mod sink;
