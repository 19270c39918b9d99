//! Core library for the use case custom field patcher.
//!
//! A run is a straight pipeline: the YAML configuration is validated in
//! [`config`], a bearer token is obtained and field names are resolved through
//! the [`api`] client and [`fields`], the input table is prepared by
//! [`io::csv_read`], and [`dispatch`] sends one update per (row, field) pair.
//! [`patch`] wires the stages together and [`logging`] builds the subscriber
//! everything logs through.

pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fields;
pub mod io;
pub mod logging;
pub mod model;
pub mod patch;

pub use error::{Result, TableError, ToolError};
