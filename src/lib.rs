//! GPX Viewer
//!
//! The library surface is the [`data`] module: GPX document parsing,
//! geometry decimation and bounding-region computation. The interactive map
//! application lives in the binary.

pub mod data;
