//! # Tessera Engine
//!
//! Headless driver for the Tessera world engine: configuration loading,
//! the follow camera, stored-change import, and the frame loop.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod app;
pub mod camera;
pub mod changes;
pub mod config;
