//! Infrastructure layer: storage, configuration and order recording.

pub mod config;
pub mod db;
pub mod recorder;
pub mod store;

#[cfg(test)]
mod integration_tests;

pub use recorder::{OrderRecorder, RecordError, Reference};
