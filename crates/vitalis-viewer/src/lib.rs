//! Vitalis headless viewer.
//!
//! Builds the demo anatomy, drives the camera along a scripted tour and
//! reports LOD, asset and animation statistics through the log.

pub mod anatomy;
pub mod dolly;
pub mod error;
pub mod frame_stats;
pub mod platform;
pub mod script;
pub mod viewer;

pub use error::ViewerError;
pub use viewer::Viewer;
