//! Scene coordination for the anatomy viewer.
//!
//! [`SceneCoordinator`] ties the LOD manager, the progressive model loader, the
//! animation engine and the instanced renderer together behind one per-frame
//! `update`, and exposes the runtime controls a host UI drives.

mod camera;
mod content;
mod coordinator;

pub use camera::CameraState;
pub use content::{
    ContentProvider, InvalidReadingLevel, LevelContent, ReadingLevel, StaticContentProvider,
};
pub use coordinator::{FrameOutput, SceneCoordinator, quality_for_level};
