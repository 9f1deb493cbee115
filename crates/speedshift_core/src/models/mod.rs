//! Data models for speedshift.
//!
//! - Enums for input media classification
//! - Media structures (files, tag sets)
//! - Request/result structures for a single transform job

mod enums;
mod media;
mod request;

// Re-export all public types
pub use enums::MediaKind;
pub use media::{MediaFile, TagSet};
pub use request::{SpeedFactor, TransformOutput, TransformRequest};
