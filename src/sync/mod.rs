//! Compact binary records for replicated state.
//!
//! - [`TransformRecord`] - fixed 36-byte transform
//! - [`CameraSyncRecord`] - camera state with string fields

mod camera;
mod transform;

pub use camera::CameraSyncRecord;
pub use transform::{decode_transforms, encode_transforms, TransformRecord};
