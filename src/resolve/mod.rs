//! Value resolvers.
//!
//! A resolver intercepts one `(instance, member, value)` triple before default
//! serialization and replaces the value with an engine-independent form.
//! Resolvers run in priority order; the first that applies wins.
//!
//! - [`ConstraintSourceResolver`] - constraint source lists (0)
//! - [`TimelineResolver`] - shared timeline models (10)
//! - [`SignalReceiverResolver`] - signal events (20)
//! - [`SpriteSheetResolver`] - sprites and texture sprite sheets (30)
//! - [`LodGroupResolver`] - LOD switch distances (40)

mod chain;
mod constraint;
mod lod;
mod signal;
mod sprite;
mod timeline;

pub use chain::{ResolverChain, ValueResolver};
pub use constraint::ConstraintSourceResolver;
pub use lod::LodGroupResolver;
pub use signal::SignalReceiverResolver;
pub use sprite::{SpriteSheetResolver, SPRITE_TYPE};
pub use timeline::{TimelineResolver, TIMELINE_TYPE};
