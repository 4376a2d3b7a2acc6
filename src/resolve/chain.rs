//! Priority-ordered resolver list.

use crate::core::{ExportableObject, Value};
use crate::emit::Serializer;

/// Intercepts serialization of one member value.
///
/// Resolvers are registered once per exporter and shared across runs; any
/// state they keep is a cache cleared by [`ValueResolver::reset`].
pub trait ValueResolver: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lower runs first.
    fn priority(&self) -> i32;

    /// Replace `value` and return `true`, or return `false` without side
    /// effects when the resolver does not apply.
    fn try_resolve(
        &self,
        ser: &mut Serializer<'_>,
        instance: &ExportableObject,
        member: &str,
        value: &mut Value,
    ) -> bool;

    /// Clear resolver-local caches at a run boundary.
    fn reset(&self) {}
}

/// Resolvers in priority order; equal priorities keep registration order.
#[derive(Default)]
pub struct ResolverChain {
    resolvers: Vec<Box<dyn ValueResolver>>,
}

impl ResolverChain {
    /// Empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain with the built-in resolvers.
    pub fn with_defaults() -> Self {
        let mut chain = Self::new();
        chain
            .register(super::ConstraintSourceResolver)
            .register(super::TimelineResolver)
            .register(super::SignalReceiverResolver)
            .register(super::SpriteSheetResolver::default())
            .register(super::LodGroupResolver);
        chain
    }

    pub fn register(&mut self, resolver: impl ValueResolver + 'static) -> &mut Self {
        self.resolvers.push(Box::new(resolver));
        // Stable sort keeps registration order among equal priorities.
        self.resolvers.sort_by_key(|r| r.priority());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ValueResolver> {
        self.resolvers.iter().map(|r| r.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    pub fn reset_all(&self) {
        for r in &self.resolvers {
            r.reset();
        }
    }
}

impl std::fmt::Debug for ResolverChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
