//! The generation stage interface.

use std::collections::BTreeSet;

use delve_world::Edits;

use crate::context::GenContext;
use crate::error::GenResult;

/// One step of a generation pipeline.
///
/// `apply` reads the context (area, blackboard, committed world, RNG
/// streams) and returns edits; it never writes the world itself.
/// Capabilities named by `provides` may be blackboard keys or world layers.
pub trait Stage {
    /// Unique id within a pipeline.
    fn id(&self) -> &str;

    /// Capabilities made available to later stages.
    fn provides(&self) -> BTreeSet<String>;

    /// Capabilities that earlier stages must provide.
    fn requires(&self) -> BTreeSet<String>;

    /// Produces this stage's edits for the context's area.
    fn apply(&self, ctx: &mut GenContext<'_>) -> GenResult<Edits>;
}

/// Builds a capability set from string literals.
#[must_use]
pub fn capabilities<const N: usize>(names: [&str; N]) -> BTreeSet<String> {
    names.into_iter().map(str::to_string).collect()
}
