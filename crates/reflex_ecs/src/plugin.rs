//! Plugins bundle related registrations behind one call.

use crate::error::EcsError;
use crate::world::World;

/// A reusable unit of world setup. A plugin registers event kinds,
/// systems, and nested plugins against the world it is added to.
pub trait Plugin {
    /// Perform this plugin's registrations. Errors abort `add_plugin`.
    fn build(&self, world: &mut World) -> Result<(), EcsError>;
}
