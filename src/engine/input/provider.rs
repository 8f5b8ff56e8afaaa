// Control providers: anything that owns a state table

use super::control::{AnyControl, ControlHash};
use super::state::StateTable;
use serde::{Deserialize, Serialize};

/// Non-owning key of a provider, carried by each control for lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderId(pub u32);

/// An entity that owns an ordered table of controls
///
/// Devices and action map inputs both implement this, so consumers can
/// address controls by hash without knowing where they come from.
pub trait ControlProvider {
    fn provider_id(&self) -> ProviderId;

    fn state(&self) -> &StateTable;

    fn state_mut(&mut self) -> &mut StateTable;

    /// Position of the control with `hash`, `None` when not provided
    fn control_index_from_hash(&self, hash: ControlHash) -> Option<usize> {
        self.state().index_of_hash(hash)
    }

    fn control_hash_from_index(&self, index: usize) -> Option<ControlHash> {
        self.state().hash_of_index(index)
    }

    fn control_by_name(&self, name: &str) -> Option<&AnyControl> {
        self.state()
            .index_of_name(name)
            .and_then(|index| self.state().get(index))
    }
}
