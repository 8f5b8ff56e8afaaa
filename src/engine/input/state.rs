// State tables: the ordered control arena owned by a provider

use super::cell::Timeline;
use super::control::{AnyControl, ControlDescriptor, ControlHash};
use super::provider::ProviderId;
use super::value::Value;
use std::collections::HashMap;

/// Ordered collection of controls
///
/// Positions are assigned once and never move. `None` entries are declared
/// but not allocated.
#[derive(Debug, Clone)]
pub struct StateTable {
    provider: ProviderId,
    controls: Vec<Option<AnyControl>>,
    hash_to_index: HashMap<ControlHash, usize>,
}

impl StateTable {
    /// Allocate one control per descriptor, in order
    pub fn new(provider: ProviderId, descriptors: &[ControlDescriptor]) -> Self {
        Self::with_gaps(provider, descriptors.iter().cloned().map(Some))
    }

    /// Allocate a layout where some positions are left unallocated
    pub fn with_gaps<I>(provider: ProviderId, descriptors: I) -> Self
    where
        I: IntoIterator<Item = Option<ControlDescriptor>>,
    {
        let controls: Vec<Option<AnyControl>> = descriptors
            .into_iter()
            .enumerate()
            .map(|(index, descriptor)| {
                descriptor.map(|descriptor| AnyControl::new(index, &descriptor, provider))
            })
            .collect();

        let hash_to_index = controls
            .iter()
            .flatten()
            .map(|control| (control.hash(), control.index()))
            .collect();

        Self {
            provider,
            controls,
            hash_to_index,
        }
    }

    /// Empty table with the same positions, names, kinds and enabled subset,
    /// owned by `provider`
    pub fn clone_layout(&self, provider: ProviderId) -> Self {
        let controls = self
            .controls
            .iter()
            .map(|slot| {
                slot.as_ref().map(|control| {
                    let mut copy = control.clone();
                    copy.rehome(provider);
                    copy
                })
            })
            .collect();

        Self {
            provider,
            controls,
            hash_to_index: self.hash_to_index.clone(),
        }
    }

    pub fn provider(&self) -> ProviderId {
        self.provider
    }

    /// Number of positions, allocated or not
    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// Control at `index`, `None` when out of range or unallocated
    pub fn get(&self, index: usize) -> Option<&AnyControl> {
        self.controls.get(index).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut AnyControl> {
        self.controls.get_mut(index).and_then(Option::as_mut)
    }

    /// Control at `index`
    ///
    /// # Panics
    /// Panics when `index` is outside the table or unallocated.
    pub fn control(&self, index: usize) -> &AnyControl {
        match &self.controls[index] {
            Some(control) => control,
            None => panic!("control position {} is not allocated", index),
        }
    }

    /// Mutable control at `index`
    ///
    /// # Panics
    /// Panics when `index` is outside the table or unallocated.
    pub fn control_mut(&mut self, index: usize) -> &mut AnyControl {
        match &mut self.controls[index] {
            Some(control) => control,
            None => panic!("control position {} is not allocated", index),
        }
    }

    /// Iterate allocated controls in position order
    pub fn iter(&self) -> impl Iterator<Item = &AnyControl> {
        self.controls.iter().flatten()
    }

    pub fn index_of_hash(&self, hash: ControlHash) -> Option<usize> {
        self.hash_to_index.get(&hash).copied()
    }

    pub fn hash_of_index(&self, index: usize) -> Option<ControlHash> {
        self.get(index).map(AnyControl::hash)
    }

    pub fn index_of_name(&self, name: &str) -> Option<usize> {
        self.iter()
            .find(|control| control.name() == name)
            .map(AnyControl::index)
    }

    /// Sorted hashes of every enabled control
    pub fn sorted_hashes(&self) -> Vec<ControlHash> {
        let mut hashes: Vec<ControlHash> = self
            .iter()
            .filter(|control| control.is_enabled())
            .map(AnyControl::hash)
            .collect();
        hashes.sort_unstable();
        hashes.dedup();
        hashes
    }

    /// Enable or disable a single position; false if it is not allocated
    pub fn set_enabled(&mut self, index: usize, enabled: bool) -> bool {
        match self.get_mut(index) {
            Some(control) => {
                control.set_enabled(enabled);
                true
            }
            None => false,
        }
    }

    /// Enable exactly the listed positions, disabling everything else
    pub fn enable_only(&mut self, indices: &[usize]) {
        for control in self.controls.iter_mut().flatten() {
            let enabled = indices.contains(&control.index());
            control.set_enabled(enabled);
        }
    }

    pub fn enable_all(&mut self) {
        for control in self.controls.iter_mut().flatten() {
            control.set_enabled(true);
        }
    }

    /// Event write at `index`; dropped when missing, disabled or mistyped
    pub fn apply(&mut self, index: usize, raw: Value, value: Value) -> bool {
        match self.get_mut(index) {
            Some(control) => control.set_from_event(raw, value),
            None => false,
        }
    }

    /// Relative event write at `index`
    pub fn accumulate(&mut self, index: usize, delta: Value) -> bool {
        match self.get_mut(index) {
            Some(control) => control.accumulate_from_event(delta),
            None => false,
        }
    }

    /// Advance every control once for the starting transition
    pub fn begin_update(&mut self, timeline: Timeline) {
        for control in self.controls.iter_mut().flatten() {
            control.advance(timeline);
        }
    }

    /// Put every control back to its default on both timelines
    pub fn reset(&mut self) {
        for control in self.controls.iter_mut().flatten() {
            control.reset();
        }
    }
}
