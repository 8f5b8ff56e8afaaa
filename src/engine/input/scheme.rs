// Control schemes: device slot requirements plus the bindings that use them

use super::binding::{Binding, CombinedBinding, SlotKey};
use super::control::ControlHash;
use super::layout::DeviceType;
use super::value::ControlKind;
use super::InputError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One device a scheme needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSlot {
    pub key: SlotKey,
    pub device_type: DeviceType,
    /// Capability tag the device must carry, such as "Left"
    #[serde(default)]
    pub tag: Option<String>,
    /// Hashes the bindings read from this slot, sorted and deduplicated
    #[serde(skip)]
    used_control_hashes: Vec<ControlHash>,
}

impl DeviceSlot {
    pub fn new(key: SlotKey, device_type: DeviceType) -> Self {
        Self {
            key,
            device_type,
            tag: None,
            used_control_hashes: Vec::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn used_control_hashes(&self) -> &[ControlHash] {
        &self.used_control_hashes
    }
}

/// A named set of device slots and per-action bindings
///
/// Bindings persist through [`ControlScheme::bindings_to_json`]; slots are
/// declared in code.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlScheme {
    pub name: String,
    slots: Vec<DeviceSlot>,
    /// Binding root per action name
    bindings: BTreeMap<String, CombinedBinding>,
}

impl ControlScheme {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: Vec::new(),
            bindings: BTreeMap::new(),
        }
    }

    pub fn with_slot(mut self, slot: DeviceSlot) -> Self {
        self.slots.push(slot);
        self.refresh_used_hashes();
        self
    }

    /// Builder form of [`ControlScheme::bind`]
    pub fn with_binding(
        mut self,
        action: &str,
        binding: CombinedBinding,
    ) -> Result<Self, InputError> {
        self.bind(action, binding)?;
        Ok(self)
    }

    pub fn slots(&self) -> &[DeviceSlot] {
        &self.slots
    }

    pub fn slot_keys(&self) -> Vec<SlotKey> {
        self.slots.iter().map(|slot| slot.key).collect()
    }

    pub fn slot(&self, key: SlotKey) -> Option<&DeviceSlot> {
        self.slots.iter().find(|slot| slot.key == key)
    }

    pub fn binding(&self, action: &str) -> Option<&CombinedBinding> {
        self.bindings.get(action)
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&str, &CombinedBinding)> {
        self.bindings.iter().map(|(action, binding)| (action.as_str(), binding))
    }

    /// Set the whole binding root of `action`
    pub fn bind(&mut self, action: &str, binding: CombinedBinding) -> Result<(), InputError> {
        check_kinds(action, &binding)?;
        self.bindings.insert(action.to_string(), binding);
        self.refresh_used_hashes();
        Ok(())
    }

    /// Replace one alternative source of `action`
    ///
    /// `source` equal to the current source count appends a new
    /// alternative.
    pub fn rebind(
        &mut self,
        action: &str,
        source: usize,
        binding: Binding,
    ) -> Result<(), InputError> {
        let root = self
            .bindings
            .get_mut(action)
            .ok_or_else(|| InputError::UnknownAction(action.to_string()))?;

        if let Some((expected, actual)) = binding.mismatch(root.kind) {
            return Err(InputError::BindingKind {
                action: action.to_string(),
                expected,
                actual,
            });
        }

        match source.cmp(&root.sources.len()) {
            std::cmp::Ordering::Less => root.sources[source] = binding,
            std::cmp::Ordering::Equal => root.sources.push(binding),
            std::cmp::Ordering::Greater => {
                return Err(InputError::SourceOutOfRange {
                    action: action.to_string(),
                    index: source,
                })
            }
        }

        log::info!("Rebound '{}' source {} in scheme '{}'", action, source, self.name);
        self.refresh_used_hashes();
        Ok(())
    }

    /// Remove the binding of `action`, returning it
    pub fn unbind(&mut self, action: &str) -> Option<CombinedBinding> {
        let removed = self.bindings.remove(action);
        if removed.is_some() {
            self.refresh_used_hashes();
        }
        removed
    }

    /// Slot that a device of `device_type` with `tags` could fill
    pub fn slot_for_device(
        &self,
        device_type: DeviceType,
        tags: &[String],
    ) -> Option<&DeviceSlot> {
        self.slots.iter().find(|slot| {
            device_type.satisfies(slot.device_type)
                && slot
                    .tag
                    .as_ref()
                    .map_or(true, |tag| tags.iter().any(|t| t.eq_ignore_ascii_case(tag)))
        })
    }

    /// Save every binding root as JSON
    pub fn bindings_to_json(&self) -> Result<String, InputError> {
        Ok(serde_json::to_string_pretty(&self.bindings)?)
    }

    /// Replace every binding root from JSON written by
    /// [`ControlScheme::bindings_to_json`]
    pub fn bindings_from_json(&mut self, json: &str) -> Result<(), InputError> {
        let bindings: BTreeMap<String, CombinedBinding> = serde_json::from_str(json)?;
        for (action, binding) in &bindings {
            check_kinds(action, binding)?;
        }
        self.bindings = bindings;
        self.refresh_used_hashes();
        Ok(())
    }

    /// Recompute each slot's used hashes from the current bindings
    fn refresh_used_hashes(&mut self) {
        let mut used: BTreeMap<SlotKey, Vec<ControlHash>> = BTreeMap::new();
        for binding in self.bindings.values() {
            for source in &binding.sources {
                source.for_each_reference(&mut |reference| {
                    used.entry(reference.slot).or_default().push(reference.hash);
                });
            }
        }
        for slot in &mut self.slots {
            let mut hashes = used.remove(&slot.key).unwrap_or_default();
            hashes.sort_unstable();
            hashes.dedup();
            slot.used_control_hashes = hashes;
        }
    }

    /// Kind of the binding root of `action`, if bound
    pub fn action_kind(&self, action: &str) -> Option<ControlKind> {
        self.bindings.get(action).map(|binding| binding.kind)
    }
}

/// Reject a root whose tree would read the wrong kind of value anywhere
fn check_kinds(action: &str, binding: &CombinedBinding) -> Result<(), InputError> {
    match binding.mismatch() {
        Some((expected, actual)) => Err(InputError::BindingKind {
            action: action.to_string(),
            expected,
            actual,
        }),
        None => Ok(()),
    }
}
