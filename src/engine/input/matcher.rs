// Device-slot matching: pick the control scheme and devices that fit best

use super::control::ControlHash;
use super::device::Device;
use super::event::DeviceId;
use super::layout::DeviceType;
use super::provider::ControlProvider;
use super::scheme::{ControlScheme, DeviceSlot};

/// What the matcher needs to know about one available device
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCandidate {
    pub id: DeviceId,
    pub device_type: DeviceType,
    pub tags: Vec<String>,
    /// Hashes of the enabled controls, sorted
    pub hashes: Vec<ControlHash>,
    pub last_event_time: f64,
}

impl DeviceCandidate {
    pub fn from_device(device: &Device) -> Self {
        Self {
            id: device.id(),
            device_type: device.device_type(),
            tags: device.tags().to_vec(),
            hashes: device.state().sorted_hashes(),
            last_event_time: device.last_event_time(),
        }
    }

    fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// The chosen scheme and one device per slot, in slot order
#[derive(Debug, Clone, PartialEq)]
pub struct SchemeMatch {
    pub scheme_index: usize,
    pub devices: Vec<DeviceId>,
}

/// Score a device's sorted hashes against a slot's sorted needs
///
/// Every needed hash the device lacks costs one point; extra hashes are
/// free. Zero means fully supported.
pub fn compatibility_score(needed: &[ControlHash], provided: &[ControlHash]) -> i32 {
    let mut score = 0;
    let mut provided = provided.iter().peekable();
    for hash in needed {
        while provided.next_if(|candidate| *candidate < hash).is_some() {}
        if provided.next_if(|candidate| *candidate == hash).is_none() {
            score -= 1;
        }
    }
    score
}

/// Whether `device` may fill `slot`
fn accepts(slot: &DeviceSlot, device: &DeviceCandidate) -> bool {
    if let Some(tag) = &slot.tag {
        if !device.has_tag(tag) {
            return false;
        }
    }
    let needed = slot.used_control_hashes();
    if needed.is_empty() {
        device.device_type.satisfies(slot.device_type)
    } else {
        compatibility_score(needed, &device.hashes) >= 0
    }
}

/// Fill every slot of `scheme`, or `None` if any slot stays empty
fn assign(
    scheme: &ControlScheme,
    devices: &[DeviceCandidate],
    required: &[DeviceId],
) -> Option<Vec<usize>> {
    let mut assigned: Vec<usize> = Vec::with_capacity(scheme.slots().len());

    for slot in scheme.slots() {
        let candidates = devices
            .iter()
            .enumerate()
            .filter(|(position, _)| !assigned.contains(position))
            .filter(|(_, device)| accepts(slot, device));

        let mut best: Option<(usize, &DeviceCandidate)> = None;
        for (position, device) in candidates {
            if required.contains(&device.id) {
                best = Some((position, device));
                break;
            }
            // Strict comparison keeps the first device on ties
            if best.map_or(true, |(_, current)| device.last_event_time > current.last_event_time) {
                best = Some((position, device));
            }
        }

        let (position, _) = best?;
        assigned.push(position);
    }

    let complete = required
        .iter()
        .all(|id| assigned.iter().any(|position| devices[*position].id == *id));
    complete.then_some(assigned)
}

/// Choose the scheme whose assignment saw input most recently
///
/// `required` devices must all appear in the chosen assignment. Schemes
/// with equal recency resolve to the one declared first.
pub fn find_best_match(
    devices: &[DeviceCandidate],
    schemes: &[ControlScheme],
    required: &[DeviceId],
) -> Option<SchemeMatch> {
    let mut best: Option<(f64, SchemeMatch)> = None;

    for (scheme_index, scheme) in schemes.iter().enumerate() {
        let Some(assigned) = assign(scheme, devices, required) else {
            log::debug!("Scheme '{}' cannot be filled", scheme.name);
            continue;
        };

        let recency = assigned
            .iter()
            .map(|position| devices[*position].last_event_time)
            .fold(f64::NEG_INFINITY, f64::max);

        if best.as_ref().map_or(true, |(time, _)| recency > *time) {
            let ids: Vec<DeviceId> =
                assigned.iter().map(|position| devices[*position].id).collect();
            best = Some((
                recency,
                SchemeMatch {
                    scheme_index,
                    devices: ids,
                },
            ));
        }
    }

    best.map(|(_, found)| found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::input::binding::{Binding, CombinedBinding, SlotKey};
    use crate::engine::input::value::ControlKind;

    fn hashes(ids: &[u32]) -> Vec<ControlHash> {
        ids.iter().map(|id| ControlHash(*id)).collect()
    }

    fn candidate(id: u32, device_type: DeviceType, time: f64) -> DeviceCandidate {
        DeviceCandidate {
            id: DeviceId(id),
            device_type,
            tags: Vec::new(),
            hashes: Vec::new(),
            last_event_time: time,
        }
    }

    fn single_slot(name: &str, device_type: DeviceType) -> ControlScheme {
        ControlScheme::new(name).with_slot(DeviceSlot::new(SlotKey(0), device_type))
    }

    #[test]
    fn test_compatibility_score() {
        let provided = hashes(&[1, 2, 3]);
        assert_eq!(compatibility_score(&hashes(&[1, 2]), &provided), 0);
        assert_eq!(compatibility_score(&hashes(&[1, 2, 4]), &provided), -1);
        assert_eq!(compatibility_score(&hashes(&[4, 5, 6]), &provided), -3);
        assert_eq!(compatibility_score(&hashes(&[7, 8]), &[]), -2);
        assert_eq!(compatibility_score(&[], &provided), 0);
    }

    #[test]
    fn test_most_recent_scheme_wins() {
        let devices = [
            candidate(1, DeviceType::Keyboard, 5.0),
            candidate(2, DeviceType::Gamepad, 9.0),
        ];
        let schemes = [
            single_slot("Keyboard", DeviceType::Keyboard),
            single_slot("Gamepad", DeviceType::Gamepad),
        ];
        let found = find_best_match(&devices, &schemes, &[]).unwrap();
        assert_eq!(found.scheme_index, 1);
        assert_eq!(found.devices, vec![DeviceId(2)]);
    }

    #[test]
    fn test_equal_recency_keeps_declaration_order() {
        let devices = [
            candidate(1, DeviceType::Keyboard, 3.0),
            candidate(2, DeviceType::Gamepad, 3.0),
        ];
        let schemes = [
            single_slot("Gamepad", DeviceType::Gamepad),
            single_slot("Keyboard", DeviceType::Keyboard),
        ];
        for _ in 0..3 {
            let found = find_best_match(&devices, &schemes, &[]).unwrap();
            assert_eq!(found.scheme_index, 0);
        }
    }

    #[test]
    fn test_required_device_is_pinned() {
        let devices = [
            candidate(1, DeviceType::Gamepad, 9.0),
            candidate(2, DeviceType::Gamepad, 1.0),
        ];
        let schemes = [single_slot("Gamepad", DeviceType::Gamepad)];

        let found = find_best_match(&devices, &schemes, &[]).unwrap();
        assert_eq!(found.devices, vec![DeviceId(1)]);

        let found = find_best_match(&devices, &schemes, &[DeviceId(2)]).unwrap();
        assert_eq!(found.devices, vec![DeviceId(2)]);
    }

    #[test]
    fn test_scheme_missing_required_device_is_rejected() {
        let devices = [
            candidate(1, DeviceType::Keyboard, 9.0),
            candidate(2, DeviceType::Pointer, 1.0),
        ];
        let schemes = [
            single_slot("KeyboardOnly", DeviceType::Keyboard),
            ControlScheme::new("KeyboardMouse")
                .with_slot(DeviceSlot::new(SlotKey(0), DeviceType::Keyboard))
                .with_slot(DeviceSlot::new(SlotKey(1), DeviceType::Pointer)),
        ];
        let found = find_best_match(&devices, &schemes, &[DeviceId(2)]).unwrap();
        assert_eq!(found.scheme_index, 1);
        assert_eq!(found.devices, vec![DeviceId(1), DeviceId(2)]);

        let keyboard_only = &schemes[..1];
        assert!(find_best_match(&devices, keyboard_only, &[DeviceId(2)]).is_none());
    }

    #[test]
    fn test_device_used_once_per_scheme() {
        let devices = [candidate(1, DeviceType::Gamepad, 1.0)];
        let schemes = [ControlScheme::new("TwoPads")
            .with_slot(DeviceSlot::new(SlotKey(0), DeviceType::Gamepad))
            .with_slot(DeviceSlot::new(SlotKey(1), DeviceType::Gamepad))];
        assert!(find_best_match(&devices, &schemes, &[]).is_none());
    }

    #[test]
    fn test_tag_filter_applies_before_scoring() {
        let mut left = candidate(1, DeviceType::TrackedController, 8.0);
        left.tags.push("Left".into());
        let mut right = candidate(2, DeviceType::TrackedController, 2.0);
        right.tags.push("Right".into());
        let schemes = [ControlScheme::new("RightHand").with_slot(
            DeviceSlot::new(SlotKey(0), DeviceType::TrackedController).with_tag("Right"),
        )];
        let found = find_best_match(&[left, right], &schemes, &[]).unwrap();
        assert_eq!(found.devices, vec![DeviceId(2)]);
    }

    #[test]
    fn test_hash_requirements_replace_type_check() {
        let needed = ControlHash::new("Trigger", ControlKind::Axis);
        let scheme = ControlScheme::new("Trigger")
            .with_slot(DeviceSlot::new(SlotKey(0), DeviceType::Joystick))
            .with_binding(
                "Fire",
                CombinedBinding::new(ControlKind::Axis)
                    .with_source(Binding::control(SlotKey(0), "Trigger", ControlKind::Axis)),
            )
            .unwrap();

        let mut lacking = candidate(1, DeviceType::Joystick, 9.0);
        lacking.hashes = hashes(&[1, 2]);
        let mut providing = candidate(2, DeviceType::TrackedController, 1.0);
        providing.hashes = vec![needed];

        let found = find_best_match(&[lacking, providing], &[scheme], &[]).unwrap();
        assert_eq!(found.devices, vec![DeviceId(2)]);
    }

    #[test]
    fn test_no_devices_no_match() {
        let schemes = [single_slot("Keyboard", DeviceType::Keyboard)];
        assert!(find_best_match(&[], &schemes, &[]).is_none());
    }
}
