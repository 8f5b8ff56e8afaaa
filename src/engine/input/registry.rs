// Profile registry: resolves device descriptor strings to profiles

use super::profile::DeviceProfile;
use super::InputError;
use regex::Regex;
use std::sync::Arc;

/// One registered profile with its descriptor patterns
#[derive(Debug, Clone)]
struct ProfileEntry {
    profile: Arc<DeviceProfile>,
    /// Tried in order during the first pass
    match_patterns: Vec<Regex>,
    /// Only tried once no entry matched in the first pass
    last_resort: Option<Regex>,
    /// Descriptors matching this never get this profile
    never_match: Option<Regex>,
}

impl ProfileEntry {
    fn excludes(&self, descriptor: &str) -> bool {
        self.never_match
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(descriptor))
    }
}

/// Ordered collection of profiles with regex descriptor matching
#[derive(Debug, Default)]
pub struct ProfileRegistry {
    entries: Vec<ProfileEntry>,
}

impl ProfileRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a profile
    ///
    /// Patterns are compiled here so a bad pattern is reported at startup
    /// rather than while resolving devices.
    pub fn register(
        &mut self,
        profile: DeviceProfile,
        match_patterns: &[&str],
        last_resort: Option<&str>,
        never_match: Option<&str>,
    ) -> Result<(), InputError> {
        let match_patterns = match_patterns
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;
        let last_resort = last_resort.map(Regex::new).transpose()?;
        let never_match = never_match.map(Regex::new).transpose()?;

        log::debug!("Registered device profile '{}'", profile.name());
        self.entries.push(ProfileEntry {
            profile: Arc::new(profile),
            match_patterns,
            last_resort,
            never_match,
        });
        Ok(())
    }

    /// Find the profile for a device descriptor
    ///
    /// Exclusions are checked first, then every entry's ordered patterns,
    /// then the last-resort patterns.
    pub fn resolve(&self, descriptor: &str) -> Option<Arc<DeviceProfile>> {
        let candidates = || self.entries.iter().filter(|entry| !entry.excludes(descriptor));

        candidates()
            .find(|entry| {
                entry
                    .match_patterns
                    .iter()
                    .any(|pattern| pattern.is_match(descriptor))
            })
            .or_else(|| {
                candidates().find(|entry| {
                    entry
                        .last_resort
                        .as_ref()
                        .is_some_and(|pattern| pattern.is_match(descriptor))
                })
            })
            .map(|entry| Arc::clone(&entry.profile))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ProfileRegistry {
        let mut registry = ProfileRegistry::new();
        registry
            .register(
                DeviceProfile::new("Xbox"),
                &["(?i)xbox", "(?i)xinput"],
                Some("(?i)controller"),
                Some("(?i)virtual"),
            )
            .unwrap();
        registry
            .register(
                DeviceProfile::new("DualShock"),
                &["(?i)wireless controller", "054c"],
                None,
                None,
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_exact_match() {
        let registry = registry();
        let profile = registry.resolve("Microsoft Xbox One Pad").unwrap();
        assert_eq!(profile.name(), "Xbox");
    }

    #[test]
    fn test_exact_patterns_beat_last_resort() {
        // Both "controller" (Xbox last resort) and "wireless controller" match
        let registry = registry();
        let profile = registry.resolve("Wireless Controller").unwrap();
        assert_eq!(profile.name(), "DualShock");
    }

    #[test]
    fn test_last_resort_fallback() {
        let registry = registry();
        let profile = registry.resolve("Some Generic Controller").unwrap();
        assert_eq!(profile.name(), "Xbox");
    }

    #[test]
    fn test_never_match_excludes() {
        let registry = registry();
        assert!(registry.resolve("Virtual Xbox Bridge").is_none());
    }

    #[test]
    fn test_unknown_descriptor() {
        let registry = registry();
        assert!(registry.resolve("USB Keyboard").is_none());
    }

    #[test]
    fn test_bad_pattern_is_reported() {
        let mut registry = ProfileRegistry::new();
        let result = registry.register(DeviceProfile::new("Broken"), &["(unclosed"], None, None);
        assert!(matches!(result, Err(InputError::Pattern(_))));
        assert!(registry.is_empty());
    }
}
