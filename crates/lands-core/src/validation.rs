//! Region validation
//!
//! Every rule is checked independently and all violations are collected, so a
//! caller can report the full list back to the user in one pass.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::region::Region;

/// Configured limits for region fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationLimits {
    pub max_id_length: usize,
    pub max_name_length: usize,
    pub max_description_length: usize,
    pub max_contact_length: usize,
    pub max_owner_length: usize,
    pub min_chunks_per_region: usize,
    pub max_chunks_per_region: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_id_length: 64,
            max_name_length: 64,
            max_description_length: 512,
            max_contact_length: 128,
            max_owner_length: 64,
            min_chunks_per_region: 1,
            max_chunks_per_region: 10_000,
        }
    }
}

impl ValidationLimits {
    pub fn with_chunk_range(mut self, min: usize, max: usize) -> Self {
        self.min_chunks_per_region = min;
        self.max_chunks_per_region = max;
        self
    }
}

/// Outcome of validating a region
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Success,
    Failure(Vec<String>),
}

impl ValidationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    pub fn errors(&self) -> &[String] {
        match self {
            Self::Success => &[],
            Self::Failure(errors) => errors,
        }
    }

    pub fn into_errors(self) -> Vec<String> {
        match self {
            Self::Success => Vec::new(),
            Self::Failure(errors) => errors,
        }
    }
}

/// Stateless rule engine over a region's fields and tiles
#[derive(Debug, Clone, Default)]
pub struct RegionValidator {
    limits: ValidationLimits,
}

impl RegionValidator {
    pub fn new(limits: ValidationLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &ValidationLimits {
        &self.limits
    }

    /// Whether `id` matches `[a-zA-Z0-9_-]{1,max}`
    pub fn is_valid_id(&self, id: &str) -> bool {
        let len = id.chars().count();
        len >= 1
            && len <= self.limits.max_id_length
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }

    /// Check a region against the configured limits
    ///
    /// An empty `allowed_worlds` set disables the world allow-list.
    pub fn validate(&self, region: &Region, allowed_worlds: &HashSet<String>) -> ValidationResult {
        let mut errors = Vec::new();

        self.check_id(&region.id, &mut errors);
        self.check_required("Region name", &region.name, self.limits.max_name_length, &mut errors);
        self.check_optional(
            "Description",
            &region.description,
            self.limits.max_description_length,
            &mut errors,
        );
        self.check_required("Owner", &region.owner, self.limits.max_owner_length, &mut errors);
        self.check_optional(
            "Contact",
            &region.contact,
            self.limits.max_contact_length,
            &mut errors,
        );
        check_world(&region.world, allowed_worlds, &mut errors);
        self.check_chunks(region, &mut errors);

        if errors.is_empty() {
            ValidationResult::Success
        } else {
            ValidationResult::Failure(errors)
        }
    }

    fn check_id(&self, id: &str, errors: &mut Vec<String>) {
        if id.trim().is_empty() {
            errors.push("Region ID cannot be blank".to_string());
        } else if !self.is_valid_id(id) {
            errors.push(format!(
                "Region ID must contain only letters, numbers, hyphens, and underscores (1-{} characters)",
                self.limits.max_id_length
            ));
        }
    }

    fn check_required(&self, field: &str, value: &str, max: usize, errors: &mut Vec<String>) {
        if value.trim().is_empty() {
            errors.push(format!("{field} cannot be blank"));
            return;
        }
        self.check_optional(field, value, max, errors);
    }

    fn check_optional(&self, field: &str, value: &str, max: usize, errors: &mut Vec<String>) {
        if value.chars().count() > max {
            errors.push(format!("{field} exceeds maximum length of {max} characters"));
        }
        if contains_control_characters(value) {
            errors.push(format!("{field} contains invalid control characters"));
        }
    }

    fn check_chunks(&self, region: &Region, errors: &mut Vec<String>) {
        let count = region.chunks.len();
        let min = self.limits.min_chunks_per_region;
        let max = self.limits.max_chunks_per_region;

        if count < min {
            errors.push(format!(
                "Region must have at least {min} chunk(s) (has {count})"
            ));
        }
        if count > max {
            errors.push(format!(
                "Region exceeds maximum chunk count of {max} (has {count})"
            ));
        }

        let mut seen = HashSet::with_capacity(count);
        if region.chunks.iter().any(|key| !seen.insert(*key)) {
            errors.push("Region contains duplicate chunks".to_string());
        }
    }
}

fn check_world(world: &str, allowed_worlds: &HashSet<String>, errors: &mut Vec<String>) {
    if world.trim().is_empty() {
        errors.push("World name cannot be blank".to_string());
        return;
    }

    if !allowed_worlds.is_empty() && !allowed_worlds.contains(world) {
        let mut allowed: Vec<&str> = allowed_worlds.iter().map(String::as_str).collect();
        allowed.sort_unstable();
        errors.push(format!(
            "World '{world}' is not in the allowed worlds list: {}",
            allowed.join(", ")
        ));
    }
}

/// Control characters other than line breaks and tabs
fn contains_control_characters(text: &str) -> bool {
    text.chars()
        .any(|c| c.is_control() && c != '\n' && c != '\r' && c != '\t')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_region() -> Region {
        Region::new("spawn_town-1", "Spawn Town", "admin", "world")
            .with_description("The main spawn area\nfor new players")
            .with_contact("admin@example.com")
            .with_tiles([(0, 0), (16, 0)])
    }

    fn no_worlds() -> HashSet<String> {
        HashSet::new()
    }

    #[test]
    fn test_valid_region_passes() {
        let validator = RegionValidator::default();
        assert!(validator.validate(&valid_region(), &no_worlds()).is_success());
    }

    #[test]
    fn test_zero_chunks_fails_minimum() {
        let validator = RegionValidator::default();
        let mut region = valid_region();
        region.chunks.clear();

        let result = validator.validate(&region, &no_worlds());
        assert_eq!(result.errors().len(), 1);
        assert!(result.errors()[0].contains("at least 1"));
    }

    #[test]
    fn test_one_over_maximum_fails() {
        let validator = RegionValidator::new(ValidationLimits::default().with_chunk_range(1, 4));
        let region = valid_region().with_tiles([(32, 0), (48, 0), (64, 0)]);
        assert_eq!(region.chunks.len(), 5);

        let result = validator.validate(&region, &no_worlds());
        assert!(result.errors().iter().any(|e| e.contains("maximum chunk count of 4")));
    }

    #[test]
    fn test_exactly_maximum_passes() {
        let validator = RegionValidator::new(ValidationLimits::default().with_chunk_range(1, 2));
        assert!(validator.validate(&valid_region(), &no_worlds()).is_success());
    }

    #[test]
    fn test_id_with_space_fails_pattern() {
        let validator = RegionValidator::default();
        let mut region = valid_region();
        region.id = "spawn town".to_string();

        let result = validator.validate(&region, &no_worlds());
        assert!(result.errors()[0].starts_with("Region ID must contain only"));
    }

    #[test]
    fn test_id_too_long_fails() {
        let validator = RegionValidator::default();
        assert!(validator.is_valid_id(&"a".repeat(64)));
        assert!(!validator.is_valid_id(&"a".repeat(65)));
        assert!(!validator.is_valid_id(""));
    }

    #[test]
    fn test_duplicate_chunks_fail() {
        let validator = RegionValidator::default();
        let region = valid_region().with_tiles([(0, 0)]);

        let result = validator.validate(&region, &no_worlds());
        assert_eq!(result.errors(), ["Region contains duplicate chunks"]);
    }

    #[test]
    fn test_errors_are_collected_not_short_circuited() {
        let validator = RegionValidator::default();
        let region = Region {
            id: " ".to_string(),
            name: String::new(),
            description: "bad\u{0007}bell".to_string(),
            owner: "o".repeat(65),
            contact: "c".repeat(129),
            world: String::new(),
            chunks: Vec::new(),
        };

        let errors = validator.validate(&region, &no_worlds()).into_errors();
        assert_eq!(errors.len(), 7);
        assert!(errors.contains(&"Region ID cannot be blank".to_string()));
        assert!(errors.contains(&"Region name cannot be blank".to_string()));
        assert!(errors.contains(&"World name cannot be blank".to_string()));
    }

    #[test]
    fn test_allowed_whitespace_is_not_control() {
        let validator = RegionValidator::default();
        let mut region = valid_region();
        region.description = "tab\there\r\nnext line".to_string();
        assert!(validator.validate(&region, &no_worlds()).is_success());

        region.name = "nul\0name".to_string();
        let result = validator.validate(&region, &no_worlds());
        assert_eq!(result.errors(), ["Region name contains invalid control characters"]);
    }

    #[test]
    fn test_world_allow_list() {
        let validator = RegionValidator::default();
        let allowed: HashSet<String> = ["world_nether".to_string()].into_iter().collect();

        let result = validator.validate(&valid_region(), &allowed);
        assert!(result.errors()[0].contains("not in the allowed worlds list"));

        let mut region = valid_region();
        region.world = "world_nether".to_string();
        assert!(validator.validate(&region, &allowed).is_success());
    }
}
