//! Pure validators for cluster configuration fields
//!
//! Each check is independent of the others: it performs no I/O, reads no
//! shared state, and can be run in any order. The first violated constraint
//! is returned as a [`ValidationError`].

use crate::defaults::MAX_CLUSTER_NAME_LEN;
use crate::error::ValidationError;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9-]*$").expect("valid name regex"));

// ASCII digits only; `\d` would also accept other Unicode digits.
static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^1\.[0-9]{1,2}$").expect("valid version regex"));

static INSTANCE_TYPE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z0-9]+\.[a-z0-9]+$").expect("valid instance type regex")
});

/// Check that a cluster name is acceptable to EKS.
///
/// Names are 1-100 characters of ASCII letters, digits and hyphens, and must
/// start with a letter or digit.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }

    if name.len() > MAX_CLUSTER_NAME_LEN {
        return Err(ValidationError::NameTooLong(name.len()));
    }

    if !NAME_PATTERN.is_match(name) {
        return Err(ValidationError::InvalidNameFormat(name.to_string()));
    }

    Ok(())
}

/// Check that a Kubernetes version is `1.X` or `1.XX`, without patch or prefix.
pub fn validate_version(version: &str) -> Result<(), ValidationError> {
    if version.is_empty() {
        return Err(ValidationError::EmptyVersion);
    }

    if !VERSION_PATTERN.is_match(version) {
        return Err(ValidationError::InvalidVersionFormat(version.to_string()));
    }

    Ok(())
}

/// Check the subnet count and that no subnet ID is blank.
///
/// Whitespace-only IDs count as empty.
pub fn validate_subnets<S: AsRef<str>>(
    subnets: &[S],
    min_required: usize,
) -> Result<(), ValidationError> {
    if subnets.len() < min_required {
        return Err(ValidationError::InsufficientSubnets {
            have: subnets.len(),
            need: min_required,
        });
    }

    if let Some(index) = subnets.iter().position(|s| s.as_ref().trim().is_empty()) {
        return Err(ValidationError::EmptySubnet { index });
    }

    Ok(())
}

/// Check that a tag map is present and carries every required key.
///
/// `None` is an error; an empty map only fails if keys are required.
pub fn validate_tags<S: AsRef<str>>(
    tags: Option<&HashMap<String, String>>,
    required_keys: &[S],
) -> Result<(), ValidationError> {
    let tags = tags.ok_or(ValidationError::NilTagMap)?;

    for key in required_keys {
        let key = key.as_ref();
        if !tags.contains_key(key) {
            return Err(ValidationError::MissingRequiredTag(key.to_string()));
        }
    }

    Ok(())
}

/// Check that at least one instance type is given and each looks like
/// `family.size` (e.g. `t3.medium`, `m5.large`).
pub fn validate_instance_types<S: AsRef<str>>(types: &[S]) -> Result<(), ValidationError> {
    if types.is_empty() {
        return Err(ValidationError::NoInstanceTypes);
    }

    if let Some(bad) = types
        .iter()
        .map(AsRef::as_ref)
        .find(|t| !INSTANCE_TYPE_PATTERN.is_match(t))
    {
        return Err(ValidationError::InvalidInstanceType(bad.to_string()));
    }

    Ok(())
}

/// Check node group sizing: `0 <= min <= desired <= max`.
pub fn validate_node_group_size(min: i32, max: i32, desired: i32) -> Result<(), ValidationError> {
    if min < 0 {
        return Err(ValidationError::NegativeMinSize(min));
    }

    if max < min {
        return Err(ValidationError::MaxLessThanMin { min, max });
    }

    if desired < min {
        return Err(ValidationError::DesiredBelowMin { desired, min });
    }

    if desired > max {
        return Err(ValidationError::DesiredAboveMax { desired, max });
    }

    Ok(())
}
