//! AWS resource tag constants and tag-set merging
//!
//! Every harness-created cluster carries the default tag set below so
//! orphaned clusters can be traced back to the run that created them.
//!
//! ## Tag Schema
//!
//! | Tag Key | Description |
//! |---------|-------------|
//! | `ManagedBy` | Static identifier ("eks-harness") |
//! | `Environment` | Environment name (e.g. "terratest") |
//! | `eks-harness:run-id` | Unique run identifier |
//! | `eks-harness:created-at` | RFC 3339 creation timestamp |

use std::collections::HashMap;

/// Tag key identifying the tool that manages the resource
pub const TAG_MANAGED_BY: &str = "ManagedBy";

/// Tag value for [`TAG_MANAGED_BY`]
pub const TAG_MANAGED_BY_VALUE: &str = "eks-harness";

/// Tag key for the environment name
pub const TAG_ENVIRONMENT: &str = "Environment";

/// Tag key for run ID - unique identifier per harness run
pub const TAG_RUN_ID: &str = "eks-harness:run-id";

/// Tag key for creation timestamp (RFC 3339 format)
pub const TAG_CREATED_AT: &str = "eks-harness:created-at";

/// Merge two tag sets, custom values winning on key collisions.
///
/// Absent inputs are treated as empty maps, so this never fails.
pub fn merge_tags(
    default_tags: Option<&HashMap<String, String>>,
    custom_tags: Option<&HashMap<String, String>>,
) -> HashMap<String, String> {
    let mut merged = default_tags.cloned().unwrap_or_default();
    if let Some(custom) = custom_tags {
        merged.extend(custom.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    merged
}

/// Build the standard tag set for a harness run.
pub fn default_tags(environment: &str, run_id: &str) -> HashMap<String, String> {
    HashMap::from([
        (TAG_MANAGED_BY.to_string(), TAG_MANAGED_BY_VALUE.to_string()),
        (TAG_ENVIRONMENT.to_string(), environment.to_string()),
        (TAG_RUN_ID.to_string(), run_id.to_string()),
        (
            TAG_CREATED_AT.to_string(),
            format_created_at(chrono::Utc::now()),
        ),
    ])
}

/// Creation timestamp as stored in the [`TAG_CREATED_AT`] tag
fn format_created_at(time: chrono::DateTime<chrono::Utc>) -> String {
    time.to_rfc3339()
}
