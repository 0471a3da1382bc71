//! Generated resource names

use uuid::Uuid;

/// Number of id characters appended to generated cluster names
pub const UNIQUE_ID_LEN: usize = 10;

/// Generate a cluster name that will not collide with parallel runs
///
/// The id comes from the random tail of a UUIDv7 so names stay short
/// enough for the EKS and IAM name limits.
pub fn unique_cluster_name(prefix: &str) -> String {
    let id = Uuid::now_v7().simple().to_string();
    format!("{prefix}-{}", &id[id.len() - UNIQUE_ID_LEN..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate_name;
    use std::collections::HashSet;

    #[test]
    fn test_unique_cluster_name() {
        let a = unique_cluster_name("terratest");

        assert!(a.starts_with("terratest-"));
        assert_eq!(a.len(), "terratest-".len() + UNIQUE_ID_LEN);
        assert!(a.chars().all(|c| !c.is_ascii_uppercase()));
        assert_eq!(validate_name(&a), Ok(()));
    }

    #[test]
    fn test_names_from_separate_threads_do_not_collide() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    (0..250)
                        .map(|_| unique_cluster_name("terratest"))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for name in handle.join().unwrap() {
                assert!(seen.insert(name));
            }
        }
        assert_eq!(seen.len(), 2000);
    }
}
