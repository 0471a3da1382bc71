//! Parsing of `terraform output -json`

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;

pub const OUTPUT_ENDPOINT: &str = "cluster_endpoint";
pub const OUTPUT_CA_DATA: &str = "cluster_certificate_authority_data";
pub const OUTPUT_NAME: &str = "cluster_name";
pub const OUTPUT_VERSION: &str = "cluster_version";

/// One entry of `terraform output -json`
#[derive(Debug, Deserialize)]
struct OutputValue {
    value: serde_json::Value,
    #[serde(default)]
    sensitive: bool,
}

/// Module outputs the harness relies on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterOutputs {
    pub endpoint: String,
    pub certificate_authority_data: String,
    pub cluster_name: String,
    pub cluster_version: String,
}

impl ClusterOutputs {
    /// Parse the JSON printed by `terraform output -json`
    pub fn parse(json: &str) -> Result<Self> {
        let outputs: HashMap<String, OutputValue> =
            serde_json::from_str(json).context("Failed to parse terraform output JSON")?;

        let get = |key: &str| -> Result<String> {
            let output = outputs
                .get(key)
                .with_context(|| format!("terraform output {key} is missing"))?;
            match &output.value {
                serde_json::Value::String(s) => Ok(s.clone()),
                serde_json::Value::Null => Ok(String::new()),
                other => anyhow::bail!(
                    "terraform output {key} is not a string (sensitive: {}): {other}",
                    output.sensitive
                ),
            }
        };

        Ok(Self {
            endpoint: get(OUTPUT_ENDPOINT)?,
            certificate_authority_data: get(OUTPUT_CA_DATA)?,
            cluster_name: get(OUTPUT_NAME)?,
            cluster_version: get(OUTPUT_VERSION)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: &str = r#"{
        "cluster_certificate_authority_data": {"sensitive": false, "type": "string", "value": "LS0tLS1CRUdJTg=="},
        "cluster_endpoint": {"sensitive": false, "type": "string", "value": "https://ABC.gr7.us-west-1.eks.amazonaws.com"},
        "cluster_name": {"sensitive": false, "type": "string", "value": "terratest-abc"},
        "cluster_version": {"sensitive": false, "type": "string", "value": "1.29"},
        "oidc_provider_arn": {"sensitive": false, "type": "string", "value": "arn:aws:iam::123:oidc-provider/x"}
    }"#;

    #[test]
    fn test_parse_outputs() {
        let outputs = ClusterOutputs::parse(OUTPUT).unwrap();
        assert_eq!(outputs.cluster_name, "terratest-abc");
        assert_eq!(outputs.cluster_version, "1.29");
        assert_eq!(
            outputs.endpoint,
            "https://ABC.gr7.us-west-1.eks.amazonaws.com"
        );
        assert_eq!(outputs.certificate_authority_data, "LS0tLS1CRUdJTg==");
    }

    #[test]
    fn test_missing_output() {
        let err = ClusterOutputs::parse(r#"{"cluster_name": {"value": "x"}}"#).unwrap_err();
        assert!(err.to_string().contains("cluster_endpoint"));
    }

    #[test]
    fn test_empty_state_is_an_error() {
        assert!(ClusterOutputs::parse("{}").is_err());
        assert!(ClusterOutputs::parse("not json").is_err());
    }

    #[test]
    fn test_non_string_output() {
        let json = r#"{
            "cluster_endpoint": {"value": ["a"]},
            "cluster_certificate_authority_data": {"value": "x"},
            "cluster_name": {"value": "x"},
            "cluster_version": {"value": "1.29"}
        }"#;
        let err = ClusterOutputs::parse(json).unwrap_err();
        assert!(err.to_string().contains("not a string"));
    }
}
