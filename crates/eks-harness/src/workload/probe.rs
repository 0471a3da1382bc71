//! Probe pod specification

use crate::config::ProbeConfig;
use k8s_openapi::api::core::v1::{Container, ContainerPort, Pod, PodSpec, ResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use uuid::Uuid;

const CONTAINER_NAME: &str = "probe";
const CONTAINER_PORT: i32 = 80;

/// Unique pod name for a new probe
pub fn probe_name(prefix: &str) -> String {
    let id = Uuid::now_v7().simple().to_string();
    format!("{prefix}-probe-{}", &id[id.len() - 8..])
}

fn quantities(cpu: &str, memory: &str) -> BTreeMap<String, Quantity> {
    BTreeMap::from([
        ("cpu".to_string(), Quantity(cpu.to_string())),
        ("memory".to_string(), Quantity(memory.to_string())),
    ])
}

/// A small pod that proves the cluster schedules and runs work
pub fn probe_pod(name: &str, config: &ProbeConfig) -> Pod {
    let labels = BTreeMap::from([
        ("app".to_string(), config.name_prefix.clone()),
        ("test".to_string(), "true".to_string()),
    ]);

    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(config.namespace.clone()),
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: CONTAINER_NAME.to_string(),
                image: Some(config.image.clone()),
                ports: Some(vec![ContainerPort {
                    container_port: CONTAINER_PORT,
                    ..Default::default()
                }]),
                resources: Some(ResourceRequirements {
                    requests: Some(quantities("100m", "64Mi")),
                    limits: Some(quantities("200m", "128Mi")),
                    ..Default::default()
                }),
                ..Default::default()
            }],
            restart_policy: Some("Never".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_pod() {
        let pod = probe_pod("terratest-probe-1", &ProbeConfig::default());

        assert_eq!(pod.metadata.name.as_deref(), Some("terratest-probe-1"));
        assert_eq!(pod.metadata.namespace.as_deref(), Some("default"));
        let labels = pod.metadata.labels.unwrap();
        assert_eq!(labels["app"], "terratest");
        assert_eq!(labels["test"], "true");

        let spec = pod.spec.unwrap();
        assert_eq!(spec.restart_policy.as_deref(), Some("Never"));
        let container = &spec.containers[0];
        assert_eq!(container.image.as_deref(), Some("nginx:alpine"));
        assert_eq!(container.ports.as_ref().unwrap()[0].container_port, 80);

        let resources = container.resources.as_ref().unwrap();
        assert_eq!(resources.requests.as_ref().unwrap()["cpu"].0, "100m");
        assert_eq!(resources.requests.as_ref().unwrap()["memory"].0, "64Mi");
        assert_eq!(resources.limits.as_ref().unwrap()["cpu"].0, "200m");
        assert_eq!(resources.limits.as_ref().unwrap()["memory"].0, "128Mi");
    }

    #[test]
    fn test_probe_name() {
        let name = probe_name("terratest");
        assert!(name.starts_with("terratest-probe-"));
        assert_eq!(name.len(), "terratest-probe-".len() + 8);
        assert_ne!(name, probe_name("terratest"));
    }
}
