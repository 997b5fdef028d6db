use k8s_openapi::api::core::v1::{Namespace, Node, Pod, Service};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use serde::{Deserialize, Serialize};

/// Cluster-wide observations for one collection instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterStats {
    pub node_count: usize,
    pub pod_count: usize,
    pub running_pods: usize,
    pub failed_pods: usize,
    pub service_count: usize,
    pub namespace_count: usize,
    /// Aggregate container CPU requests, cores.
    pub cpu_requests: f64,
    /// Aggregate container memory requests, GiB.
    pub memory_requests: f64,
    pub cpu_limits: f64,
    pub memory_limits: f64,
}

impl ClusterStats {
    pub fn from_objects(
        nodes: &[Node],
        pods: &[Pod],
        services: &[Service],
        namespaces: &[Namespace],
    ) -> Self {
        let mut stats = Self {
            node_count: nodes.len(),
            pod_count: pods.len(),
            service_count: services.len(),
            namespace_count: namespaces.len(),
            ..Default::default()
        };

        for pod in pods {
            match pod.status.as_ref().and_then(|s| s.phase.as_deref()) {
                Some("Running") => stats.running_pods += 1,
                Some("Failed") => stats.failed_pods += 1,
                _ => {}
            }

            let containers = pod.spec.as_ref().map(|s| s.containers.as_slice()).unwrap_or(&[]);
            for container in containers {
                let Some(resources) = container.resources.as_ref() else {
                    continue;
                };
                if let Some(requests) = resources.requests.as_ref() {
                    stats.cpu_requests += requests.get("cpu").map(cpu_cores).unwrap_or(0.0);
                    stats.memory_requests += requests.get("memory").map(memory_gib).unwrap_or(0.0);
                }
                if let Some(limits) = resources.limits.as_ref() {
                    stats.cpu_limits += limits.get("cpu").map(cpu_cores).unwrap_or(0.0);
                    stats.memory_limits += limits.get("memory").map(memory_gib).unwrap_or(0.0);
                }
            }
        }

        stats
    }
}

/// Parse a CPU quantity ("250m", "2") into cores.
pub fn cpu_cores(quantity: &Quantity) -> f64 {
    let raw = quantity.0.as_str();
    if let Some(milli) = raw.strip_suffix('m') {
        milli.parse::<f64>().map(|v| v / 1000.0).unwrap_or(0.0)
    } else {
        raw.parse::<f64>().unwrap_or(0.0)
    }
}

/// Parse a memory quantity ("128Mi", "2Gi", "512000k", plain bytes)
/// into GiB.
pub fn memory_gib(quantity: &Quantity) -> f64 {
    const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

    let raw = quantity.0.as_str();
    let suffixes: &[(&str, f64)] = &[
        ("Ki", 1024.0),
        ("Mi", 1024.0 * 1024.0),
        ("Gi", GIB),
        ("Ti", GIB * 1024.0),
        ("k", 1e3),
        ("M", 1e6),
        ("G", 1e9),
        ("T", 1e12),
    ];

    for (suffix, scale) in suffixes {
        if let Some(digits) = raw.strip_suffix(suffix) {
            return digits.parse::<f64>().map(|v| v * scale / GIB).unwrap_or(0.0);
        }
    }

    raw.parse::<f64>().map(|v| v / GIB).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> Quantity {
        Quantity(s.to_string())
    }

    #[test]
    fn test_cpu_cores_millicores() {
        assert_eq!(cpu_cores(&q("250m")), 0.25);
        assert_eq!(cpu_cores(&q("2")), 2.0);
        assert_eq!(cpu_cores(&q("garbage")), 0.0);
    }

    #[test]
    fn test_memory_gib_binary_suffixes() {
        assert_eq!(memory_gib(&q("1Gi")), 1.0);
        assert_eq!(memory_gib(&q("512Mi")), 0.5);
        assert!((memory_gib(&q("1G")) - 1e9 / (1024.0 * 1024.0 * 1024.0)).abs() < 1e-9);
    }

    #[test]
    fn test_cluster_stats_counts_phases() {
        use k8s_openapi::api::core::v1::PodStatus;

        let running = Pod {
            status: Some(PodStatus {
                phase: Some("Running".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let failed = Pod {
            status: Some(PodStatus {
                phase: Some("Failed".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let pending = Pod {
            status: Some(PodStatus {
                phase: Some("Pending".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let stats = ClusterStats::from_objects(&[], &[running, failed, pending], &[], &[]);
        assert_eq!(stats.pod_count, 3);
        assert_eq!(stats.running_pods, 1);
        assert_eq!(stats.failed_pods, 1);
    }
}
