//! Priority-ordered resource discovery.
//!
//! Locates a monitored resource (a configuration object, a workload)
//! when no explicit location is configured, by scanning an ordered list
//! of (namespace, selector) candidates. The scan is deterministic: the
//! first candidate yielding a predicate match wins. A candidate whose
//! query fails transiently is skipped; only total loss of cluster
//! connectivity escapes to the caller. Results are never cached between
//! calls, so discovery stays correct across topology changes.

use crate::error::Result;
use crate::k8s::client::ClusterClient;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Pod};
use tracing::debug;

/// One search location: a namespace scope and a label selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub namespace: String,
    pub selector: String,
}

impl Candidate {
    pub fn new(namespace: &str, selector: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            selector: selector.to_string(),
        }
    }

    /// Cross product of namespaces and selectors, namespace-major, the
    /// priority order the original dashboard scanned in.
    pub fn cross(namespaces: &[&str], selectors: &[&str]) -> Vec<Candidate> {
        namespaces
            .iter()
            .flat_map(|ns| selectors.iter().map(|sel| Candidate::new(ns, sel)))
            .collect()
    }
}

/// A successful discovery: the candidate that matched and the object.
#[derive(Debug, Clone)]
pub struct Found<T> {
    pub namespace: String,
    pub selector: String,
    pub object: T,
}

/// Scoped list query against the cluster, the only capability discovery
/// needs from its collaborators.
#[async_trait]
pub trait ObjectLister {
    type Object: Send;

    async fn list(&self, namespace: &str, selector: &str) -> Result<Vec<Self::Object>>;
}

/// Scan `candidates` strictly in order and return the first object
/// matching `predicate`, or `None` once the list is exhausted.
pub async fn find<L, P>(
    lister: &L,
    candidates: &[Candidate],
    predicate: P,
) -> Result<Option<Found<L::Object>>>
where
    L: ObjectLister + Sync,
    P: Fn(&L::Object) -> bool,
{
    for candidate in candidates {
        let objects = match lister.list(&candidate.namespace, &candidate.selector).await {
            Ok(objects) => objects,
            Err(e) if e.is_unavailable() => return Err(e),
            Err(e) => {
                debug!(
                    namespace = %candidate.namespace,
                    selector = %candidate.selector,
                    "Skipping candidate: {}", e
                );
                continue;
            }
        };

        if let Some(object) = objects.into_iter().find(|o| predicate(o)) {
            debug!(
                namespace = %candidate.namespace,
                selector = %candidate.selector,
                "Discovery match"
            );
            return Ok(Some(Found {
                namespace: candidate.namespace.clone(),
                selector: candidate.selector.clone(),
                object,
            }));
        }
    }

    Ok(None)
}

/// ConfigMap-scoped lister over the cluster client.
pub struct ConfigMapLister<'a>(pub &'a ClusterClient);

#[async_trait]
impl ObjectLister for ConfigMapLister<'_> {
    type Object = ConfigMap;

    async fn list(&self, namespace: &str, selector: &str) -> Result<Vec<ConfigMap>> {
        self.0.list_config_maps(namespace, Some(selector)).await
    }
}

/// Pod-scoped lister over the cluster client.
pub struct PodLister<'a>(pub &'a ClusterClient);

#[async_trait]
impl ObjectLister for PodLister<'_> {
    type Object = Pod;

    async fn list(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>> {
        self.0.list_pods(namespace, Some(selector)).await
    }
}
