use crate::error::{MeshwatchError, Result};
use crate::k8s::types::ClusterStats;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Node, Pod, Service};
use kube::api::ListParams;
use kube::{Api, Client};
use tracing::{debug, info};

/// Thin wrapper over the kube client. Failure to obtain the client at
/// all (no kubeconfig, no in-cluster credentials) maps to
/// [`MeshwatchError::Unavailable`]; individual scoped queries map to
/// [`MeshwatchError::KubernetesError`].
#[derive(Clone)]
pub struct ClusterClient {
    client: Client,
}

impl ClusterClient {
    pub async fn try_default() -> Result<Self> {
        debug!("Initializing Kubernetes client");

        let client = Client::try_default().await.map_err(|e| {
            MeshwatchError::Unavailable(format!("Failed to create K8s client: {}", e))
        })?;

        info!("Connected to Kubernetes cluster");

        Ok(Self { client })
    }

    pub fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    pub fn config_maps(&self, namespace: &str) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), namespace)
    }

    pub fn services(&self, namespace: &str) -> Api<Service> {
        Api::namespaced(self.client.clone(), namespace)
    }

    pub async fn list_pods(&self, namespace: &str, selector: Option<&str>) -> Result<Vec<Pod>> {
        let list = self
            .pods(namespace)
            .list(&list_params(selector))
            .await
            .map_err(|e| MeshwatchError::KubernetesError(format!("Failed to list pods: {}", e)))?;
        Ok(list.items)
    }

    pub async fn list_config_maps(
        &self,
        namespace: &str,
        selector: Option<&str>,
    ) -> Result<Vec<ConfigMap>> {
        let list = self
            .config_maps(namespace)
            .list(&list_params(selector))
            .await
            .map_err(|e| {
                MeshwatchError::KubernetesError(format!("Failed to list configmaps: {}", e))
            })?;
        Ok(list.items)
    }

    pub async fn list_services(
        &self,
        namespace: &str,
        selector: Option<&str>,
    ) -> Result<Vec<Service>> {
        let list = self
            .services(namespace)
            .list(&list_params(selector))
            .await
            .map_err(|e| {
                MeshwatchError::KubernetesError(format!("Failed to list services: {}", e))
            })?;
        Ok(list.items)
    }

    pub async fn list_all_pods(&self) -> Result<Vec<Pod>> {
        let api: Api<Pod> = Api::all(self.client.clone());
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| MeshwatchError::KubernetesError(format!("Failed to list pods: {}", e)))?;
        Ok(list.items)
    }

    pub async fn list_all_services(&self) -> Result<Vec<Service>> {
        let api: Api<Service> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await.map_err(|e| {
            MeshwatchError::KubernetesError(format!("Failed to list services: {}", e))
        })?;
        Ok(list.items)
    }

    pub async fn list_nodes(&self) -> Result<Vec<Node>> {
        let api: Api<Node> = Api::all(self.client.clone());
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| MeshwatchError::KubernetesError(format!("Failed to list nodes: {}", e)))?;
        Ok(list.items)
    }

    pub async fn list_namespaces(&self) -> Result<Vec<Namespace>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await.map_err(|e| {
            MeshwatchError::KubernetesError(format!("Failed to list namespaces: {}", e))
        })?;
        Ok(list.items)
    }

    /// Gather one consistent set of cluster-wide observations.
    pub async fn cluster_stats(&self) -> Result<ClusterStats> {
        let (nodes, pods, services, namespaces) = futures::try_join!(
            self.list_nodes(),
            self.list_all_pods(),
            self.list_all_services(),
            self.list_namespaces(),
        )?;

        Ok(ClusterStats::from_objects(
            &nodes,
            &pods,
            &services,
            &namespaces,
        ))
    }
}

fn list_params(selector: Option<&str>) -> ListParams {
    match selector {
        Some(labels) => ListParams::default().labels(labels),
        None => ListParams::default(),
    }
}
