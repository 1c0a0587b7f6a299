use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kube::{api::ListParams, Api, Client};

use crate::nodes::{ClusterNodeSource, NodeLister};

#[async_trait]
impl NodeLister for Client {
    async fn list_nodes(&self) -> Result<Vec<Node>, kube::Error> {
        let node_api: Api<Node> = Api::all(self.clone());
        let nodes = node_api.list(&ListParams::default()).await?;
        Ok(nodes.items)
    }
}

pub fn cluster_node_source(client: &Client) -> ClusterNodeSource<Client> {
    ClusterNodeSource::new(client.clone())
}
