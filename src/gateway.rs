use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Node, Pod, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{ListParams, WatchEvent, WatchParams};
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::mirror::{ObjectRecord, ResourceKind};

/// Watch event type, mirroring the remote API's ADDED/MODIFIED/DELETED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Added,
    Modified,
    Deleted,
}

/// One delivered watch event: what happened, and to which record.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectEvent {
    pub event_type: EventType,
    pub record: ObjectRecord,
}

/// The cluster API surface the sync loop consumes.
///
/// Failures here are `anyhow` errors on purpose: the sync loop absorbs them
/// by resyncing and only ever logs them, so no caller needs to distinguish
/// their shape.
#[async_trait]
pub trait ObjectGateway: Send + Sync {
    /// Full list of the current records of `kind`.
    async fn list(&self, kind: ResourceKind) -> anyhow::Result<Vec<ObjectRecord>>;

    /// Open a stream of change events for `kind`. The stream ends on any
    /// remote error or graceful close; it is never resumed, only reopened.
    async fn watch(
        &self,
        kind: ResourceKind,
    ) -> anyhow::Result<BoxStream<'static, anyhow::Result<ObjectEvent>>>;
}

/// [`ObjectGateway`] over a real cluster via `kube`.
///
/// Only object metadata travels the wire: lists and watches use the
/// metadata-only API variants, since the mirror never caches object bodies.
#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
}

impl KubeGateway {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Cheap reachability check: the cluster must report at least one node.
    pub async fn ping(&self) -> anyhow::Result<()> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let list = nodes.list_metadata(&ListParams::default()).await?;
        anyhow::ensure!(!list.items.is_empty(), "no nodes available");
        Ok(())
    }

    async fn list_kind<K>(&self, kind: ResourceKind) -> anyhow::Result<Vec<ObjectRecord>>
    where
        K: Resource + Clone + DeserializeOwned + std::fmt::Debug,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::all(self.client.clone());
        let list = api.list_metadata(&ListParams::default()).await?;
        debug!(kind = %kind, count = list.items.len(), "listed objects");
        Ok(list
            .items
            .into_iter()
            .map(|obj| record_from_meta(kind, obj.metadata))
            .collect())
    }

    fn watch_kind<K>(&self, kind: ResourceKind) -> BoxStream<'static, anyhow::Result<ObjectEvent>>
    where
        K: Resource + Clone + DeserializeOwned + std::fmt::Debug + Send + 'static,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::all(self.client.clone());
        let stream = async_stream::try_stream! {
            let events = api.watch_metadata(&WatchParams::default(), "0").await?;
            futures::pin_mut!(events);
            while let Some(event) = events.try_next().await? {
                let (event_type, meta) = match event {
                    WatchEvent::Added(obj) => (EventType::Added, obj.metadata),
                    WatchEvent::Modified(obj) => (EventType::Modified, obj.metadata),
                    WatchEvent::Deleted(obj) => (EventType::Deleted, obj.metadata),
                    WatchEvent::Bookmark(_) => continue,
                    WatchEvent::Error(status) => {
                        Err::<(), anyhow::Error>(anyhow::anyhow!(
                            "error event from watch: {status:?}"
                        ))?;
                        continue;
                    }
                };
                yield ObjectEvent {
                    event_type,
                    record: record_from_meta(kind, meta),
                };
            }
        };
        stream.boxed()
    }
}

#[async_trait]
impl ObjectGateway for KubeGateway {
    async fn list(&self, kind: ResourceKind) -> anyhow::Result<Vec<ObjectRecord>> {
        match kind {
            ResourceKind::Pod => self.list_kind::<Pod>(kind).await,
            ResourceKind::Service => self.list_kind::<Service>(kind).await,
            ResourceKind::Deployment => self.list_kind::<Deployment>(kind).await,
            ResourceKind::ConfigMap => self.list_kind::<ConfigMap>(kind).await,
            ResourceKind::Namespace => self.list_kind::<Namespace>(kind).await,
            ResourceKind::Node => self.list_kind::<Node>(kind).await,
        }
    }

    async fn watch(
        &self,
        kind: ResourceKind,
    ) -> anyhow::Result<BoxStream<'static, anyhow::Result<ObjectEvent>>> {
        Ok(match kind {
            ResourceKind::Pod => self.watch_kind::<Pod>(kind),
            ResourceKind::Service => self.watch_kind::<Service>(kind),
            ResourceKind::Deployment => self.watch_kind::<Deployment>(kind),
            ResourceKind::ConfigMap => self.watch_kind::<ConfigMap>(kind),
            ResourceKind::Namespace => self.watch_kind::<Namespace>(kind),
            ResourceKind::Node => self.watch_kind::<Node>(kind),
        })
    }
}

fn record_from_meta(kind: ResourceKind, meta: ObjectMeta) -> ObjectRecord {
    ObjectRecord {
        kind,
        name: meta.name.unwrap_or_default(),
        namespace: meta.namespace.unwrap_or_default(),
        resource_version: meta.resource_version.unwrap_or_default(),
    }
}
