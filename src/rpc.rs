use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use crate::error::Result;
use crate::filter::Filter;
use crate::mirror::{Mirror, ObjectRecord, ResourceKind};

/// Read surface over the mirror: one route per cached kind.
///
/// Every route answers with the kind's full current snapshot. The filter in
/// the request body only selects the route semantically; no server-side
/// narrowing by namespace or server happens here — that is the caller's job.
pub fn router(mirror: Arc<Mirror>) -> Router {
    Router::new()
        .route("/pods", post(pods))
        .route("/services", post(services))
        .route("/deployments", post(deployments))
        .with_state(mirror)
}

/// Serve the query routes until the shutdown signal fires.
pub async fn serve(
    listener: TcpListener,
    mirror: Arc<Mirror>,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mirror query service listening");
    }
    axum::serve(listener, router(mirror))
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await
}

async fn pods(
    State(mirror): State<Arc<Mirror>>,
    Json(_filter): Json<Filter>,
) -> Json<Vec<ObjectRecord>> {
    Json(mirror.snapshot(ResourceKind::Pod))
}

async fn services(
    State(mirror): State<Arc<Mirror>>,
    Json(_filter): Json<Filter>,
) -> Json<Vec<ObjectRecord>> {
    Json(mirror.snapshot(ResourceKind::Service))
}

async fn deployments(
    State(mirror): State<Arc<Mirror>>,
    Json(_filter): Json<Filter>,
) -> Json<Vec<ObjectRecord>> {
    Json(mirror.snapshot(ResourceKind::Deployment))
}

/// Calling side of the query service.
#[async_trait]
pub trait MirrorClient: Send + Sync {
    async fn pods(&self, filter: &Filter) -> Result<Vec<ObjectRecord>>;
    async fn services(&self, filter: &Filter) -> Result<Vec<ObjectRecord>>;
    async fn deployments(&self, filter: &Filter) -> Result<Vec<ObjectRecord>>;
}

/// [`MirrorClient`] over HTTP. Connection-level failures surface verbatim as
/// [`Error::Transport`](crate::error::Error::Transport).
pub struct HttpMirrorClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpMirrorClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    async fn call(&self, path: &str, filter: &Filter) -> Result<Vec<ObjectRecord>> {
        let response = self
            .http
            .post(format!("{}/{path}", self.base_url))
            .json(filter)
            .send()
            .await?;
        Ok(response.error_for_status()?.json().await?)
    }
}

#[async_trait]
impl MirrorClient for HttpMirrorClient {
    async fn pods(&self, filter: &Filter) -> Result<Vec<ObjectRecord>> {
        self.call("pods", filter).await
    }

    async fn services(&self, filter: &Filter) -> Result<Vec<ObjectRecord>> {
        self.call("services", filter).await
    }

    async fn deployments(&self, filter: &Filter) -> Result<Vec<ObjectRecord>> {
        self.call("deployments", filter).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::error::Error;

    fn record(kind: ResourceKind, name: &str) -> ObjectRecord {
        ObjectRecord {
            kind,
            name: name.to_string(),
            namespace: "default".to_string(),
            resource_version: "1".to_string(),
        }
    }

    fn names(records: &[ObjectRecord]) -> HashSet<String> {
        records.iter().map(|r| r.name.clone()).collect()
    }

    async fn start_server(mirror: Arc<Mirror>) -> (String, watch::Sender<bool>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let (tx, rx) = watch::channel(false);
        tokio::spawn(serve(listener, mirror, rx));
        (format!("http://{addr}"), tx)
    }

    #[tokio::test]
    async fn snapshots_round_trip_per_kind() {
        let mirror = Arc::new(Mirror::new());
        mirror.replace_all(
            ResourceKind::Pod,
            vec![record(ResourceKind::Pod, "p1"), record(ResourceKind::Pod, "p2")],
        );
        mirror.replace_all(ResourceKind::Service, vec![record(ResourceKind::Service, "s1")]);

        let (base_url, _tx) = start_server(Arc::clone(&mirror)).await;
        let client = HttpMirrorClient::new(base_url);

        let pods = client.pods(&Filter::default()).await.expect("pods");
        assert_eq!(names(&pods), names(&mirror.snapshot(ResourceKind::Pod)));

        let services = client.services(&Filter::default()).await.expect("services");
        assert_eq!(names(&services), HashSet::from(["s1".to_string()]));

        let deployments = client.deployments(&Filter::default()).await.expect("deployments");
        assert!(deployments.is_empty());
    }

    #[tokio::test]
    async fn filter_is_ignored_beyond_routing() {
        let mirror = Arc::new(Mirror::new());
        mirror.replace_all(
            ResourceKind::Pod,
            vec![
                ObjectRecord {
                    kind: ResourceKind::Pod,
                    name: "in-blue".into(),
                    namespace: "blue".into(),
                    resource_version: "1".into(),
                },
                ObjectRecord {
                    kind: ResourceKind::Pod,
                    name: "in-red".into(),
                    namespace: "red".into(),
                    resource_version: "2".into(),
                },
            ],
        );

        let (base_url, _tx) = start_server(mirror).await;
        let client = HttpMirrorClient::new(base_url);

        let narrow = Filter {
            server: "https://foo.com".into(),
            namespace: "blue".into(),
            kind: "pod".into(),
        };
        let pods = client.pods(&narrow).await.expect("pods");
        assert_eq!(pods.len(), 2, "no server-side namespace filtering");
    }

    #[tokio::test]
    async fn concurrent_calls_do_not_block_each_other() {
        let mirror = Arc::new(Mirror::new());
        mirror.replace_all(ResourceKind::Pod, vec![record(ResourceKind::Pod, "p1")]);

        let (base_url, _tx) = start_server(mirror).await;
        let client = Arc::new(HttpMirrorClient::new(base_url));

        let mut calls = Vec::new();
        for _ in 0..8 {
            let client = Arc::clone(&client);
            calls.push(tokio::spawn(async move {
                client.pods(&Filter::default()).await
            }));
        }
        for call in calls {
            let pods = call.await.expect("join").expect("pods");
            assert_eq!(pods.len(), 1);
        }
    }

    #[tokio::test]
    async fn dead_endpoint_surfaces_transport_error() {
        // Bind and immediately drop to get a port with nothing behind it.
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let client = HttpMirrorClient::new(format!("http://{addr}"));
        let err = client.pods(&Filter::default()).await.expect_err("must fail");
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn shutdown_stops_the_server() {
        let mirror = Arc::new(Mirror::new());
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let (tx, rx) = watch::channel(false);
        let server = tokio::spawn(serve(listener, mirror, rx));

        tx.send(true).expect("signal shutdown");
        tokio::time::timeout(std::time::Duration::from_secs(1), server)
            .await
            .expect("server exits promptly")
            .expect("task joins")
            .expect("serve result");
    }
}
