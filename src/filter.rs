use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Result;
use crate::mirror::ResourceKind;
use crate::overrides::Overrides;

/// The effective query target: the sole contract between resolution and
/// querying. Also the request shape carried by the RPC read methods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filter {
    pub server: String,
    pub namespace: String,
    pub kind: String,
}

/// Merge the kubeconfig defaults with a free-text override string into one
/// effective filter for `kind`.
///
/// The override string is parsed exactly once at this boundary; resolution
/// itself only ever sees the structured [`Overrides`] value.
pub fn resolve(config: &Config, raw_overrides: &str, kind: &str) -> Result<Filter> {
    resolve_with(config, &Overrides::parse(raw_overrides), kind)
}

/// [`resolve`] for callers that already hold parsed overrides.
///
/// `server` and `namespace` are independent precedence chains that happen to
/// share two sources, which is why this is a field-by-field layered merge and
/// not a last-writer-wins scan:
///
///   server:    --server  >  --cluster  >  --context  >  current context
///   namespace: --namespace  >  --context  >  current context
///
/// An unresolvable `--context` or `--cluster` name is ignored and the merge
/// falls through to the next layer down; it is not an error.
pub fn resolve_with(config: &Config, overrides: &Overrides, kind: &str) -> Result<Filter> {
    let kind: ResourceKind = kind.parse()?;
    let mut filter = config.default_filter()?;

    if let Some(name) = &overrides.context
        && let Some(context) = config.context(name)
        && let Some(cluster) = config.cluster(&context.context.cluster)
    {
        filter.server = cluster.cluster.server.clone();
        filter.namespace = context.context.namespace.clone().unwrap_or_default();
    }

    if let Some(name) = &overrides.cluster
        && let Some(cluster) = config.cluster(name)
    {
        // Server only. The namespace chain does not include --cluster.
        filter.server = cluster.cluster.server.clone();
    }

    if let Some(namespace) = &overrides.namespace {
        filter.namespace = namespace.clone();
    }

    if let Some(server) = &overrides.server {
        filter.server = server.clone();
    }

    filter.kind = kind.as_str().to_string();
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Cluster, Context, NamedCluster, NamedContext};
    use crate::error::Error;

    fn two_cluster_config() -> Config {
        Config {
            current_context: "prod".into(),
            contexts: vec![
                NamedContext {
                    name: "dev".into(),
                    context: Context {
                        cluster: "cluster_2".into(),
                        namespace: Some("red".into()),
                        user: None,
                    },
                },
                NamedContext {
                    name: "prod".into(),
                    context: Context {
                        cluster: "cluster_1".into(),
                        namespace: Some("blue".into()),
                        user: None,
                    },
                },
            ],
            clusters: vec![
                NamedCluster {
                    name: "cluster_1".into(),
                    cluster: Cluster {
                        server: "https://foo.com".into(),
                        ..Cluster::default()
                    },
                },
                NamedCluster {
                    name: "cluster_2".into(),
                    cluster: Cluster {
                        server: "https://bar.com".into(),
                        ..Cluster::default()
                    },
                },
            ],
            users: vec![],
        }
    }

    fn resolved(raw: &str) -> Filter {
        resolve(&two_cluster_config(), raw, "pod").expect("resolves")
    }

    #[test]
    fn empty_overrides_equal_default_filter_with_kind() {
        let filter = resolved("");
        assert_eq!(
            filter,
            Filter {
                server: "https://foo.com".into(),
                namespace: "blue".into(),
                kind: "pod".into(),
            }
        );
    }

    #[test]
    fn context_override_sets_server_and_namespace() {
        let filter = resolved("--context=dev");
        assert_eq!(filter.server, "https://bar.com");
        assert_eq!(filter.namespace, "red");
    }

    #[test]
    fn last_context_occurrence_wins() {
        let filter = resolved(" c --context dev x --context prod c");
        assert_eq!(filter.server, "https://foo.com");
        assert_eq!(filter.namespace, "blue");
    }

    #[test]
    fn cluster_override_sets_server_but_never_namespace() {
        let filter = resolved("--cluster=cluster_2");
        assert_eq!(filter.server, "https://bar.com");
        assert_eq!(filter.namespace, "blue");
    }

    #[test]
    fn cluster_wins_over_context_for_server_only() {
        // --cluster beats --context on server even when --context comes later;
        // namespace still follows the context.
        let filter = resolved("--cluster=cluster_2 --context=prod");
        assert_eq!(filter.server, "https://bar.com");
        assert_eq!(filter.namespace, "blue");
    }

    #[test]
    fn explicit_namespace_beats_context() {
        let filter = resolved("--namespace=ns4 --context=dev");
        assert_eq!(filter.namespace, "ns4");
        assert_eq!(filter.server, "https://bar.com");
    }

    #[test]
    fn explicit_server_beats_cluster_and_context() {
        let filter = resolved("--server=y1.com --cluster=cluster_2");
        assert_eq!(filter.server, "y1.com");

        let filter = resolved("--server=y1.com --context=dev");
        assert_eq!(filter.server, "y1.com");
    }

    #[test]
    fn unresolvable_context_and_cluster_names_fall_through() {
        let filter = resolved("--context=missing");
        assert_eq!(filter.server, "https://foo.com");
        assert_eq!(filter.namespace, "blue");

        let filter = resolved("--cluster=missing");
        assert_eq!(filter.server, "https://foo.com");
    }

    #[test]
    fn kind_is_validated_against_the_canonical_set() {
        for kind in ["pod", "service", "deployment", "configmap", "namespace", "node"] {
            let filter = resolve(&two_cluster_config(), "", kind).expect("resolves");
            assert_eq!(filter.kind, kind);
        }
        let err = resolve(&two_cluster_config(), "", "k8s-resource").expect_err("rejects");
        assert!(matches!(err, Error::UnsupportedKind(_)));
    }

    #[test]
    fn broken_config_surfaces_config_error() {
        let mut config = two_cluster_config();
        config.current_context = "gone".into();
        let err = resolve(&config, "", "pod").expect_err("must fail");
        assert!(matches!(err, Error::Config(_)));
    }
}
