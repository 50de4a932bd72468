use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::filter::Filter;

/// Decoded kubeconfig, as handed over by whatever reads it off disk.
///
/// Field names follow the on-disk kubeconfig shape so the structure
/// deserializes directly from a decoded document. Name lookups take the first
/// match within each list; references between lists are allowed to dangle
/// until something actually needs to follow them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub current_context: String,
    pub contexts: Vec<NamedContext>,
    pub clusters: Vec<NamedCluster>,
    pub users: Vec<NamedUser>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamedContext {
    pub name: String,
    pub context: Context,
}

/// A named pairing of a cluster, optional namespace, and optional user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Context {
    pub cluster: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: Cluster,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Cluster {
    pub server: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_authority: Option<String>,
    pub insecure_skip_tls_verify: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamedUser {
    pub name: String,
    pub user: User,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_certificate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_key: Option<String>,
}

impl Config {
    /// Look up a context by name.
    pub fn context(&self, name: &str) -> Option<&NamedContext> {
        self.contexts.iter().find(|c| c.name == name)
    }

    /// Look up a cluster by name.
    pub fn cluster(&self, name: &str) -> Option<&NamedCluster> {
        self.clusters.iter().find(|c| c.name == name)
    }

    /// Look up a user by name.
    pub fn user(&self, name: &str) -> Option<&NamedUser> {
        self.users.iter().find(|u| u.name == name)
    }

    /// The context named by `current-context`.
    pub fn current_context(&self) -> Result<&NamedContext> {
        self.context(&self.current_context).ok_or_else(|| {
            Error::Config(format!(
                "current context {:?} not found in kubeconfig",
                self.current_context
            ))
        })
    }

    /// The cluster referenced by the current context.
    pub fn current_cluster(&self) -> Result<&NamedCluster> {
        let context = self.current_context()?;
        self.cluster(&context.context.cluster).ok_or_else(|| {
            Error::Config(format!(
                "cluster {:?} referenced by context {:?} not found in kubeconfig",
                context.context.cluster, context.name
            ))
        })
    }

    /// The user referenced by the current context, when one is named.
    pub fn current_user(&self) -> Result<Option<&NamedUser>> {
        let context = self.current_context()?;
        match &context.context.user {
            Some(name) => {
                let user = self.user(name).ok_or_else(|| {
                    Error::Config(format!(
                        "user {:?} referenced by context {:?} not found in kubeconfig",
                        name, context.name
                    ))
                })?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// The query target implied by the current context alone: its cluster's
    /// server and its namespace (empty when unset). The kind is left for the
    /// caller to fill in.
    pub fn default_filter(&self) -> Result<Filter> {
        let context = self.current_context()?;
        let cluster = self.current_cluster()?;
        Ok(Filter {
            server: cluster.cluster.server.clone(),
            namespace: context.context.namespace.clone().unwrap_or_default(),
            kind: String::new(),
        })
    }
}
