use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The canonical resource kinds the system understands.
///
/// Alias resolution (`po` -> `pod` and friends) happens outside the core;
/// only canonical names arrive here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Pod,
    Service,
    Deployment,
    ConfigMap,
    Namespace,
    Node,
}

impl ResourceKind {
    /// Every canonical kind, in a fixed order.
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Pod,
        ResourceKind::Service,
        ResourceKind::Deployment,
        ResourceKind::ConfigMap,
        ResourceKind::Namespace,
        ResourceKind::Node,
    ];

    /// The kinds kept continuously fresh by the sync loops.
    pub const MIRRORED: [ResourceKind; 3] = [
        ResourceKind::Pod,
        ResourceKind::Service,
        ResourceKind::Deployment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "pod",
            ResourceKind::Service => "service",
            ResourceKind::Deployment => "deployment",
            ResourceKind::ConfigMap => "configmap",
            ResourceKind::Namespace => "namespace",
            ResourceKind::Node => "node",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pod" => Ok(ResourceKind::Pod),
            "service" => Ok(ResourceKind::Service),
            "deployment" => Ok(ResourceKind::Deployment),
            "configmap" => Ok(ResourceKind::ConfigMap),
            "namespace" => Ok(ResourceKind::Namespace),
            "node" => Ok(ResourceKind::Node),
            other => Err(Error::UnsupportedKind(other.to_string())),
        }
    }
}

/// The only fields the mirror tracks per object. Full bodies are never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRecord {
    pub kind: ResourceKind,
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub resource_version: String,
}

/// In-memory cache of object records, one independently guarded table per kind.
///
/// Every table is keyed by object name and is either untouched since startup
/// or a complete snapshot as of the last applied event. Mutations take the
/// table's write lock only for the span of the map update; `snapshot` copies
/// under the read lock so internal storage never escapes.
pub struct Mirror {
    tables: HashMap<ResourceKind, RwLock<HashMap<String, ObjectRecord>>>,
}

impl Mirror {
    pub fn new() -> Self {
        let tables = ResourceKind::ALL
            .into_iter()
            .map(|kind| (kind, RwLock::new(HashMap::new())))
            .collect();
        Self { tables }
    }

    fn table(&self, kind: ResourceKind) -> &RwLock<HashMap<String, ObjectRecord>> {
        // Every variant gets a table in `new`.
        &self.tables[&kind]
    }

    /// Atomically swap the whole table for `kind`, as after a full list.
    pub fn replace_all(&self, kind: ResourceKind, records: Vec<ObjectRecord>) {
        let fresh: HashMap<String, ObjectRecord> = records
            .into_iter()
            .map(|record| (record.name.clone(), record))
            .collect();
        *self.table(kind).write() = fresh;
    }

    /// Insert or overwrite a single record by name.
    pub fn upsert(&self, kind: ResourceKind, record: ObjectRecord) {
        self.table(kind).write().insert(record.name.clone(), record);
    }

    /// Delete a record by name. Gone until a later list or add re-creates it.
    pub fn remove(&self, kind: ResourceKind, name: &str) {
        self.table(kind).write().remove(name);
    }

    /// An independent copy of the current table for `kind`.
    pub fn snapshot(&self, kind: ResourceKind) -> Vec<ObjectRecord> {
        self.table(kind).read().values().cloned().collect()
    }

    /// Number of records currently cached for `kind`.
    pub fn len(&self, kind: ResourceKind) -> usize {
        self.table(kind).read().len()
    }

    pub fn is_empty(&self, kind: ResourceKind) -> bool {
        self.len(kind) == 0
    }
}

impl Default for Mirror {
    fn default() -> Self {
        Self::new()
    }
}
