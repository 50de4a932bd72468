#![cfg_attr(not(doctest), doc = include_str!("../README.md"))]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use k8s_openapi;
pub use kube;

pub mod config;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod mirror;
pub mod overrides;
pub mod rpc;
pub mod sync;
pub mod tls;

pub use config::Config;
pub use error::{Error, Result};
pub use filter::{Filter, resolve, resolve_with};
pub use gateway::{EventType, KubeGateway, ObjectEvent, ObjectGateway};
pub use mirror::{Mirror, ObjectRecord, ResourceKind};
pub use overrides::Overrides;
pub use rpc::{HttpMirrorClient, MirrorClient};
pub use sync::{ResyncPolicy, run_sync, spawn_sync};
