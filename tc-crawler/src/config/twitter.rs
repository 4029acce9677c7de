use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use twitter::{Backend, Credentials, MediaPolicy, OnError};

use crate::download::ExistingFiles;

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Api,
    #[default]
    Web,
    GraphQl,
}

#[derive(Deserialize, Debug)]
pub struct TwitterConfig {
    #[serde(default)]
    pub backend: BackendKind,
    pub graphql_query_id: Option<String>,
    pub bearer: Option<String>,
    /// Sent verbatim with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(deserialize_with = "super::deserialize_path")]
    pub download_path: PathBuf,
    #[serde(default, deserialize_with = "super::deserialize_path_option")]
    pub database: Option<PathBuf>,
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    #[serde(default)]
    pub existing_files: ExistingFiles,
    #[serde(default)]
    pub unknown_media: OnError,
    #[serde(default)]
    pub unresolved_media: OnError,
}

fn default_max_connections() -> usize {
    25
}

impl TwitterConfig {
    pub fn backend(&self) -> Result<Backend> {
        Ok(match self.backend {
            BackendKind::Api => Backend::Api,
            BackendKind::Web => Backend::Web,
            BackendKind::GraphQl => Backend::GraphQl {
                query_id: self
                    .graphql_query_id
                    .clone()
                    .ok_or_else(|| anyhow!("graphql backend requires graphql_query_id"))?,
            },
        })
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            bearer: self.bearer.clone(),
            headers: self.headers.clone(),
        }
    }

    pub fn media_policy(&self) -> MediaPolicy {
        MediaPolicy {
            unknown_kind: self.unknown_media,
            unresolved: self.unresolved_media,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(super::default_database_path)
    }
}
