use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;
use thiserror::Error;

use super::{ContractError, HttpMethod, RouteSpec};

#[derive(Debug, Error)]
pub enum OpenApiContractError {
    #[error("failed to read OpenAPI file '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to parse OpenAPI YAML '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid OpenAPI route '{path}': {source}")]
    InvalidRoute { path: String, source: ContractError },

    #[error("OpenAPI path '{path}' declares unsupported operation '{key}'")]
    UnsupportedOperation { path: String, key: String },
}

#[derive(Debug, Deserialize)]
struct OpenApiDocument {
    #[serde(default)]
    paths: BTreeMap<String, BTreeMap<String, Value>>,
}

/// Path-level keys that are not operations.
const NON_OPERATION_KEYS: &[&str] = &["parameters", "summary", "description", "servers"];

pub fn load_routes(path: &Path) -> Result<Vec<RouteSpec>, OpenApiContractError> {
    let raw = fs::read_to_string(path).map_err(|source| OpenApiContractError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_routes(raw.as_str()).map_err(|error| match error {
        OpenApiContractError::Parse { source, .. } => OpenApiContractError::Parse {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

pub fn parse_routes(raw: &str) -> Result<Vec<RouteSpec>, OpenApiContractError> {
    let document: OpenApiDocument =
        serde_yaml::from_str(raw).map_err(|source| OpenApiContractError::Parse {
            path: PathBuf::new(),
            source,
        })?;

    let mut routes = BTreeSet::new();
    for (route_path, item) in document.paths {
        for key in item.keys() {
            if NON_OPERATION_KEYS.contains(&key.as_str()) {
                continue;
            }
            let method = HttpMethod::ALL
                .into_iter()
                .find(|m| m.openapi_key() == key.as_str())
                .ok_or_else(|| OpenApiContractError::UnsupportedOperation {
                    path: route_path.clone(),
                    key: key.clone(),
                })?;
            let spec = RouteSpec::new(method, route_path.as_str()).map_err(|source| {
                OpenApiContractError::InvalidRoute {
                    path: route_path.clone(),
                    source,
                }
            })?;
            routes.insert(spec);
        }
    }

    Ok(routes.into_iter().collect())
}
