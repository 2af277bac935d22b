use std::collections::BTreeSet;

use crate::contract::{HttpMethod, RouteSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteDomain {
    System,
    Credential,
    Models,
    Generate,
    Execute,
    Outputs,
    Shell,
    Window,
}

impl RouteDomain {
    pub fn from_path(path: &str) -> Self {
        if path == "/health" {
            return Self::System;
        }
        if path.starts_with("/api/credential") {
            return Self::Credential;
        }
        if path.starts_with("/api/models") {
            return Self::Models;
        }
        if path.starts_with("/api/generate") {
            return Self::Generate;
        }
        if path.starts_with("/api/execute") {
            return Self::Execute;
        }
        if path.starts_with("/api/outputs") {
            return Self::Outputs;
        }
        if path.starts_with("/api/window") {
            return Self::Window;
        }
        Self::Shell
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDefinition {
    pub spec: RouteSpec,
    pub domain: RouteDomain,
    pub handler_id: String,
}

pub fn route_catalog() -> Vec<RouteDefinition> {
    let mut out = Vec::with_capacity(CONTRACT_ROUTES.len());
    let mut seen = BTreeSet::new();

    for (method, path) in CONTRACT_ROUTES {
        let spec = RouteSpec::new(*method, *path).expect("contract routes must be valid");
        assert!(
            seen.insert(spec.clone()),
            "duplicate route in contract list: {spec}"
        );

        out.push(RouteDefinition {
            domain: RouteDomain::from_path(spec.path.as_str()),
            handler_id: handler_id_for(spec.method, spec.path.as_str()),
            spec,
        });
    }

    out
}

/// `POST /api/execute/stream` → `post_api_execute_stream`.
fn handler_id_for(method: HttpMethod, path: &str) -> String {
    let mut id = method.as_str().to_ascii_lowercase();
    for part in path.trim_matches('/').split('/') {
        id.push('_');
        id.extend(part.chars().map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                '_'
            }
        }));
    }
    id
}

const CONTRACT_ROUTES: &[(HttpMethod, &str)] = &[
    (HttpMethod::Get, "/health"),
    (HttpMethod::Get, "/api/credential"),
    (HttpMethod::Put, "/api/credential"),
    (HttpMethod::Delete, "/api/credential"),
    (HttpMethod::Get, "/api/models"),
    (HttpMethod::Post, "/api/generate"),
    (HttpMethod::Post, "/api/execute"),
    (HttpMethod::Post, "/api/execute/stream"),
    (HttpMethod::Get, "/api/outputs"),
    (HttpMethod::Get, "/api/outputs/data-uri"),
    (HttpMethod::Post, "/api/shell/reveal"),
    (HttpMethod::Post, "/api/shell/open-url"),
    (HttpMethod::Post, "/api/window/minimize"),
    (HttpMethod::Post, "/api/window/close"),
];
