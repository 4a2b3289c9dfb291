#![allow(dead_code)]

use aid_graph::{Audience, InMemoryRemote, Session};
use serde_json::{Value, json};

pub const GRAPH: &str = "mock://graph/beta";
pub const ARM: &str = "mock://arm";
pub const APP: &str = "mock://graph/beta/applications/app-1";

pub fn session() -> Session {
    Session::new("contoso", Audience::Graph.scopes(), "mock-token")
}

pub fn scope(id: &str, value: &str, kind: &str, display: &str, description: &str) -> Value {
    json!({
        "id": id,
        "value": value,
        "isEnabled": true,
        "type": kind,
        "adminConsentDisplayName": display,
        "adminConsentDescription": description,
    })
}

/// An application holding `read.all` (111) and `write.all` (222), both enabled.
pub fn remote_with_scopes() -> InMemoryRemote {
    let remote = InMemoryRemote::new();
    remote.seed(
        APP,
        json!({
            "id": "app-1",
            "appId": "client-1",
            "displayName": "Payroll blueprint",
            "identifierUris": [],
            "api": {
                "oauth2PermissionScopes": [
                    scope("111", "read.all", "User", "Read", "Read all data"),
                    scope("222", "write.all", "Admin", "Write", "Write all data"),
                ]
            }
        }),
    );
    remote
}

pub fn patch_bodies(remote: &InMemoryRemote) -> Vec<Value> {
    remote
        .writes()
        .into_iter()
        .filter_map(|call| call.body)
        .collect()
}
