mod support;

use aid_graph::kinds::ScopeSpec;
use aid_graph::ops::{remove_scope, upsert_scope};
use aid_graph::{DryRunClient, GraphApi, Verb};
use support::{GRAPH, remote_with_scopes, session};
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn rehearsed_removal_reads_but_never_writes() {
    let dry = DryRunClient::new(remote_with_scopes());
    let session = session();
    let api = GraphApi::new(&dry, &session, GRAPH);

    let out = remove_scope(&api, "app-1", "write.all").await.unwrap();
    assert_eq!(out.scope_id, "222");

    let skipped = dry.skipped();
    assert_eq!(skipped.len(), 2);
    assert!(skipped.iter().all(|call| call.verb == Verb::Patch));
    assert_eq!(
        skipped[0].body.as_ref().unwrap()["api"]["oauth2PermissionScopes"][1]["isEnabled"],
        false
    );
    assert!(logs_contain("dry run: write not sent"));
}

#[tokio::test]
async fn rehearsed_upsert_reports_what_would_change() {
    let dry = DryRunClient::new(remote_with_scopes());
    let session = session();
    let api = GraphApi::new(&dry, &session, GRAPH);

    let spec = ScopeSpec::new("export.all").admin_consent("Export", "Export all data");
    let out = upsert_scope(&api, "app-1", &spec).await.unwrap();

    assert!(out.was_created);
    assert!(out.written);
    assert_eq!(dry.skipped().len(), 1);
}
