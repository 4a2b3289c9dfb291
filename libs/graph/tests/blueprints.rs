mod support;

use aid_core::{DuplicatePolicy, ReconcileError};
use aid_graph::ops::{
    create_agent_identity, create_blueprint, delete_agent_identity, delete_blueprint,
    list_agent_identities, list_blueprints,
};
use aid_graph::{GraphApi, InMemoryRemote, OperationError, ResultRecord, Verb};
use serde_json::json;
use support::{GRAPH, session};

fn directory() -> InMemoryRemote {
    let remote = InMemoryRemote::new();
    remote.seed_collection(&format!("{GRAPH}/applications"));
    remote.seed_collection(&format!("{GRAPH}/servicePrincipals"));
    remote
}

fn sponsors() -> Vec<String> {
    vec!["user-1".to_string()]
}

#[tokio::test]
async fn blueprint_and_its_principal_are_created() {
    let remote = directory();
    let session = session();
    let api = GraphApi::new(&remote, &session, GRAPH);

    let out = create_blueprint(&api, "Payroll agents", &sponsors(), &[], DuplicatePolicy::Fail)
        .await
        .unwrap();

    assert!(!out.reused);
    assert!(out.principal_id.is_some());
    let writes = remote.writes();
    assert_eq!(writes.len(), 2);
    assert_eq!(
        writes[0].url,
        format!("{GRAPH}/applications/graph.agentIdentityBlueprint")
    );
    insta::with_settings!({sort_maps => true}, {
        insta::assert_json_snapshot!(writes[0].body.clone().unwrap(), @r#"
        {
          "@odata.type": "Microsoft.Graph.AgentIdentityBlueprint",
          "displayName": "Payroll agents",
          "sponsors@odata.bind": [
            "mock://graph/beta/directoryObjects/user-1"
          ]
        }
        "#);
    });
    assert_eq!(writes[1].body.clone().unwrap(), json!({"appId": out.app_id}));

    let record = ResultRecord::from_outcome(&out).unwrap();
    assert_eq!(record.get("displayName"), Some(&json!("Payroll agents")));
    assert_eq!(record.get("reused"), Some(&json!(false)));
}

#[tokio::test]
async fn owners_are_bound_when_given() {
    let remote = directory();
    let session = session();
    let api = GraphApi::new(&remote, &session, GRAPH);

    create_blueprint(
        &api,
        "Payroll agents",
        &sponsors(),
        &["owner-1".to_string()],
        DuplicatePolicy::Fail,
    )
    .await
    .unwrap();

    let body = remote.writes()[0].body.clone().unwrap();
    assert_eq!(
        body["owners@odata.bind"],
        json!(["mock://graph/beta/directoryObjects/owner-1"])
    );
}

#[tokio::test]
async fn duplicate_names_follow_the_policy() {
    let remote = directory();
    let session = session();
    let api = GraphApi::new(&remote, &session, GRAPH);
    let first = create_blueprint(&api, "Payroll agents", &sponsors(), &[], DuplicatePolicy::Fail)
        .await
        .unwrap();
    let writes_after_first = remote.writes().len();

    let err = create_blueprint(&api, "payroll AGENTS", &sponsors(), &[], DuplicatePolicy::Fail)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OperationError::Reconcile(ReconcileError::Duplicate { count: 1, .. })
    ));
    assert_eq!(remote.writes().len(), writes_after_first);

    let skipped = create_blueprint(&api, "Payroll agents", &sponsors(), &[], DuplicatePolicy::Skip)
        .await
        .unwrap();
    assert!(skipped.reused);
    assert_eq!(skipped.object_id, first.object_id);
    assert_eq!(skipped.app_id, first.app_id);
    assert_eq!(remote.writes().len(), writes_after_first);

    create_blueprint(&api, "Payroll agents", &sponsors(), &[], DuplicatePolicy::CreateAnyway)
        .await
        .unwrap();
    assert_eq!(list_blueprints(&api, None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn list_filters_by_name_fragment() {
    let remote = directory();
    let session = session();
    let api = GraphApi::new(&remote, &session, GRAPH);
    for name in ["Payroll agents", "Support agents", "Payroll auditors"] {
        create_blueprint(&api, name, &sponsors(), &[], DuplicatePolicy::Fail)
            .await
            .unwrap();
    }
    // Plain applications are not blueprints.
    remote.seed(
        &format!("{GRAPH}/applications/plain"),
        json!({"id": "plain", "appId": "x", "displayName": "Payroll portal"}),
    );

    let payroll = list_blueprints(&api, Some("payroll")).await.unwrap();
    let names: Vec<&str> = payroll.iter().map(|bp| bp.display_name.as_str()).collect();
    assert_eq!(names, vec!["Payroll agents", "Payroll auditors"]);
    assert!(list_blueprints(&api, Some("finance")).await.unwrap().is_empty());
    assert_eq!(list_blueprints(&api, Some("  ")).await.unwrap().len(), 3);
}

#[tokio::test]
async fn sponsors_are_required() {
    let remote = directory();
    let session = session();
    let api = GraphApi::new(&remote, &session, GRAPH);

    let err = create_blueprint(&api, "Payroll agents", &[], &[], DuplicatePolicy::Fail)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "missing required value: sponsor_ids");
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn agent_identities_are_scoped_to_their_blueprint() {
    let remote = directory();
    let session = session();
    let api = GraphApi::new(&remote, &session, GRAPH);
    let payroll = create_blueprint(&api, "Payroll agents", &sponsors(), &[], DuplicatePolicy::Fail)
        .await
        .unwrap();
    let support = create_blueprint(&api, "Support agents", &sponsors(), &[], DuplicatePolicy::Fail)
        .await
        .unwrap();

    let agent = create_agent_identity(&api, &payroll.app_id, "Payroll bot", &sponsors(), DuplicatePolicy::Fail)
        .await
        .unwrap();
    create_agent_identity(&api, &support.app_id, "Payroll bot", &sponsors(), DuplicatePolicy::Fail)
        .await
        .unwrap();

    let post = remote.writes().into_iter().rev().nth(1).unwrap();
    assert_eq!(post.verb, Verb::Post);
    assert_eq!(
        post.url,
        format!("{GRAPH}/servicePrincipals/Microsoft.Graph.AgentIdentity")
    );
    assert_eq!(
        post.body.unwrap()["agentIdentityBlueprintId"],
        json!(payroll.app_id)
    );

    let payroll_agents = list_agent_identities(&api, Some(&payroll.app_id)).await.unwrap();
    assert_eq!(payroll_agents.len(), 1);
    assert_eq!(payroll_agents[0].id, agent.object_id);
    assert_eq!(list_agent_identities(&api, None).await.unwrap().len(), 2);

    let dup = create_agent_identity(&api, &payroll.app_id, "Payroll bot", &sponsors(), DuplicatePolicy::Skip)
        .await
        .unwrap();
    assert!(dup.reused);
    assert_eq!(dup.object_id, agent.object_id);

    delete_agent_identity(&api, &agent.object_id).await.unwrap();
    assert!(
        list_agent_identities(&api, Some(&payroll.app_id))
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn deleting_a_missing_blueprint_is_not_found() {
    let remote = directory();
    let session = session();
    let api = GraphApi::new(&remote, &session, GRAPH);
    let created = create_blueprint(&api, "Payroll agents", &sponsors(), &[], DuplicatePolicy::Fail)
        .await
        .unwrap();

    let deleted = delete_blueprint(&api, &created.object_id).await.unwrap();
    assert_eq!(deleted.id, created.object_id);

    let err = delete_blueprint(&api, &created.object_id).await.unwrap_err();
    assert_eq!(err.to_string(), format!("blueprint '{}' not found", created.object_id));
}
