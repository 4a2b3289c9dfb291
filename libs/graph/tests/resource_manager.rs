mod support;

use aid_graph::ops::role_assignment::storage_account_scope;
use aid_graph::ops::{
    StorageRole, assign_storage_role, create_managed_identity, delete_managed_identity,
    delete_role_assignment, list_managed_identities, list_role_assignments,
};
use aid_graph::{ArmApi, ArmScope, InMemoryRemote, Verb};
use serde_json::json;
use support::{ARM, session};

const IDENTITIES: &str = "mock://arm/subscriptions/sub-1/resourceGroups/rg-agents/providers/Microsoft.ManagedIdentity/userAssignedIdentities";
const ASSIGNMENTS: &str = "mock://arm/subscriptions/sub-1/resourceGroups/rg-agents/providers/Microsoft.Storage/storageAccounts/payrolldata/providers/Microsoft.Authorization/roleAssignments";

fn arm_scope() -> ArmScope {
    ArmScope {
        subscription_id: "sub-1".into(),
        resource_group: "rg-agents".into(),
    }
}

fn resource_manager() -> InMemoryRemote {
    let remote = InMemoryRemote::new();
    remote.seed_collection(IDENTITIES);
    remote.seed_collection(ASSIGNMENTS);
    remote
}

#[tokio::test]
async fn managed_identity_lifecycle() {
    let remote = resource_manager();
    let session = session();
    let arm = ArmApi::new(&remote, &session, ARM, arm_scope());

    let created = create_managed_identity(&arm, "payroll-mi", "westeurope").await.unwrap();
    assert_eq!(created.name, "payroll-mi");
    assert_eq!(created.location, "westeurope");
    assert_eq!(
        created.id,
        "/subscriptions/sub-1/resourceGroups/rg-agents/providers/Microsoft.ManagedIdentity/userAssignedIdentities/payroll-mi"
    );
    let writes = remote.writes();
    let put = &writes[0];
    assert_eq!(put.verb, Verb::Put);
    assert_eq!(put.url, format!("{IDENTITIES}/payroll-mi?api-version=2023-01-31"));
    assert_eq!(put.body, Some(json!({"location": "westeurope"})));

    let listed = list_managed_identities(&arm).await.unwrap();
    assert_eq!(listed, vec![created.clone()]);

    let deleted = delete_managed_identity(&arm, "payroll-mi").await.unwrap();
    assert_eq!(deleted.id, created.id);
    assert!(list_managed_identities(&arm).await.unwrap().is_empty());
}

#[tokio::test]
async fn role_assignment_is_created_once() {
    let remote = resource_manager();
    let session = session();
    let arm = ArmApi::new(&remote, &session, ARM, arm_scope());

    let first = assign_storage_role(&arm, "payrolldata", "sp-1", StorageRole::BlobDataContributor)
        .await
        .unwrap();
    assert!(first.created);
    assert_eq!(first.role, "Storage Blob Data Contributor");
    assert_eq!(first.scope, storage_account_scope(&arm, "payrolldata"));

    let put = remote.writes().pop().unwrap();
    assert!(put.url.starts_with(ASSIGNMENTS));
    assert!(put.url.ends_with("?api-version=2022-04-01"));
    insta::with_settings!({sort_maps => true}, {
        insta::assert_json_snapshot!(put.body.unwrap(), @r#"
        {
          "properties": {
            "principalId": "sp-1",
            "principalType": "ServicePrincipal",
            "roleDefinitionId": "/subscriptions/sub-1/providers/Microsoft.Authorization/roleDefinitions/ba92f5b4-2d11-453d-a403-e96b0029c9fe"
          }
        }
        "#);
    });

    let second = assign_storage_role(&arm, "payrolldata", "sp-1", StorageRole::BlobDataContributor)
        .await
        .unwrap();
    assert!(!second.created);
    assert_eq!(second.assignment_id, first.assignment_id);
    assert_eq!(remote.writes().len(), 1);

    // A different role for the same principal is a separate grant.
    let reader = assign_storage_role(&arm, "payrolldata", "sp-1", StorageRole::BlobDataReader)
        .await
        .unwrap();
    assert!(reader.created);
}

#[tokio::test]
async fn assignments_filter_by_principal_and_delete_by_id() {
    let remote = resource_manager();
    let session = session();
    let arm = ArmApi::new(&remote, &session, ARM, arm_scope());
    let mine = assign_storage_role(&arm, "payrolldata", "sp-1", StorageRole::QueueDataContributor)
        .await
        .unwrap();
    assign_storage_role(&arm, "payrolldata", "sp-2", StorageRole::TableDataContributor)
        .await
        .unwrap();

    assert_eq!(list_role_assignments(&arm, "payrolldata", None).await.unwrap().len(), 2);
    let only_mine = list_role_assignments(&arm, "payrolldata", Some("SP-1")).await.unwrap();
    assert_eq!(only_mine.len(), 1);
    assert_eq!(only_mine[0].role(), Some(StorageRole::QueueDataContributor));

    delete_role_assignment(&arm, &mine.assignment_id).await.unwrap();
    assert!(
        list_role_assignments(&arm, "payrolldata", Some("sp-1"))
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn malformed_inputs_are_rejected_locally() {
    let remote = resource_manager();
    let session = session();
    let arm = ArmApi::new(&remote, &session, ARM, arm_scope());

    let err = delete_role_assignment(&arm, "not-an-id").await.unwrap_err();
    assert!(err.to_string().starts_with("invalid assignment_id"));
    let err = create_managed_identity(&arm, "x", "westeurope").await.unwrap_err();
    assert!(err.to_string().starts_with("invalid name"));
    let err = assign_storage_role(&arm, "", "sp-1", StorageRole::BlobDataOwner)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "missing required value: storage_account");
    assert!(remote.calls().is_empty());
}
