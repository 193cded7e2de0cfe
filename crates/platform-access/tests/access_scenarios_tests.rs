//! End-to-end tests for the access service.
//!
//! These tests drive [`AccessService`] the way an API layer would: one
//! identity per caller, every mutation in its own transaction, audit events
//! observed on the in-memory bus.
//!
//! Scenarios:
//! 1. Inherited roles and the last-owner rule on a fresh organization
//! 2. Public links on documents only
//! 3. Workspace trash hiding and restoring its documents
//! 4. Idempotent moves and cross-organization moves
//! 5. Privileged view for support users and install admins
//! 6. Concurrent owner removals never orphan a resource

use platform_access::{AccessConfig, AccessError, AccessService, PermissionDelta};
use platform_org::{DocId, DocType, OrgId, OrgKey, ResourceId, WorkspaceId};
use platform_rbac::{Identity, Principal, Role, UserId};

/// Test fixture: organization `org1` owned by user 42 with one workspace
/// and one document.
struct TestFixture {
    /// Service under test.
    service: AccessService,
    /// Owner of everything below.
    owner: Identity,
    /// The organization.
    org: OrgId,
    /// Workspace `ws1`.
    ws: WorkspaceId,
    /// Document `doc1` in `ws1`.
    doc: DocId,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_config(AccessConfig::default()).await
    }

    async fn with_config(config: AccessConfig) -> Self {
        let service = AccessService::in_memory(config).expect("Invalid configuration");
        let owner = Identity::new(UserId(42));

        let org = service
            .create_organization(&owner, "org1", Some("org1"))
            .await
            .expect("Failed to create organization");
        let ws = service
            .create_workspace(&owner, &org.into(), "ws1")
            .await
            .expect("Failed to create workspace");
        let doc = service
            .create_document(&owner, ws, "doc1", DocType::Normal)
            .await
            .expect("Failed to create document");

        Self {
            service,
            owner,
            org,
            ws,
            doc,
        }
    }

    fn org_key(&self) -> OrgKey {
        self.org.into()
    }

    async fn role(&self, identity: &Identity, resource: impl Into<ResourceId>) -> Role {
        self.service
            .resolve_role(identity, &resource.into())
            .await
            .expect("Failed to resolve role")
    }

    /// Principals holding a direct owner entry on a resource.
    async fn direct_owners(&self, resource: impl Into<ResourceId>) -> Vec<Principal> {
        let report = self
            .service
            .get_access(&self.owner, &resource.into())
            .await
            .expect("Failed to read access");
        report
            .entries
            .into_iter()
            .filter(|entry| entry.direct == Role::Owner)
            .map(|entry| entry.principal)
            .collect()
    }
}

// ============================================================================
// Inheritance and last owner
// ============================================================================

#[tokio::test]
async fn test_inherited_editor_and_last_owner_rule() {
    let fixture = TestFixture::new().await;
    let bob = Identity::new(UserId(7));

    assert_eq!(
        fixture.direct_owners(fixture.ws).await,
        vec![Principal::User(UserId(42))]
    );
    assert_eq!(fixture.role(&bob, fixture.ws).await, Role::None);

    fixture
        .service
        .apply_delta(
            &fixture.owner,
            &fixture.org.into(),
            &PermissionDelta::new().set_user(UserId(7), Role::Editor),
        )
        .await
        .unwrap();
    assert_eq!(fixture.role(&bob, fixture.ws).await, Role::Editor);
    assert_eq!(fixture.role(&bob, fixture.doc).await, Role::Editor);

    let err = fixture
        .service
        .apply_delta(
            &fixture.owner,
            &fixture.ws.into(),
            &PermissionDelta::new().remove(Principal::User(UserId(42))),
        )
        .await
        .unwrap_err();
    assert_eq!(err, AccessError::LastOwnerRemoval(fixture.ws.into()));
    assert_eq!(err.status_code(), 400);

    // Nothing was applied.
    assert_eq!(
        fixture.direct_owners(fixture.ws).await,
        vec![Principal::User(UserId(42))]
    );
}

#[tokio::test]
async fn test_owner_can_leave_when_another_ancestor_owner_remains() {
    let fixture = TestFixture::new().await;

    fixture
        .service
        .apply_delta(
            &fixture.owner,
            &fixture.org.into(),
            &PermissionDelta::new().set_user(UserId(8), Role::Owner),
        )
        .await
        .unwrap();

    let changes = fixture
        .service
        .apply_delta(
            &fixture.owner,
            &fixture.ws.into(),
            &PermissionDelta::new().remove(Principal::User(UserId(42))),
        )
        .await
        .unwrap();
    assert!(changes.is_changed());
    assert_eq!(changes.current.owner_count(), 0);

    // User 42 still owns the workspace through the organization.
    assert_eq!(fixture.role(&fixture.owner, fixture.ws).await, Role::Owner);
}

#[tokio::test]
async fn test_editor_cannot_change_access() {
    let fixture = TestFixture::new().await;
    let bob = Identity::new(UserId(7));
    fixture
        .service
        .apply_delta(
            &fixture.owner,
            &fixture.ws.into(),
            &PermissionDelta::new().set_user(UserId(7), Role::Editor),
        )
        .await
        .unwrap();

    let err = fixture
        .service
        .apply_delta(
            &bob,
            &fixture.ws.into(),
            &PermissionDelta::new().set_user(UserId(7), Role::Owner),
        )
        .await
        .unwrap_err();
    assert!(err.is_permission_denial());
    assert_eq!(fixture.role(&bob, fixture.ws).await, Role::Editor);
}

// ============================================================================
// Public links
// ============================================================================

#[tokio::test]
async fn test_everyone_viewer_on_document_only() {
    let fixture = TestFixture::new().await;
    let visitor = Identity::anonymous();
    let public = PermissionDelta::new().set_everyone(Role::Viewer);

    assert_eq!(fixture.role(&visitor, fixture.doc).await, Role::None);
    fixture
        .service
        .apply_delta(&fixture.owner, &fixture.doc.into(), &public)
        .await
        .unwrap();
    assert_eq!(fixture.role(&visitor, fixture.doc).await, Role::Viewer);
    // A public document does not open its workspace.
    assert_eq!(fixture.role(&visitor, fixture.ws).await, Role::None);

    let err = fixture
        .service
        .apply_delta(&fixture.owner, &fixture.ws.into(), &public)
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::InvalidPrincipal { .. }));
}

#[tokio::test]
async fn test_pending_email_binds_to_registered_identity() {
    let fixture = TestFixture::new().await;
    let carol = Identity::new(UserId(9)).with_email("carol@example.com");
    fixture.service.register_identity(carol.clone()).await;

    let changes = fixture
        .service
        .apply_delta(
            &fixture.owner,
            &fixture.doc.into(),
            &PermissionDelta::new()
                .set_email("Carol@Example.com", Role::Editor)
                .set_email("dave@example.com", Role::Viewer),
        )
        .await
        .unwrap();

    assert_eq!(changes.current.role_of(&Principal::User(UserId(9))), Role::Editor);
    assert_eq!(
        changes.current.role_of(&Principal::email("dave@example.com")),
        Role::Viewer
    );
    assert_eq!(fixture.role(&carol, fixture.doc).await, Role::Editor);

    let dave = Identity::new(UserId(10)).with_email("dave@example.com");
    assert_eq!(fixture.role(&dave, fixture.doc).await, Role::Viewer);
}

// ============================================================================
// Trash
// ============================================================================

#[tokio::test]
async fn test_workspace_trash_hides_and_restores_documents() {
    let fixture = TestFixture::new().await;
    let mut sub = fixture.service.events().subscribe("workspace.#").await.unwrap();

    fixture
        .service
        .soft_delete(&fixture.owner, &fixture.ws.into())
        .await
        .unwrap();

    let listed = fixture
        .service
        .list_workspaces(&fixture.owner, &fixture.org_key(), false)
        .await
        .unwrap();
    assert!(listed.is_empty());
    let docs = fixture
        .service
        .list_documents(&fixture.owner, fixture.ws, false)
        .await
        .unwrap();
    assert!(docs.is_empty());

    // The document's own flag is untouched.
    let doc = fixture
        .service
        .get_document(&fixture.owner, fixture.doc)
        .await
        .unwrap();
    assert!(doc.removed_at.is_none());

    let trash = fixture
        .service
        .list_trash(&fixture.owner, &fixture.org_key())
        .await
        .unwrap();
    assert_eq!(trash.workspaces.len(), 1);

    let err = fixture
        .service
        .soft_delete(&fixture.owner, &fixture.ws.into())
        .await
        .unwrap_err();
    assert_eq!(err, AccessError::AlreadyDeleted(fixture.ws.into()));

    fixture
        .service
        .restore(&fixture.owner, &fixture.ws.into())
        .await
        .unwrap();
    let docs = fixture
        .service
        .list_documents(&fixture.owner, fixture.ws, false)
        .await
        .unwrap();
    assert_eq!(docs.len(), 1);

    let err = fixture
        .service
        .restore(&fixture.owner, &fixture.ws.into())
        .await
        .unwrap_err();
    assert_eq!(err, AccessError::NotDeleted(fixture.ws.into()));

    let trashed = sub.recv().await.unwrap();
    assert_eq!(trashed.event_type, "workspace.move_to_trash");
    let restored = sub.recv().await.unwrap();
    assert_eq!(restored.event_type, "workspace.restore_from_trash");
}

#[tokio::test]
async fn test_permanent_delete_of_workspace_cascades() {
    let fixture = TestFixture::new().await;
    fixture
        .service
        .create_document(&fixture.owner, fixture.ws, "doc2", DocType::Normal)
        .await
        .unwrap();

    let counts = fixture
        .service
        .permanently_delete(&fixture.owner, &fixture.ws.into(), true)
        .await
        .unwrap();
    assert_eq!(counts.workspaces, 1);
    assert_eq!(counts.documents, 2);

    let err = fixture
        .service
        .get_document(&fixture.owner, fixture.doc)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 404);
}

// ============================================================================
// Moves
// ============================================================================

#[tokio::test]
async fn test_move_is_idempotent() {
    let fixture = TestFixture::new().await;
    let ws2 = fixture
        .service
        .create_workspace(&fixture.owner, &fixture.org_key(), "ws2")
        .await
        .unwrap();
    let mut sub = fixture.service.events().subscribe("document.move").await.unwrap();

    let moved = fixture
        .service
        .move_document(&fixture.owner, fixture.doc, ws2)
        .await
        .unwrap();
    assert_eq!(moved.from, fixture.ws);
    assert_eq!(moved.to, ws2);

    // Retrying with the same target changes nothing.
    let retried = fixture
        .service
        .move_document(&fixture.owner, fixture.doc, ws2)
        .await
        .unwrap();
    assert_eq!(retried.from, ws2);
    assert_eq!(retried.to, ws2);

    assert!(sub.recv().await.is_ok());
    assert!(sub.try_recv().is_none());

    let doc = fixture
        .service
        .get_document(&fixture.owner, fixture.doc)
        .await
        .unwrap();
    assert_eq!(doc.workspace_id, ws2);
}

#[tokio::test]
async fn test_moved_document_takes_access_from_new_workspace() {
    let fixture = TestFixture::new().await;
    let bob = Identity::new(UserId(7));
    let carol = Identity::new(UserId(9));
    let ws2 = fixture
        .service
        .create_workspace(&fixture.owner, &fixture.org_key(), "ws2")
        .await
        .unwrap();

    fixture
        .service
        .apply_delta(
            &fixture.owner,
            &fixture.ws.into(),
            &PermissionDelta::new().set_user(UserId(7), Role::Editor),
        )
        .await
        .unwrap();
    fixture
        .service
        .apply_delta(
            &fixture.owner,
            &ws2.into(),
            &PermissionDelta::new().set_user(UserId(9), Role::Viewer),
        )
        .await
        .unwrap();
    assert_eq!(fixture.role(&bob, fixture.doc).await, Role::Editor);
    assert_eq!(fixture.role(&carol, fixture.doc).await, Role::None);

    fixture
        .service
        .move_document(&fixture.owner, fixture.doc, ws2)
        .await
        .unwrap();

    assert_eq!(fixture.role(&bob, fixture.doc).await, Role::None);
    assert_eq!(fixture.role(&carol, fixture.doc).await, Role::Viewer);
    assert!(fixture
        .service
        .get_document(&bob, fixture.doc)
        .await
        .unwrap_err()
        .is_permission_denial());
}

#[tokio::test]
async fn test_cross_organization_move_is_rejected() {
    let fixture = TestFixture::new().await;
    let other_org = fixture
        .service
        .create_organization(&fixture.owner, "org2", Some("org2"))
        .await
        .unwrap();
    let foreign = fixture
        .service
        .create_workspace(&fixture.owner, &other_org.into(), "elsewhere")
        .await
        .unwrap();

    let err = fixture
        .service
        .move_document(&fixture.owner, fixture.doc, foreign)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AccessError::CrossOrganizationMove {
            document: fixture.doc,
            from: fixture.org,
            to: other_org,
        }
    );

    let doc = fixture
        .service
        .get_document(&fixture.owner, fixture.doc)
        .await
        .unwrap();
    assert_eq!(doc.workspace_id, fixture.ws);
}

// ============================================================================
// Privileged view
// ============================================================================

#[tokio::test]
async fn test_support_user_gets_privileged_view_of_organization() {
    let fixture = TestFixture::new().await;
    let support = Identity::new(UserId(5)).as_support();

    let report = fixture
        .service
        .get_access(&support, &fixture.org.into())
        .await
        .unwrap();
    assert_eq!(report.caller_role, Role::Viewer);

    let org = fixture
        .service
        .get_organization(&support, &OrgKey::from("org1"))
        .await
        .unwrap();
    assert_eq!(org.id, fixture.org);

    // The view is not a standing grant.
    assert_eq!(fixture.role(&support, fixture.org).await, Role::None);
}

#[tokio::test]
async fn test_regular_user_is_never_elevated() {
    let fixture = TestFixture::new().await;
    let stranger = Identity::new(UserId(6));

    let err = fixture
        .service
        .get_access(&stranger, &fixture.org.into())
        .await
        .unwrap_err();
    assert!(err.is_permission_denial());
}

#[tokio::test]
async fn test_install_admin_and_disabled_retry() {
    let admin = Identity::new(UserId(11)).with_email("root@install.example");

    let enabled = TestFixture::with_config(AccessConfig {
        install_admin_emails: vec!["root@install.example".to_string()],
        ..AccessConfig::default()
    })
    .await;
    assert!(enabled
        .service
        .get_organization(&admin, &enabled.org_key())
        .await
        .is_ok());

    let disabled = TestFixture::with_config(AccessConfig {
        install_admin_emails: vec!["root@install.example".to_string()],
        privileged_retry: false,
        ..AccessConfig::default()
    })
    .await;
    assert!(disabled
        .service
        .get_organization(&admin, &disabled.org_key())
        .await
        .unwrap_err()
        .is_permission_denial());
}

#[tokio::test]
async fn test_privileged_view_never_allows_writes() {
    let fixture = TestFixture::new().await;
    let support = Identity::new(UserId(5)).as_support();

    let err = fixture
        .service
        .rename(&support, &fixture.org.into(), "hijacked")
        .await
        .unwrap_err();
    assert!(err.is_permission_denial());
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_self_removals_keep_one_owner() {
    let fixture = TestFixture::new().await;
    let second = Identity::new(UserId(43));
    fixture
        .service
        .apply_delta(
            &fixture.owner,
            &fixture.org.into(),
            &PermissionDelta::new().set_user(UserId(43), Role::Owner),
        )
        .await
        .unwrap();

    let leave_first = PermissionDelta::new().remove(Principal::User(UserId(42)));
    let leave_second = PermissionDelta::new().remove(Principal::User(UserId(43)));
    let org: ResourceId = fixture.org.into();

    let service_a = fixture.service.clone();
    let service_b = fixture.service.clone();
    let (owner, org_a, org_b) = (fixture.owner.clone(), org.clone(), org.clone());
    let first = tokio::spawn(async move {
        service_a.apply_delta(&owner, &org_a, &leave_first).await
    });
    let second_leave = tokio::spawn(async move {
        service_b.apply_delta(&second, &org_b, &leave_second).await
    });

    let results = [first.await.unwrap(), second_leave.await.unwrap()];
    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|result| matches!(result, Err(AccessError::LastOwnerRemoval(_)))));

    let snapshot = fixture.service.store().snapshot().await;
    let remaining = platform_access::effective_role(
        &snapshot,
        &platform_access::Scope::new(Identity::new(UserId(42))),
        &org,
    )
    .unwrap()
    .max(
        platform_access::effective_role(
            &snapshot,
            &platform_access::Scope::new(Identity::new(UserId(43))),
            &org,
        )
        .unwrap(),
    );
    assert_eq!(remaining, Role::Owner);
}
