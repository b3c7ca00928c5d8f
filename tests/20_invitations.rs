mod common;

use anyhow::Result;
use chrono::{Duration, Utc};

use common::{RecordingInviteSender, TestApp};
use tenant_gate::authz::{keys, AuthzError, Role};
use tenant_gate::database::models::{InvitationStatus, PendingInvitation, TeamSettingsPatch, TierName};
use tenant_gate::database::InvitationStore;
use uuid::Uuid;

fn pending_row(org_id: Uuid, invited_by: Uuid, expires_in: Duration) -> PendingInvitation {
    let now = Utc::now();
    PendingInvitation {
        id: Uuid::new_v4(),
        email: "new.hire@acme.test".to_string(),
        proposed_role: Role::Member,
        invited_by,
        org_id,
        status: InvitationStatus::Pending,
        expires_at: now + expires_in,
        created_at: now,
        approved_by: None,
        approved_at: None,
        rejected_by: None,
        rejected_at: None,
        rejection_reason: None,
    }
}

#[tokio::test]
async fn admin_invite_is_dispatched_and_approved() -> Result<()> {
    let app = TestApp::new();
    let acme = app.org("acme").await;
    let admin = app.user(&acme, "admin@acme.test", Role::Admin).await;

    let invitation = app
        .state
        .invitations
        .create_invitation(&app.acting(&acme, &admin), " New.Hire@Acme.test ", Role::Member)
        .await?;

    assert_eq!(invitation.email, "new.hire@acme.test");
    assert_eq!(invitation.status, InvitationStatus::Approved);
    assert_eq!(invitation.approved_by, Some(admin.user_id));

    let sent = app.sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].email, "new.hire@acme.test");
    assert_eq!(sent[0].redirect_url, "http://acme.app.example.com/auth/accept-invite");
    assert_eq!(sent[0].metadata["user_role"], "member");
    assert_eq!(sent[0].metadata["subdomain"], "acme");
    Ok(())
}

#[tokio::test]
async fn member_invites_need_team_setting_and_stay_pending() -> Result<()> {
    let app = TestApp::new();
    let acme = app.org("acme").await;
    let owner = app.user(&acme, "owner@acme.test", Role::Owner).await;
    let member = app.user(&acme, "member@acme.test", Role::Member).await;
    let member_ctx = app.acting(&acme, &member);

    let err = app
        .state
        .invitations
        .create_invitation(&member_ctx, "guest@acme.test", Role::ViewOnly)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::Unauthorized(_)));

    app.state
        .team_settings
        .update_team_settings(
            &app.acting(&acme, &owner),
            &TeamSettingsPatch {
                allow_member_invites: Some(true),
                ..Default::default()
            },
        )
        .await?;

    let invitation = app
        .state
        .invitations
        .create_invitation(&member_ctx, "guest@acme.test", Role::ViewOnly)
        .await?;
    assert_eq!(invitation.status, InvitationStatus::Pending);
    assert!(app.sender.sent().is_empty());

    // Members cannot hand out their own role.
    let err = app
        .state
        .invitations
        .create_invitation(&member_ctx, "peer@acme.test", Role::Member)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::Unauthorized(_)));
    Ok(())
}

#[tokio::test]
async fn team_member_limit_blocks_new_invitations() -> Result<()> {
    let app = TestApp::new();
    let acme = app.org("acme").await;
    let admin = app.user(&acme, "admin@acme.test", Role::Admin).await;
    for i in 0..4 {
        app.user(&acme, &format!("user{}@acme.test", i), Role::Member).await;
    }

    let err = app
        .state
        .invitations
        .create_invitation(&app.acting(&acme, &admin), "sixth@acme.test", Role::Member)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AuthzError::LimitReached {
            resource: "team_members".to_string(),
            current: 5,
            limit: 5,
        }
    );
    assert!(app.sender.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn expired_invitation_is_marked_on_approval_attempt() -> Result<()> {
    let app = TestApp::new();
    let acme = app.org("acme").await;
    let admin = app.user(&acme, "admin@acme.test", Role::Admin).await;
    let row = pending_row(acme.org.id, admin.user_id, Duration::hours(-1));
    app.store.put_invitation(row.clone()).await;

    let err = app
        .state
        .invitations
        .approve_invitation(row.id, &app.acting(&acme, &admin))
        .await
        .unwrap_err();
    assert_eq!(err, AuthzError::Expired("Invitation has expired".to_string()));

    let stored = app.store.find_invitation(row.id).await?.expect("row");
    assert_eq!(stored.status, InvitationStatus::Expired);
    assert!(app.sender.sent().is_empty());

    // Terminal: a second attempt no longer sees a pending row.
    let err = app
        .state
        .invitations
        .approve_invitation(row.id, &app.acting(&acme, &admin))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn rejected_invitation_cannot_be_approved() -> Result<()> {
    let app = TestApp::new();
    let acme = app.org("acme").await;
    let admin = app.user(&acme, "admin@acme.test", Role::Admin).await;
    let acting = app.acting(&acme, &admin);
    let row = pending_row(acme.org.id, admin.user_id, Duration::days(3));
    app.store.put_invitation(row.clone()).await;

    app.state
        .invitations
        .reject_invitation(row.id, &acting, Some("  duplicate  ".to_string()))
        .await?;

    let stored = app.store.find_invitation(row.id).await?.expect("row");
    assert_eq!(stored.status, InvitationStatus::Rejected);
    assert_eq!(stored.rejected_by, Some(admin.user_id));
    assert_eq!(stored.rejection_reason.as_deref(), Some("duplicate"));

    let err = app.state.invitations.approve_invitation(row.id, &acting).await.unwrap_err();
    assert!(matches!(err, AuthzError::NotFound(_)));
    let err = app
        .state
        .invitations
        .reject_invitation(row.id, &acting, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::NotFound(_)));
    assert!(app.sender.sent().is_empty());

    let after = app.store.find_invitation(row.id).await?.expect("row");
    assert_eq!(after.status, InvitationStatus::Rejected);
    assert_eq!(after.rejected_by, Some(admin.user_id));
    assert_eq!(after.rejected_at, stored.rejected_at);
    assert_eq!(after.rejection_reason.as_deref(), Some("duplicate"));
    assert_eq!(after.approved_by, None);
    assert_eq!(after.approved_at, None);
    Ok(())
}

#[tokio::test]
async fn failed_dispatch_leaves_invitation_pending() -> Result<()> {
    let app = TestApp::with_sender(RecordingInviteSender::failing());
    let acme = app.org("acme").await;
    let admin = app.user(&acme, "admin@acme.test", Role::Admin).await;
    let row = pending_row(acme.org.id, admin.user_id, Duration::days(3));
    app.store.put_invitation(row.clone()).await;

    let err = app
        .state
        .invitations
        .approve_invitation(row.id, &app.acting(&acme, &admin))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::Transport(_)));

    let stored = app.store.find_invitation(row.id).await?.expect("row");
    assert_eq!(stored.status, InvitationStatus::Pending);
    assert_eq!(stored.approved_by, None);
    Ok(())
}

#[tokio::test]
async fn other_organizations_cannot_resolve_invitations() -> Result<()> {
    let app = TestApp::new();
    let acme = app.org("acme").await;
    let globex = app.org("globex").await;
    let acme_admin = app.user(&acme, "admin@acme.test", Role::Admin).await;
    let globex_owner = app.user(&globex, "owner@globex.test", Role::Owner).await;
    let row = pending_row(acme.org.id, acme_admin.user_id, Duration::days(3));
    app.store.put_invitation(row.clone()).await;

    let err = app
        .state
        .invitations
        .approve_invitation(row.id, &app.acting(&globex, &globex_owner))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::Unauthorized(_)));

    // Right organization, wrong tenant subdomain.
    let mut spoofed = app.acting(&acme, &acme_admin);
    spoofed.subdomain = "globex".to_string();
    let err = app
        .state
        .invitations
        .reject_invitation(row.id, &spoofed, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::Unauthorized(_)));

    let stored = app.store.find_invitation(row.id).await?.expect("row");
    assert_eq!(stored.status, InvitationStatus::Pending);
    Ok(())
}

#[tokio::test]
async fn members_cannot_approve() -> Result<()> {
    let app = TestApp::new();
    let acme = app.org("acme").await;
    let admin = app.user(&acme, "admin@acme.test", Role::Admin).await;
    let member = app.user(&acme, "member@acme.test", Role::Member).await;
    let row = pending_row(acme.org.id, admin.user_id, Duration::days(3));
    app.store.put_invitation(row.clone()).await;

    let err = app
        .state
        .invitations
        .approve_invitation(row.id, &app.acting(&acme, &member))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::InsufficientRole { actual: Role::Member, .. }));
    Ok(())
}

#[tokio::test]
async fn pending_list_reports_lapsed_rows_as_expired() -> Result<()> {
    let app = TestApp::new();
    let acme = app.org("acme").await;
    let admin = app.user(&acme, "admin@acme.test", Role::Admin).await;
    let fresh = pending_row(acme.org.id, admin.user_id, Duration::days(3));
    let lapsed = pending_row(acme.org.id, admin.user_id, Duration::minutes(-5));
    app.store.put_invitation(fresh.clone()).await;
    app.store.put_invitation(lapsed.clone()).await;

    let rows = app
        .state
        .invitations
        .list_pending_invitations(&app.acting(&acme, &admin))
        .await?;
    assert_eq!(rows.len(), 2);
    let status_of = |id| rows.iter().find(|r| r.id == id).map(|r| r.status);
    assert_eq!(status_of(fresh.id), Some(InvitationStatus::Pending));
    assert_eq!(status_of(lapsed.id), Some(InvitationStatus::Expired));
    Ok(())
}

#[tokio::test]
async fn revoked_team_invite_blocks_admins() -> Result<()> {
    let app = TestApp::new();
    let acme = app.org("acme").await;
    app.store.add_subscription(acme.org.id, TierName::Business, "active").await;
    let owner = app.user(&acme, "owner@acme.test", Role::Owner).await;
    let admin = app.user(&acme, "admin@acme.test", Role::Admin).await;
    let owner_ctx = app.acting(&acme, &owner);
    let admin_ctx = app.acting(&acme, &admin);

    app.state
        .capabilities
        .set_capability_override(&owner_ctx, Role::Admin, keys::TEAM_INVITE, false)
        .await?;

    let err = app
        .state
        .invitations
        .create_invitation(&admin_ctx, "new@acme.test", Role::Member)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::Unauthorized(_)));
    assert!(app.sender.sent().is_empty());
    assert!(app.store.list_invitations(acme.org.id, None).await?.is_empty());

    // team.manage_roles alone still lets an admin resolve invitations.
    let row = pending_row(acme.org.id, owner.user_id, Duration::days(3));
    app.store.put_invitation(row.clone()).await;
    app.state.invitations.approve_invitation(row.id, &admin_ctx).await?;

    app.state
        .capabilities
        .set_capability_override(&owner_ctx, Role::Admin, keys::TEAM_MANAGE_ROLES, false)
        .await?;
    let other = pending_row(acme.org.id, owner.user_id, Duration::days(3));
    app.store.put_invitation(other.clone()).await;
    let err = app
        .state
        .invitations
        .reject_invitation(other.id, &admin_ctx, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::Unauthorized(_)));
    let stored = app.store.find_invitation(other.id).await?.expect("row");
    assert_eq!(stored.status, InvitationStatus::Pending);
    Ok(())
}

#[tokio::test]
async fn granted_team_invite_lets_members_file_invitations() -> Result<()> {
    let app = TestApp::new();
    let acme = app.org("acme").await;
    app.store.add_subscription(acme.org.id, TierName::Business, "active").await;
    let owner = app.user(&acme, "owner@acme.test", Role::Owner).await;
    let member = app.user(&acme, "member@acme.test", Role::Member).await;

    app.state
        .capabilities
        .set_capability_override(&app.acting(&acme, &owner), Role::Member, keys::TEAM_INVITE, true)
        .await?;

    // allow_member_invites is still off.
    let invitation = app
        .state
        .invitations
        .create_invitation(&app.acting(&acme, &member), "guest@acme.test", Role::ViewOnly)
        .await?;
    assert_eq!(invitation.status, InvitationStatus::Pending);
    assert_eq!(invitation.invited_by, member.user_id);
    assert!(app.sender.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn unknown_organization_cannot_invite() -> Result<()> {
    let app = TestApp::new();
    let acme = app.org("acme").await;
    let admin = app.user(&acme, "admin@acme.test", Role::Admin).await;
    let mut acting = app.acting(&acme, &admin);
    acting.org_id = Uuid::new_v4();

    let err = app
        .state
        .invitations
        .create_invitation(&acting, "new@acme.test", Role::Member)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::Unauthorized(_)));
    assert!(app.sender.sent().is_empty());
    Ok(())
}
