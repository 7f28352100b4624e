// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Invitation email composition and dispatch.
//!
//! | Project scoped | In directory | Template |
//! |----------------|--------------|----------|
//! | yes | no  | `invitation/ad_invite_project.html` |
//! | yes | yes | `invitation/ad_existing_invite_project.html` |
//! | no  | no  | `invitation/ad_invite_without_project.html` |
//! | no  | yes | `invitation/ad_existing_invite_without_project.html` |
//!
//! Accounts not yet in the directory also get the configured attachment, and
//! a copy of the email goes to the admin address.

use base64ct::{Base64, Encoding};
use serde_json::{Map, Value};
use tracing::info;

use super::ServiceResult;
use crate::config::NotificationConfig;
use crate::providers::{EmailAttachment, EmailMessage, IdentityUser, NotifierError, Project};
use crate::state::AppState;
use crate::storage::{PlatformRole, StoredInvitation};

/// Everything needed to render one invitation.
pub struct InvitationNotice<'a> {
    pub invitation: &'a StoredInvitation,
    pub project: Option<&'a Project>,
    pub inviter: &'a IdentityUser,
    pub account_in_directory: bool,
}

pub fn subject(config: &NotificationConfig, project: Option<&Project>) -> String {
    match project {
        Some(project) => format!("Welcome to the {} project!", project.name),
        None => format!("Welcome to {}!", config.project_name),
    }
}

pub fn template(project_scoped: bool, account_in_directory: bool) -> &'static str {
    match (project_scoped, account_in_directory) {
        (true, false) => "invitation/ad_invite_project.html",
        (true, true) => "invitation/ad_existing_invite_project.html",
        (false, false) => "invitation/ad_invite_without_project.html",
        (false, true) => "invitation/ad_existing_invite_without_project.html",
    }
}

fn platform_role_label(role: PlatformRole) -> &'static str {
    match role {
        PlatformRole::Admin => "Platform Administrator",
        PlatformRole::Member => "Platform User",
    }
}

pub fn template_kwargs(config: &NotificationConfig, notice: &InvitationNotice<'_>) -> Map<String, Value> {
    let invitation = notice.invitation;
    let inviter_email = notice.inviter.email.clone().unwrap_or_default();
    let inviter_name = notice.inviter.username.clone();

    let mut kwargs = Map::new();
    let mut put = |key: &str, value: String| {
        kwargs.insert(key.to_string(), Value::String(value));
    };
    put("inviter_email", inviter_email);
    put("inviter_name", inviter_name);
    put("support_email", config.support_email.clone());
    put("admin_email", config.admin_email.clone());
    put("url", config.login_url.clone());
    put("user_email", invitation.email.clone());
    put("domain", config.domain_name.clone());
    put("helpdesk_email", config.helpdesk_email.clone());

    match notice.project {
        Some(project) => {
            put("project_name", project.name.clone());
            put("project_code", project.code.clone());
            put(
                "project_role",
                invitation.project_role.clone().unwrap_or_default(),
            );
        }
        None => put(
            "platform_role",
            platform_role_label(invitation.platform_role).to_string(),
        ),
    }
    kwargs
}

/// Build the invitee email, plus the admin copy for accounts not yet in the
/// directory.
pub fn compose(
    config: &NotificationConfig,
    notice: &InvitationNotice<'_>,
    attachments: Vec<EmailAttachment>,
) -> Vec<EmailMessage> {
    let invitee = EmailMessage {
        subject: subject(config, notice.project),
        receiver: notice.invitation.email.clone(),
        sender: config.support_email.clone(),
        template: template(notice.project.is_some(), notice.account_in_directory).to_string(),
        template_kwargs: template_kwargs(config, notice),
        attachments,
    };

    if notice.account_in_directory {
        return vec![invitee];
    }

    let admin_copy = EmailMessage {
        receiver: config.admin_email.clone(),
        ..invitee.clone()
    };
    vec![invitee, admin_copy]
}

/// Read and encode the configured attachment, if any.
pub async fn load_attachment(
    config: &NotificationConfig,
) -> Result<Option<EmailAttachment>, NotifierError> {
    let Some(path) = &config.attachment_path else {
        return Ok(None);
    };

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| NotifierError::Attachment(format!("{}: {e}", path.display())))?;

    let name = config.attachment_name.clone().unwrap_or_else(|| {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    Ok(Some(EmailAttachment {
        name,
        data: Base64::encode_string(&bytes),
    }))
}

/// Compose and send the emails for a freshly created invitation.
pub async fn send_invitation_emails(
    state: &AppState,
    invitation: &StoredInvitation,
    project: Option<&Project>,
    inviter: &IdentityUser,
    account_in_directory: bool,
) -> ServiceResult<()> {
    let config = &state.settings.notification;

    let attachments = if account_in_directory {
        Vec::new()
    } else {
        load_attachment(config).await?.into_iter().collect()
    };

    let notice = InvitationNotice {
        invitation,
        project,
        inviter,
        account_in_directory,
    };

    for message in compose(config, &notice, attachments) {
        state.notifier.send(&message).await?;
    }

    info!(
        invitation_id = %invitation.id,
        template = %template(project.is_some(), account_in_directory),
        "Invitation emails sent"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::notification_config;
    use crate::storage::InvitationStatus;
    use chrono::Utc;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn invitation(platform_role: PlatformRole, project: Option<&str>) -> StoredInvitation {
        StoredInvitation {
            id: "inv-1".to_string(),
            invitation_code: "code".to_string(),
            email: "new@example.com".to_string(),
            platform_role,
            project_role: project.map(|_| "collaborator".to_string()),
            project_code: project.map(str::to_string),
            status: InvitationStatus::Pending,
            invited_by: "admin".to_string(),
            create_timestamp: Utc::now(),
            expiry_timestamp: None,
        }
    }

    fn project() -> Project {
        Project {
            id: "p-1".to_string(),
            code: "fakecode".to_string(),
            name: "Fake Project".to_string(),
        }
    }

    #[test]
    fn project_invite_for_new_account_copies_admin() {
        let config = notification_config();
        let inv = invitation(PlatformRole::Member, Some("fakecode"));
        let project = project();
        let inviter = IdentityUser {
            id: "admin-id".to_string(),
            username: "admin".to_string(),
            email: None,
            attributes: HashMap::new(),
        };
        let notice = InvitationNotice {
            invitation: &inv,
            project: Some(&project),
            inviter: &inviter,
            account_in_directory: false,
        };

        let messages = compose(&config, &notice, vec![]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].receiver, "new@example.com");
        assert_eq!(messages[1].receiver, "admin@example.com");
        assert_eq!(messages[0].subject, "Welcome to the Fake Project project!");
        assert_eq!(messages[0].template, "invitation/ad_invite_project.html");
        assert_eq!(messages[0].sender, "support@example.com");

        let kwargs = &messages[0].template_kwargs;
        assert_eq!(kwargs["project_code"], "fakecode");
        assert_eq!(kwargs["project_role"], "collaborator");
        assert_eq!(kwargs["inviter_name"], "admin");
        assert_eq!(kwargs["inviter_email"], "");
        assert!(kwargs.get("platform_role").is_none());
    }

    #[test]
    fn platform_invite_for_directory_account() {
        let config = notification_config();
        let inv = invitation(PlatformRole::Admin, None);
        let inviter = IdentityUser {
            id: "admin-id".to_string(),
            username: "admin".to_string(),
            email: Some("boss@example.com".to_string()),
            attributes: HashMap::new(),
        };
        let notice = InvitationNotice {
            invitation: &inv,
            project: None,
            inviter: &inviter,
            account_in_directory: true,
        };

        let messages = compose(&config, &notice, vec![]);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].subject, "Welcome to Example Platform!");
        assert_eq!(
            messages[0].template,
            "invitation/ad_existing_invite_without_project.html"
        );
        let kwargs = &messages[0].template_kwargs;
        assert_eq!(kwargs["platform_role"], "Platform Administrator");
        assert_eq!(kwargs["inviter_email"], "boss@example.com");
        assert_eq!(kwargs["url"], "https://example.com/login");
        assert_eq!(kwargs["domain"], "example.com");
    }

    #[test]
    fn template_table() {
        assert_eq!(template(false, false), "invitation/ad_invite_without_project.html");
        assert_eq!(template(true, true), "invitation/ad_existing_invite_project.html");
    }

    #[tokio::test]
    async fn attachment_is_base64_encoded() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("guide.pdf");
        std::fs::write(&path, b"hello").unwrap();

        let mut config = notification_config();
        config.attachment_path = Some(path);
        config.attachment_name = Some("Guide.pdf".to_string());

        let attachment = load_attachment(&config).await.unwrap().unwrap();
        assert_eq!(attachment.name, "Guide.pdf");
        assert_eq!(attachment.data, "aGVsbG8=");
    }

    #[tokio::test]
    async fn no_attachment_configured() {
        assert!(load_attachment(&notification_config())
            .await
            .unwrap()
            .is_none());
    }
}
