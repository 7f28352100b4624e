// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Invitation lifecycle.
//!
//! Creating an invitation runs, in order: project resolution, duplicate
//! check, existing-user check, inviter lookup, directory group assignment,
//! insert, audit event, email. The first failure stops the sequence; earlier steps are not
//! undone. The duplicate check and the insert are not atomic.

use chrono::Utc;
use tracing::info;

use super::events::EventService;
use super::{close_directory, notify, ServiceError, ServiceResult};
use crate::config::DirectoryConfig;
use crate::models::{CreateInvitationRequest, UserRelationship, UserView};
use crate::providers::{DirectoryError, DirectorySession, Project};
use crate::state::AppState;
use crate::storage::repository::events::{DETAIL_INVITATION_ID, DETAIL_PROJECT_CODE};
use crate::storage::repository::{
    InvitationColumn, InvitationFilter, InvitationPatch, InvitationSearch, NewEvent,
    NewInvitation,
};
use crate::storage::{
    EventType, InvitationRepository, InvitationStatus, Pagination, PlatformRole, SortOrder,
    StoredInvitation,
};

/// Realm role marking platform administrators.
const PLATFORM_ADMIN_ROLE: &str = "platform-admin";
/// Status reported for an invitee without an account yet.
const INVITED_STATUS: &str = "invited";
/// Status reported when the account has no status attribute.
const DEFAULT_ACCOUNT_STATUS: &str = "pending";

/// Result of [`InvitationService::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateInvitationOutcome {
    Created(StoredInvitation),
    /// An invitation for this email and project already exists.
    Conflict,
    /// The email already belongs to a platform user.
    AlreadyExists,
}

pub struct InvitationService<'a> {
    state: &'a AppState,
}

impl<'a> InvitationService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub async fn create(
        &self,
        request: &CreateInvitationRequest,
    ) -> ServiceResult<CreateInvitationOutcome> {
        info!(
            email = %request.email,
            platform_role = %request.platform_role,
            invited_by = %request.invited_by,
            "Creating invitation"
        );
        let relationship = request.relationship();

        let project = match relationship.and_then(|r| r.project_ref()) {
            Some(reference) => Some(self.state.projects.get(reference).await?),
            None => None,
        };

        let repo = InvitationRepository::new(&self.state.db);
        if let Some(project) = &project {
            let existing = repo.query(
                &InvitationFilter::default()
                    .with_project_code(&project.code)
                    .with_email(&request.email),
            )?;
            if !existing.is_empty() {
                info!(email = %request.email, project_code = %project.code, "Invitation already exists");
                return Ok(CreateInvitationOutcome::Conflict);
            }
        }

        if self
            .state
            .identity
            .get_user_by_email(&request.email)
            .await?
            .is_some()
        {
            info!(email = %request.email, "User already exists in platform");
            return Ok(CreateInvitationOutcome::AlreadyExists);
        }

        let inviter = self
            .state
            .identity
            .get_user_by_username(&request.invited_by)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Inviter {} not found", request.invited_by))
            })?;

        let account_in_directory = if self.state.settings.directory.enabled {
            self.assign_directory_groups(&request.email, request.platform_role, project.as_ref())
                .await?
        } else {
            false
        };

        let invitation = repo.create(&NewInvitation {
            email: request.email.clone(),
            platform_role: request.platform_role,
            project_role: project
                .as_ref()
                .and(relationship)
                .and_then(|r| r.project_role.clone()),
            project_code: project.as_ref().map(|p| p.code.clone()),
            invited_by: request.invited_by.clone(),
            expiry_timestamp: Some(Utc::now() + self.state.settings.invitation_ttl),
        })?;

        let mut event = NewEvent::new(if project.is_some() {
            EventType::InviteToProject
        } else {
            EventType::InviteToPlatform
        })
        .with_operator(&invitation.invited_by)
        .with_operator_id(&inviter.id)
        .with_detail(DETAIL_INVITATION_ID, invitation.id.clone())
        .with_detail("platform_role", invitation.platform_role.as_str());
        if let Some(project) = &project {
            event = event
                .with_detail("project_role", invitation.project_role.clone())
                .with_detail(DETAIL_PROJECT_CODE, project.code.clone());
        }
        EventService::new(self.state).record(event).await?;

        notify::send_invitation_emails(
            self.state,
            &invitation,
            project.as_ref(),
            &inviter,
            account_in_directory,
        )
        .await?;

        info!(invitation_id = %invitation.id, "Invitation created");
        Ok(CreateInvitationOutcome::Created(invitation))
    }

    /// Returns whether the account already exists in the directory.
    async fn assign_directory_groups(
        &self,
        email: &str,
        platform_role: PlatformRole,
        project: Option<&Project>,
    ) -> ServiceResult<bool> {
        let mut session = self.state.directory.connect().await?;
        let result = add_to_invitee_groups(
            session.as_mut(),
            &self.state.settings.directory,
            email,
            platform_role,
            project,
        )
        .await;
        close_directory(session.as_mut()).await;
        Ok(result?)
    }

    /// Inspect a user or pending invitee.
    pub async fn check_user(
        &self,
        email: &str,
        project_code: Option<&str>,
    ) -> ServiceResult<UserView> {
        info!(email = %email, "Checking user");
        let Some(user) = self.state.identity.get_user_by_email(email).await? else {
            let pending = InvitationRepository::new(&self.state.db).query(
                &InvitationFilter::default()
                    .with_email(email)
                    .with_status(InvitationStatus::Pending),
            )?;
            return match pending.into_iter().next() {
                Some(invitation) => Ok(UserView {
                    name: String::new(),
                    email: invitation.email,
                    status: INVITED_STATUS.to_string(),
                    role: invitation.platform_role,
                    relationship: UserRelationship::default(),
                }),
                None => Err(ServiceError::NotFound(format!(
                    "User {email} not found in identity provider"
                ))),
            };
        };

        let project = match project_code.filter(|c| !c.is_empty()) {
            Some(code) => Some(self.state.projects.get(code).await?),
            None => None,
        };

        let roles = self.state.identity.get_user_realm_roles(&user.id).await?;
        let role = if roles.iter().any(|r| r.name == PLATFORM_ADMIN_ROLE) {
            PlatformRole::Admin
        } else {
            PlatformRole::Member
        };

        let project_role = project.as_ref().and_then(|project| {
            let prefix = format!("{}-", project.code);
            roles
                .iter()
                .find_map(|r| r.name.strip_prefix(&prefix).map(str::to_string))
        });

        let relationship = match (project, project_role) {
            (Some(project), Some(project_role)) => UserRelationship {
                project_code: Some(project.code),
                project_role: Some(project_role),
            },
            _ => UserRelationship::default(),
        };

        Ok(UserView {
            name: user.username.clone(),
            email: user.email.clone().unwrap_or_default(),
            status: user
                .attribute("status")
                .unwrap_or(DEFAULT_ACCOUNT_STATUS)
                .to_string(),
            role,
            relationship,
        })
    }

    pub fn list(
        &self,
        search: &InvitationSearch,
        pagination: Pagination,
        order_by: InvitationColumn,
        order: SortOrder,
    ) -> ServiceResult<(Vec<StoredInvitation>, usize)> {
        Ok(InvitationRepository::new(&self.state.db).list(search, pagination, order_by, order)?)
    }

    /// Mark a pending invitation complete and link its audit event to the
    /// account the invitee registered.
    pub async fn finalize(
        &self,
        invitation_id: &str,
        status: InvitationStatus,
    ) -> ServiceResult<StoredInvitation> {
        if status != InvitationStatus::Complete {
            return Err(ServiceError::Validation(format!(
                "Invalid status transition to {}",
                status.as_str()
            )));
        }

        let repo = InvitationRepository::new(&self.state.db);
        let invitation = repo.get(invitation_id)?;
        if invitation.status == InvitationStatus::Complete {
            return Err(ServiceError::Validation(format!(
                "Invitation {invitation_id} is already complete"
            )));
        }

        let user = self
            .state
            .identity
            .get_user_by_email(&invitation.email)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("User {} not found", invitation.email))
            })?;

        EventService::new(self.state).backfill_target(invitation_id, &user.id, &user.username)?;

        let updated = repo.update(
            &InvitationFilter::by_id(invitation_id),
            &InvitationPatch {
                status: Some(InvitationStatus::Complete),
            },
        )?;
        info!(invitation_id = %invitation_id, username = %user.username, "Invitation completed");
        Ok(updated)
    }
}

/// Add an existing directory account to the base user group, then to the
/// admin group or the project group.
async fn add_to_invitee_groups(
    session: &mut dyn DirectorySession,
    config: &DirectoryConfig,
    email: &str,
    platform_role: PlatformRole,
    project: Option<&Project>,
) -> Result<bool, DirectoryError> {
    if !session.is_account_in_ad(email).await? {
        return Ok(false);
    }
    let Some(user) = session.get_user_by_email(email).await? else {
        return Ok(false);
    };

    let mut groups = vec![config.user_group.as_str()];
    match (platform_role, project) {
        (PlatformRole::Admin, _) => groups.push(config.admin_group.as_str()),
        (PlatformRole::Member, Some(project)) => groups.push(project.code.as_str()),
        (PlatformRole::Member, None) => {}
    }

    for group in groups {
        let group_dn = session.format_group_dn(group);
        session.add_user_to_group(&user.dn, &group_dn).await?;
    }
    Ok(true)
}
