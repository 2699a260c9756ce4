//! Facade over the Directory groups, group settings, and members endpoints.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::auth::Authenticator;
use crate::error::{FailureKind, GroupsError, Result};
use crate::models::{ApiErrorResponse, Group, Member, MembersListResponse, Role};
use crate::settings::{public_group_settings, GroupSettings};

/// Base URL for the Admin SDK Directory API.
const DIRECTORY_API_BASE: &str = "https://admin.googleapis.com/admin/directory/v1";

/// Base URL for the Groups Settings API.
const SETTINGS_API_BASE: &str = "https://www.googleapis.com/groups/v1/groups";

/// Total attempts for a settings fetch; the endpoint intermittently answers
/// with a transient backend error.
const SETTINGS_FETCH_ATTEMPTS: u32 = 3;

/// Which facade operation an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GetGroup,
    CreateGroup,
    GetSettings,
    UpdateSettings,
    ListMembers,
    AddMember,
    RemoveMember,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::GetGroup => "get-group",
            Operation::CreateGroup => "create-group",
            Operation::GetSettings => "get-settings",
            Operation::UpdateSettings => "update-settings",
            Operation::ListMembers => "list-members",
            Operation::AddMember => "add-member",
            Operation::RemoveMember => "remove-member",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("WARNING"),
            Severity::Error => f.write_str("ERROR"),
        }
    }
}

/// One recorded failure. Expected per-item failures are appended to the
/// facade's event list instead of being returned as errors.
#[derive(Debug, Clone)]
pub struct OperationEvent {
    pub severity: Severity,
    pub operation: Operation,
    pub target: String,
    pub cause: FailureKind,
    pub message: String,
}

impl fmt::Display for OperationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Everything known about a group: the group record, its settings, and its
/// member list. Settings and members are only fetched when the group exists;
/// `None` means skipped or failed.
#[derive(Debug, Clone)]
pub struct GroupInfo {
    pub group: Option<Group>,
    pub settings: Option<GroupSettings>,
    pub members: Option<Vec<Member>>,
}

/// Result of `create_group`. `settings` is `Some` only when the public
/// settings path was attempted (`is_public`).
#[derive(Debug, Clone)]
pub struct CreatedGroup {
    pub group: Option<Group>,
    pub settings: Option<SettingsUpdate>,
}

/// Outcome of a settings update. `Unchanged` (nothing differed) is a success,
/// distinct from `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsUpdate {
    Applied(GroupSettings),
    Unchanged,
    Failed,
}

impl SettingsUpdate {
    pub fn succeeded(&self) -> bool {
        !matches!(self, SettingsUpdate::Failed)
    }
}

/// Facade composing the groups, group settings, and members resources behind
/// one authenticated transport.
///
/// All operations are sequential, one request at a time. Expected failures
/// (missing group, duplicate member, ...) are recorded in the event log and
/// surfaced as `None`/`false`/`Failed` returns rather than errors.
pub struct GroupDirectoryFacade {
    auth: Authenticator,
    http: Client,
    directory_base: String,
    settings_base: String,
    events: Vec<OperationEvent>,
}

impl GroupDirectoryFacade {
    /// Create a facade against the production Google endpoints.
    pub fn new(auth: Authenticator) -> Self {
        Self::with_base_urls(auth, DIRECTORY_API_BASE, SETTINGS_API_BASE)
    }

    /// Create a facade with explicit API base URLs. Tests point these at a
    /// local server.
    pub fn with_base_urls(
        auth: Authenticator,
        directory_base: impl Into<String>,
        settings_base: impl Into<String>,
    ) -> Self {
        Self {
            auth,
            http: Client::new(),
            directory_base: directory_base.into(),
            settings_base: settings_base.into(),
            events: Vec::new(),
        }
    }

    /// Events recorded so far, oldest first.
    pub fn events(&self) -> &[OperationEvent] {
        &self.events
    }

    /// Drain the event log.
    pub fn take_events(&mut self) -> Vec<OperationEvent> {
        std::mem::take(&mut self.events)
    }

    /// Fetch a group together with its settings and member list.
    ///
    /// Settings and members are only fetched when the group exists.
    pub async fn group_info(&mut self, group_email: &str) -> GroupInfo {
        let group = self.get_group(group_email).await;
        let (settings, members) = if group.is_some() {
            (
                self.get_group_settings(group_email).await,
                self.get_group_members(group_email).await,
            )
        } else {
            (None, None)
        };
        GroupInfo {
            group,
            settings,
            members,
        }
    }

    /// Create a group using the email address as both address and name.
    ///
    /// With `is_public`, the public settings override is applied right after
    /// creation through the settings-update path.
    pub async fn create_group(&mut self, group_email: &str, is_public: bool) -> CreatedGroup {
        let group = match self.insert_group(group_email).await {
            Ok(group) => Some(group),
            Err(err) => {
                let cause = FailureKind::from(&err);
                let detail = match cause {
                    FailureKind::AlreadyExists => "Group already exists.".to_string(),
                    _ => err.to_string(),
                };
                self.record(
                    Operation::CreateGroup,
                    group_email,
                    cause,
                    format!("Failed to create group ({}). {}", group_email, detail),
                );
                None
            }
        };

        let settings = if is_public {
            Some(self.update_group_to_public(group_email).await)
        } else {
            None
        };

        CreatedGroup { group, settings }
    }

    /// Apply the desired settings to a group, sending only fields that differ
    /// from the stored values.
    pub async fn update_group_settings(
        &mut self,
        group_email: &str,
        desired: &BTreeMap<String, String>,
    ) -> SettingsUpdate {
        let Some(current) = self.get_group_settings(group_email).await else {
            return SettingsUpdate::Failed;
        };

        let changes = current.diff(desired);
        if changes.is_empty() {
            return SettingsUpdate::Unchanged;
        }

        match self.patch_settings(group_email, &changes).await {
            Ok(updated) => SettingsUpdate::Applied(updated),
            Err(err) => {
                let cause = FailureKind::from(&err);
                let detail = match cause {
                    FailureKind::NotFound | FailureKind::Backend => {
                        "It is not a group or it does not exist.".to_string()
                    }
                    _ => err.to_string(),
                };
                self.record(
                    Operation::UpdateSettings,
                    group_email,
                    cause,
                    format!(
                        "Failed to update group settings of ({}). {}",
                        group_email, detail
                    ),
                );
                SettingsUpdate::Failed
            }
        }
    }

    /// Make a group externally postable and contactable.
    pub async fn update_group_to_public(&mut self, group_email: &str) -> SettingsUpdate {
        self.update_group_settings(group_email, &public_group_settings())
            .await
    }

    /// Add each address to the group with the given role ("OWNER", "MANAGER"
    /// or "MEMBER"). Returns true only if every add succeeded; members added
    /// before a failure stay added.
    pub async fn add_group_members(
        &mut self,
        group_email: &str,
        emails: &[String],
        role: &str,
    ) -> bool {
        let role: Role = match role.parse() {
            Ok(role) => role,
            Err(msg) => {
                self.record(
                    Operation::AddMember,
                    group_email,
                    FailureKind::Validation,
                    msg,
                );
                return false;
            }
        };

        if group_email.is_empty() || emails.is_empty() {
            self.record(
                Operation::AddMember,
                group_email,
                FailureKind::Validation,
                "Group or member email addresses not provided. Nothing to add.".to_string(),
            );
            return false;
        }

        let mut failures = 0;
        for member_email in emails {
            if !self.add_member(group_email, member_email, role).await {
                failures += 1;
            }
        }
        failures == 0
    }

    /// Remove each address from the group. Returns true only if every remove
    /// succeeded; members removed before a failure stay removed.
    pub async fn remove_group_members(&mut self, group_email: &str, emails: &[String]) -> bool {
        if group_email.is_empty() || emails.is_empty() {
            self.record(
                Operation::RemoveMember,
                group_email,
                FailureKind::Validation,
                "Group or member email addresses not provided. Nothing to remove.".to_string(),
            );
            return false;
        }

        let mut failures = 0;
        for member_email in emails {
            if !self.remove_member(group_email, member_email).await {
                failures += 1;
            }
        }
        failures == 0
    }

    async fn get_group(&mut self, group_email: &str) -> Option<Group> {
        match self.fetch_group(group_email).await {
            Ok(group) => Some(group),
            Err(err) => {
                let cause = FailureKind::from(&err);
                let detail = match cause {
                    FailureKind::NotFound => "Group not found.".to_string(),
                    _ => err.to_string(),
                };
                self.record(
                    Operation::GetGroup,
                    group_email,
                    cause,
                    format!("Failed to retrieve group ({}). {}", group_email, detail),
                );
                None
            }
        }
    }

    /// Fetch group settings with a bounded retry; only the final failure is
    /// recorded.
    async fn get_group_settings(&mut self, group_email: &str) -> Option<GroupSettings> {
        let outcome = {
            let this = &*self;
            retry(SETTINGS_FETCH_ATTEMPTS, || this.fetch_settings(group_email)).await
        };

        match outcome {
            Ok(settings) => Some(settings),
            Err(err) => {
                let cause = FailureKind::from(&err);
                let detail = match cause {
                    FailureKind::Backend => "Not a group or it does not exist.".to_string(),
                    _ => err.to_string(),
                };
                self.record(
                    Operation::GetSettings,
                    group_email,
                    cause,
                    format!(
                        "Failed to retrieve group settings of ({}). {}",
                        group_email, detail
                    ),
                );
                None
            }
        }
    }

    async fn get_group_members(&mut self, group_email: &str) -> Option<Vec<Member>> {
        match self.fetch_members(group_email).await {
            Ok(members) => Some(members),
            Err(err) => {
                let cause = FailureKind::from(&err);
                self.record(
                    Operation::ListMembers,
                    group_email,
                    cause,
                    format!("Failed to list members of ({}). {}", group_email, err),
                );
                None
            }
        }
    }

    async fn add_member(&mut self, group_email: &str, member_email: &str, role: Role) -> bool {
        match self.insert_member(group_email, member_email, role).await {
            Ok(_) => true,
            Err(err) => {
                let cause = FailureKind::from(&err);
                let detail = match cause {
                    FailureKind::NotFound => "Group not found.".to_string(),
                    FailureKind::AlreadyExists => "Already exists.".to_string(),
                    FailureKind::InvalidMember => {
                        format!("{} cannot be added as {}.", member_email, role)
                    }
                    _ => err.to_string(),
                };
                self.record(
                    Operation::AddMember,
                    group_email,
                    cause,
                    format!(
                        "Failed to add {} {} to {}. {}",
                        role, member_email, group_email, detail
                    ),
                );
                false
            }
        }
    }

    async fn remove_member(&mut self, group_email: &str, member_email: &str) -> bool {
        match self.delete_member(group_email, member_email).await {
            Ok(()) => true,
            Err(err) => {
                let cause = FailureKind::from(&err);
                let detail = match cause {
                    FailureKind::NotFound => "Member or group not found.".to_string(),
                    _ => err.to_string(),
                };
                self.record(
                    Operation::RemoveMember,
                    group_email,
                    cause,
                    format!(
                        "Failed to remove {} from {}. {}",
                        member_email, group_email, detail
                    ),
                );
                false
            }
        }
    }

    async fn fetch_group(&self, group_email: &str) -> Result<Group> {
        let token = self.auth.get_access_token().await?;

        let response = self
            .http
            .get(format!("{}/groups/{}", self.directory_base, group_email))
            .bearer_auth(&token)
            .send()
            .await?;

        decode(response).await
    }

    async fn insert_group(&self, group_email: &str) -> Result<Group> {
        let token = self.auth.get_access_token().await?;

        let body = json!({
            "email": group_email,
            "name": group_email,
        });

        let response = self
            .http
            .post(format!("{}/groups", self.directory_base))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;

        decode(response).await
    }

    async fn fetch_settings(&self, group_email: &str) -> Result<GroupSettings> {
        let token = self.auth.get_access_token().await?;

        let response = self
            .http
            .get(format!("{}/{}", self.settings_base, group_email))
            .bearer_auth(&token)
            .query(&[("alt", "json")])
            .send()
            .await?;

        decode(response).await
    }

    async fn patch_settings(
        &self,
        group_email: &str,
        changes: &BTreeMap<String, String>,
    ) -> Result<GroupSettings> {
        let token = self.auth.get_access_token().await?;

        let response = self
            .http
            .patch(format!("{}/{}", self.settings_base, group_email))
            .bearer_auth(&token)
            .query(&[("alt", "json")])
            .json(changes)
            .send()
            .await?;

        decode(response).await
    }

    async fn fetch_members(&self, group_email: &str) -> Result<Vec<Member>> {
        let token = self.auth.get_access_token().await?;
        let mut all_members = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(format!(
                    "{}/groups/{}/members",
                    self.directory_base, group_email
                ))
                .bearer_auth(&token);

            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let response = request.send().await?;
            let page: MembersListResponse = decode(response).await?;
            all_members.extend(page.members);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(all_members)
    }

    async fn insert_member(
        &self,
        group_email: &str,
        member_email: &str,
        role: Role,
    ) -> Result<Member> {
        let token = self.auth.get_access_token().await?;

        let body = json!({
            "email": member_email,
            "role": role,
        });

        let response = self
            .http
            .post(format!(
                "{}/groups/{}/members",
                self.directory_base, group_email
            ))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;

        decode(response).await
    }

    async fn delete_member(&self, group_email: &str, member_email: &str) -> Result<()> {
        let token = self.auth.get_access_token().await?;

        let response = self
            .http
            .delete(format!(
                "{}/groups/{}/members/{}",
                self.directory_base, group_email, member_email
            ))
            .bearer_auth(&token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_failure(response).await);
        }

        Ok(())
    }

    fn record(&mut self, operation: Operation, target: &str, cause: FailureKind, message: String) {
        tracing::warn!(
            operation = operation.as_str(),
            group = target,
            cause = ?cause,
            "{}",
            message
        );
        self.events.push(OperationEvent {
            severity: Severity::Error,
            operation,
            target: target.to_string(),
            cause,
            message,
        });
    }
}

/// Run `op` up to `attempts` times, returning the first success or the last
/// error.
async fn retry<T, F, Fut>(attempts: u32, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => return Err(err),
            Err(_) => attempt += 1,
        }
    }
}

/// Decode a successful response as JSON, or turn the body into an ApiError.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(api_failure(response).await);
    }
    Ok(response.json().await?)
}

async fn api_failure(response: Response) -> GroupsError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(api_error) => {
            let reason = api_error.reason().map(str::to_string);
            GroupsError::ApiError {
                status: api_error.error.code,
                reason,
                message: api_error.error.message,
            }
        }
        Err(_) => GroupsError::ApiError {
            status,
            reason: None,
            message: body,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ServiceAccountCredentials;
    use std::cell::Cell;

    fn offline_facade() -> GroupDirectoryFacade {
        // Never issues a request in these tests; the key is deliberately junk.
        let credentials = ServiceAccountCredentials {
            client_email: "test@project.iam.gserviceaccount.com".to_string(),
            private_key: "not a key".to_string(),
            token_uri: None,
        };
        GroupDirectoryFacade::new(Authenticator::new(credentials))
    }

    #[tokio::test]
    async fn test_retry_returns_first_success() {
        let calls = Cell::new(0u32);
        let result = retry(3, || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Err(GroupsError::TokenRefreshError("transient".to_string()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_returns_last_error() {
        let calls = Cell::new(0u32);
        let result: Result<()> = retry(3, || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move { Err(GroupsError::TokenRefreshError(format!("attempt {}", n))) }
        })
        .await;

        assert_eq!(calls.get(), 3);
        match result {
            Err(GroupsError::TokenRefreshError(msg)) => assert_eq!(msg, "attempt 3"),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_retry_single_attempt() {
        let calls = Cell::new(0u32);
        let result = retry(1, || {
            calls.set(calls.get() + 1);
            async { Ok::<_, GroupsError>(42) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_add_members_rejects_invalid_role() {
        let mut facade = offline_facade();

        let ok = facade
            .add_group_members(
                "group@example.com",
                &["user@example.com".to_string()],
                "ABC",
            )
            .await;

        assert!(!ok);
        assert_eq!(facade.events().len(), 1);
        let event = &facade.events()[0];
        assert_eq!(event.operation, Operation::AddMember);
        assert_eq!(event.cause, FailureKind::Validation);
        assert!(event.message.contains("ABC"));
    }

    #[tokio::test]
    async fn test_add_members_rejects_empty_arguments() {
        let mut facade = offline_facade();

        assert!(!facade.add_group_members("group@example.com", &[], "MEMBER").await);
        assert!(
            !facade
                .add_group_members("", &["user@example.com".to_string()], "MEMBER")
                .await
        );
        assert_eq!(facade.events().len(), 2);
        assert!(facade
            .events()
            .iter()
            .all(|e| e.cause == FailureKind::Validation));
    }

    #[tokio::test]
    async fn test_remove_members_rejects_empty_arguments() {
        let mut facade = offline_facade();

        assert!(!facade.remove_group_members("group@example.com", &[]).await);
        assert!(
            !facade
                .remove_group_members("", &["user@example.com".to_string()])
                .await
        );
        assert_eq!(facade.events().len(), 2);
        assert_eq!(facade.events()[0].operation, Operation::RemoveMember);
    }

    #[tokio::test]
    async fn test_take_events_drains_log() {
        let mut facade = offline_facade();
        facade.add_group_members("group@example.com", &[], "MEMBER").await;

        assert_eq!(facade.take_events().len(), 1);
        assert!(facade.events().is_empty());
    }

    #[test]
    fn test_event_display() {
        let event = OperationEvent {
            severity: Severity::Error,
            operation: Operation::AddMember,
            target: "group@example.com".to_string(),
            cause: FailureKind::AlreadyExists,
            message: "Failed to add MEMBER user@example.com to group@example.com. Already exists."
                .to_string(),
        };

        let display = format!("{}", event);
        assert!(display.starts_with("ERROR: "));
        assert!(display.contains("Already exists."));
    }

    #[test]
    fn test_settings_update_succeeded() {
        assert!(SettingsUpdate::Unchanged.succeeded());
        assert!(SettingsUpdate::Applied(GroupSettings::default()).succeeded());
        assert!(!SettingsUpdate::Failed.succeeded());
    }
}
