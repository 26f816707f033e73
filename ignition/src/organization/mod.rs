//! Finding and provisioning a user's development organization.

pub mod handler;

use tenant_http_client::models::OrgRole;

use crate::error::{Error, Result};
use crate::tenant::{NewSpace, Organization, TenantResourceApi};

/// Organization name for an account: `prefix-user`, lower-cased.
///
/// `user@domain` keeps the part before the first `@`; `DOMAIN\user` keeps the
/// part after the first `\`.
pub fn derive_org_name(prefix: &str, account_name: &str) -> String {
    let user = if let Some((local, _)) = account_name.split_once('@') {
        local
    } else if let Some((_, user)) = account_name.split_once('\\') {
        user
    } else {
        account_name
    };
    format!("{prefix}-{user}").to_lowercase()
}

/// Pick the user's organization from the ones they belong to.
///
/// An exact (case-insensitive) name match wins; otherwise the first org on
/// the configured quota, in API order.
pub async fn find_org_for_user(
    api: &dyn TenantResourceApi,
    expected_name: &str,
    user_id: &str,
    quota_id: &str,
) -> Result<Organization> {
    let organizations = api.organizations_for_user(user_id).await?;
    if organizations.is_empty() {
        return Err(Error::NotFound(format!("user {user_id} has no organizations")));
    }

    let mut quota_matches = Vec::new();
    for organization in organizations {
        if fold_eq(&organization.name, expected_name) {
            return Ok(organization);
        }
        if fold_eq(&organization.quota_definition_guid, quota_id) {
            quota_matches.push(organization);
        }
    }

    quota_matches
        .into_iter()
        .next()
        .ok_or_else(|| Error::NotFound(format!("organization {expected_name} not found")))
}

/// Unicode case-insensitive comparison.
fn fold_eq(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

// ============================================================================
// Provisioning
// ============================================================================

/// Best-effort steps that follow organization creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    OrgRole(OrgRole),
    DefaultSpace,
}

impl std::fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ProvisionStep::OrgRole(role) => write!(f, "{role}"),
            ProvisionStep::DefaultSpace => write!(f, "default-space"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    SoftFailure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningReport {
    pub organization: Organization,
    pub steps: Vec<(ProvisionStep, StepOutcome)>,
}

impl ProvisioningReport {
    pub fn soft_failures(&self) -> impl Iterator<Item = &(ProvisionStep, StepOutcome)> {
        self.steps
            .iter()
            .filter(|(_, outcome)| matches!(outcome, StepOutcome::SoftFailure(_)))
    }
}

/// Create the organization, bind the user's org roles and create the default
/// space. Only organization creation can fail the call; every later step is
/// recorded in the report and logged.
pub async fn create_org_for_user(
    api: &dyn TenantResourceApi,
    name: &str,
    user_id: &str,
    quota_id: &str,
    space_name: &str,
) -> Result<ProvisioningReport> {
    if user_id.trim().is_empty() {
        return Err(Error::InvalidArgument(
            "cannot create an org without a valid user id".to_string(),
        ));
    }

    let organization = api
        .create_organization(&name.to_lowercase(), quota_id)
        .await?;
    tracing::info!(
        "created organization {} ({}) for user {}",
        organization.name,
        organization.guid,
        user_id
    );

    let mut steps = Vec::with_capacity(4);
    for role in [OrgRole::User, OrgRole::Manager, OrgRole::Auditor] {
        let result = api
            .associate_org_role(&organization.guid, user_id, role)
            .await;
        steps.push((ProvisionStep::OrgRole(role), outcome(result)));
    }

    let space = NewSpace {
        name: space_name.to_lowercase(),
        organization_guid: organization.guid.clone(),
        manager_guids: vec![user_id.to_string()],
        developer_guids: vec![user_id.to_string()],
        auditor_guids: vec![user_id.to_string()],
        allow_ssh: true,
    };
    steps.push((ProvisionStep::DefaultSpace, outcome(api.create_space(space).await)));

    let report = ProvisioningReport {
        organization,
        steps,
    };
    for (step, result) in report.soft_failures() {
        tracing::warn!(
            "organization {}: step {} failed: {:?}",
            report.organization.guid,
            step,
            result
        );
    }
    Ok(report)
}

fn outcome(result: Result<()>) -> StepOutcome {
    match result {
        Ok(()) => StepOutcome::Completed,
        Err(e) => StepOutcome::SoftFailure(e.to_string()),
    }
}
