//! Scope resolution and eligibility rules for expert assignment.
//!
//! Routing a project to its responsible admin goes through a scope
//! dimension configured on the role; assigning an expert group to a
//! project is gated on advisor conflicts and certification. Both checks
//! are pure; the engine supplies the facts from storage.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// The axis used to route a project to its responsible admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScopeDimension {
    College,
    ProjectCategory,
    ProjectLevel,
    KeyField,
}

impl ScopeDimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeDimension::College => "COLLEGE",
            ScopeDimension::ProjectCategory => "PROJECT_CATEGORY",
            ScopeDimension::ProjectLevel => "PROJECT_LEVEL",
            ScopeDimension::KeyField => "KEY_FIELD",
        }
    }

    pub fn parse(s: &str) -> Option<ScopeDimension> {
        match s {
            "COLLEGE" => Some(ScopeDimension::College),
            "PROJECT_CATEGORY" => Some(ScopeDimension::ProjectCategory),
            "PROJECT_LEVEL" => Some(ScopeDimension::ProjectLevel),
            "KEY_FIELD" => Some(ScopeDimension::KeyField),
            _ => None,
        }
    }
}

/// Sentinel scope value for projects outside any key domain.
pub const GENERAL_FIELD: &str = "GENERAL";

/// Project facts needed to compute a scope value.
#[derive(Debug, Clone, Default)]
pub struct ProjectScopeFacts {
    pub leader_college_code: Option<String>,
    pub category_code: Option<String>,
    pub level_code: Option<String>,
    pub is_key_field: bool,
    pub key_domain_code: Option<String>,
}

/// The scope value a project presents along a given dimension.
///
/// The responsible admin is the unique user whose managed scope value
/// equals this string.
pub fn scope_value(
    dimension: ScopeDimension,
    facts: &ProjectScopeFacts,
) -> Result<String, CoreError> {
    let value = match dimension {
        ScopeDimension::College => facts.leader_college_code.clone().ok_or_else(|| {
            CoreError::Validation("project leader has no college on record".to_string())
        })?,
        ScopeDimension::ProjectCategory => facts.category_code.clone().ok_or_else(|| {
            CoreError::Validation("project has no category on record".to_string())
        })?,
        ScopeDimension::ProjectLevel => facts.level_code.clone().ok_or_else(|| {
            CoreError::Validation("project has no level on record".to_string())
        })?,
        ScopeDimension::KeyField => {
            if facts.is_key_field {
                facts.key_domain_code.clone().ok_or_else(|| {
                    CoreError::Validation(
                        "key-field project has no key domain on record".to_string(),
                    )
                })?
            } else {
                GENERAL_FIELD.to_string()
            }
        }
    };
    Ok(value)
}

/// One member of an expert group, with the facts eligibility needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpertCandidate {
    pub user_id: DbId,
    pub name: String,
    pub college_code: Option<String>,
    pub is_certified: bool,
}

/// Validate an expert group against one project before assignment.
///
/// Fails listing every offending member by name so the admin can fix
/// the group in one pass.
pub fn check_group_eligibility(
    members: &[ExpertCandidate],
    advisor_ids: &[DbId],
    creator_college_code: Option<&str>,
) -> Result<(), CoreError> {
    if members.is_empty() {
        return Err(CoreError::Validation(
            "expert group has no members".to_string(),
        ));
    }

    let advisors: Vec<&str> = members
        .iter()
        .filter(|m| advisor_ids.contains(&m.user_id))
        .map(|m| m.name.as_str())
        .collect();
    if !advisors.is_empty() {
        return Err(CoreError::Validation(format!(
            "group members are advisors of this project: {}",
            advisors.join(", ")
        )));
    }

    let uncertified: Vec<&str> = members
        .iter()
        .filter(|m| !m.is_certified)
        .map(|m| m.name.as_str())
        .collect();
    if !uncertified.is_empty() {
        return Err(CoreError::Validation(format!(
            "group members are not certified experts: {}",
            uncertified.join(", ")
        )));
    }

    if let Some(college) = creator_college_code {
        let outsiders: Vec<&str> = members
            .iter()
            .filter(|m| m.college_code.as_deref() != Some(college))
            .map(|m| m.name.as_str())
            .collect();
        if !outsiders.is_empty() {
            return Err(CoreError::Validation(format!(
                "group members are outside your college: {}",
                outsiders.join(", ")
            )));
        }
    }

    Ok(())
}
