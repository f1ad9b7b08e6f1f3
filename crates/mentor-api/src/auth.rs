//! Caller identity.
//!
//! Authentication happens upstream; by the time a request reaches this router
//! the gateway has set `x-user-id` and `x-user-role`. The extractor only
//! parses them, and handlers check role membership where it matters.

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
  Mentor,
  SchoolAdmin,
  AcsiAdmin,
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
  pub user_id: Uuid,
  pub role:    Role,
}

impl Actor {
  /// Mentors and network administrators may mint links and delete or plan
  /// from assessments. School administrators may not.
  pub fn can_manage_assessments(&self) -> bool {
    matches!(self.role, Role::Mentor | Role::AcsiAdmin)
  }

  pub fn require_manager(&self) -> Result<(), ApiError> {
    if self.can_manage_assessments() {
      Ok(())
    } else {
      Err(ApiError::Forbidden(format!("role {} may not perform this action", self.role)))
    }
  }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, ApiError> {
  parts
    .headers
    .get(name)
    .ok_or_else(|| ApiError::Unauthorized(format!("missing {name} header")))?
    .to_str()
    .map_err(|_| ApiError::Unauthorized(format!("{name} header is not valid text")))
}

impl<St> FromRequestParts<St> for Actor
where
  St: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
    let user_id = header(parts, USER_ID_HEADER)?
      .parse::<Uuid>()
      .map_err(|_| ApiError::Unauthorized(format!("{USER_ID_HEADER} is not a uuid")))?;
    let role = header(parts, USER_ROLE_HEADER)?
      .parse::<Role>()
      .map_err(|_| ApiError::Unauthorized(format!("unknown role in {USER_ROLE_HEADER}")))?;
    Ok(Actor { user_id, role })
  }
}
