/*!
 * # Caller identity
 *
 * Authentication happens upstream of this service. The gateway forwards the
 * resolved caller as two headers which the [`Actor`] extractor trusts:
 *
 * - `x-actor-id`: user id or display name
 * - `x-actor-role`: one of `admin`, `admin2`, `teacher`, `student`
 *
 * Requests without them are served as an anonymous actor. The actor ends up in
 * audit columns such as `payment_plans.cancelled_by` and
 * `attendances.marked_by`.
 */

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::str::FromStr;
use utoipa::ToSchema;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Role {
    Admin,
    #[serde(rename = "admin2")]
    #[strum(serialize = "admin2")]
    Admin2,
    Teacher,
    Student,
}

/// The caller on whose behalf a request runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Option<String>,
    pub role: Option<Role>,
}

impl Actor {
    pub fn anonymous() -> Self {
        Self {
            id: None,
            role: None,
        }
    }

    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: Some(id.into()),
            role: Some(role),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.id.is_none()
    }

    /// Value written to audit columns.
    pub fn audit_name(&self) -> Option<String> {
        self.id.clone()
    }

    fn from_parts(parts: &Parts) -> Self {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let id = header(ACTOR_ID_HEADER).map(str::to_string);
        let role = header(ACTOR_ROLE_HEADER).and_then(|raw| match Role::from_str(raw) {
            Ok(role) => Some(role),
            Err(_) => {
                tracing::debug!(role = raw, "ignoring unknown actor role");
                None
            }
        });

        Self { id, role }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Actor::from_parts(parts))
    }
}
