use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::{PublicUser, User};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Dinner {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub location: String,
    pub host_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// `None` until loaded from the store.
    #[sqlx(skip)]
    pub host: Option<User>,
    /// `None` until loaded from the store.
    #[sqlx(skip)]
    pub invitees: Option<Vec<User>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicDinner {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub location: String,
    pub host: PublicUser,
    pub invitees: Vec<PublicUser>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /dinners/new`.
#[derive(Debug, Deserialize)]
pub struct NewDinner {
    pub date: DateTime<Utc>,
    pub location: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    #[error("dinner host was not loaded")]
    HostNotLoaded,
    #[error("dinner invitees were not loaded")]
    InviteesNotLoaded,
}

impl Dinner {
    pub fn new(date: DateTime<Utc>, location: &str, host: &User) -> Self {
        let now = Utc::now();
        Dinner {
            id: Uuid::new_v4(),
            date,
            location: location.to_string(),
            host_id: host.id,
            created_at: now,
            updated_at: now,
            host: Some(host.clone()),
            invitees: Some(Vec::new()),
        }
    }

    pub fn is_invited(&self, user_id: Uuid) -> bool {
        self.invitees
            .as_deref()
            .is_some_and(|invitees| invitees.iter().any(|u| u.id == user_id))
    }

    /// Requires both the host and the invitees to be loaded.
    pub fn as_public(&self) -> Result<PublicDinner, ProjectionError> {
        let host = self.host.as_ref().ok_or(ProjectionError::HostNotLoaded)?;
        let invitees = self
            .invitees
            .as_ref()
            .ok_or(ProjectionError::InviteesNotLoaded)?;
        Ok(PublicDinner {
            id: self.id,
            date: self.date,
            location: self.location.clone(),
            host: host.as_public(),
            invitees: invitees.iter().map(User::as_public).collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
