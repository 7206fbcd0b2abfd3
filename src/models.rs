use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;

use crate::schema::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Agent,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Agent => "agent",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "agent" => Ok(Role::Agent),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of an application. Any status may follow any other; admins move
/// records freely, including backwards and onto the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    New,
    Accepted,
    Success,
    Rejected,
    Paid,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 5] = [
        ApplicationStatus::New,
        ApplicationStatus::Accepted,
        ApplicationStatus::Success,
        ApplicationStatus::Rejected,
        ApplicationStatus::Paid,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::New => "new",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Success => "success",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Paid => "paid",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ApplicationStatus::New => "Новая",
            ApplicationStatus::Accepted => "Принята",
            ApplicationStatus::Success => "Успешно",
            ApplicationStatus::Rejected => "Отклонена",
            ApplicationStatus::Paid => "Оплачено",
        }
    }
}

impl FromStr for ApplicationStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| UnknownVariant(value.to_string()))
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value `{}`", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: String,
    pub telegram_chat_id: Option<String>,
    pub created_at: NaiveDateTime,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin.as_str()
    }

    pub fn is_agent(&self) -> bool {
        self.role == Role::Agent.as_str()
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = applications)]
#[diesel(belongs_to(User, foreign_key = agent_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Application {
    pub id: i32,
    pub client_address: String,
    pub client_full_name: String,
    pub client_phone: String,
    pub comment: Option<String>,
    pub status: String,
    pub agent_id: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = applications)]
pub struct NewApplication {
    pub client_address: String,
    pub client_full_name: String,
    pub client_phone: String,
    pub comment: Option<String>,
    pub status: String,
    pub agent_id: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Outward view of a user. Credentials never leave the service.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i32,
    pub username: String,
    pub full_name: String,
    pub role: String,
    pub telegram_chat_id: Option<String>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            role: user.role.clone(),
            telegram_chat_id: user.telegram_chat_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    #[serde(flatten)]
    pub user: PublicUser,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for AgentSummary {
    fn from(user: &User) -> Self {
        Self {
            user: PublicUser::from(user),
            created_at: user.created_at.and_utc(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationView {
    pub id: i32,
    pub client_address: String,
    pub client_full_name: String,
    pub client_phone: String,
    pub comment: Option<String>,
    pub status: String,
    pub agent_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<PublicUser>,
}

impl ApplicationView {
    pub fn with_agent(application: &Application, agent: &User) -> Self {
        Self {
            agent: Some(PublicUser::from(agent)),
            ..Self::from(application)
        }
    }
}

impl From<&Application> for ApplicationView {
    fn from(application: &Application) -> Self {
        Self {
            id: application.id,
            client_address: application.client_address.clone(),
            client_full_name: application.client_full_name.clone(),
            client_phone: application.client_phone.clone(),
            comment: application.comment.clone(),
            status: application.status.clone(),
            agent_id: application.agent_id,
            created_at: application.created_at.and_utc(),
            updated_at: application.updated_at.and_utc(),
            agent: None,
        }
    }
}
