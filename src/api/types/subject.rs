//! Safe wire projection of a subject

use serde::Serialize;

use crate::domain::subject::{Permission, Subject};

/// Subject fields safe to expose: no hash, no lockout bookkeeping
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectResponse {
    pub id: String,
    pub identity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<Permission>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<String>,
}

impl SubjectResponse {
    pub fn from_subject(subject: &Subject) -> Self {
        Self {
            id: subject.id().as_str().to_string(),
            identity: subject.identity().to_string(),
            name: subject.name().map(String::from),
            role: subject.role().as_str().to_string(),
            is_active: subject.is_active(),
            permissions: subject.permissions().to_vec(),
            created_at: subject.created_at().to_rfc3339(),
            last_login_at: subject.last_login_at().map(|t| t.to_rfc3339()),
        }
    }
}
