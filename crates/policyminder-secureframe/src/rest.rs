//! Access-key client for Secureframe's REST API.
//!
//! The REST `users` endpoint reports progress as aggregate `onboarding_status`
//! and `personnel_status` strings instead of per-task flags. Records built
//! here carry those strings, and the per-task flags are derived from the
//! onboarding stage so either evaluation mode gives a sensible answer.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use policyminder_core::{FetchError, PersonRecord, PersonnelSource};
use serde::Deserialize;
use tracing::info;

use crate::SecureframeError;

pub const DEFAULT_BASE_URL: &str = "https://api.secureframe.com";

#[derive(Debug, Deserialize)]
struct UsersResponse {
    #[serde(default)]
    data: Vec<User>,
}

/// One JSON:API resource from `GET /users`.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    pub attributes: UserAttributes,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserAttributes {
    pub id: Option<String>,
    pub active: bool,
    pub email: String,
    pub name: String,
    pub employee_type: String,
    pub in_audit_scope: bool,
    pub invited: bool,
    pub invited_at: Option<DateTime<Utc>>,
    pub onboarding_status: Option<String>,
    pub personnel_status: Option<String>,
}

impl From<User> for PersonRecord {
    fn from(user: User) -> Self {
        let a = user.attributes;
        let (policies_accepted, security_training_completed) =
            match a.onboarding_status.as_deref() {
                Some("not_started") => (false, false),
                Some("security_training") => (true, false),
                _ => (true, true),
            };
        PersonRecord {
            id: a.id.unwrap_or(user.id),
            email: a.email,
            name: a.name,
            active: a.active,
            invited: a.invited,
            in_audit_scope: a.in_audit_scope,
            policies_accepted,
            security_training_completed,
            employee_type: a.employee_type,
            personnel_status: a.personnel_status,
            onboarding_status: a.onboarding_status,
            invited_at: a.invited_at,
        }
    }
}

/// REST client authenticated with an access key and secret key.
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    access_key: String,
    secret_key: String,
}

impl RestClient {
    pub fn new(access_key: String, secret_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            access_key,
            secret_key,
        }
    }

    /// Point the client at a different API root (no trailing slash).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// All users, one per id, in response order.
    pub async fn users(&self) -> Result<Vec<User>, SecureframeError> {
        let url = format!("{}/users", self.base_url);
        info!(url = %url, "listing secureframe users");

        let resp = self
            .client
            .get(&url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("{} {}", self.access_key, self.secret_key),
            )
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SecureframeError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        let parsed: UsersResponse = serde_json::from_str(&body)?;

        let mut seen = HashSet::new();
        let users: Vec<User> = parsed
            .data
            .into_iter()
            .filter(|u| seen.insert(u.id.clone()))
            .collect();
        info!(count = users.len(), "listed users");
        Ok(users)
    }
}

#[async_trait]
impl PersonnelSource for RestClient {
    async fn fetch_roster(&self) -> Result<Vec<PersonRecord>, FetchError> {
        let users = self.users().await?;
        Ok(users.into_iter().map(PersonRecord::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn user(id: &str, onboarding: &str, personnel: &str) -> serde_json::Value {
        json!({
            "id": id,
            "type": "user",
            "attributes": {
                "id": id,
                "active": true,
                "email": format!("{id}@example.com"),
                "name": "Ada Lovelace",
                "employee_type": "employee",
                "in_audit_scope": true,
                "invited": true,
                "invited_at": "2022-02-01T00:00:00Z",
                "onboarding_status": onboarding,
                "personnel_status": personnel,
                "manager_name": null,
            },
            "links": { "self": format!("/users/{id}") },
        })
    }

    #[test]
    fn onboarding_stage_sets_task_flags() {
        let cases = [
            ("not_started", false, false),
            ("security_training", true, false),
            ("completed", true, true),
        ];
        for (stage, policies, training) in cases {
            let u: User = serde_json::from_value(user("u1", stage, "tasks_incomplete")).unwrap();
            let record = PersonRecord::from(u);
            assert_eq!(record.policies_accepted, policies, "{stage}");
            assert_eq!(record.security_training_completed, training, "{stage}");
            assert_eq!(record.onboarding_status.as_deref(), Some(stage));
        }
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client =
            RestClient::new("ak".into(), "sk".into()).with_base_url("http://localhost:4000/".into());
        assert_eq!(client.base_url, "http://localhost:4000");
    }

    #[tokio::test]
    async fn lists_users_with_key_pair_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .and(header("authorization", "ak sk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    user("u1", "not_started", "tasks_incomplete"),
                    user("u2", "completed", "all_tasks_completed"),
                    user("u1", "not_started", "tasks_incomplete"),
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let roster = RestClient::new("ak".into(), "sk".into())
            .with_base_url(server.uri())
            .fetch_roster()
            .await
            .unwrap();

        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].email, "u1@example.com");
        assert_eq!(roster[1].personnel_status.as_deref(), Some("all_tasks_completed"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let err = RestClient::new("ak".into(), "sk".into())
            .with_base_url(server.uri())
            .fetch_roster()
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 403, .. }));
    }
}
