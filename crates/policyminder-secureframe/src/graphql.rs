//! Bearer-token client for Secureframe's GraphQL API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use policyminder_core::{FetchError, PersonRecord, PersonnelSource};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::SecureframeError;

pub const DEFAULT_ENDPOINT: &str = "https://app.secureframe.com/graphql";

/// Page size requested from `searchCompanyUsers`.
const PER_PAGE: u32 = 1000;

const PERSONNEL_QUERY: &str = r#"fragment PersonnelTabContentsCompanyUsers on CompanyUser {
  active
  email
  employeeType
  id
  inAuditScope
  invited
  invitedAt
  name
  policiesAccepted
  policiesAcceptedAt
  securityTrainingCompleted
  securityTrainingCompletedAt
  role
  __typename
}

query personnelTabContentsSearch($searchkick: CompanyUserSearchkickInput, $companyId: ID) {
  searchCompanyUsers(searchkick: $searchkick, companyId: $companyId) {
    data {
      collection {
        ...PersonnelTabContentsCompanyUsers
        __typename
      }
      metadata {
        currentPage
        limitValue
        totalCount
        totalPages
        __typename
      }
      __typename
    }
    __typename
  }
}"#;

const COMPANY_QUERY: &str = r#"query getCompanyUsersForCurrentUser {
  getCompanyUsersForCurrentUser {
    id
    company {
      id
      name
      __typename
    }
    __typename
  }
}"#;

/// A person as returned by `personnelTabContentsSearch`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Person {
    pub id: String,
    pub active: bool,
    pub email: String,
    pub employee_type: String,
    pub in_audit_scope: bool,
    pub invited: bool,
    pub invited_at: Option<DateTime<Utc>>,
    pub name: String,
    pub policies_accepted: bool,
    pub security_training_completed: bool,
    pub role: Option<String>,
}

impl From<Person> for PersonRecord {
    fn from(p: Person) -> Self {
        PersonRecord {
            id: p.id,
            email: p.email,
            name: p.name,
            active: p.active,
            invited: p.invited,
            in_audit_scope: p.in_audit_scope,
            policies_accepted: p.policies_accepted,
            security_training_completed: p.security_training_completed,
            employee_type: p.employee_type,
            personnel_status: None,
            onboarding_status: None,
            invited_at: p.invited_at,
        }
    }
}

/// The company the token's user belongs to.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Company {
    pub id: String,
    pub name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Payload<'a> {
    operation_name: &'a str,
    variables: Variables<'a>,
    query: &'a str,
}

#[derive(Serialize, Default)]
struct Variables<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    searchkick: Option<SearchKick>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_company_user_id: Option<&'a str>,
    #[serde(rename = "companyId", skip_serializing_if = "Option::is_none")]
    company_id: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchKick {
    page: u32,
    per_page: u32,
    query: &'static str,
}

#[derive(Deserialize)]
struct Response<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchData {
    search_company_users: SearchCompanyUsers,
}

#[derive(Deserialize)]
struct SearchCompanyUsers {
    data: SearchPage,
}

#[derive(Deserialize)]
struct SearchPage {
    #[serde(default)]
    collection: Vec<Person>,
    #[serde(default)]
    metadata: Option<PageMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageMetadata {
    total_pages: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompanyUsersData {
    get_company_users_for_current_user: Vec<CompanyUser>,
}

#[derive(Deserialize)]
struct CompanyUser {
    company: Company,
}

/// GraphQL client scoped to one company.
pub struct GraphqlClient {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    company_id: String,
    company_user_id: String,
}

impl GraphqlClient {
    pub fn new(token: String, company_id: String, company_user_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token,
            company_id,
            company_user_id,
        }
    }

    /// Point the client at a different GraphQL endpoint (no trailing slash).
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    /// Every person in the company, across all result pages.
    pub async fn personnel(&self) -> Result<Vec<Person>, SecureframeError> {
        let mut people = Vec::new();
        let mut page = 1;
        loop {
            let payload = Payload {
                operation_name: "personnelTabContentsSearch",
                variables: Variables {
                    searchkick: Some(SearchKick {
                        page,
                        per_page: PER_PAGE,
                        query: "*",
                    }),
                    current_company_user_id: Some(&self.company_user_id),
                    company_id: Some(&self.company_id),
                },
                query: PERSONNEL_QUERY,
            };
            let data: SearchData = self.query(&payload).await?;
            let result = data.search_company_users.data;
            let total_pages = result.metadata.map_or(1, |m| m.total_pages);
            debug!(page, total_pages, count = result.collection.len(), "fetched personnel page");
            people.extend(result.collection);

            if page >= total_pages {
                break;
            }
            page += 1;
        }

        info!(count = people.len(), "fetched personnel");
        Ok(people)
    }

    /// The company the token's user belongs to.
    pub async fn company(&self) -> Result<Company, SecureframeError> {
        let payload = Payload {
            operation_name: "getCompanyUsersForCurrentUser",
            variables: Variables {
                current_company_user_id: Some(&self.company_user_id),
                ..Default::default()
            },
            query: COMPANY_QUERY,
        };
        let data: CompanyUsersData = self.query(&payload).await?;
        data.get_company_users_for_current_user
            .into_iter()
            .next()
            .map(|u| u.company)
            .ok_or(SecureframeError::NoCompany)
    }

    async fn query<T: DeserializeOwned>(&self, payload: &Payload<'_>) -> Result<T, SecureframeError> {
        info!(endpoint = %self.endpoint, operation = payload.operation_name, "querying secureframe");
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(SecureframeError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Response<T> = serde_json::from_str(&body)?;
        if !parsed.errors.is_empty() {
            let messages: Vec<_> = parsed.errors.into_iter().map(|e| e.message).collect();
            return Err(SecureframeError::Graphql(messages.join("; ")));
        }
        parsed
            .data
            .ok_or_else(|| SecureframeError::Graphql("response carried no data".into()))
    }
}

#[async_trait]
impl PersonnelSource for GraphqlClient {
    async fn fetch_roster(&self) -> Result<Vec<PersonRecord>, FetchError> {
        let people = self.personnel().await?;
        Ok(people.into_iter().map(PersonRecord::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GraphqlClient {
        GraphqlClient::new("tok".into(), "company-1".into(), "cu-1".into())
            .with_endpoint(format!("{}/graphql/", server.uri()))
    }

    fn page(collection: serde_json::Value, total_pages: u32) -> serde_json::Value {
        json!({
            "data": {
                "searchCompanyUsers": {
                    "data": {
                        "collection": collection,
                        "metadata": { "currentPage": 1, "totalPages": total_pages },
                    }
                }
            }
        })
    }

    #[test]
    fn person_maps_to_record() {
        let person: Person = serde_json::from_value(json!({
            "id": "p1",
            "active": true,
            "email": "ada@example.com",
            "employeeType": "Employee",
            "inAuditScope": true,
            "invited": true,
            "invitedAt": "2023-05-01T10:00:00Z",
            "name": "Ada Lovelace",
            "policiesAccepted": false,
            "securityTrainingCompleted": true,
            "endDate": null,
            "__typename": "CompanyUser"
        }))
        .unwrap();
        let record = PersonRecord::from(person);
        assert_eq!(record.employee_type, "Employee");
        assert!(!record.policies_accepted);
        assert_eq!(
            record.invited_at,
            Some("2023-05-01T10:00:00Z".parse().unwrap())
        );
        assert!(record.onboarding_status.is_none());
    }

    #[test]
    fn null_invited_at_is_unset() {
        let person: Person =
            serde_json::from_value(json!({ "id": "p1", "invitedAt": null })).unwrap();
        assert!(person.invited_at.is_none());
    }

    #[test]
    fn endpoint_trailing_slash_is_trimmed() {
        let client = GraphqlClient::new("t".into(), "c".into(), "u".into())
            .with_endpoint("http://localhost:4000/graphql/".into());
        assert_eq!(client.endpoint, "http://localhost:4000/graphql");
    }

    #[test]
    fn personnel_payload_shape() {
        let payload = Payload {
            operation_name: "personnelTabContentsSearch",
            variables: Variables {
                searchkick: Some(SearchKick {
                    page: 1,
                    per_page: PER_PAGE,
                    query: "*",
                }),
                current_company_user_id: Some("cu-1"),
                company_id: Some("company-1"),
            },
            query: PERSONNEL_QUERY,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["operationName"], "personnelTabContentsSearch");
        assert_eq!(value["variables"]["searchkick"]["perPage"], 1000);
        assert_eq!(value["variables"]["current_company_user_id"], "cu-1");
        assert_eq!(value["variables"]["companyId"], "company-1");
    }

    #[tokio::test]
    async fn fetches_roster_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header("authorization", "Bearer tok"))
            .and(body_partial_json(
                json!({ "operationName": "personnelTabContentsSearch" }),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(
                json!([
                    { "id": "p1", "email": "a@example.com", "active": true },
                    { "id": "p2", "email": "b@example.com", "active": false },
                ]),
                1,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let roster = client(&server).fetch_roster().await.unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].email, "a@example.com");
        assert!(!roster[1].active);
    }

    #[tokio::test]
    async fn follows_result_pages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "variables": { "searchkick": { "page": 1 } } })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(page(json!([{ "id": "p1" }]), 2)),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "variables": { "searchkick": { "page": 2 } } })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(page(json!([{ "id": "p2" }]), 2)),
            )
            .mount(&server)
            .await;

        let people = client(&server).personnel().await.unwrap();
        let ids: Vec<_> = people.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let err = client(&server).fetch_roster().await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 401, ref body } if body == "unauthorized"));
    }

    #[tokio::test]
    async fn graphql_errors_are_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "errors": [{ "message": "not authorized" }],
            })))
            .mount(&server)
            .await;

        let err = client(&server).personnel().await.unwrap_err();
        assert!(matches!(err, SecureframeError::Graphql(ref m) if m == "not authorized"));
    }

    #[tokio::test]
    async fn garbage_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client(&server).fetch_roster().await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn looks_up_company_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(
                json!({ "operationName": "getCompanyUsersForCurrentUser" }),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "getCompanyUsersForCurrentUser": [
                        { "id": "cu-1", "company": { "id": "company-1", "name": "Acme" } }
                    ]
                }
            })))
            .mount(&server)
            .await;

        let company = client(&server).company().await.unwrap();
        assert_eq!(company.name, "Acme");
    }

    #[tokio::test]
    async fn missing_company_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "getCompanyUsersForCurrentUser": [] }
            })))
            .mount(&server)
            .await;

        let err = client(&server).company().await.unwrap_err();
        assert!(matches!(err, SecureframeError::NoCompany));
    }
}
