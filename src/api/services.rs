//! Typed resource clients over `ApiClient`.
//!
//! Each operation is exactly one round trip. No retries here: the
//! aggregator owns the retry policy.

use crate::api::transport::ApiClient;
use crate::error::ApiError;
use crate::models::{
    AnalysisResult, AuthResponse, GitHubProfile, GitHubRepo, LoginRequest, RecommendationReport,
    RegisterRequest, TrendReport, UsageReport, UserSummary,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// The per-subject fetches the aggregator combines into one view.
#[async_trait]
pub trait AnalysisSource: Send + Sync {
    /// Primary fetch.
    async fn fetch_analysis(&self, username: &str) -> Result<AnalysisResult, ApiError>;

    async fn fetch_report(&self, username: &str) -> Result<UsageReport, ApiError>;

    async fn fetch_recommendations(&self, username: &str)
        -> Result<RecommendationReport, ApiError>;

    async fn fetch_trends(&self, username: &str) -> Result<TrendReport, ApiError>;
}

/// Reject empty usernames before anything goes on the wire.
///
/// GitHub username syntax is deliberately not checked; the backend answers
/// 404 for names it does not know.
pub fn validate_username(username: &str) -> Result<&str, ApiError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation(
            "username must not be empty".to_string(),
        ));
    }
    Ok(trimmed)
}

/// Path for a per-subject endpoint, with the username percent-encoded.
fn subject_path(endpoint: &str, username: &str) -> Result<String, ApiError> {
    let username = validate_username(username)?;
    Ok(format!("/api/{}/{}", endpoint, urlencoding::encode(username)))
}

/// Client for the analysis, report, recommendation and trend endpoints.
#[derive(Clone)]
pub struct DevPulseService {
    client: Arc<ApiClient>,
}

impl DevPulseService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AnalysisSource for DevPulseService {
    async fn fetch_analysis(&self, username: &str) -> Result<AnalysisResult, ApiError> {
        let path = subject_path("analyze", username)?;
        self.client.get(&path).await
    }

    async fn fetch_report(&self, username: &str) -> Result<UsageReport, ApiError> {
        let path = subject_path("report", username)?;
        self.client.get(&path).await
    }

    async fn fetch_recommendations(
        &self,
        username: &str,
    ) -> Result<RecommendationReport, ApiError> {
        let path = subject_path("recommendations", username)?;
        self.client.get(&path).await
    }

    async fn fetch_trends(&self, username: &str) -> Result<TrendReport, ApiError> {
        let path = subject_path("trends", username)?;
        self.client.get(&path).await
    }
}

/// Client for the GitHub account linked to the signed-in user.
#[derive(Clone)]
pub struct GitHubService {
    client: Arc<ApiClient>,
}

impl GitHubService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn profile(&self) -> Result<GitHubProfile, ApiError> {
        self.client.get("/github/profile").await
    }

    pub async fn repositories(&self) -> Result<Vec<GitHubRepo>, ApiError> {
        self.client.get("/github/repos").await
    }

    /// Raw contribution events; their shape is owned by GitHub.
    pub async fn contributions(&self) -> Result<Vec<Value>, ApiError> {
        self.client.get("/github/contributions").await
    }
}

/// Login, registration and session management.
#[derive(Clone)]
pub struct AuthService {
    client: Arc<ApiClient>,
}

impl AuthService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Sign in and store the returned token.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: AuthResponse = self.client.post("/auth/login", &request).await?;
        self.store_token(&response)?;
        info!("Signed in as {}", response.user.email);
        Ok(response)
    }

    /// Create an account and store the returned token.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ApiError> {
        let request = RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: AuthResponse = self.client.post("/auth/register", &request).await?;
        self.store_token(&response)?;
        info!("Registered {}", response.user.email);
        Ok(response)
    }

    /// Forget the stored token. Returns whether one was present.
    pub fn logout(&self) -> bool {
        self.client.credentials().clear().is_some()
    }

    pub async fn current_user(&self) -> Result<UserSummary, ApiError> {
        self.client.get("/auth/me").await
    }

    pub fn is_authenticated(&self) -> bool {
        self.client.credentials().get().is_some()
    }

    fn store_token(&self, response: &AuthResponse) -> Result<(), ApiError> {
        debug!("Storing session token for user {}", response.user.id);
        self.client
            .credentials()
            .set(response.token.clone())
            .map_err(|e| ApiError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::credentials::{CredentialStore, MemoryCredentialStore};
    use crate::api::transport::LoginPrompt;
    use crate::config::ApiConfig;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_client(server: &MockServer, store: Arc<MemoryCredentialStore>) -> Arc<ApiClient> {
        let config = ApiConfig {
            base_url: server.uri(),
            timeout_seconds: 5,
            ..ApiConfig::default()
        };
        Arc::new(ApiClient::new(&config, store, Arc::new(LoginPrompt)).unwrap())
    }

    #[test]
    fn test_validate_username() {
        assert_eq!(validate_username(" octocat ").unwrap(), "octocat");
        assert!(matches!(
            validate_username("   "),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_subject_path_encodes_username() {
        assert_eq!(
            subject_path("analyze", "octocat").unwrap(),
            "/api/analyze/octocat"
        );
        assert_eq!(
            subject_path("report", "a b/c").unwrap(),
            "/api/report/a%20b%2Fc"
        );
    }

    #[tokio::test]
    async fn test_fetch_analysis_and_report() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/analyze/octocat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "username": "octocat",
                "averageCommitsPerDay": 1.5,
                "consecutiveDays": 6
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/report/octocat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "totalCommits": 120,
                "totalRepositories": 8
            })))
            .expect(1)
            .mount(&server)
            .await;

        let service = DevPulseService::new(make_client(&server, Arc::default()));

        let analysis = assert_ok!(service.fetch_analysis("octocat").await);
        assert_eq!(analysis.average_commits_per_day, Some(1.5));
        assert_eq!(analysis.consecutive_days, Some(6));

        let report = assert_ok!(service.fetch_report("octocat").await);
        assert_eq!(report.total_commits, Some(120));
        assert_eq!(report.average_commits_per_repo, None);
    }

    #[tokio::test]
    async fn test_not_found_propagates_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/recommendations/ghost-user"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let service = DevPulseService::new(make_client(&server, Arc::default()));
        let err = assert_err!(service.fetch_recommendations("ghost-user").await);
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_empty_username_sends_nothing() {
        let server = MockServer::start().await;
        let service = DevPulseService::new(make_client(&server, Arc::default()));

        let err = assert_err!(service.fetch_trends("").await);
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_stores_token_for_later_requests() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": "jwt-abc",
                "user": {"id": 7, "name": "Mona", "email": "mona@example.com"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .and(header("authorization", "Bearer jwt-abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 7, "name": "Mona", "email": "mona@example.com"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        let auth = AuthService::new(make_client(&server, store.clone()));
        assert!(!auth.is_authenticated());

        let response = assert_ok!(auth.login("mona@example.com", "pw").await);
        assert_eq!(response.user.id, 7);
        assert_eq!(store.get().as_deref(), Some("jwt-abc"));
        assert!(auth.is_authenticated());

        let me = assert_ok!(auth.current_user().await);
        assert_eq!(me.name, "Mona");

        assert!(auth.logout());
        assert!(!auth.is_authenticated());
        assert!(!auth.logout());
    }

    #[tokio::test]
    async fn test_github_repositories() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/github/repos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "name": "hello-world", "html_url": "https://github.com/octocat/hello-world",
                 "stargazers_count": 42, "language": "Rust", "description": null}
            ])))
            .mount(&server)
            .await;

        let github = GitHubService::new(make_client(&server, Arc::default()));
        let repos = assert_ok!(github.repositories().await);
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].stargazers_count, 42);
        assert_eq!(repos[0].description, None);
    }
}
