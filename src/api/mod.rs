use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::errors::ApiError;
use crate::lifecycle::CourseState;
use crate::model::{
    AdminMetrics, AdminUser, Course, CourseDraft, Instructor, InstructorStats, OperationResult,
};

pub mod model;

pub use model::BulkAction;
use model::{ChangeStateBody, CopyContentBody, ReasonBody, RefreshBody, TransferBody};

const USER_AGENT: &str = "aula-admin/0.1";

/// Everything the administrative workflow needs from the backend. One method
/// per endpoint; implementations do no business logic beyond unwrapping
/// responses and normalizing errors.
#[async_trait]
pub trait CourseApi: Send + Sync {
    async fn get_all_courses_admin(&self) -> Result<Vec<Course>, ApiError>;

    async fn get_inactive_courses_admin(&self) -> Result<Vec<Course>, ApiError>;

    async fn get_admin_metrics(&self) -> Result<AdminMetrics, ApiError>;

    async fn get_instructor_stats(&self) -> Result<Vec<InstructorStats>, ApiError>;

    async fn get_course(&self, course_id: i64) -> Result<Course, ApiError>;

    async fn current_user(&self) -> Result<AdminUser, ApiError>;

    async fn list_instructors(&self) -> Result<Vec<Instructor>, ApiError>;

    async fn create_course(&self, draft: &CourseDraft) -> Result<Course, ApiError>;

    async fn update_course(&self, course_id: i64, draft: &CourseDraft)
        -> Result<Course, ApiError>;

    async fn activate_course(&self, course_id: i64, reason: &str)
        -> Result<OperationResult, ApiError>;

    async fn deactivate_course(
        &self,
        course_id: i64,
        reason: &str,
    ) -> Result<OperationResult, ApiError>;

    async fn delete_course_admin(
        &self,
        course_id: i64,
        reason: &str,
    ) -> Result<OperationResult, ApiError>;

    async fn transfer_course(
        &self,
        course_id: i64,
        new_instructor_id: i64,
        reason: &str,
    ) -> Result<OperationResult, ApiError>;

    async fn change_course_state(
        &self,
        course_id: i64,
        state: CourseState,
        reason: &str,
    ) -> Result<OperationResult, ApiError>;

    async fn copy_course_content(
        &self,
        source_id: i64,
        target_id: i64,
        include_enrollments: bool,
    ) -> Result<OperationResult, ApiError>;

    async fn bulk_operation(
        &self,
        action: &BulkAction,
        course_ids: &[i64],
        reason: &str,
    ) -> Result<OperationResult, ApiError>;
}

/// Normalize a list response. The backend paginates some endpoints and not
/// others: a `results` array inside an object wins, a bare array is taken
/// as-is, anything else is an empty list.
pub fn unwrap_list<T: DeserializeOwned>(raw: Value) -> Result<Vec<T>, ApiError> {
    let items = match raw {
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        Value::Array(items) => items,
        _ => Vec::new(),
    };
    items
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(ApiError::from))
        .collect()
}

struct Tokens {
    access: String,
    refresh: Option<String>,
}

#[derive(Clone)]
pub struct CourseClient {
    http: Client,
    base_url: Url,
    tokens: Arc<RwLock<Tokens>>,
}

impl fmt::Debug for CourseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CourseClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl CourseClient {
    pub fn new(
        base_url: &str,
        access_token: String,
        refresh_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        // Url::join drops the last segment unless the base ends with '/'.
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url =
            Url::parse(&base).map_err(|e| ApiError::Other(format!("invalid base URL: {e}")))?;
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url,
            tokens: Arc::new(RwLock::new(Tokens {
                access: access_token,
                refresh: refresh_token.filter(|t| !t.trim().is_empty()),
            })),
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, ApiError> {
        Self::new(
            &cfg.api.base_url,
            cfg.api.access_token.clone(),
            cfg.api.refresh_token.clone(),
            cfg.request_timeout(),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn build_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        access_token: &str,
    ) -> Result<reqwest::Request, ApiError> {
        let endpoint = self
            .base_url
            .join(path)
            .map_err(|e| ApiError::Other(format!("invalid endpoint {path}: {e}")))?;
        let mut builder = self
            .http
            .request(method, endpoint)
            .header("Authorization", format!("Bearer {}", access_token))
            .header("Content-Type", "application/json");
        if let Some(body) = body {
            builder = builder.json(body);
        }
        builder
            .build()
            .map_err(|e| ApiError::Other(format!("failed to build request: {e}")))
    }

    async fn execute(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, ApiError> {
        let mut retried = false;
        loop {
            let access = self.tokens.read().await.access.clone();
            let request = self.build_request(method.clone(), path, body, &access)?;
            debug!(method = %request.method(), url = %request.url(), "api request");
            for (name, value) in request.headers() {
                if name.as_str().eq_ignore_ascii_case("authorization") {
                    debug!("  {}: Bearer [REDACTED]", name);
                } else {
                    debug!("  {}: {}", name, value.to_str().unwrap_or("[invalid]"));
                }
            }

            let res = self.http.execute(request).await.map_err(|e| {
                warn!(error = %e, path, "request did not reach the backend");
                ApiError::Network {
                    detail: e.to_string(),
                }
            })?;
            let status = res.status();
            debug!(%status, path, "api response");

            if status == StatusCode::UNAUTHORIZED && !retried && self.refresh_access().await {
                retried = true;
                continue;
            }

            let text = res.text().await?;
            if !status.is_success() {
                warn!(%status, path, body = %text, "backend returned an error");
                return Err(ApiError::from_response(status.as_u16(), &text));
            }
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_str(&text)?);
        }
    }

    /// Exchange the refresh token for a new access token. Returns `false`
    /// when no refresh token is configured or the exchange failed, so the
    /// caller still sees the original 401.
    async fn refresh_access(&self) -> bool {
        let Some(refresh) = self.tokens.read().await.refresh.clone() else {
            return false;
        };
        let endpoint = match self.base_url.join("users/refresh/") {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "invalid refresh endpoint");
                return false;
            }
        };
        let res = match self
            .http
            .post(endpoint)
            .json(&RefreshBody { refresh: &refresh })
            .send()
            .await
        {
            Ok(res) => res,
            Err(e) => {
                warn!(error = %e, "token refresh did not reach the backend");
                return false;
            }
        };
        if !res.status().is_success() {
            warn!(status = %res.status(), "token refresh rejected");
            return false;
        }
        let payload: Value = match res.json().await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "token refresh returned an unreadable body");
                return false;
            }
        };
        let Some(access) = payload.get("access").and_then(Value::as_str) else {
            warn!("token refresh response has no access token");
            return false;
        };
        self.tokens.write().await.access = access.to_string();
        info!("access token refreshed");
        true
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiError> {
        let raw = self.execute(Method::GET, path, None).await?;
        unwrap_list(raw)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let raw = self.execute(method, path, body.as_ref()).await?;
        decode(raw)
    }
}

/// An empty body decodes like `{}` so `{message}`-style results tolerate 204s.
fn decode<T: DeserializeOwned>(raw: Value) -> Result<T, ApiError> {
    let raw = if raw.is_null() {
        Value::Object(Map::new())
    } else {
        raw
    };
    Ok(serde_json::from_value(raw)?)
}

fn to_body<T: serde::Serialize>(body: &T) -> Result<Value, ApiError> {
    Ok(serde_json::to_value(body)?)
}

#[async_trait]
impl CourseApi for CourseClient {
    #[instrument(skip_all)]
    async fn get_all_courses_admin(&self) -> Result<Vec<Course>, ApiError> {
        self.get_list("courses/admin/all/").await
    }

    #[instrument(skip_all)]
    async fn get_inactive_courses_admin(&self) -> Result<Vec<Course>, ApiError> {
        self.get_list("courses/admin/inactive/").await
    }

    #[instrument(skip_all)]
    async fn get_admin_metrics(&self) -> Result<AdminMetrics, ApiError> {
        self.send(Method::GET, "courses/admin/metrics/", None).await
    }

    #[instrument(skip_all)]
    async fn get_instructor_stats(&self) -> Result<Vec<InstructorStats>, ApiError> {
        self.get_list("courses/admin/instructor-stats/").await
    }

    #[instrument(skip(self))]
    async fn get_course(&self, course_id: i64) -> Result<Course, ApiError> {
        self.send(Method::GET, &format!("courses/{course_id}/"), None)
            .await
    }

    #[instrument(skip_all)]
    async fn current_user(&self) -> Result<AdminUser, ApiError> {
        self.send(Method::GET, "users/me/", None).await
    }

    #[instrument(skip_all)]
    async fn list_instructors(&self) -> Result<Vec<Instructor>, ApiError> {
        self.get_list("users/list_by_role/?role=instructor").await
    }

    #[instrument(skip_all)]
    async fn create_course(&self, draft: &CourseDraft) -> Result<Course, ApiError> {
        self.send(Method::POST, "courses/", Some(to_body(draft)?))
            .await
    }

    #[instrument(skip(self, draft))]
    async fn update_course(&self, course_id: i64, draft: &CourseDraft) -> Result<Course, ApiError> {
        self.send(
            Method::PATCH,
            &format!("courses/{course_id}/"),
            Some(to_body(draft)?),
        )
        .await
    }

    #[instrument(skip(self, reason))]
    async fn activate_course(&self, course_id: i64, reason: &str) -> Result<OperationResult, ApiError> {
        self.send(
            Method::POST,
            &format!("courses/{course_id}/activate/"),
            Some(to_body(&ReasonBody { reason })?),
        )
        .await
    }

    #[instrument(skip(self, reason))]
    async fn deactivate_course(
        &self,
        course_id: i64,
        reason: &str,
    ) -> Result<OperationResult, ApiError> {
        self.send(
            Method::POST,
            &format!("courses/{course_id}/deactivate/"),
            Some(to_body(&ReasonBody { reason })?),
        )
        .await
    }

    #[instrument(skip(self, reason))]
    async fn delete_course_admin(
        &self,
        course_id: i64,
        reason: &str,
    ) -> Result<OperationResult, ApiError> {
        self.send(
            Method::DELETE,
            &format!("courses/{course_id}/admin_delete/"),
            Some(to_body(&ReasonBody { reason })?),
        )
        .await
    }

    #[instrument(skip(self, reason))]
    async fn transfer_course(
        &self,
        course_id: i64,
        new_instructor_id: i64,
        reason: &str,
    ) -> Result<OperationResult, ApiError> {
        self.send(
            Method::PUT,
            &format!("courses/{course_id}/transfer/"),
            Some(to_body(&TransferBody {
                new_instructor_id,
                reason,
            })?),
        )
        .await
    }

    #[instrument(skip(self, reason))]
    async fn change_course_state(
        &self,
        course_id: i64,
        state: CourseState,
        reason: &str,
    ) -> Result<OperationResult, ApiError> {
        self.send(
            Method::POST,
            &format!("courses/{course_id}/change-state/"),
            Some(to_body(&ChangeStateBody { state, reason })?),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn copy_course_content(
        &self,
        source_id: i64,
        target_id: i64,
        include_enrollments: bool,
    ) -> Result<OperationResult, ApiError> {
        self.send(
            Method::POST,
            &format!("courses/{target_id}/copy-content/"),
            Some(to_body(&CopyContentBody {
                source_course_id: source_id,
                include_enrollments,
            })?),
        )
        .await
    }

    #[instrument(skip(self, course_ids, reason), fields(count = course_ids.len()))]
    async fn bulk_operation(
        &self,
        action: &BulkAction,
        course_ids: &[i64],
        reason: &str,
    ) -> Result<OperationResult, ApiError> {
        self.send(Method::POST, action.path(), Some(action.body(course_ids, reason)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(base: &str) -> CourseClient {
        CourseClient::new(base, "token".into(), None, Duration::from_secs(10)).unwrap()
    }

    #[test]
    fn unwrap_list_prefers_results_envelope() {
        let raw = json!({"count": 2, "next": null, "results": [{"id": 1}, {"id": 2}]});
        let courses: Vec<Course> = unwrap_list(raw).unwrap();
        assert_eq!(courses.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn unwrap_list_keeps_bare_arrays() {
        let raw = json!([{"id": 5, "title": "Archivos Históricos"}]);
        let courses: Vec<Course> = unwrap_list(raw).unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].title, "Archivos Históricos");
    }

    #[test]
    fn unwrap_list_tolerates_mixed_record_shapes() {
        let raw = json!({"results": [
            {"id": 1, "duration": 40, "duration_hours": 40},
            {"id": 2, "enrolled_students": 3, "enrolled_students_count": 3},
            {"id": 3, "enrolled_students_count": null, "description": null},
            {"id": 4}
        ]});
        let courses: Vec<Course> = unwrap_list(raw).unwrap();
        assert_eq!(courses.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert_eq!(courses[0].duration_hours, Some(40.0));
        assert_eq!(courses[1].enrolled_students_count, 3);
        assert_eq!(courses[2].description, "");
    }

    #[test]
    fn unwrap_list_defaults_to_empty() {
        for raw in [
            json!({"detail": "ok"}),
            json!({"results": "not a list"}),
            json!(null),
            json!("text"),
            json!(42),
        ] {
            let courses: Vec<Course> = unwrap_list(raw).unwrap();
            assert!(courses.is_empty());
        }
    }

    #[test]
    fn decode_treats_empty_body_as_empty_object() {
        let r: OperationResult = decode(Value::Null).unwrap();
        assert_eq!(r.message, None);
    }

    #[test]
    fn build_request_sets_headers_and_path() {
        let client = client("http://localhost:8000/api");
        let body = json!({"reason": "x"});
        let request = client
            .build_request(Method::POST, "courses/3/activate/", Some(&body), "abc")
            .unwrap();
        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.url().path(), "/api/courses/3/activate/");
        let headers = request.headers();
        assert_eq!(
            headers
                .get("Authorization")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "Bearer abc"
        );
        assert_eq!(
            headers
                .get("Content-Type")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "application/json"
        );
    }

    #[test]
    fn build_request_keeps_query_strings() {
        let client = client("https://aula.example.org/api/");
        let request = client
            .build_request(Method::GET, "users/list_by_role/?role=instructor", None, "t")
            .unwrap();
        assert_eq!(request.url().path(), "/api/users/list_by_role/");
        assert_eq!(request.url().query(), Some("role=instructor"));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = CourseClient::new("not a url", "t".into(), None, Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, ApiError::Other(_)));
    }
}
