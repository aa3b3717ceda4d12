use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{Backend, BackendResult, Operation, Query};
use crate::config::Config;
use crate::error::{BackendError, DECODE_CODE, FORBIDDEN_CODE, NOT_FOUND_CODE};

/// PostgREST answers single-row requests with an object instead of an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

#[derive(Debug, Clone, Deserialize)]
struct Session {
    access_token: String,
}

/// Backend over the project's REST endpoints (`/rest/v1`, `/auth/v1`, `/storage/v1`).
///
/// Holds the ambient session; requests made without one use the anon key.
pub struct RestBackend {
    client: Client,
    base_url: String,
    api_key: String,
    session: RwLock<Option<Session>>,
}

impl RestBackend {
    pub fn new(base_url: &str, api_key: &str, timeout: Option<Duration>) -> Self {
        let mut builder = ClientBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            session: RwLock::new(None),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.supabase_url, &config.anon_key, config.http_timeout)
    }

    fn endpoint(&self, service: &str, path: &str) -> String {
        format!("{}/{service}/v1/{path}", self.base_url)
    }

    fn access_token(&self) -> Option<String> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|session| session.access_token.clone())
    }

    fn store_session(&self, body: &Value) {
        if let Ok(session) = Session::deserialize(body) {
            *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
        }
    }

    fn clear_session(&self) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self.access_token().unwrap_or_else(|| self.api_key.clone());
        request.header("apikey", &self.api_key).bearer_auth(token)
    }

    async fn send(&self, request: RequestBuilder) -> BackendResult {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(BackendError::transport)?;
        read_response(response).await
    }
}

#[async_trait]
impl Backend for RestBackend {
    async fn execute(&self, query: Query) -> BackendResult {
        let method = match query.operation {
            Operation::Select => Method::GET,
            Operation::Insert(_) => Method::POST,
            Operation::Update(_) => Method::PATCH,
            Operation::Delete => Method::DELETE,
        };
        debug!(table = %query.table, method = %method, single = query.single, "backend query");

        let mut request = self
            .client
            .request(method, self.endpoint("rest", &query.table))
            .query(&rest_params(&query));

        if query.single {
            request = request.header(ACCEPT, SINGLE_OBJECT);
        }
        match &query.operation {
            Operation::Select => {}
            Operation::Insert(body) | Operation::Update(body) => {
                request = request.json(body).header("Prefer", prefer_header(&query));
            }
            Operation::Delete => {
                request = request.header("Prefer", prefer_header(&query));
            }
        }

        self.send(request).await
    }

    async fn current_user(&self) -> BackendResult {
        if self.access_token().is_none() {
            return Ok(None);
        }
        self.send(self.client.get(self.endpoint("auth", "user"))).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> BackendResult {
        let request = self
            .client
            .post(self.endpoint("auth", "token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));

        let body = self.send(request).await?;
        if let Some(body) = &body {
            self.store_session(body);
        }
        Ok(body.and_then(user_from_auth_body))
    }

    async fn sign_out(&self) -> BackendResult {
        if self.access_token().is_none() {
            return Ok(None);
        }
        let result = self.send(self.client.post(self.endpoint("auth", "logout"))).await;
        self.clear_session();
        result.map(|_| None)
    }

    async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> BackendResult {
        let request = self
            .client
            .post(self.endpoint("auth", "signup"))
            .json(&json!({ "email": email, "password": password, "data": metadata }));

        let body = self.send(request).await?;
        if let Some(body) = &body {
            self.store_session(body);
        }
        Ok(body.and_then(user_from_auth_body))
    }

    async fn update_user(&self, metadata: Value) -> BackendResult {
        let request = self
            .client
            .put(self.endpoint("auth", "user"))
            .json(&json!({ "data": metadata }));
        let body = self.send(request).await?;
        Ok(body.and_then(user_from_auth_body))
    }

    async fn reset_password(&self, email: &str) -> BackendResult {
        let request = self
            .client
            .post(self.endpoint("auth", "recover"))
            .json(&json!({ "email": email }));
        self.send(request).await.map(|_| None)
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BackendError> {
        debug!(bucket, path, size = bytes.len(), "uploading object");
        let request = self
            .client
            .post(self.endpoint("storage", &format!("object/{bucket}/{path}")))
            .header(CONTENT_TYPE, content_type)
            .body(bytes);
        self.send(request).await.map(|_| ())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.endpoint("storage", &format!("object/public/{bucket}/{path}"))
    }
}

fn rest_params(query: &Query) -> Vec<(String, String)> {
    let mut params = Vec::new();
    if query.returns_rows() {
        params.push(("select".to_string(), query.select_list().to_string()));
    }
    params.extend(query.filters.iter().map(|filter| filter.to_param()));
    if let Some(order) = query.order_param() {
        params.push(("order".to_string(), order));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

fn prefer_header(query: &Query) -> &'static str {
    if query.returns_rows() {
        "return=representation"
    } else {
        "return=minimal"
    }
}

async fn read_response(response: Response) -> BackendResult {
    let status = response.status();
    let body = response.text().await.map_err(BackendError::transport)?;

    if !status.is_success() {
        return Err(parse_error(status.as_u16(), &body));
    }
    if body.trim().is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(&body).map_err(|err| {
        BackendError::new(DECODE_CODE, "backend returned invalid JSON").with_details(err.to_string())
    })?;
    Ok((!value.is_null()).then_some(value))
}

/// Reads PostgREST (`code`/`message`/`details`), GoTrue (`error_code`/`msg`)
/// and storage (`error`/`message`) error bodies.
fn parse_error(status: u16, body: &str) -> BackendError {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let text = |key: &str| match parsed.get(key) {
        Some(Value::String(value)) => Some(value.clone()),
        Some(Value::Number(value)) => Some(value.to_string()),
        _ => None,
    };

    let code = text("code")
        .filter(|code| !code.chars().all(|c| c.is_ascii_digit()))
        .or_else(|| text("error_code"))
        .or_else(|| match status {
            401 | 403 => Some(FORBIDDEN_CODE.to_string()),
            404 => Some(NOT_FOUND_CODE.to_string()),
            _ => text("error"),
        });
    let message = text("message")
        .or_else(|| text("msg"))
        .or_else(|| text("error_description"))
        .unwrap_or_else(|| body.trim().to_string());
    let details = text("details").or_else(|| text("hint"));

    BackendError {
        code,
        message,
        details,
        status: Some(status),
    }
}

/// Auth endpoints return either `{user, access_token, ..}` or the bare user.
fn user_from_auth_body(body: Value) -> Option<Value> {
    match body.get("user") {
        Some(user) if !user.is_null() => Some(user.clone()),
        _ if body.get("id").is_some() => Some(body),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Direction;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn select_params_include_filters_order_and_limit() {
        let query = Query::table("workouts")
            .select("*, program:training_program_id (*)")
            .eq("client_id", "c1")
            .gte("start_time", "2026-10-16T00:00:00.000Z")
            .order("start_time", Direction::Ascending)
            .limit(1)
            .single();

        assert_eq!(
            rest_params(&query),
            vec![
                ("select".to_string(), "*,program:training_program_id(*)".to_string()),
                ("client_id".to_string(), "eq.c1".to_string()),
                ("start_time".to_string(), "gte.2026-10-16T00:00:00.000Z".to_string()),
                ("order".to_string(), "start_time.asc".to_string()),
                ("limit".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn minimal_writes_skip_select_param() {
        let query = Query::table("workouts").delete().eq("id", "w1");
        assert_eq!(rest_params(&query), vec![("id".to_string(), "eq.w1".to_string())]);
        assert_eq!(prefer_header(&query), "return=minimal");
    }

    #[test]
    fn postgrest_error_body_keeps_code_and_details() {
        let err = parse_error(
            406,
            r#"{"code":"PGRST116","message":"JSON object requested, multiple (or no) rows returned","details":"The result contains 0 rows","hint":null}"#,
        );
        assert_eq!(err.code.as_deref(), Some("PGRST116"));
        assert_eq!(err.details.as_deref(), Some("The result contains 0 rows"));
        assert_eq!(err.status, Some(406));
    }

    #[test]
    fn auth_error_with_numeric_code_uses_error_code() {
        let err = parse_error(
            400,
            r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#,
        );
        assert_eq!(err.code.as_deref(), Some("invalid_credentials"));
        assert_eq!(err.message, "Invalid login credentials");
    }

    #[test]
    fn unauthorized_without_code_is_forbidden() {
        let err = parse_error(401, "");
        assert_eq!(err.code.as_deref(), Some(FORBIDDEN_CODE));
    }

    #[test]
    fn public_url_points_at_public_object_path() {
        let backend = RestBackend::new("https://demo.supabase.co/", "anon", None);
        assert_eq!(
            backend.public_url("photos", "measurement_photos/c1/1.jpg"),
            "https://demo.supabase.co/storage/v1/object/public/photos/measurement_photos/c1/1.jpg"
        );
    }

    #[test]
    fn auth_body_yields_nested_or_bare_user() {
        let nested = json!({"access_token": "t", "user": {"id": "u1"}});
        assert_eq!(user_from_auth_body(nested), Some(json!({"id": "u1"})));

        let bare = json!({"id": "u2", "email": "a@b.c"});
        assert_eq!(user_from_auth_body(bare.clone()), Some(bare));
        assert_eq!(user_from_auth_body(json!({})), None);
    }

    fn backend_for(server: &MockServer) -> RestBackend {
        RestBackend::new(&server.uri(), "anon", None)
    }

    #[tokio::test]
    async fn single_row_select_asks_for_an_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/workouts"))
            .and(query_param("select", "*"))
            .and(query_param("id", "eq.w1"))
            .and(header("accept", SINGLE_OBJECT))
            .and(header("apikey", "anon"))
            .and(header("authorization", "Bearer anon"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "w1"})))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let row = backend
            .execute(Query::table("workouts").eq("id", "w1").single())
            .await
            .unwrap();
        assert_eq!(row, Some(json!({"id": "w1"})));
    }

    #[tokio::test]
    async fn writes_send_the_matching_prefer_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/clients"))
            .and(header("prefer", "return=representation"))
            .and(body_json(json!({"first_name": "Ana"})))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!([{"id": "c1", "first_name": "Ana"}])),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/clients"))
            .and(query_param("id", "eq.c1"))
            .and(header("prefer", "return=minimal"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let inserted = backend
            .execute(
                Query::table("clients")
                    .insert(json!({"first_name": "Ana"}))
                    .select("*"),
            )
            .await
            .unwrap();
        assert_eq!(inserted, Some(json!([{"id": "c1", "first_name": "Ana"}])));

        let deleted = backend
            .execute(Query::table("clients").delete().eq("id", "c1"))
            .await
            .unwrap();
        assert_eq!(deleted, None);
    }

    #[tokio::test]
    async fn sign_in_swaps_anon_key_for_session_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(header("authorization", "Bearer anon"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "user-token",
                "token_type": "bearer",
                "user": {"id": "u1", "email": "coach@example.com"}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("authorization", "Bearer user-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "u1"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .and(header("authorization", "Bearer user-token"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        assert_eq!(backend.current_user().await.unwrap(), None);

        let user = backend.sign_in("coach@example.com", "secret").await.unwrap();
        assert_eq!(user, Some(json!({"id": "u1", "email": "coach@example.com"})));
        assert_eq!(backend.current_user().await.unwrap(), Some(json!({"id": "u1"})));

        assert_eq!(backend.sign_out().await.unwrap(), None);
        assert_eq!(backend.current_user().await.unwrap(), None);
    }

    #[tokio::test]
    async fn error_responses_become_backend_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/workouts"))
            .respond_with(ResponseTemplate::new(406).set_body_json(json!({
                "code": "PGRST116",
                "message": "JSON object requested, multiple (or no) rows returned",
                "details": "The result contains 0 rows",
                "hint": null
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/clients"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let err = backend
            .execute(Query::table("workouts").eq("id", "missing").single())
            .await
            .unwrap_err();
        assert_eq!(err.code.as_deref(), Some(NOT_FOUND_CODE));
        assert_eq!(err.status, Some(406));

        let err = backend.execute(Query::table("clients")).await.unwrap_err();
        assert_eq!(err.code.as_deref(), Some(FORBIDDEN_CODE));
        assert_eq!(err.status, Some(401));
    }

    #[tokio::test]
    async fn upload_posts_bytes_with_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/photos/measurement_photos/c1/1.jpg"))
            .and(header("content-type", "image/jpeg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"Key": "photos/measurement_photos/c1/1.jpg"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        backend
            .upload("photos", "measurement_photos/c1/1.jpg", vec![0xff, 0xd8], "image/jpeg")
            .await
            .unwrap();
    }
}
