//! # Remote Store
//!
//! libSQL-compatible remote backend. Each statement is sent as a Hrana
//! `v2/pipeline` request holding one `execute` and one `close`, so no
//! server-side stream outlives a call.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::clock::{format_timestamp, parse_timestamp, MonotonicClock};
use super::errors::{StoreError, StoreResult};
use super::record::{RawRecord, RawSummary, Record, RecordSummary};
use super::{sql, RecordStore};

// ==================
// Wire Types
// ==================

#[derive(Debug, Serialize)]
struct PipelineRequest<'a> {
    requests: Vec<StreamRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamRequest<'a> {
    Execute { stmt: Statement<'a> },
    Close,
}

#[derive(Debug, Serialize)]
struct Statement<'a> {
    sql: &'a str,
    args: Vec<HranaValue>,
    want_rows: bool,
}

/// A single SQL value as Hrana encodes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum HranaValue {
    Null,
    Integer { value: String },
    Float { value: f64 },
    Text { value: String },
    Blob { base64: String },
}

impl HranaValue {
    fn text(value: impl Into<String>) -> Self {
        Self::Text {
            value: value.into(),
        }
    }

    fn into_text(self) -> StoreResult<String> {
        match self {
            Self::Text { value } => Ok(value),
            other => Err(StoreError::Protocol(format!("expected text, got {:?}", other))),
        }
    }

    fn into_optional_text(self) -> StoreResult<Option<String>> {
        match self {
            Self::Null => Ok(None),
            other => other.into_text().map(Some),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PipelineResponse {
    results: Vec<StreamResult>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamResult {
    Ok { response: StreamResponse },
    Error { error: HranaError },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamResponse {
    Execute { result: StmtResult },
    Close,
}

#[derive(Debug, Default, Deserialize)]
struct StmtResult {
    #[serde(default)]
    rows: Vec<Vec<HranaValue>>,
    #[serde(default)]
    affected_row_count: u64,
}

impl StmtResult {
    fn into_rows<const N: usize>(self) -> StoreResult<Vec<[HranaValue; N]>> {
        self.rows
            .into_iter()
            .map(|row| {
                let len = row.len();
                <[HranaValue; N]>::try_from(row).map_err(|_| {
                    StoreError::Protocol(format!("expected {} columns, got {}", N, len))
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct HranaError {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// Pull the execute result out of a pipeline response
fn execute_result(response: PipelineResponse) -> StoreResult<StmtResult> {
    match response.results.into_iter().next() {
        Some(StreamResult::Ok {
            response: StreamResponse::Execute { result },
        }) => Ok(result),
        Some(StreamResult::Ok { response }) => Err(StoreError::Protocol(format!(
            "expected execute response, got {:?}",
            response
        ))),
        Some(StreamResult::Error { error }) => Err(StoreError::Remote(match error.code {
            Some(code) => format!("{} ({})", error.message, code),
            None => error.message,
        })),
        None => Err(StoreError::Protocol("empty pipeline response".to_string())),
    }
}

/// `libsql://host` is served over https; anything else is used as given
fn pipeline_url(url: &str) -> String {
    let base = match url.strip_prefix("libsql://") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    };
    format!("{}/v2/pipeline", base.trim_end_matches('/'))
}

// ==================
// Store
// ==================

/// Remote libSQL-backed record store
pub struct RemoteStore {
    client: Client,
    pipeline_url: String,
    auth_token: Option<String>,
    clock: MonotonicClock,
}

impl RemoteStore {
    /// Create a store for the database at `url`
    pub fn new(url: &str, auth_token: Option<String>) -> Self {
        Self::with_client(Client::new(), url, auth_token)
    }

    pub fn with_client(client: Client, url: &str, auth_token: Option<String>) -> Self {
        Self {
            client,
            pipeline_url: pipeline_url(url),
            auth_token: auth_token.filter(|t| !t.is_empty()),
            clock: MonotonicClock::new(),
        }
    }

    async fn execute(&self, sql: &str, args: Vec<HranaValue>) -> StoreResult<StmtResult> {
        let body = PipelineRequest {
            requests: vec![
                StreamRequest::Execute {
                    stmt: Statement {
                        sql,
                        args,
                        want_rows: true,
                    },
                },
                StreamRequest::Close,
            ],
        };

        let mut request = self.client.post(&self.pipeline_url).json(&body);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response: PipelineResponse = request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(sql, "remote statement executed");
        execute_result(response)
    }
}

#[async_trait]
impl RecordStore for RemoteStore {
    async fn init_schema(&self) -> StoreResult<()> {
        self.execute(sql::CREATE_TABLE, vec![]).await?;
        self.execute(sql::CREATE_INDEX, vec![]).await?;

        let latest = self.execute(sql::LATEST, vec![]).await?.into_rows::<1>()?;
        if let Some([value]) = latest.into_iter().next() {
            if let Some(text) = value.into_optional_text()? {
                let at = parse_timestamp(&text).map_err(|e| StoreError::corrupt("*", e))?;
                self.clock.observe(at);
            }
        }
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<RecordSummary>> {
        let rows = self.execute(sql::LIST, vec![]).await?.into_rows::<3>()?;
        rows.into_iter()
            .map(|[id, created_at, updated_at]| {
                RawSummary {
                    id: id.into_text()?,
                    created_at: created_at.into_text()?,
                    updated_at: updated_at.into_text()?,
                }
                .decode()
            })
            .collect()
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Record>> {
        let rows = self
            .execute(sql::GET, vec![HranaValue::text(id)])
            .await?
            .into_rows::<4>()?;
        match rows.into_iter().next() {
            Some([id, data, created_at, updated_at]) => RawRecord {
                id: id.into_text()?,
                data: data.into_text()?,
                created_at: created_at.into_text()?,
                updated_at: updated_at.into_text()?,
            }
            .decode()
            .map(Some),
            None => Ok(None),
        }
    }

    async fn exists(&self, id: &str) -> StoreResult<bool> {
        let result = self.execute(sql::EXISTS, vec![HranaValue::text(id)]).await?;
        Ok(!result.rows.is_empty())
    }

    async fn insert(&self, id: &str, data: &str, at: DateTime<Utc>) -> StoreResult<()> {
        let args = vec![
            HranaValue::text(id),
            HranaValue::text(data),
            HranaValue::text(format_timestamp(&at)),
        ];
        self.execute(sql::INSERT, args).await?;
        Ok(())
    }

    async fn update(&self, id: &str, data: &str, at: DateTime<Utc>) -> StoreResult<u64> {
        let args = vec![
            HranaValue::text(id),
            HranaValue::text(data),
            HranaValue::text(format_timestamp(&at)),
        ];
        Ok(self.execute(sql::UPDATE, args).await?.affected_row_count)
    }

    async fn delete(&self, id: &str) -> StoreResult<u64> {
        let result = self.execute(sql::DELETE, vec![HranaValue::text(id)]).await?;
        Ok(result.affected_row_count)
    }

    fn clock(&self) -> &MonotonicClock {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use chrono::Duration;
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    // ==================
    // Fake pipeline endpoint
    // ==================

    type Reply = (StatusCode, Value);

    #[derive(Default)]
    struct FakeDatabase {
        seen: Mutex<Vec<(Option<String>, Value)>>,
        replies: Mutex<VecDeque<Reply>>,
    }

    impl FakeDatabase {
        fn seen(&self) -> Vec<(Option<String>, Value)> {
            self.seen.lock().unwrap().clone()
        }
    }

    async fn pipeline_handler(
        State(db): State<Arc<FakeDatabase>>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        db.seen.lock().unwrap().push((auth, body));
        let (status, reply) = db
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((StatusCode::INTERNAL_SERVER_ERROR, json!({})));
        (status, Json(reply))
    }

    async fn fake_database(replies: Vec<Reply>) -> (String, Arc<FakeDatabase>) {
        let db = Arc::new(FakeDatabase {
            seen: Mutex::new(Vec::new()),
            replies: Mutex::new(replies.into()),
        });
        let app = Router::new()
            .route("/v2/pipeline", post(pipeline_handler))
            .with_state(Arc::clone(&db));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), db)
    }

    fn text(value: &str) -> Value {
        json!({"type": "text", "value": value})
    }

    fn executed(rows: Value, affected_row_count: u64) -> Reply {
        (
            StatusCode::OK,
            json!({
                "baton": null,
                "base_url": null,
                "results": [
                    {"type": "ok", "response": {"type": "execute", "result": {
                        "cols": [],
                        "rows": rows,
                        "affected_row_count": affected_row_count,
                        "last_insert_rowid": null
                    }}},
                    {"type": "ok", "response": {"type": "close"}}
                ]
            }),
        )
    }

    const T1: &str = "2024-05-01T10:00:00.000001Z";
    const T2: &str = "2024-05-01T10:00:00.000002Z";

    // ==================
    // Store over the fake endpoint
    // ==================

    #[tokio::test]
    async fn test_remote_insert_sends_bearer_and_statement() {
        let (url, db) = fake_database(vec![executed(json!([]), 1)]).await;
        let store = RemoteStore::new(&url, Some("secret".to_string()));

        let at = store.clock().now();
        store.insert("a", r#"{"x":1}"#, at).await.unwrap();

        let seen = db.seen();
        assert_eq!(seen.len(), 1);
        let (auth, body) = &seen[0];
        assert_eq!(auth.as_deref(), Some("Bearer secret"));
        assert_eq!(body["requests"][0]["type"], "execute");
        assert_eq!(body["requests"][0]["stmt"]["sql"], sql::INSERT);
        assert_eq!(
            body["requests"][0]["stmt"]["args"],
            json!([text("a"), text(r#"{"x":1}"#), text(&format_timestamp(&at))])
        );
        assert_eq!(body["requests"][1], json!({"type": "close"}));
    }

    #[tokio::test]
    async fn test_remote_without_token_sends_no_auth() {
        let (url, db) = fake_database(vec![executed(json!([]), 0)]).await;
        let store = RemoteStore::new(&url, Some(String::new()));

        assert_eq!(store.delete("a").await.unwrap(), 0);
        assert_eq!(db.seen()[0].0, None);
    }

    #[tokio::test]
    async fn test_remote_get_decodes_record() {
        let (url, db) = fake_database(vec![
            executed(json!([[text("a"), text(r#"{"x":[1,null]}"#), text(T1), text(T2)]]), 0),
            executed(json!([]), 0),
        ])
        .await;
        let store = RemoteStore::new(&url, None);

        let record = store.get("a").await.unwrap().unwrap();
        assert_eq!(record.id, "a");
        assert_eq!(record.data, json!({"x": [1, null]}));
        assert!(record.updated_at > record.created_at);
        assert!(store.get("missing").await.unwrap().is_none());

        let seen = db.seen();
        assert_eq!(seen[0].1["requests"][0]["stmt"]["args"], json!([text("a")]));
        assert_eq!(seen[1].1["requests"][0]["stmt"]["args"], json!([text("missing")]));
    }

    #[tokio::test]
    async fn test_remote_list_decodes_summaries_in_order() {
        let (url, db) = fake_database(vec![executed(
            json!([[text("b"), text(T1), text(T2)], [text("a"), text(T1), text(T1)]]),
            0,
        )])
        .await;
        let store = RemoteStore::new(&url, None);

        let ids: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(db.seen()[0].1["requests"][0]["stmt"]["sql"], sql::LIST);
    }

    #[tokio::test]
    async fn test_remote_exists_and_affected_rows() {
        let (url, _db) = fake_database(vec![
            executed(json!([[{"type": "integer", "value": "1"}]]), 0),
            executed(json!([]), 0),
            executed(json!([]), 1),
            executed(json!([]), 0),
            executed(json!([]), 1),
        ])
        .await;
        let store = RemoteStore::new(&url, None);

        assert!(store.exists("a").await.unwrap());
        assert!(!store.exists("b").await.unwrap());
        assert_eq!(store.update("a", "2", store.clock().now()).await.unwrap(), 1);
        assert_eq!(store.update("b", "2", store.clock().now()).await.unwrap(), 0);
        assert_eq!(store.delete("a").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_remote_corrupt_data_is_an_error() {
        let (url, _db) = fake_database(vec![executed(
            json!([[text("a"), text("{oops"), text(T1), text(T1)]]),
            0,
        )])
        .await;
        let store = RemoteStore::new(&url, None);

        assert!(matches!(
            store.get("a").await.unwrap_err(),
            StoreError::Corrupt { .. }
        ));
    }

    #[tokio::test]
    async fn test_remote_statement_error_maps_to_remote() {
        let (url, _db) = fake_database(vec![(
            StatusCode::OK,
            json!({"results": [
                {"type": "error", "error": {"message": "UNIQUE constraint failed: records.id", "code": "SQLITE_CONSTRAINT"}},
                {"type": "error", "error": {"message": "stream closed"}}
            ]}),
        )])
        .await;
        let store = RemoteStore::new(&url, None);

        let err = store.insert("a", "1", store.clock().now()).await.unwrap_err();
        match err {
            StoreError::Remote(message) => assert!(message.contains("UNIQUE constraint")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_remote_http_failure_maps_to_transport() {
        let (url, _db) = fake_database(vec![(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"error": "boom"}),
        )])
        .await;
        let store = RemoteStore::new(&url, None);

        assert!(matches!(
            store.list().await.unwrap_err(),
            StoreError::Transport(_)
        ));
    }

    #[tokio::test]
    async fn test_remote_init_schema_seeds_clock() {
        let future = Utc::now() + Duration::hours(1);
        let (url, db) = fake_database(vec![
            executed(json!([]), 0),
            executed(json!([]), 0),
            executed(json!([[text(&format_timestamp(&future))]]), 0),
        ])
        .await;
        let store = RemoteStore::new(&url, None);

        store.init_schema().await.unwrap();
        assert!(store.clock().now() > future);

        let sqls: Vec<Value> = db
            .seen()
            .iter()
            .map(|(_, body)| body["requests"][0]["stmt"]["sql"].clone())
            .collect();
        assert_eq!(
            sqls,
            vec![json!(sql::CREATE_TABLE), json!(sql::CREATE_INDEX), json!(sql::LATEST)]
        );
    }

    #[tokio::test]
    async fn test_remote_init_schema_on_empty_table() {
        let (url, _db) = fake_database(vec![
            executed(json!([]), 0),
            executed(json!([]), 0),
            executed(json!([[{"type": "null"}]]), 0),
        ])
        .await;
        let store = RemoteStore::new(&url, None);
        store.init_schema().await.unwrap();
    }

    // ==================
    // Wire encoding
    // ==================

    #[test]
    fn test_pipeline_url() {
        assert_eq!(
            pipeline_url("libsql://db-org.turso.io"),
            "https://db-org.turso.io/v2/pipeline"
        );
        assert_eq!(
            pipeline_url("http://127.0.0.1:8080/"),
            "http://127.0.0.1:8080/v2/pipeline"
        );
    }

    #[test]
    fn test_request_encoding() {
        let body = PipelineRequest {
            requests: vec![
                StreamRequest::Execute {
                    stmt: Statement {
                        sql: sql::GET,
                        args: vec![HranaValue::text("abc")],
                        want_rows: true,
                    },
                },
                StreamRequest::Close,
            ],
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["requests"][0]["type"], "execute");
        assert_eq!(
            value["requests"][0]["stmt"]["args"][0],
            json!({"type": "text", "value": "abc"})
        );
        assert_eq!(value["requests"][1], json!({"type": "close"}));
    }

    #[test]
    fn test_execute_result_rows() {
        let response: PipelineResponse = serde_json::from_value(json!({
            "baton": null,
            "base_url": null,
            "results": [
                {"type": "ok", "response": {"type": "execute", "result": {
                    "cols": [{"name": "id"}, {"name": "created_at"}, {"name": "updated_at"}],
                    "rows": [[
                        {"type": "text", "value": "a"},
                        {"type": "text", "value": "2024-05-01T10:00:00.000001Z"},
                        {"type": "text", "value": "2024-05-01T10:00:00.000001Z"}
                    ]],
                    "affected_row_count": 0,
                    "last_insert_rowid": null
                }}},
                {"type": "ok", "response": {"type": "close"}}
            ]
        }))
        .unwrap();

        let rows = execute_result(response).unwrap().into_rows::<3>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], HranaValue::text("a"));
    }

    #[test]
    fn test_execute_result_error() {
        let response: PipelineResponse = serde_json::from_value(json!({
            "results": [
                {"type": "error", "error": {"message": "no such table: records", "code": "SQLITE_ERROR"}},
                {"type": "error", "error": {"message": "previous statement failed"}}
            ]
        }))
        .unwrap();

        let err = execute_result(response).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Remote database error: no such table: records (SQLITE_ERROR)"
        );
    }

    #[test]
    fn test_column_count_mismatch_is_protocol_error() {
        let result = StmtResult {
            rows: vec![vec![HranaValue::Null]],
            affected_row_count: 0,
        };
        assert!(matches!(
            result.into_rows::<2>(),
            Err(StoreError::Protocol(_))
        ));
    }

    #[test]
    fn test_null_max_is_none() {
        assert_eq!(HranaValue::Null.into_optional_text().unwrap(), None);
        assert!(HranaValue::Integer {
            value: "1".to_string()
        }
        .into_text()
        .is_err());
    }
}
