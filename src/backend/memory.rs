use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::{Backend, BackendResult, Filter, Operation, OperationKind, Query};
use crate::error::{BackendError, MALFORMED_PAYLOAD_CODE};

const AUTH: &str = "auth";
const STORAGE: &str = "storage";

#[derive(Debug, Clone)]
enum Relation {
    /// `table.column` references `target.id`.
    ToOne {
        table: String,
        column: String,
        target: String,
    },
    /// `target.foreign_key` references `table.id`.
    ToMany {
        table: String,
        target: String,
        foreign_key: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum SelectItem {
    Star,
    Column(String),
    Embed {
        alias: Option<String>,
        target: String,
        children: Vec<SelectItem>,
    },
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    scope: String,
    operation: Option<OperationKind>,
    error: BackendError,
}

#[derive(Debug, Clone)]
struct StoredUser {
    email: String,
    password: String,
    user: Value,
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, Vec<Value>>,
    relations: Vec<Relation>,
    failures: Vec<InjectedFailure>,
    users: Vec<StoredUser>,
    session: Option<usize>,
    objects: HashMap<String, Vec<u8>>,
    executed: Vec<Query>,
}

/// In-memory backend for tests: PostgREST-like filtering, ordering, single-row
/// mode and embeds over JSON rows, plus password auth and object storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend with the relations used by the coaching tables.
    pub fn with_fitness_schema() -> Self {
        let backend = Self::new();
        backend.relate_one("workouts", "training_program_id", "training_programs");
        backend.relate_many("training_programs", "program_exercises", "program_id");
        backend.relate_many("measurements", "body_measurements", "measurement_id");
        backend.relate_many("clients", "measurements", "client_id");
        backend.relate_many("clients", "workouts", "client_id");
        backend.relate_many("clients", "measurement_photos", "client_id");
        backend
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn relate_one(&self, table: &str, column: &str, target: &str) {
        self.lock().relations.push(Relation::ToOne {
            table: table.to_string(),
            column: column.to_string(),
            target: target.to_string(),
        });
    }

    pub fn relate_many(&self, table: &str, target: &str, foreign_key: &str) {
        self.lock().relations.push(Relation::ToMany {
            table: table.to_string(),
            target: target.to_string(),
            foreign_key: foreign_key.to_string(),
        });
    }

    pub fn seed(&self, table: &str, rows: impl IntoIterator<Item = Value>) {
        self.lock()
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    /// Makes the next `operation` on `table` fail with `error`.
    pub fn fail_next(&self, table: &str, operation: OperationKind, error: BackendError) {
        self.lock().failures.push(InjectedFailure {
            scope: table.to_string(),
            operation: Some(operation),
            error,
        });
    }

    /// Makes the next auth call fail with `error`.
    pub fn fail_auth(&self, error: BackendError) {
        self.lock().failures.push(InjectedFailure {
            scope: AUTH.to_string(),
            operation: None,
            error,
        });
    }

    pub fn fail_upload(&self, error: BackendError) {
        self.lock().failures.push(InjectedFailure {
            scope: STORAGE.to_string(),
            operation: None,
            error,
        });
    }

    /// Registers a user and makes it the ambient session. Returns its id.
    pub fn sign_in_as(&self, email: &str, metadata: Value) -> Uuid {
        let mut state = self.lock();
        let id = Uuid::new_v4();
        state.users.push(StoredUser {
            email: email.to_string(),
            password: String::new(),
            user: json!({ "id": id, "email": email, "user_metadata": metadata }),
        });
        state.session = Some(state.users.len() - 1);
        id
    }

    pub fn executed(&self) -> Vec<Query> {
        self.lock().executed.clone()
    }

    pub fn object(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.lock().objects.get(&format!("{bucket}/{path}")).cloned()
    }
}

impl State {
    fn take_failure(&mut self, scope: &str, operation: Option<OperationKind>) -> Option<BackendError> {
        let index = self
            .failures
            .iter()
            .position(|failure| failure.scope == scope && failure.operation == operation)?;
        Some(self.failures.remove(index).error)
    }

    fn run(&mut self, query: &Query) -> BackendResult {
        if let Some(err) = self.take_failure(&query.table, Some(query.operation.kind())) {
            return Err(err);
        }

        let affected = match &query.operation {
            Operation::Select => {
                let mut rows: Vec<Value> = self
                    .tables
                    .get(&query.table)
                    .map(|rows| rows.iter().filter(|row| matches(row, &query.filters)).cloned().collect())
                    .unwrap_or_default();
                if let Some((column, direction)) = &query.order {
                    rows.sort_by(|a, b| compare_values(a.get(column), b.get(column)));
                    if *direction == super::Direction::Descending {
                        rows.reverse();
                    }
                }
                if let Some(limit) = query.limit {
                    rows.truncate(limit);
                }
                rows
            }
            Operation::Insert(payload) => {
                let incoming = match payload {
                    Value::Array(rows) => rows.clone(),
                    row => vec![row.clone()],
                };
                let mut inserted = Vec::with_capacity(incoming.len());
                for row in incoming {
                    let Value::Object(mut fields) = row else {
                        return Err(BackendError::new(MALFORMED_PAYLOAD_CODE, "insert payload must be an object"));
                    };
                    fields
                        .entry("id")
                        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
                    fields
                        .entry("created_at")
                        .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
                    inserted.push(Value::Object(fields));
                }
                self.tables
                    .entry(query.table.clone())
                    .or_default()
                    .extend(inserted.iter().cloned());
                inserted
            }
            Operation::Update(patch) => {
                let Value::Object(patch) = patch else {
                    return Err(BackendError::new(MALFORMED_PAYLOAD_CODE, "update payload must be an object"));
                };
                let mut updated = Vec::new();
                for row in self.tables.entry(query.table.clone()).or_default().iter_mut() {
                    if !matches(row, &query.filters) {
                        continue;
                    }
                    if let Value::Object(fields) = row {
                        for (key, value) in patch {
                            fields.insert(key.clone(), value.clone());
                        }
                    }
                    updated.push(row.clone());
                }
                updated
            }
            Operation::Delete => {
                let rows = self.tables.entry(query.table.clone()).or_default();
                let (removed, kept): (Vec<Value>, Vec<Value>) =
                    rows.drain(..).partition(|row| matches(row, &query.filters));
                *rows = kept;
                removed
            }
        };

        if !query.returns_rows() {
            return Ok(None);
        }

        let items = parse_select(query.select_list());
        let projected: Vec<Value> = affected
            .iter()
            .map(|row| self.project(&query.table, row, &items))
            .collect();

        if query.single {
            return match <[Value; 1]>::try_from(projected) {
                Ok([row]) => Ok(Some(row)),
                Err(rows) => Err(BackendError::not_found(
                    "JSON object requested, multiple (or no) rows returned",
                )
                .with_details(format!("The result contains {} rows", rows.len()))),
            };
        }
        Ok(Some(Value::Array(projected)))
    }

    fn project(&self, table: &str, row: &Value, items: &[SelectItem]) -> Value {
        let mut out = Map::new();
        let Some(fields) = row.as_object() else {
            return row.clone();
        };

        for item in items {
            match item {
                SelectItem::Star => out.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone()))),
                SelectItem::Column(name) => {
                    if let Some(value) = fields.get(name) {
                        out.insert(name.clone(), value.clone());
                    }
                }
                SelectItem::Embed {
                    alias,
                    target,
                    children,
                } => {
                    let key = alias.clone().unwrap_or_else(|| target.clone());
                    out.insert(key, self.embed(table, row, target, children));
                }
            }
        }
        Value::Object(out)
    }

    fn embed(&self, table: &str, row: &Value, target: &str, children: &[SelectItem]) -> Value {
        for relation in &self.relations {
            match relation {
                Relation::ToOne {
                    table: owner,
                    column,
                    target: referenced,
                } if owner == table && (column == target || referenced == target) => {
                    let key = row.get(column).filter(|v| !v.is_null()).map(scalar_text);
                    return key
                        .and_then(|key| {
                            self.tables.get(referenced)?.iter().find(|candidate| {
                                candidate.get("id").map(scalar_text).as_deref() == Some(key.as_str())
                            })
                        })
                        .map(|found| self.project(referenced, found, children))
                        .unwrap_or(Value::Null);
                }
                Relation::ToMany {
                    table: owner,
                    target: child,
                    foreign_key,
                } if owner == table && child == target => {
                    let id = row.get("id").map(scalar_text);
                    let rows = self
                        .tables
                        .get(child)
                        .map(|rows| {
                            rows.iter()
                                .filter(|candidate| {
                                    candidate.get(foreign_key).map(scalar_text) == id
                                })
                                .map(|found| self.project(child, found, children))
                                .collect()
                        })
                        .unwrap_or_default();
                    return Value::Array(rows);
                }
                _ => {}
            }
        }
        Value::Null
    }

    fn session_user(&self) -> Option<&StoredUser> {
        self.session.and_then(|index| self.users.get(index))
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn execute(&self, query: Query) -> BackendResult {
        let mut state = self.lock();
        state.executed.push(query.clone());
        state.run(&query)
    }

    async fn current_user(&self) -> BackendResult {
        let mut state = self.lock();
        if let Some(err) = state.take_failure(AUTH, None) {
            return Err(err);
        }
        Ok(state.session_user().map(|stored| stored.user.clone()))
    }

    async fn sign_in(&self, email: &str, password: &str) -> BackendResult {
        let mut state = self.lock();
        if let Some(err) = state.take_failure(AUTH, None) {
            return Err(err);
        }
        let index = state
            .users
            .iter()
            .position(|stored| stored.email == email && stored.password == password)
            .ok_or_else(|| {
                BackendError::new("invalid_credentials", "Invalid login credentials").with_status(400)
            })?;
        state.session = Some(index);
        Ok(Some(state.users[index].user.clone()))
    }

    async fn sign_out(&self) -> BackendResult {
        self.lock().session = None;
        Ok(None)
    }

    async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> BackendResult {
        let mut state = self.lock();
        if let Some(err) = state.take_failure(AUTH, None) {
            return Err(err);
        }
        if state.users.iter().any(|stored| stored.email == email) {
            return Err(BackendError::new("user_already_exists", "User already registered").with_status(422));
        }
        let user = json!({
            "id": Uuid::new_v4(),
            "email": email,
            "user_metadata": metadata,
            "created_at": Utc::now().to_rfc3339(),
        });
        state.users.push(StoredUser {
            email: email.to_string(),
            password: password.to_string(),
            user: user.clone(),
        });
        state.session = Some(state.users.len() - 1);
        Ok(Some(user))
    }

    async fn update_user(&self, metadata: Value) -> BackendResult {
        let mut state = self.lock();
        if let Some(err) = state.take_failure(AUTH, None) {
            return Err(err);
        }
        let index = state.session.ok_or_else(BackendError::session_missing)?;
        let user = &mut state.users[index].user;
        if let (Some(existing), Value::Object(patch)) = (
            user.get_mut("user_metadata").and_then(Value::as_object_mut),
            metadata,
        ) {
            existing.extend(patch);
        }
        Ok(Some(user.clone()))
    }

    async fn reset_password(&self, _email: &str) -> BackendResult {
        let mut state = self.lock();
        match state.take_failure(AUTH, None) {
            Some(err) => Err(err),
            None => Ok(None),
        }
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), BackendError> {
        let mut state = self.lock();
        if let Some(err) = state.take_failure(STORAGE, None) {
            return Err(err);
        }
        let key = format!("{bucket}/{path}");
        if state.objects.contains_key(&key) {
            return Err(BackendError::new("Duplicate", "The resource already exists").with_status(409));
        }
        state.objects.insert(key, bytes);
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://{bucket}/{path}")
    }
}

fn matches(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| {
        let Some(value) = row.get(filter.column()).filter(|v| !v.is_null()) else {
            return false;
        };
        let ordering = compare_text(&scalar_text(value), filter.value());
        match filter {
            Filter::Eq { .. } => ordering == Ordering::Equal,
            Filter::Gte { .. } => ordering != Ordering::Less,
        }
    })
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Nulls sort after every value, as PostgREST does for ascending order.
fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    let left = left.filter(|v| !v.is_null());
    let right = right.filter(|v| !v.is_null());
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(l), Some(r)) => compare_text(&scalar_text(l), &scalar_text(r)),
    }
}

fn compare_text(left: &str, right: &str) -> Ordering {
    if let (Ok(l), Ok(r)) = (left.parse::<f64>(), right.parse::<f64>()) {
        return l.partial_cmp(&r).unwrap_or(Ordering::Equal);
    }
    if let (Ok(l), Ok(r)) = (
        DateTime::parse_from_rfc3339(left),
        DateTime::parse_from_rfc3339(right),
    ) {
        return l.cmp(&r);
    }
    left.cmp(right)
}

fn parse_select(list: &str) -> Vec<SelectItem> {
    split_top_level(list)
        .into_iter()
        .filter(|item| !item.is_empty())
        .map(parse_item)
        .collect()
}

fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (index, c) in list.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&list[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
}

fn parse_item(item: &str) -> SelectItem {
    if item == "*" {
        return SelectItem::Star;
    }
    let Some(open) = item.find('(') else {
        return SelectItem::Column(item.to_string());
    };

    let head = &item[..open];
    let body = &item[open + 1..];
    let inner = body.strip_suffix(')').unwrap_or(body);
    let (alias, target) = match head.split_once(':') {
        Some((alias, target)) => (Some(alias.to_string()), target.to_string()),
        None => (None, head.to_string()),
    };

    SelectItem::Embed {
        alias,
        target,
        children: parse_select(inner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Direction;

    #[test]
    fn parses_nested_embed_lists() {
        let items = parse_select("*,program:training_program_id(*,exercises:program_exercises(*))");
        assert_eq!(
            items,
            vec![
                SelectItem::Star,
                SelectItem::Embed {
                    alias: Some("program".to_string()),
                    target: "training_program_id".to_string(),
                    children: vec![
                        SelectItem::Star,
                        SelectItem::Embed {
                            alias: Some("exercises".to_string()),
                            target: "program_exercises".to_string(),
                            children: vec![SelectItem::Star],
                        },
                    ],
                },
            ]
        );
        assert_eq!(parse_select("id"), vec![SelectItem::Column("id".to_string())]);
    }

    #[tokio::test]
    async fn select_filters_orders_and_limits() {
        let backend = MemoryBackend::new();
        backend.seed(
            "client_activities",
            vec![
                json!({"id": "a1", "client_id": "c1", "date": "2026-01-03", "duration": 10}),
                json!({"id": "a2", "client_id": "c1", "date": "2026-01-01", "duration": 20}),
                json!({"id": "a3", "client_id": "c2", "date": "2026-01-02", "duration": 30}),
            ],
        );

        let rows = backend
            .execute(
                Query::table("client_activities")
                    .select("*")
                    .eq("client_id", "c1")
                    .order("date", Direction::Ascending),
            )
            .await
            .unwrap()
            .unwrap();
        let ids: Vec<&str> = rows
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["a2", "a1"]);

        let longest = backend
            .execute(
                Query::table("client_activities")
                    .select("id")
                    .gte("duration", 15)
                    .order("duration", Direction::Descending)
                    .limit(1),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(longest, json!([{"id": "a3"}]));
    }

    #[tokio::test]
    async fn single_mode_reports_not_found_for_zero_rows() {
        let backend = MemoryBackend::new();
        let err = backend
            .execute(Query::table("clients").select("*").eq("id", "missing").single())
            .await
            .unwrap_err();
        assert_eq!(err.code.as_deref(), Some(crate::error::NOT_FOUND_CODE));
        assert_eq!(err.details.as_deref(), Some("The result contains 0 rows"));
    }

    #[tokio::test]
    async fn embeds_resolve_to_one_and_to_many_relations() {
        let backend = MemoryBackend::with_fitness_schema();
        backend.seed("training_programs", vec![json!({"id": "p1", "title": "Strength"})]);
        backend.seed(
            "program_exercises",
            vec![json!({"id": "e1", "program_id": "p1", "name": "Squat", "sets": []})],
        );
        backend.seed(
            "workouts",
            vec![json!({"id": "w1", "client_id": "c1", "training_program_id": "p1"})],
        );

        let workout = backend
            .execute(
                Query::table("workouts")
                    .select("*, program:training_program_id (*, exercises:program_exercises (*))")
                    .eq("id", "w1")
                    .single(),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(workout["program"]["title"], "Strength");
        assert_eq!(workout["program"]["exercises"][0]["name"], "Squat");
    }

    #[tokio::test]
    async fn injected_failure_applies_once() {
        let backend = MemoryBackend::new();
        backend.fail_next(
            "body_measurements",
            OperationKind::Insert,
            BackendError::new("23503", "foreign key violation"),
        );

        let query = Query::table("body_measurements").insert(json!({"chest": 100}));
        assert!(backend.execute(query.clone()).await.is_err());
        assert!(backend.execute(query).await.is_ok());
        assert_eq!(backend.rows("body_measurements").len(), 1);
    }

    #[tokio::test]
    async fn update_and_delete_touch_matching_rows_only() {
        let backend = MemoryBackend::new();
        backend.seed(
            "workouts",
            vec![
                json!({"id": "w1", "completed": false}),
                json!({"id": "w2", "completed": false}),
            ],
        );

        let updated = backend
            .execute(
                Query::table("workouts")
                    .update(json!({"completed": true}))
                    .eq("id", "w1")
                    .select("*")
                    .single(),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["completed"], true);

        backend
            .execute(Query::table("workouts").delete().eq("id", "w2"))
            .await
            .unwrap();
        assert_eq!(backend.rows("workouts").len(), 1);
    }
}
