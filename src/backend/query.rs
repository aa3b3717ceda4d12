use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    fn suffix(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq { column: String, value: String },
    Gte { column: String, value: String },
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Self::Eq { column, .. } | Self::Gte { column, .. } => column,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Self::Eq { value, .. } | Self::Gte { value, .. } => value,
        }
    }

    /// Query-string pair in PostgREST's `column=op.value` form.
    pub fn to_param(&self) -> (String, String) {
        match self {
            Self::Eq { column, value } => (column.clone(), format!("eq.{value}")),
            Self::Gte { column, value } => (column.clone(), format!("gte.{value}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Select,
    Insert(Value),
    Update(Value),
    Delete,
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Select => OperationKind::Select,
            Self::Insert(_) => OperationKind::Insert,
            Self::Update(_) => OperationKind::Update,
            Self::Delete => OperationKind::Delete,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Select,
    Insert,
    Update,
    Delete,
}

/// Table-scoped request against the row store.
///
/// Mirrors the PostgREST client surface: `table(..).select(..).eq(..).order(..)`.
/// On writes, calling `select` asks the backend to return the affected rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub operation: Operation,
    pub columns: Option<String>,
    pub filters: Vec<Filter>,
    pub order: Option<(String, Direction)>,
    pub limit: Option<usize>,
    pub single: bool,
}

impl Query {
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            operation: Operation::Select,
            columns: None,
            filters: Vec::new(),
            order: None,
            limit: None,
            single: false,
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.columns = Some(compact_columns(columns));
        self
    }

    pub fn insert(mut self, row: Value) -> Self {
        self.operation = Operation::Insert(row);
        self
    }

    pub fn update(mut self, patch: Value) -> Self {
        self.operation = Operation::Update(patch);
        self
    }

    pub fn delete(mut self) -> Self {
        self.operation = Operation::Delete;
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push(Filter::Eq {
            column: column.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn gte(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push(Filter::Gte {
            column: column.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.order = Some((column.to_string(), direction));
        self
    }

    pub fn limit(mut self, count: usize) -> Self {
        self.limit = Some(count);
        self
    }

    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    /// Whether the backend is expected to hand rows back.
    pub fn returns_rows(&self) -> bool {
        matches!(self.operation, Operation::Select) || self.columns.is_some()
    }

    pub fn select_list(&self) -> &str {
        self.columns.as_deref().unwrap_or("*")
    }

    pub fn order_param(&self) -> Option<String> {
        self.order
            .as_ref()
            .map(|(column, direction)| format!("{column}.{}", direction.suffix()))
    }
}

/// Strips whitespace outside double quotes, the way PostgREST clients send
/// multi-line embed selects.
pub fn compact_columns(raw: &str) -> String {
    let mut quoted = false;
    raw.chars()
        .filter(|c| {
            if *c == '"' {
                quoted = !quoted;
            }
            quoted || !c.is_whitespace()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn select_compacts_multiline_embeds() {
        let query = Query::table("workouts").select(
            r#"
            *,
            program:training_program_id (
                *,
                exercises:program_exercises (*)
            )
            "#,
        );
        assert_eq!(
            query.select_list(),
            "*,program:training_program_id(*,exercises:program_exercises(*))"
        );
    }

    #[test]
    fn filters_render_as_postgrest_params() {
        let query = Query::table("workouts")
            .eq("client_id", "abc")
            .gte("start_time", "2026-01-01T00:00:00Z")
            .order("start_time", Direction::Ascending)
            .limit(1);

        let params: Vec<(String, String)> = query.filters.iter().map(Filter::to_param).collect();
        assert_eq!(
            params,
            vec![
                ("client_id".to_string(), "eq.abc".to_string()),
                ("start_time".to_string(), "gte.2026-01-01T00:00:00Z".to_string()),
            ]
        );
        assert_eq!(query.order_param().as_deref(), Some("start_time.asc"));
        assert_eq!(query.limit, Some(1));
    }

    #[test]
    fn writes_only_return_rows_when_selected() {
        let bare = Query::table("client_activities").insert(json!({"duration": 10}));
        assert!(!bare.returns_rows());

        let returning = bare.clone().select("*").single();
        assert!(returning.returns_rows());
        assert!(returning.single);
        assert!(Query::table("clients").returns_rows());
    }
}
