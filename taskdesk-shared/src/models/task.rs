/// Task model, read model and task-specific repository queries
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(200) NOT NULL,
///     description TEXT NOT NULL,
///     due_date TIMESTAMPTZ,
///     status VARCHAR(50) NOT NULL,
///     remarks TEXT NOT NULL,
///     created_on TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_on TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     created_by UUID NOT NULL REFERENCES users(id),
///     updated_by UUID NOT NULL REFERENCES users(id),
///     CONSTRAINT tasks_updated_after_created CHECK (updated_on >= created_on)
/// );
/// ```
///
/// `status` is an open string. [`TaskStatus`] names the values the UI
/// offers, but any non-empty string is stored as given.
///
/// # Search
///
/// [`Repository::search`] matches a case-insensitive, unanchored substring
/// against title, description, remarks and status (`ILIKE '%q%'`). There is
/// no index behind arbitrary substrings, so each search scans the table.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{query_builder::Separated, Postgres, QueryBuilder};
use std::{fmt, str::FromStr};
use uuid::Uuid;
use validator::Validate;

use crate::db::repository::{Entity, Repository};

/// Default page size for searches
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size a caller may ask for
pub const MAX_PAGE_SIZE: u32 = 100;

/// Well-known task statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "InProgress",
            TaskStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
    pub status: String,
    pub remarks: String,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    pub created_by: Uuid,
    pub updated_by: Uuid,
}

impl Task {
    /// Builds a new task owned by `user_id`; creator and last updater coincide
    pub fn new(input: TaskInput, user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            due_date: input.due_date,
            status: input.status,
            remarks: input.remarks,
            created_on: now,
            updated_on: now,
            created_by: user_id,
            updated_by: user_id,
        }
    }

    /// Overwrites the mutable fields and stamps the update
    ///
    /// `created_on` and `created_by` are left alone.
    pub fn apply(&mut self, input: TaskInput, user_id: Uuid, now: DateTime<Utc>) {
        self.title = input.title;
        self.description = input.description;
        self.due_date = input.due_date;
        self.status = input.status;
        self.remarks = input.remarks;
        self.updated_by = user_id;
        self.updated_on = next_update_timestamp(self.updated_on, now);
    }
}

impl Entity for Task {
    const TABLE: &'static str = "tasks";
    const COLUMNS: &'static [&'static str] = &[
        "title",
        "description",
        "due_date",
        "status",
        "remarks",
        "created_on",
        "updated_on",
        "created_by",
        "updated_by",
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn push_values(&self, values: &mut Separated<'_, 'static, Postgres, &'static str>) {
        values.push_bind(self.title.clone());
        values.push_bind(self.description.clone());
        values.push_bind(self.due_date);
        values.push_bind(self.status.clone());
        values.push_bind(self.remarks.clone());
        values.push_bind(self.created_on);
        values.push_bind(self.updated_on);
        values.push_bind(self.created_by);
        values.push_bind(self.updated_by);
    }
}

/// Returns a timestamp strictly after `previous`, normally `now`
///
/// Guards against clock steps and same-microsecond updates so `updated_on`
/// always moves forward.
pub fn next_update_timestamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = previous + Duration::microseconds(1);
    if now >= floor {
        now
    } else {
        floor
    }
}

/// Fields a caller supplies when creating or updating a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    #[validate(length(min = 1, max = 200, message = "Title is required (max 200 characters)"))]
    pub title: String,

    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,

    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,

    #[validate(length(min = 1, max = 50, message = "Status is required (max 50 characters)"))]
    pub status: String,

    #[validate(length(min = 1, message = "Remarks are required"))]
    pub remarks: String,
}

impl TaskInput {
    /// Trims surrounding whitespace so blank fields fail validation
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            due_date: self.due_date,
            status: self.status.trim().to_string(),
            remarks: self.remarks.trim().to_string(),
        }
    }
}

/// Task joined with the names of its creator and last updater
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetails {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
    pub status: String,
    pub remarks: String,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    pub created_by: Uuid,
    pub created_by_name: String,
    pub updated_by: Uuid,
    pub updated_by_name: String,
}

/// Column a search result can be ordered by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskSortField {
    Title,
    DueDate,
    Status,
    #[default]
    CreatedOn,
    UpdatedOn,
}

impl TaskSortField {
    fn column(&self) -> &'static str {
        match self {
            TaskSortField::Title => "t.title",
            TaskSortField::DueDate => "t.due_date",
            TaskSortField::Status => "t.status",
            TaskSortField::CreatedOn => "t.created_on",
            TaskSortField::UpdatedOn => "t.updated_on",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Search parameters, as they arrive on the query string
///
/// Empty values (`?query=&page=`) count as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub query: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub sort_by: Option<TaskSortField>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub sort_dir: Option<SortDirection>,

    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: Option<u32>,

    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(range(min = 1, max = 100, message = "Page size must be between 1 and 100"))]
    pub page_size: Option<u32>,
}

impl TaskFilter {
    /// Trimmed text filter, `None` when blank
    pub fn text(&self) -> Option<&str> {
        self.query.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * i64::from(self.page_size())
    }
}

/// Treats `""` (and whitespace) as a missing value, otherwise parses via `FromStr`
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<T>().map(Some).map_err(serde::de::Error::custom),
    }
}

impl FromStr for TaskSortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(TaskSortField::Title),
            "dueDate" => Ok(TaskSortField::DueDate),
            "status" => Ok(TaskSortField::Status),
            "createdOn" => Ok(TaskSortField::CreatedOn),
            "updatedOn" => Ok(TaskSortField::UpdatedOn),
            other => Err(format!("unknown sort field '{}'", other)),
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction '{}'", other)),
        }
    }
}

/// Escapes LIKE metacharacters so `text` matches literally
///
/// PostgreSQL's default LIKE escape character is the backslash.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `%text%` with metacharacters escaped
pub fn contains_pattern(text: &str) -> String {
    format!("%{}%", escape_like(text))
}

const DETAILS_SELECT: &str = "SELECT t.id, t.title, t.description, t.due_date, t.status, t.remarks, \
     t.created_on, t.updated_on, \
     t.created_by, creator.name AS created_by_name, \
     t.updated_by, updater.name AS updated_by_name \
     FROM tasks t \
     JOIN users creator ON creator.id = t.created_by \
     JOIN users updater ON updater.id = t.updated_by";

fn details_query() -> QueryBuilder<'static, Postgres> {
    QueryBuilder::new(DETAILS_SELECT)
}

/// Builds the search statement for `filter`
pub fn search_query(filter: &TaskFilter) -> QueryBuilder<'static, Postgres> {
    let mut query = details_query();
    let mut has_where = false;

    if let Some(text) = filter.text() {
        let pattern = contains_pattern(text);
        query
            .push(" WHERE (t.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR t.description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR t.remarks ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR t.status ILIKE ")
            .push_bind(pattern)
            .push(")");
        has_where = true;
    }

    if let Some(status) = filter.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query
            .push(if has_where { " AND " } else { " WHERE " })
            .push("t.status = ")
            .push_bind(status.to_string());
    }

    let direction = filter.sort_dir.unwrap_or_default().keyword();
    query
        .push(" ORDER BY ")
        .push(filter.sort_by.unwrap_or_default().column())
        .push(" ")
        .push(direction)
        .push(", t.id ")
        .push(direction)
        .push(" LIMIT ")
        .push_bind(i64::from(filter.page_size()))
        .push(" OFFSET ")
        .push_bind(filter.offset());

    query
}

impl Repository<'_, Task> {
    /// Task with creator/updater names, or `None`
    pub async fn find_details(&mut self, id: Uuid) -> Result<Option<TaskDetails>, sqlx::Error> {
        let mut query = details_query();
        query.push(" WHERE t.id = ").push_bind(id);
        self.fetch_optional_as(query).await
    }

    /// Substring search with optional exact status filter, ordered and paged
    pub async fn search(&mut self, filter: &TaskFilter) -> Result<Vec<TaskDetails>, sqlx::Error> {
        self.fetch_all_as(search_query(filter)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sqlx::Execute;

    fn input() -> TaskInput {
        TaskInput {
            title: "Buy milk".to_string(),
            description: "2%".to_string(),
            due_date: None,
            status: TaskStatus::Pending.to_string(),
            remarks: "urgent".to_string(),
        }
    }

    #[test]
    fn test_new_task_stamps_creator_as_updater() {
        let user = Uuid::new_v4();
        let now = Utc::now();

        let task = Task::new(input(), user, now);

        assert_eq!(task.created_by, user);
        assert_eq!(task.updated_by, user);
        assert_eq!(task.created_on, now);
        assert_eq!(task.updated_on, now);
        assert_eq!(task.status, "Pending");
    }

    #[test]
    fn test_apply_keeps_creation_fields() {
        let creator = Uuid::new_v4();
        let editor = Uuid::new_v4();
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let mut task = Task::new(input(), creator, created);

        let mut changes = input();
        changes.status = TaskStatus::Completed.to_string();
        task.apply(changes, editor, created + Duration::hours(1));

        assert_eq!(task.created_by, creator);
        assert_eq!(task.created_on, created);
        assert_eq!(task.updated_by, editor);
        assert_eq!(task.updated_on, created + Duration::hours(1));
        assert_eq!(task.status, "Completed");
        assert_eq!(task.title, "Buy milk");
    }

    #[test]
    fn test_next_update_timestamp_strictly_advances() {
        let previous = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();

        assert_eq!(
            next_update_timestamp(previous, previous + Duration::seconds(5)),
            previous + Duration::seconds(5)
        );
        // Same instant or a clock that stepped backwards
        assert_eq!(
            next_update_timestamp(previous, previous),
            previous + Duration::microseconds(1)
        );
        assert_eq!(
            next_update_timestamp(previous, previous - Duration::seconds(30)),
            previous + Duration::microseconds(1)
        );
    }

    #[test]
    fn test_input_validation_rejects_blank_fields() {
        assert!(input().normalized().validate().is_ok());

        let mut blank = input();
        blank.title = "   ".to_string();
        blank.remarks = String::new();
        let errors = blank.normalized().validate().unwrap_err();
        let fields = errors.field_errors();

        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("remarks"));
        assert!(!fields.contains_key("description"));
    }

    #[test]
    fn test_input_accepts_open_status() {
        let mut custom = input();
        custom.status = "Blocked".to_string();
        assert!(custom.validate().is_ok());
    }

    #[test]
    fn test_input_deserializes_camel_case() {
        let parsed: TaskInput = serde_json::from_str(
            r#"{"title":"t","description":"d","dueDate":"2025-03-01T00:00:00Z","status":"Pending","remarks":"r"}"#,
        )
        .unwrap();
        assert_eq!(
            parsed.due_date,
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap())
        );

        let without_due: TaskInput =
            serde_json::from_str(r#"{"title":"t","description":"d","status":"Pending","remarks":"r"}"#)
                .unwrap();
        assert!(without_due.due_date.is_none());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("plain"), "plain");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("snake_case"), "snake\\_case");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(contains_pattern("2%"), "%2\\%%");
    }

    #[test]
    fn test_filter_defaults() {
        let filter = TaskFilter::default();

        assert_eq!(filter.page(), 1);
        assert_eq!(filter.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(filter.offset(), 0);
        assert!(filter.text().is_none());
        assert!(filter.validate().is_ok());
    }

    #[test]
    fn test_filter_offset() {
        let filter = TaskFilter {
            page: Some(3),
            page_size: Some(25),
            ..Default::default()
        };
        assert_eq!(filter.offset(), 50);
    }

    #[test]
    fn test_filter_validation_bounds() {
        let zero_page = TaskFilter {
            page: Some(0),
            ..Default::default()
        };
        assert!(zero_page.validate().is_err());

        let huge_page = TaskFilter {
            page_size: Some(MAX_PAGE_SIZE + 1),
            ..Default::default()
        };
        assert!(huge_page.validate().is_err());
    }

    #[test]
    fn test_filter_deserializes_empty_values_as_absent() {
        let filter: TaskFilter = serde_json::from_value(serde_json::json!({
            "query": "",
            "status": " ",
            "page": "",
            "pageSize": "10",
            "sortBy": "dueDate",
            "sortDir": "ASC"
        }))
        .unwrap();

        assert_eq!(filter.query, None);
        assert_eq!(filter.status, None);
        assert_eq!(filter.page, None);
        assert_eq!(filter.page_size, Some(10));
        assert_eq!(filter.sort_by, Some(TaskSortField::DueDate));
        assert_eq!(filter.sort_dir, Some(SortDirection::Asc));
    }

    #[test]
    fn test_filter_rejects_unknown_sort_field() {
        let result: Result<TaskFilter, _> =
            serde_json::from_value(serde_json::json!({ "sortBy": "password_hash" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_search_query_without_filters() {
        let mut query = search_query(&TaskFilter::default());
        let sql = query.build().sql().to_string();

        assert!(!sql.contains("WHERE"));
        assert!(sql.ends_with("ORDER BY t.created_on DESC, t.id DESC LIMIT $1 OFFSET $2"));
    }

    #[test]
    fn test_search_query_text_and_status() {
        let filter = TaskFilter {
            query: Some(" urgent ".to_string()),
            status: Some("Pending".to_string()),
            sort_by: Some(TaskSortField::Title),
            sort_dir: Some(SortDirection::Asc),
            ..Default::default()
        };
        let mut query = search_query(&filter);
        let sql = query.build().sql().to_string();

        assert!(sql.contains(
            "WHERE (t.title ILIKE $1 OR t.description ILIKE $2 OR t.remarks ILIKE $3 OR t.status ILIKE $4)"
        ));
        assert!(sql.contains("AND t.status = $5"));
        assert!(sql.contains("ORDER BY t.title ASC, t.id ASC LIMIT $6 OFFSET $7"));
    }

    #[test]
    fn test_search_query_status_only() {
        let filter = TaskFilter {
            status: Some("Completed".to_string()),
            ..Default::default()
        };
        let mut query = search_query(&filter);
        let sql = query.build().sql().to_string();

        assert!(sql.contains("WHERE t.status = $1"));
        assert!(!sql.contains("ILIKE"));
    }
}
