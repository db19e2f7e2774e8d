//! Issue query language.
//!
//! A query is a list of clauses joined by the literal ` AND `. Each clause
//! is `field op value`, where `op` is one of `=`, `!=`, `~`, `!~`, `>`, `<`,
//! `>=`, `<=`. Quote characters are stripped from values. There is no OR,
//! no parentheses and no precedence.
//!
//! ```text
//! status = "In Progress" AND priority != High
//! assignee = currentUser() AND updated >= -7d
//! title ~ login AND labels = mobile
//! ```
//!
//! [`Query::parse`] is lenient: a clause without an operator becomes a no-op
//! that matches everything, and unknown fields read as empty. Use
//! [`Query::parse_strict`] to reject both.

use std::fmt;

use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::Issue;

/// Comparison operators, in match order (two-character operators first).
const OPERATORS: [(&str, Operator); 8] = [
    ("!=", Operator::Ne),
    ("!~", Operator::NotContains),
    (">=", Operator::Ge),
    ("<=", Operator::Le),
    ("=", Operator::Eq),
    ("~", Operator::Contains),
    (">", Operator::Gt),
    ("<", Operator::Lt),
];

/// A built-in named query.
#[derive(Debug, Clone, Copy)]
pub struct QuickFilter {
    pub id: &'static str,
    pub name: &'static str,
    pub query: &'static str,
}

/// Quick filters available in every database.
pub const QUICK_FILTERS: [QuickFilter; 6] = [
    QuickFilter {
        id: "my-issues",
        name: "My Issues",
        query: "assignee = currentUser()",
    },
    QuickFilter {
        id: "recently-updated",
        name: "Recently Updated",
        query: "updated >= -7d",
    },
    QuickFilter {
        id: "overdue",
        name: "Overdue",
        query: "dueDate < now() AND status != Done",
    },
    QuickFilter {
        id: "high-priority",
        name: "High Priority",
        query: "priority = High",
    },
    QuickFilter {
        id: "bugs",
        name: "Bugs",
        query: "type = Bug",
    },
    QuickFilter {
        id: "unassigned",
        name: "Unassigned",
        query: "assignee = null",
    },
];

/// Find a quick filter by id or display name (case-insensitive).
#[must_use]
pub fn quick_filter(name: &str) -> Option<&'static QuickFilter> {
    QUICK_FILTERS
        .iter()
        .find(|f| f.id.eq_ignore_ascii_case(name) || f.name.eq_ignore_ascii_case(name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Contains,
    NotContains,
    Gt,
    Lt,
    Ge,
    Le,
}

impl Operator {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Contains => "~",
            Self::NotContains => "!~",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
        }
    }

    /// Parse an operator token.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        OPERATORS
            .iter()
            .find(|(token, _)| *token == s.trim())
            .map(|(_, op)| *op)
    }

    const fn is_ordering(self) -> bool {
        matches!(self, Self::Gt | Self::Lt | Self::Ge | Self::Le)
    }

    fn compare_ord(self, ord: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};
        match self {
            Self::Eq => ord == Equal,
            Self::Ne => ord != Equal,
            Self::Gt => ord == Greater,
            Self::Lt => ord == Less,
            Self::Ge => ord != Less,
            Self::Le => ord != Greater,
            Self::Contains | Self::NotContains => false,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Queryable fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Title,
    Description,
    Key,
    Status,
    Priority,
    Type,
    Assignee,
    Reporter,
    Project,
    Created,
    Updated,
    DueDate,
    Labels,
    Components,
    Sprint,
    Epic,
    StoryPoints,
    EstimatedHours,
    LoggedHours,
    /// Reads as the empty string
    Unknown(String),
}

impl Field {
    /// Field names accepted in queries.
    pub const NAMES: [&'static str; 19] = [
        "title",
        "description",
        "key",
        "status",
        "priority",
        "type",
        "assignee",
        "reporter",
        "project",
        "created",
        "updated",
        "dueDate",
        "labels",
        "components",
        "sprint",
        "epic",
        "storyPoints",
        "estimatedHours",
        "loggedHours",
    ];

    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "title" => Self::Title,
            "description" => Self::Description,
            "key" => Self::Key,
            "status" => Self::Status,
            "priority" => Self::Priority,
            "type" => Self::Type,
            "assignee" => Self::Assignee,
            "reporter" => Self::Reporter,
            "project" => Self::Project,
            "created" => Self::Created,
            "updated" => Self::Updated,
            "duedate" => Self::DueDate,
            "labels" | "label" => Self::Labels,
            "components" | "component" => Self::Components,
            "sprint" => Self::Sprint,
            "epic" => Self::Epic,
            "storypoints" => Self::StoryPoints,
            "estimatedhours" => Self::EstimatedHours,
            "loggedhours" => Self::LoggedHours,
            _ => Self::Unknown(name.to_string()),
        }
    }
}

/// The value a record holds for a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(Option<String>),
    Number(Option<f64>),
    List(Vec<String>),
}

/// Anything the query language can be evaluated against.
pub trait Record {
    fn field_value(&self, field: &Field) -> FieldValue;
}

/// Render a Unix-millis timestamp as `YYYY-MM-DD` (UTC).
#[must_use]
pub fn millis_to_date(ms: i64) -> Option<String> {
    chrono::DateTime::from_timestamp_millis(ms).map(|d| d.date_naive().format("%Y-%m-%d").to_string())
}

impl Record for Issue {
    #[allow(clippy::cast_precision_loss)]
    fn field_value(&self, field: &Field) -> FieldValue {
        use FieldValue::{List, Number, Text};
        match field {
            Field::Title => Text(Some(self.title.clone())),
            Field::Description => Text(self.description.clone()),
            Field::Key => Text(Some(self.key.clone())),
            Field::Status => Text(Some(self.status.clone())),
            Field::Priority => Text(Some(self.priority.as_str().to_string())),
            Field::Type => Text(Some(self.issue_type.as_str().to_string())),
            Field::Assignee => Text(self.assignee.clone()),
            Field::Reporter => Text(self.reporter.clone()),
            Field::Project => Text(Some(self.project_key.clone())),
            Field::Created => Text(millis_to_date(self.created_at)),
            Field::Updated => Text(millis_to_date(self.updated_at)),
            Field::DueDate => Text(self.due_date.clone()),
            Field::Labels => List(self.labels.clone()),
            Field::Components => List(self.components.clone()),
            Field::Sprint => Text(self.sprint_name.clone()),
            Field::Epic => Text(self.epic_key.clone()),
            Field::StoryPoints => Number(self.story_points.map(|p| p as f64)),
            Field::EstimatedHours => Number(self.estimated_hours),
            Field::LoggedHours => Number(Some(self.logged_hours)),
            Field::Unknown(_) => Text(Some(String::new())),
        }
    }
}

/// Right-hand side of a clause, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Literal(String),
    /// `currentUser()`
    CurrentUser,
    /// `now()`
    Today,
    /// `-7d`, `+3d`
    RelativeDays(i64),
    /// `null` or `EMPTY`
    Null,
}

impl Value {
    fn parse(raw: &str) -> Self {
        let v = raw.trim();
        if v.eq_ignore_ascii_case("currentuser()") {
            return Self::CurrentUser;
        }
        if v.eq_ignore_ascii_case("now()") {
            return Self::Today;
        }
        if v.eq_ignore_ascii_case("null") || v.eq_ignore_ascii_case("empty") {
            return Self::Null;
        }
        if let Some(days) = parse_relative_days(v) {
            return Self::RelativeDays(days);
        }
        Self::Literal(v.to_string())
    }

    fn resolve(&self, ctx: &EvalContext) -> Option<String> {
        match self {
            Self::Literal(s) => Some(s.clone()),
            Self::CurrentUser => Some(ctx.current_user.clone()),
            Self::Today => Some(ctx.today.format("%Y-%m-%d").to_string()),
            Self::RelativeDays(days) => Some(
                (ctx.today + Duration::days(*days))
                    .format("%Y-%m-%d")
                    .to_string(),
            ),
            Self::Null => None,
        }
    }
}

fn parse_relative_days(v: &str) -> Option<i64> {
    let body = v.strip_suffix(['d', 'D'])?;
    let (sign, digits) = match body.as_bytes().first()? {
        b'-' => (-1, &body[1..]),
        b'+' => (1, &body[1..]),
        _ => return None,
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<i64>().ok().map(|n| sign * n)
}

/// Who is asking and what day it is.
#[derive(Debug, Clone)]
pub struct EvalContext {
    pub current_user: String,
    pub today: NaiveDate,
}

impl EvalContext {
    pub fn new(current_user: impl Into<String>) -> Self {
        Self {
            current_user: current_user.into(),
            today: chrono::Utc::now().date_naive(),
        }
    }

    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }
}

/// One `field op value` comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub field: Field,
    pub op: Operator,
    pub value: Value,
}

impl Clause {
    fn matches(&self, record: &impl Record, ctx: &EvalContext) -> bool {
        let wanted = self.value.resolve(ctx);
        match record.field_value(&self.field) {
            FieldValue::Text(actual) => compare_text(actual.as_deref(), self.op, wanted.as_deref()),
            FieldValue::Number(actual) => compare_number(actual, self.op, wanted.as_deref()),
            FieldValue::List(items) => compare_list(&items, self.op, wanted.as_deref()),
        }
    }
}

fn is_missing(v: Option<&str>) -> bool {
    v.is_none_or(str::is_empty)
}

fn compare_text(actual: Option<&str>, op: Operator, wanted: Option<&str>) -> bool {
    let Some(wanted) = wanted else {
        return match op {
            Operator::Eq => is_missing(actual),
            Operator::Ne => !is_missing(actual),
            _ => false,
        };
    };

    if op.is_ordering() && actual.is_none() {
        return false;
    }
    let actual = actual.unwrap_or("");

    match op {
        Operator::Contains => actual.to_lowercase().contains(&wanted.to_lowercase()),
        Operator::NotContains => !actual.to_lowercase().contains(&wanted.to_lowercase()),
        _ => op.compare_ord(actual.cmp(wanted)),
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

fn compare_number(actual: Option<f64>, op: Operator, wanted: Option<&str>) -> bool {
    let Some(wanted) = wanted else {
        return match op {
            Operator::Eq => actual.is_none(),
            Operator::Ne => actual.is_some(),
            _ => false,
        };
    };

    match (actual, wanted.parse::<f64>()) {
        (Some(a), Ok(w)) if !matches!(op, Operator::Contains | Operator::NotContains) => a
            .partial_cmp(&w)
            .is_some_and(|ord| op.compare_ord(ord)),
        (actual, _) => {
            let text = actual.map(format_number);
            compare_text(text.as_deref(), op, Some(wanted))
        }
    }
}

fn compare_list(items: &[String], op: Operator, wanted: Option<&str>) -> bool {
    let Some(wanted) = wanted else {
        return match op {
            Operator::Eq => items.is_empty(),
            Operator::Ne => !items.is_empty(),
            _ => false,
        };
    };

    if items.is_empty() {
        return compare_text(Some(""), op, Some(wanted));
    }

    match op {
        Operator::Ne => !items.iter().any(|i| i == wanted),
        Operator::NotContains => !items
            .iter()
            .any(|i| i.to_lowercase().contains(&wanted.to_lowercase())),
        _ => items
            .iter()
            .any(|i| compare_text(Some(i), op, Some(wanted))),
    }
}

/// A clause as written, or a no-op for text that did not parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Clause(Clause),
    Noop(String),
}

/// A parsed query.
#[derive(Debug, Clone)]
pub struct Query {
    raw: String,
    conditions: Vec<Condition>,
}

/// Split a clause at its first operator.
fn split_clause(clause: &str) -> Option<(&str, Operator, &str)> {
    for (idx, _) in clause.char_indices() {
        let rest = &clause[idx..];
        if let Some((token, op)) = OPERATORS.iter().find(|(token, _)| rest.starts_with(token)) {
            return Some((&clause[..idx], *op, &clause[idx + token.len()..]));
        }
    }
    None
}

fn strip_quotes(value: &str) -> String {
    value.chars().filter(|c| *c != '"' && *c != '\'').collect()
}

impl Query {
    /// Parse leniently. Never fails.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let conditions = input
            .split(" AND ")
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|text| match split_clause(text) {
                Some((field, op, value)) => Condition::Clause(Clause {
                    field: Field::parse(field.trim()),
                    op,
                    value: Value::parse(&strip_quotes(value)),
                }),
                None => {
                    debug!(clause = text, "Query clause has no operator, ignoring");
                    Condition::Noop(text.to_string())
                }
            })
            .collect();

        Self {
            raw: input.trim().to_string(),
            conditions,
        }
    }

    /// Parse, rejecting clauses without an operator and unknown fields.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` naming the first offending clause.
    pub fn parse_strict(input: &str) -> Result<Self> {
        let query = Self::parse(input);
        let clauses = input
            .split(" AND ")
            .map(str::trim)
            .filter(|c| !c.is_empty());

        for (text, condition) in clauses.zip(&query.conditions) {
            match condition {
                Condition::Noop(_) => {
                    return Err(Error::InvalidQuery {
                        clause: text.to_string(),
                        reason: "expected `field op value`".to_string(),
                    });
                }
                Condition::Clause(Clause {
                    field: Field::Unknown(name),
                    ..
                }) => {
                    return Err(Error::InvalidQuery {
                        clause: text.to_string(),
                        reason: if name.is_empty() {
                            "missing field name".to_string()
                        } else {
                            format!("unknown field '{name}' (known: {})", Field::NAMES.join(", "))
                        },
                    });
                }
                Condition::Clause(_) => {}
            }
        }
        Ok(query)
    }

    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// True when the query has no clauses and therefore matches everything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Evaluate against one record. Every clause must hold.
    pub fn matches(&self, record: &impl Record, ctx: &EvalContext) -> bool {
        self.conditions.iter().all(|c| match c {
            Condition::Clause(clause) => clause.matches(record, ctx),
            Condition::Noop(_) => true,
        })
    }

    /// Keep the records that match, preserving order.
    pub fn filter<'a, T: Record>(&self, records: &'a [T], ctx: &EvalContext) -> Vec<&'a T> {
        records.iter().filter(|r| self.matches(*r, ctx)).collect()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Assemble a query from individual conditions.
///
/// Structured conditions keep their values verbatim: quotes and ` AND `
/// inside a value are data, not syntax. Text added with [`raw`] goes
/// through [`Query::parse`]. The rendered form is `field op "value"`
/// clauses joined by ` AND `.
///
/// [`raw`]: QueryBuilder::raw
#[derive(Debug, Default, Clone)]
pub struct QueryBuilder {
    conditions: Vec<Condition>,
    text: Vec<String>,
}

impl QueryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn condition(mut self, field: &str, op: Operator, value: &str) -> Self {
        self.conditions.push(Condition::Clause(Clause {
            field: Field::parse(field),
            op,
            value: Value::Literal(value.to_string()),
        }));
        self.text.push(format!("{field} {op} \"{value}\""));
        self
    }

    /// Add a condition only when a value is present.
    #[must_use]
    pub fn condition_opt(self, field: &str, op: Operator, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.condition(field, op, v),
            None => self,
        }
    }

    /// Append an already-written query.
    #[must_use]
    pub fn raw(mut self, query: &str) -> Self {
        if !query.trim().is_empty() {
            let parsed = Query::parse(query);
            self.conditions.extend(parsed.conditions);
            self.text.push(parsed.raw);
        }
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// The AND of every condition added so far.
    #[must_use]
    pub fn build(self) -> Query {
        Query {
            raw: self.text.join(" AND "),
            conditions: self.conditions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IssueType, Priority};

    fn ctx() -> EvalContext {
        EvalContext::new("alex").with_today(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
    }

    fn issue(title: &str, status: &str, priority: Priority) -> Issue {
        let mut issue = Issue::new("proj_1".into(), title.into(), status.into());
        issue.key = "MOB-1".into();
        issue.project_key = "MOB".into();
        issue.priority = priority;
        issue
    }

    #[test]
    fn test_exact_status_match() {
        let q = Query::parse("status = \"In Progress\"");
        assert!(q.matches(&issue("a", "In Progress", Priority::Low), &ctx()));
        assert!(!q.matches(&issue("a", "In progress", Priority::Low), &ctx()));
        assert!(!q.matches(&issue("a", "To Do", Priority::Low), &ctx()));
    }

    #[test]
    fn test_not_equal_excludes() {
        let q = Query::parse("priority != High");
        assert!(!q.matches(&issue("a", "To Do", Priority::High), &ctx()));
        assert!(q.matches(&issue("a", "To Do", Priority::Medium), &ctx()));
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let q = Query::parse("title ~ LOGIN");
        assert!(q.matches(&issue("Fix login bug", "To Do", Priority::Low), &ctx()));
        let q = Query::parse("title !~ 'login'");
        assert!(!q.matches(&issue("Fix Login bug", "To Do", Priority::Low), &ctx()));
    }

    #[test]
    fn test_and_requires_all() {
        let q = Query::parse("status = Done AND priority = High");
        assert!(q.matches(&issue("a", "Done", Priority::High), &ctx()));
        assert!(!q.matches(&issue("a", "Done", Priority::Low), &ctx()));
        assert_eq!(q.conditions().len(), 2);
    }

    #[test]
    fn test_two_char_operators_win() {
        let q = Query::parse("storyPoints >= 5");
        match &q.conditions()[0] {
            Condition::Clause(c) => {
                assert_eq!(c.op, Operator::Ge);
                assert_eq!(c.value, Value::Literal("5".into()));
            }
            Condition::Noop(_) => panic!("expected clause"),
        }
    }

    #[test]
    fn test_malformed_clause_is_noop() {
        let q = Query::parse("status Done");
        assert!(matches!(q.conditions()[0], Condition::Noop(_)));
        assert!(q.matches(&issue("a", "To Do", Priority::Low), &ctx()));
        assert!(Query::parse_strict("status Done").is_err());
    }

    #[test]
    fn test_unknown_field_reads_empty() {
        let q = Query::parse("colour = \"\"");
        assert!(q.matches(&issue("a", "To Do", Priority::Low), &ctx()));
        let q = Query::parse("colour = red");
        assert!(!q.matches(&issue("a", "To Do", Priority::Low), &ctx()));
        assert!(matches!(
            Query::parse_strict("colour = red"),
            Err(Error::InvalidQuery { .. })
        ));
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let q = Query::parse("   ");
        assert!(q.is_empty());
        assert!(q.matches(&issue("a", "To Do", Priority::Low), &ctx()));
    }

    #[test]
    fn test_quotes_stripped_everywhere() {
        let q = Query::parse("title = 'it''s'");
        let i = issue("its", "To Do", Priority::Low);
        assert!(q.matches(&i, &ctx()));
    }

    #[test]
    fn test_value_may_contain_operator_chars() {
        let q = Query::parse("title ~ \"a=b\"");
        assert!(q.matches(&issue("x a=b y", "To Do", Priority::Low), &ctx()));
    }

    #[test]
    fn test_current_user_and_null() {
        let mut mine = issue("a", "To Do", Priority::Low);
        mine.assignee = Some("alex".into());
        let nobody = issue("b", "To Do", Priority::Low);

        let q = Query::parse(quick_filter("my-issues").unwrap().query);
        assert!(q.matches(&mine, &ctx()));
        assert!(!q.matches(&nobody, &ctx()));

        let q = Query::parse(quick_filter("Unassigned").unwrap().query);
        assert!(!q.matches(&mine, &ctx()));
        assert!(q.matches(&nobody, &ctx()));
    }

    #[test]
    fn test_overdue_quick_filter() {
        let q = Query::parse(quick_filter("overdue").unwrap().query);

        let mut late = issue("a", "To Do", Priority::Low);
        late.due_date = Some("2025-03-01".into());
        assert!(q.matches(&late, &ctx()));

        let mut finished = late.clone();
        finished.status = "Done".into();
        assert!(!q.matches(&finished, &ctx()));

        let mut future = late.clone();
        future.due_date = Some("2025-04-01".into());
        assert!(!q.matches(&future, &ctx()));

        let undated = issue("b", "To Do", Priority::Low);
        assert!(!q.matches(&undated, &ctx()));
    }

    #[test]
    fn test_relative_dates() {
        let q = Query::parse("updated >= -7d");
        let mut recent = issue("a", "To Do", Priority::Low);
        recent.updated_at = NaiveDate::from_ymd_opt(2025, 3, 5)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp_millis();
        assert!(q.matches(&recent, &ctx()));

        let mut stale = recent.clone();
        stale.updated_at = NaiveDate::from_ymd_opt(2025, 2, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp_millis();
        assert!(!q.matches(&stale, &ctx()));
    }

    #[test]
    fn test_relative_days_parsing() {
        assert_eq!(parse_relative_days("-7d"), Some(-7));
        assert_eq!(parse_relative_days("+14D"), Some(14));
        assert_eq!(parse_relative_days("7d"), None);
        assert_eq!(parse_relative_days("-d"), None);
        assert_eq!(parse_relative_days("-7x"), None);
    }

    #[test]
    fn test_numeric_fields_compare_numerically() {
        let mut big = issue("a", "To Do", Priority::Low);
        big.story_points = Some(13);
        let mut small = issue("b", "To Do", Priority::Low);
        small.story_points = Some(3);

        let q = Query::parse("storyPoints > 5");
        assert!(q.matches(&big, &ctx()));
        assert!(!q.matches(&small, &ctx()));

        let unestimated = issue("c", "To Do", Priority::Low);
        assert!(!q.matches(&unestimated, &ctx()));
        assert!(Query::parse("storyPoints = null").matches(&unestimated, &ctx()));
    }

    #[test]
    fn test_list_fields_match_any() {
        let mut i = issue("a", "To Do", Priority::Low);
        i.labels = vec!["mobile".into(), "auth".into()];

        assert!(Query::parse("labels = auth").matches(&i, &ctx()));
        assert!(!Query::parse("labels != auth").matches(&i, &ctx()));
        assert!(Query::parse("labels ~ MOB").matches(&i, &ctx()));
        assert!(Query::parse("components = null").matches(&i, &ctx()));
    }

    #[test]
    fn test_type_and_project_fields() {
        let mut i = issue("a", "To Do", Priority::Low);
        i.issue_type = IssueType::Bug;
        assert!(Query::parse(quick_filter("bugs").unwrap().query).matches(&i, &ctx()));
        assert!(Query::parse("project = MOB AND key ~ mob-").matches(&i, &ctx()));
    }

    #[test]
    fn test_filter_preserves_order() {
        let issues = vec![
            issue("one", "Done", Priority::High),
            issue("two", "To Do", Priority::High),
            issue("three", "Done", Priority::Low),
        ];
        let q = Query::parse("status = Done");
        let titles: Vec<_> = q.filter(&issues, &ctx()).iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["one", "three"]);
    }

    #[test]
    fn test_builder_output_round_trips() {
        let built = QueryBuilder::new()
            .condition("status", Operator::Eq, "In Progress")
            .condition_opt("assignee", Operator::Eq, None)
            .condition("priority", Operator::Ne, "Low")
            .build();
        assert_eq!(built.to_string(), "status = \"In Progress\" AND priority != \"Low\"");
        assert!(built.matches(&issue("a", "In Progress", Priority::High), &ctx()));

        let reparsed = Query::parse_strict(&built.to_string()).unwrap();
        assert_eq!(reparsed.conditions(), built.conditions());
    }

    #[test]
    fn test_builder_values_are_verbatim() {
        let mut obrien = issue("a", "To Do", Priority::Medium);
        obrien.assignee = Some("O'Brien".into());
        let mut other = issue("b", "To Do", Priority::Medium);
        other.assignee = Some("OBrien".into());

        let query = QueryBuilder::new()
            .condition("assignee", Operator::Eq, "O'Brien")
            .raw("status = \"To Do\"")
            .build();
        assert_eq!(query.conditions().len(), 2);
        assert!(query.matches(&obrien, &ctx()));
        assert!(!query.matches(&other, &ctx()));

        // ` AND ` inside a value stays one clause
        let query = QueryBuilder::new()
            .condition("title", Operator::Eq, "Design AND Build")
            .build();
        assert_eq!(query.conditions().len(), 1);
        assert!(query.matches(&issue("Design AND Build", "To Do", Priority::Low), &ctx()));
    }

    #[test]
    fn test_quick_filters_parse_strictly() {
        for f in &QUICK_FILTERS {
            Query::parse_strict(f.query).unwrap();
        }
    }

    #[test]
    fn test_operator_parse() {
        assert_eq!(Operator::parse("!~"), Some(Operator::NotContains));
        assert_eq!(Operator::parse(" <= "), Some(Operator::Le));
        assert_eq!(Operator::parse("=="), None);
    }
}
