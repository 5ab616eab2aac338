//! Test models and an in-memory recording engine.

use parking_lot::Mutex;
use serde_json::{Value, json};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, FilterValue};
use crate::query::SelectQuery;
use crate::relations::RelationRegistry;
use crate::schema::ScopeRegistry;
use crate::traits::{BoxFuture, Model, QueryEngine};
use crate::types::{Row, SortOrder};

pub(crate) struct Address;
pub(crate) struct Place;
pub(crate) struct User;
pub(crate) struct Thing;
pub(crate) struct Tag;
pub(crate) struct Foo;

impl Model for Address {
    const MODEL_NAME: &'static str = "Address";
    const TABLE_NAME: &'static str = "addresses";

    fn relations(relations: &mut RelationRegistry) {
        relations.has_many::<Place>("places");
    }
}

impl Model for Place {
    const MODEL_NAME: &'static str = "Place";
    const TABLE_NAME: &'static str = "places";

    fn relations(relations: &mut RelationRegistry) {
        relations.belongs_to::<Address>("address");
        relations.has_many::<User>("users");
    }
}

impl Model for User {
    const MODEL_NAME: &'static str = "User";
    const TABLE_NAME: &'static str = "users";

    fn relations(relations: &mut RelationRegistry) {
        relations.belongs_to::<Place>("place");
        relations.has_many::<Thing>("things");
        relations.belongs_to_many::<Tag>("tags");
    }
}

impl Model for Thing {
    const MODEL_NAME: &'static str = "Thing";
    const TABLE_NAME: &'static str = "things";

    fn relations(relations: &mut RelationRegistry) {
        relations.belongs_to::<User>("user");
    }
}

impl Model for Tag {
    const MODEL_NAME: &'static str = "Tag";
    const TABLE_NAME: &'static str = "tags";

    fn relations(relations: &mut RelationRegistry) {
        relations.belongs_to_many::<User>("users");
    }
}

fn first_one(query: SelectQuery, _args: &[FilterValue]) -> SelectQuery {
    query.limit(1)
}

fn last_few(query: SelectQuery, args: &[FilterValue]) -> SelectQuery {
    let amount = match args.first() {
        Some(FilterValue::Int(n)) => *n as u64,
        _ => 3,
    };
    query.order_by("id", SortOrder::Desc).limit(amount)
}

impl Model for Foo {
    const MODEL_NAME: &'static str = "Foo";
    const TABLE_NAME: &'static str = "foos";

    fn scopes(scopes: &mut ScopeRegistry) {
        scopes.register("first_one", first_one);
        scopes.register("last_few", last_few);
    }
}

/// Engine over in-memory tables that records every request it serves.
///
/// Log entries read `select users`, `insert things {name, user_id}`,
/// `update users {name}` and `delete things`.
#[derive(Default)]
pub(crate) struct MockEngine {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    log: Mutex<Vec<String>>,
    selects: Mutex<Vec<SelectQuery>>,
    failing: Mutex<HashSet<String>>,
}

impl MockEngine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn seed(&self, table: &str, rows: Value) {
        let rows: Vec<Row> = serde_json::from_value(rows).expect("seed rows");
        self.tables.lock().insert(table.to_string(), rows);
    }

    pub(crate) fn fail_on(&self, table: &str) {
        self.failing.lock().insert(table.to_string());
    }

    pub(crate) fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub(crate) fn clear_log(&self) {
        self.log.lock().clear();
        self.selects.lock().clear();
    }

    /// Number of log entries for `prefix`, e.g. `"insert"` or `"select users"`.
    pub(crate) fn count_of(&self, prefix: &str) -> usize {
        self.log
            .lock()
            .iter()
            .filter(|entry| {
                entry.as_str() == prefix
                    || entry
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with(' '))
            })
            .count()
    }

    pub(crate) fn last_select(&self, table: &str) -> SelectQuery {
        self.selects
            .lock()
            .iter()
            .rev()
            .find(|query| query.table == table)
            .cloned()
            .expect("no select recorded for table")
    }

    fn record(&self, entry: String, table: &str) -> QueryResult<()> {
        self.log.lock().push(entry);
        if self.failing.lock().contains(table) {
            return Err(QueryError::database(format!("table {} is unavailable", table)));
        }
        Ok(())
    }

    fn run_select(&self, query: &SelectQuery) -> QueryResult<Vec<Row>> {
        self.selects.lock().push(query.clone());
        self.record(format!("select {}", query.table), &query.table)?;

        let tables = self.tables.lock();
        let mut rows: Vec<Row> = tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches(&query.filter, row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        rows.sort_by(|a, b| {
            query
                .order_by
                .iter()
                .map(|field| {
                    let ordering = compare(
                        a.get(&field.column).unwrap_or(&Value::Null),
                        b.get(&field.column).unwrap_or(&Value::Null),
                    );
                    match field.order {
                        SortOrder::Asc => ordering,
                        SortOrder::Desc => ordering.reverse(),
                    }
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });

        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map_or(usize::MAX, |n| n as usize);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    fn run_insert(&self, table: &str, values: &Row, key_column: &str) -> QueryResult<Value> {
        let columns: Vec<&str> = values.keys().map(String::as_str).collect();
        self.record(format!("insert {} {{{}}}", table, columns.join(", ")), table)?;

        let mut tables = self.tables.lock();
        let rows = tables.entry(table.to_string()).or_default();
        let key = match values.get(key_column).filter(|v| !v.is_null()) {
            Some(key) => key.clone(),
            None => {
                let max = rows
                    .iter()
                    .filter_map(|row| row.get(key_column).and_then(Value::as_i64))
                    .max()
                    .unwrap_or(0);
                json!(max + 1)
            }
        };

        let mut row = values.clone();
        row.insert(key_column.to_string(), key.clone());
        rows.push(row);
        Ok(key)
    }

    fn run_update(&self, table: &str, values: &Row, filter: &Filter) -> QueryResult<u64> {
        let columns: Vec<&str> = values.keys().map(String::as_str).collect();
        self.record(format!("update {} {{{}}}", table, columns.join(", ")), table)?;

        let mut tables = self.tables.lock();
        let mut count = 0;
        for row in tables.get_mut(table).into_iter().flatten() {
            if matches(filter, row) {
                for (column, value) in values {
                    row.insert(column.clone(), value.clone());
                }
                count += 1;
            }
        }
        Ok(count)
    }

    fn run_delete(&self, table: &str, filter: &Filter) -> QueryResult<u64> {
        self.record(format!("delete {}", table), table)?;

        let mut tables = self.tables.lock();
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| !matches(filter, row));
        Ok((before - rows.len()) as u64)
    }
}

impl QueryEngine for MockEngine {
    fn select<'a>(&'a self, query: &'a SelectQuery) -> BoxFuture<'a, QueryResult<Vec<Row>>> {
        Box::pin(async move { self.run_select(query) })
    }

    fn insert<'a>(
        &'a self,
        table: &'a str,
        values: &'a Row,
        key_column: &'a str,
    ) -> BoxFuture<'a, QueryResult<Value>> {
        Box::pin(async move { self.run_insert(table, values, key_column) })
    }

    fn update<'a>(
        &'a self,
        table: &'a str,
        values: &'a Row,
        filter: &'a Filter,
    ) -> BoxFuture<'a, QueryResult<u64>> {
        Box::pin(async move { self.run_update(table, values, filter) })
    }

    fn delete<'a>(&'a self, table: &'a str, filter: &'a Filter) -> BoxFuture<'a, QueryResult<u64>> {
        Box::pin(async move { self.run_delete(table, filter) })
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Compares like a store with type affinity: numeric text against a number
/// compares as a number, other mixed types order by kind.
fn compare(a: &Value, b: &Value) -> Ordering {
    let numbers = |x: Option<f64>, y: Option<f64>| x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers(x.as_f64(), y.as_f64()),
        (Value::Number(x), Value::String(y)) => match y.parse::<f64>() {
            Ok(y) => numbers(x.as_f64(), Some(y)),
            Err(_) => Ordering::Less,
        },
        (Value::String(_), Value::Number(_)) => compare(b, a).reverse(),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn equal(value: Option<&Value>, expected: &FilterValue) -> bool {
    match value {
        Some(value) if !value.is_null() => compare(value, &expected.to_json()).is_eq(),
        _ => false,
    }
}

fn matches(filter: &Filter, row: &Row) -> bool {
    let cell = |column: &str| row.get(column).filter(|v| !v.is_null());
    let ordered = |column: &str, value: &FilterValue, accept: fn(Ordering) -> bool| {
        cell(column).is_some_and(|v| accept(compare(v, &value.to_json())))
    };

    match filter {
        Filter::None => true,
        Filter::Equals(column, value) if value.is_null() => cell(column).is_none(),
        Filter::Equals(column, value) => equal(row.get(column), value),
        Filter::NotEquals(column, value) if value.is_null() => cell(column).is_some(),
        Filter::NotEquals(column, value) => {
            cell(column).is_some() && !equal(row.get(column), value)
        }
        Filter::Lt(column, value) => ordered(column, value, Ordering::is_lt),
        Filter::Lte(column, value) => ordered(column, value, Ordering::is_le),
        Filter::Gt(column, value) => ordered(column, value, Ordering::is_gt),
        Filter::Gte(column, value) => ordered(column, value, Ordering::is_ge),
        Filter::In(column, values) => values.iter().any(|v| equal(row.get(column), v)),
        Filter::IsNull(column) => cell(column).is_none(),
        Filter::IsNotNull(column) => cell(column).is_some(),
        Filter::And(filters) => filters.iter().all(|f| matches(f, row)),
        Filter::Or(filters) => filters.iter().any(|f| matches(f, row)),
        Filter::Not(inner) => !matches(inner, row),
    }
}

/// A mock engine holding the fixture data the tests share.
pub(crate) fn seeded() -> MockEngine {
    let engine = MockEngine::new();
    engine.seed(
        "addresses",
        json!([
            { "id": 1, "street": "Peschanaya" },
            { "id": 2, "street": "Khreschatyk" }
        ]),
    );
    engine.seed(
        "places",
        json!([
            { "id": 1, "name": "Home", "address_id": 1 },
            { "id": 2, "name": "Work", "address_id": 2 }
        ]),
    );
    engine.seed(
        "users",
        json!([
            { "id": 1, "name": "John Doe", "place_id": 1 },
            { "id": 2, "name": "Bob Marley", "place_id": 1 },
            { "id": 3, "name": "Billy", "place_id": 2 }
        ]),
    );
    engine.seed(
        "things",
        json!([
            { "id": 1, "name": "Book", "user_id": 1 },
            { "id": 2, "name": "Pen", "user_id": 1 },
            { "id": 3, "name": "Phone", "user_id": 2 }
        ]),
    );
    engine.seed(
        "tags",
        json!([
            { "id": 1, "name": "music" },
            { "id": 2, "name": "travel" }
        ]),
    );
    engine.seed(
        "tags_users",
        json!([
            { "user_id": 1, "tag_id": 2 },
            { "user_id": 2, "tag_id": 1 },
            { "user_id": 1, "tag_id": 1 }
        ]),
    );
    engine.seed(
        "foos",
        json!([{ "id": 1 }, { "id": 2 }, { "id": 3 }, { "id": 4 }, { "id": 5 }]),
    );
    engine
}
