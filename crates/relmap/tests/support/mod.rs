#![allow(dead_code)]

use relmap::schema::{Column, DataMap, Relationship};
use relmap::{Config, Db, Error, Result, Storage, Value};
use relmap_core::{ClassDescriptor, Params, PropertyDescriptor, Row};

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// In-memory storage that records every statement and answers SELECTs from
/// a queue of scripted results.
#[derive(Debug, Clone, Default)]
pub struct RecordingStorage {
    state: Rc<RefCell<State>>,
}

#[derive(Debug, Default)]
struct State {
    statements: Vec<(String, Params)>,
    results: VecDeque<Vec<Row>>,
    rows: Vec<Row>,
    next_id: i64,
    last_insert_id: Value,
    affected: u64,
    begins: usize,
    commits: usize,
    rollbacks: usize,
    fail_on: Option<String>,
}

impl RecordingStorage {
    pub fn new() -> RecordingStorage {
        let storage = RecordingStorage::default();
        storage.state.borrow_mut().next_id = 100;
        storage
    }

    /// Queues the rows returned by the next SELECT.
    pub fn returns(&self, rows: Vec<Row>) -> &RecordingStorage {
        self.state.borrow_mut().results.push_back(rows);
        self
    }

    /// Makes every statement containing `fragment` fail.
    pub fn fail_on(&self, fragment: &str) {
        self.state.borrow_mut().fail_on = Some(fragment.to_string());
    }

    pub fn sql(&self) -> Vec<String> {
        self.state
            .borrow()
            .statements
            .iter()
            .map(|(sql, _)| sql.clone())
            .collect()
    }

    pub fn params(&self, index: usize) -> Params {
        self.state.borrow().statements[index].1.clone()
    }

    pub fn writes(&self) -> Vec<String> {
        self.sql()
            .into_iter()
            .filter(|sql| !sql.starts_with("SELECT"))
            .collect()
    }

    pub fn begins(&self) -> usize {
        self.state.borrow().begins
    }

    pub fn commits(&self) -> usize {
        self.state.borrow().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.state.borrow().rollbacks
    }
}

impl Storage for RecordingStorage {
    fn execute_query(&mut self, sql: &str, params: &Params, _streaming: bool) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        state.statements.push((sql.to_string(), params.clone()));

        if let Some(fragment) = &state.fail_on {
            if sql.contains(fragment.as_str()) {
                return Err(Error::query(format!("refused: {sql}")));
            }
        }

        if sql.starts_with("SELECT") {
            state.rows = state.results.pop_front().unwrap_or_default();
        } else if sql.starts_with("INSERT") {
            state.next_id += 1;
            state.last_insert_id = Value::I64(state.next_id);
            state.affected = 1;
        } else {
            state.affected = 1;
        }
        Ok(())
    }

    fn fetch_results(&mut self) -> Result<Vec<Row>> {
        Ok(std::mem::take(&mut self.state.borrow_mut().rows))
    }

    fn affected_record_count(&self) -> u64 {
        self.state.borrow().affected
    }

    fn last_insert_id(&self) -> Value {
        self.state.borrow().last_insert_id.clone()
    }

    fn begin_transaction(&mut self) -> Result<()> {
        self.state.borrow_mut().begins += 1;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.state.borrow_mut().commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.state.borrow_mut().rollbacks += 1;
        Ok(())
    }
}

pub fn row(json: serde_json::Value) -> Row {
    let serde_json::Value::Object(fields) = json else {
        panic!("rows are JSON objects");
    };
    fields
        .iter()
        .map(|(name, value)| (name.clone(), Value::from_json(value).unwrap()))
        .collect()
}

pub fn classes() -> Vec<ClassDescriptor> {
    vec![
        ClassDescriptor::new("Parent")
            .column("id", Column::named("id").primary_key().auto_increment())
            .scalar("name")
            .relationship("user", Relationship::one_to_one("User")),
        ClassDescriptor::new("User")
            .column("id", Column::named("id").primary_key().auto_increment())
            .scalar("email"),
        ClassDescriptor::new("Contact")
            .column("id", Column::named("id").primary_key().auto_increment())
            .scalar("lastName")
            .relationship(
                "policies",
                Relationship::one_to_many("Policy", "contact")
                    .orphan_removal(true)
                    .cascade_delete(true),
            ),
        ClassDescriptor::new("Policy")
            .column("id", Column::named("id").primary_key().auto_increment())
            .scalar("reference")
            .relationship("contact", Relationship::many_to_one("Contact")),
        ClassDescriptor::new("Post")
            .column("id", Column::named("id").primary_key().auto_increment())
            .scalar("title")
            .relationship("tags", Relationship::many_to_many("Tag")),
        ClassDescriptor::new("Tag")
            .column("id", Column::named("id").primary_key().auto_increment())
            .scalar("name"),
        ClassDescriptor::new("Author")
            .column("id", Column::named("id").primary_key().auto_increment())
            .scalar("name")
            .relationship(
                "articles",
                Relationship::one_to_many("Article", "author").lazy(false),
            ),
        ClassDescriptor::new("Article")
            .column("id", Column::named("id").primary_key().auto_increment())
            .scalar("title")
            .relationship("author", Relationship::many_to_one("Author").lazy(true)),
        ClassDescriptor::new("Account")
            .column("id", Column::named("id").primary_key())
            .scalar("statusId")
            .property(
                PropertyDescriptor::scalar("status")
                    .with_relationship(Relationship::scalar("account_status", "status_id", "id"))
                    .with_column(
                        Column::named("label")
                            .data_map(DataMap::new().entry("A", "Active").entry("I", "Inactive"))
                            .read_only(false),
                    ),
            ),
        ClassDescriptor::new("Customer")
            .column("id", Column::named("id").primary_key().auto_increment())
            .scalar("name")
            .property(
                PropertyDescriptor::object("address", "Address")
                    .with_relationship(Relationship::one_to_one("Address").embedded("address_")),
            ),
        ClassDescriptor::new("Address").scalar("street").scalar("town"),
        ClassDescriptor::new("Member")
            .column("id", Column::named("id").primary_key().auto_increment())
            .scalar("name")
            .scalar("age"),
    ]
}

pub fn db(storage: &RecordingStorage) -> Db {
    db_with(storage, Config::default())
}

pub fn db_with(storage: &RecordingStorage, config: Config) -> Db {
    let mut builder = Db::builder();
    builder.config(config);
    for class in classes() {
        builder.class(class);
    }
    builder.build(storage.clone()).unwrap()
}
