mod support;

use support::{db, db_with, row, RecordingStorage};

use pretty_assertions::assert_eq;
use relmap::{Config, Db, FindOptions, Value};
use relmap_core::Row;
use relmap_sql::SelectQueryBuilder;
use serde_json::json;

/// The aliases selected for `class`, each paired with a distinct value.
fn row_for_select(db: &Db, class: &str) -> (String, Row) {
    let collection = db.collection(class).unwrap();
    let options = FindOptions::new();
    let stmt = SelectQueryBuilder::new(&collection, &options, db.handler())
        .build()
        .unwrap();

    let (columns, _) = stmt.sql.split_once(" FROM ").unwrap();
    let row = columns
        .split(" AS `")
        .skip(1)
        .map(|rest| {
            let alias = rest.split('`').next().unwrap();
            (alias.to_string(), Value::from(format!("{alias}-value")))
        })
        .collect();
    (stmt.sql, row)
}

#[test]
fn eager_to_one_is_hydrated_from_the_same_row() {
    let storage = RecordingStorage::new();
    storage.returns(vec![row(json!({
        "id": 1, "name": "A", "user_id": 7, "user_email": "x@y.com",
    }))]);
    let db = db(&storage);

    let parents = db.repository("Parent").unwrap().find_by(FindOptions::new()).unwrap();

    assert_eq!(parents.len(), 1);
    let parent = &parents[0];
    assert_eq!(parent.value("name"), Value::from("A"));
    assert!(!parent.is_new());
    assert!(!parent.is_dirty("name"));
    assert_eq!(parent.stored("user"), Some(&Value::from(7)));

    let user = parent.object("user").unwrap().unwrap();
    assert_eq!(user.class(), "User");
    assert_eq!(user.value("id"), Value::from(7));
    assert_eq!(user.value("email"), Value::from("x@y.com"));
    assert_eq!(storage.sql().len(), 1);
}

#[test]
fn selected_aliases_bind_back_to_the_graph() {
    let storage = RecordingStorage::new();
    let db = db(&storage);
    let (sql, selected) = row_for_select(&db, "Parent");
    assert_eq!(
        selected.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["id", "name", "user_id", "user_email"]
    );
    storage.returns(vec![selected]);

    let parents = db.repository("Parent").unwrap().find_by(FindOptions::new()).unwrap();

    assert_eq!(storage.sql(), vec![sql]);
    let parent = &parents[0];
    assert_eq!(parent.value("id"), Value::from("id-value"));
    assert_eq!(parent.value("name"), Value::from("name-value"));
    assert_eq!(parent.stored("user"), Some(&Value::from("user_id-value")));
    let user = parent.object("user").unwrap().unwrap();
    assert_eq!(user.value("id"), Value::from("user_id-value"));
    assert_eq!(user.value("email"), Value::from("user_email-value"));
}

#[test]
fn embedded_objects_bind_from_prefixed_columns() {
    let storage = RecordingStorage::new();
    let db = db(&storage);
    let (sql, selected) = row_for_select(&db, "Customer");
    assert_eq!(
        sql,
        "SELECT `customer`.`id` AS `id`, `customer`.`name` AS `name`, \
         `customer`.`address_street` AS `address_street`, \
         `customer`.`address_town` AS `address_town` \
         FROM `customer` ORDER BY `customer`.`id` ASC"
    );
    storage.returns(vec![selected]);

    let customers = db.repository("Customer").unwrap().find_by(FindOptions::new()).unwrap();

    let address = customers[0].object("address").unwrap().unwrap();
    assert_eq!(address.class(), "Address");
    assert_eq!(address.value("street"), Value::from("address_street-value"));
    assert_eq!(address.value("town"), Value::from("address_town-value"));
    assert!(!address.is_new());
    assert_eq!(storage.sql().len(), 1);
}

#[test]
fn unmatched_outer_join_leaves_the_relationship_empty() {
    let storage = RecordingStorage::new();
    storage.returns(vec![row(json!({
        "id": 1, "name": "A", "user_id": null, "user_email": null,
    }))]);
    let db = db(&storage);

    let parent = db.repository("Parent").unwrap().get(1).unwrap();
    assert!(parent.object("user").unwrap().is_none());
}

fn author_rows() -> Vec<relmap_core::Row> {
    vec![
        row(json!({ "id": 1, "name": "Ann", "articles_id": 10, "articles_title": "First" })),
        row(json!({ "id": 1, "name": "Ann", "articles_id": 11, "articles_title": "Second" })),
        row(json!({ "id": 2, "name": "Bob", "articles_id": null, "articles_title": null })),
    ]
}

#[test]
fn rows_repeating_a_root_are_folded() {
    let storage = RecordingStorage::new();
    storage.returns(author_rows());
    let db = db(&storage);

    let authors = db.repository("Author").unwrap().find_by(FindOptions::new()).unwrap();

    assert_eq!(authors.len(), 2);
    let titles: Vec<Value> = authors[0]
        .collection("articles")
        .unwrap()
        .iter()
        .map(|article| article.value("title"))
        .collect();
    assert_eq!(titles, vec![Value::from("First"), Value::from("Second")]);
    assert!(authors[1].collection("articles").unwrap().is_empty());
}

#[test]
fn duplicates_are_kept_when_allowed() {
    let storage = RecordingStorage::new();
    storage.returns(author_rows());
    let config = Config::builder().allow_duplicates(true).build().unwrap();
    let db = db_with(&storage, config);

    let authors = db.repository("Author").unwrap().find_by(FindOptions::new()).unwrap();

    assert_eq!(authors.len(), 3);
    assert_eq!(authors[0].collection("articles").unwrap().len(), 1);
    assert_eq!(authors[1].collection("articles").unwrap().len(), 1);
}

#[test]
fn lazy_collection_loads_once() {
    let storage = RecordingStorage::new();
    storage
        .returns(vec![row(json!({ "id": 1, "lastName": "Doe" }))])
        .returns(vec![
            row(json!({ "id": 10, "reference": "P-1", "contact_id": 1, "contact_lastName": "Doe" })),
            row(json!({ "id": 11, "reference": "P-2", "contact_id": 1, "contact_lastName": "Doe" })),
        ]);
    let db = db(&storage);

    let contact = db.repository("Contact").unwrap().get(1).unwrap();
    assert!(!contact.is_loaded("policies"));
    assert_eq!(storage.sql().len(), 1);

    assert_eq!(contact.collection("policies").unwrap().len(), 2);
    assert_eq!(contact.collection("policies").unwrap().len(), 2);
    assert!(contact.is_loaded("policies"));

    let sql = storage.sql();
    assert_eq!(sql.len(), 2);
    assert!(sql[1].starts_with("SELECT"));
    assert!(sql[1].contains("FROM `policy`"));
    assert_eq!(storage.params(1)["param_1"], Value::from(1));
}

#[test]
fn null_owner_key_needs_no_query() {
    let storage = RecordingStorage::new();
    storage.returns(vec![row(json!({ "id": null, "lastName": "Doe" }))]);
    let db = db(&storage);

    let contacts = db.repository("Contact").unwrap().find_by(FindOptions::new()).unwrap();

    assert!(contacts[0].is_loaded("policies"));
    assert!(contacts[0].collection("policies").unwrap().is_empty());
    assert_eq!(storage.sql().len(), 1);
}

#[test]
fn many_to_many_loads_through_the_join_table() {
    let storage = RecordingStorage::new();
    storage
        .returns(vec![row(json!({ "id": 1, "title": "Hello" }))])
        .returns(vec![row(json!({ "tag_id": 3 })), row(json!({ "tag_id": 4 }))])
        .returns(vec![
            row(json!({ "id": 3, "name": "rust" })),
            row(json!({ "id": 4, "name": "orm" })),
        ]);
    let db = db(&storage);

    let post = db.repository("Post").unwrap().get(1).unwrap();
    let names: Vec<Value> = post
        .collection("tags")
        .unwrap()
        .iter()
        .map(|tag| tag.value("name"))
        .collect();

    assert_eq!(names, vec![Value::from("rust"), Value::from("orm")]);

    let sql = storage.sql();
    assert_eq!(
        sql[1],
        "SELECT `tag_id` FROM `post_tag` WHERE `post_id` = :param_1"
    );
    assert!(sql[2].contains("IN (:param_1, :param_2)"));
}

#[test]
fn empty_join_table_skips_the_child_query() {
    let storage = RecordingStorage::new();
    storage
        .returns(vec![row(json!({ "id": 1, "title": "Hello" }))])
        .returns(vec![]);
    let db = db(&storage);

    let post = db.repository("Post").unwrap().get(1).unwrap();
    assert!(post.collection("tags").unwrap().is_empty());
    assert_eq!(storage.sql().len(), 2);
}

#[test]
fn scalar_join_values_are_translated() {
    let storage = RecordingStorage::new();
    storage.returns(vec![row(json!({ "id": 1, "statusId": "A", "status": "A" }))]);
    let db = db(&storage);

    let account = db.repository("Account").unwrap().get(1).unwrap();

    assert_eq!(account.value("statusId"), Value::from("A"));
    assert_eq!(account.value("status"), Value::from("Active"));
}

#[test]
fn rows_bypass_binding() {
    let storage = RecordingStorage::new();
    storage.returns(vec![row(json!({ "id": 5, "name": "Ann", "age": 30 }))]);
    let db = db(&storage);

    let rows = db
        .repository("Member")
        .unwrap()
        .find_rows(FindOptions::new())
        .unwrap();

    assert_eq!(rows, vec![row(json!({ "id": 5, "name": "Ann", "age": 30 }))]);
}
