mod support;

use support::{db, row, RecordingStorage};

use pretty_assertions::assert_eq;
use relmap::{FindOptions, Model, Object, Result, Value};
use relmap_core::schema::Column;
use relmap_core::ClassDescriptor;
use serde_json::json;

#[derive(Debug, PartialEq)]
struct Member {
    id: Option<i64>,
    name: String,
    age: i64,
}

impl Model for Member {
    const CLASS: &'static str = "Member";

    fn descriptor() -> ClassDescriptor {
        ClassDescriptor::new("Member")
            .column("id", Column::named("id").primary_key().auto_increment())
            .scalar("name")
            .scalar("age")
    }

    fn load(object: &Object) -> Result<Member> {
        Ok(Member {
            id: object.value("id").as_i64(),
            name: object.value("name").to_string_value()?,
            age: object.value("age").to_i64()?,
        })
    }

    fn store(&self, object: &mut Object) {
        if let Some(id) = self.id {
            object.set("id", id);
        }
        object.set("name", self.name.as_str());
        object.set("age", self.age);
    }
}

#[test]
fn count_selects_only_the_count() {
    let storage = RecordingStorage::new();
    storage.returns(vec![row(json!({ "COUNT(*)": 3 }))]);
    let db = db(&storage);

    let count = db
        .repository("Member")
        .unwrap()
        .count(FindOptions::new().filter(json!({ "name": "Ann" })))
        .unwrap();

    assert_eq!(count, 3);
    assert_eq!(
        storage.sql(),
        vec!["SELECT COUNT(*) FROM `member` WHERE `member`.`name` = :param_1"]
    );
}

#[test]
fn empty_count_is_zero() {
    let storage = RecordingStorage::new();
    let db = db(&storage);

    assert_eq!(db.repository("Member").unwrap().count(FindOptions::new()).unwrap(), 0);
}

#[test]
fn values_of_one_property() {
    let storage = RecordingStorage::new();
    storage.returns(vec![
        row(json!({ "value": "Ann" })),
        row(json!({ "value": "Bob" })),
    ]);
    let db = db(&storage);

    let names = db
        .repository("Member")
        .unwrap()
        .find_values_by("name", FindOptions::new())
        .unwrap();

    assert_eq!(names, vec![Value::from("Ann"), Value::from("Bob")]);
    assert!(storage.sql()[0].starts_with("SELECT `member`.`name` AS `value` FROM `member`"));
}

#[test]
fn values_of_an_unknown_property() {
    let storage = RecordingStorage::new();
    let db = db(&storage);

    let err = db
        .repository("Member")
        .unwrap()
        .find_values_by("nickname", FindOptions::new())
        .unwrap_err();

    assert!(err.is_query());
    assert!(storage.sql().is_empty());
}

#[test]
fn first_value() {
    let storage = RecordingStorage::new();
    storage.returns(vec![row(json!({ "value": 30 }))]);
    let db = db(&storage);

    let age = db
        .repository("Member")
        .unwrap()
        .find_value_by("age", FindOptions::new())
        .unwrap();

    assert_eq!(age, Some(Value::from(30)));
}

#[test]
fn missing_record() {
    let storage = RecordingStorage::new();
    let db = db(&storage);
    let members = db.repository("Member").unwrap();

    assert!(members.find(99).unwrap().is_none());
    assert!(members.get(99).unwrap_err().is_record_not_found());
}

#[test]
fn find_one_reads_a_single_object() {
    let storage = RecordingStorage::new();
    storage.returns(vec![
        row(json!({ "id": 5, "name": "Ann", "age": 30 })),
        row(json!({ "id": 6, "name": "Bob", "age": 41 })),
    ]);
    let db = db(&storage);

    let member = db
        .repository("Member")
        .unwrap()
        .find_one_by(FindOptions::new().order_by("age DESC"))
        .unwrap()
        .unwrap();

    assert_eq!(member.value("name"), Value::from("Ann"));
    assert!(storage.sql()[0].ends_with("LIMIT 1"));
}

#[test]
fn unknown_class() {
    let storage = RecordingStorage::new();
    let db = db(&storage);

    assert!(db.repository("Invoice").is_err());
}

#[test]
fn typed_models() {
    let storage = RecordingStorage::new();
    storage.returns(vec![row(json!({ "id": 5, "name": "Ann", "age": 30 }))]);
    let db = relmap::Db::builder()
        .register::<Member>()
        .build(storage.clone())
        .unwrap();

    let members: Vec<Member> = db.find(FindOptions::new()).unwrap();
    assert_eq!(
        members,
        vec![Member {
            id: Some(5),
            name: "Ann".to_string(),
            age: 30,
        }]
    );

    let created = db
        .create(&Member {
            id: None,
            name: "Bob".to_string(),
            age: 41,
        })
        .unwrap();

    assert_eq!(created.value("id"), Value::from(101));
    assert_eq!(
        storage.sql()[1],
        "INSERT INTO `member` SET `name` = :param_1, `age` = :param_2"
    );
}
