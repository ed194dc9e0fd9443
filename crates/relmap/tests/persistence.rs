mod support;

use support::{db, db_with, row, RecordingStorage};

use pretty_assertions::assert_eq;
use relmap::{Config, DeleteOptions, Object, SaveOptions, Value};
use serde_json::json;

fn policy_rows() -> Vec<relmap_core::Row> {
    vec![
        row(json!({ "id": 10, "reference": "P-1", "contact_id": 1, "contact_lastName": "Doe" })),
        row(json!({ "id": 11, "reference": "P-2", "contact_id": 1, "contact_lastName": "Doe" })),
    ]
}

#[test]
fn owning_child_is_inserted_first() {
    let storage = RecordingStorage::new();
    let db = db(&storage);

    let contact = Object::new("Contact").with("lastName", "Doe");
    let mut policy = Object::new("Policy")
        .with("reference", "P-1")
        .with_object("contact", contact);

    db.repository("Policy")
        .unwrap()
        .save(&mut policy, SaveOptions::default())
        .unwrap();

    assert_eq!(
        storage.sql(),
        vec![
            "INSERT INTO `contact` SET `last_name` = :param_1",
            "INSERT INTO `policy` SET `reference` = :param_1, `contact_id` = :param_2",
        ]
    );
    assert_eq!(storage.params(1)["param_2"], Value::from(101));

    assert_eq!(policy.value("id"), Value::from(102));
    assert_eq!(policy.stored("contact"), Some(&Value::from(101)));
    assert!(!policy.is_new());
    assert_eq!(
        policy.object("contact").unwrap().unwrap().value("id"),
        Value::from(101)
    );
    assert_eq!((storage.begins(), storage.commits()), (1, 1));
}

#[test]
fn children_are_not_saved_when_disabled() {
    let storage = RecordingStorage::new();
    let db = db(&storage);

    let contact = Object::new("Contact").with("id", 4).with("lastName", "Doe");
    let mut policy = Object::new("Policy")
        .with("reference", "P-1")
        .with_object("contact", contact);

    db.repository("Policy")
        .unwrap()
        .save(&mut policy, SaveOptions::new().save_children(false))
        .unwrap();

    assert_eq!(
        storage.sql(),
        vec!["INSERT INTO `policy` SET `reference` = :param_1, `contact_id` = :param_2"]
    );
    assert_eq!(storage.params(0)["param_2"], Value::from(4));
}

#[test]
fn update_writes_changed_columns_only() {
    let storage = RecordingStorage::new();
    storage.returns(vec![row(json!({ "id": 5, "name": "Ann", "age": 30 }))]);
    let db = db(&storage);
    let members = db.repository("Member").unwrap();

    let mut member = members.get(5).unwrap();
    members.save(&mut member, SaveOptions::default()).unwrap();
    assert_eq!(storage.sql().len(), 1);

    member.set("age", 31);
    members.save(&mut member, SaveOptions::default()).unwrap();

    assert_eq!(
        storage.writes(),
        vec!["UPDATE `member` SET `age` = :param_1 WHERE `member`.`id` = :param_2"]
    );
    assert_eq!(storage.params(1)["param_1"], Value::from(31));
    assert_eq!(storage.params(1)["param_2"], Value::from(5));
    assert!(!member.is_dirty("age"));
}

#[test]
fn replace_upserts_the_row() {
    let storage = RecordingStorage::new();
    let db = db(&storage);

    let mut member = Object::new("Member").with("id", 5).with("name", "Ann");
    db.repository("Member")
        .unwrap()
        .save(&mut member, SaveOptions::new().replace())
        .unwrap();

    assert_eq!(
        storage.sql(),
        vec![
            "INSERT INTO `member` SET `id` = :param_1, `name` = :param_2 \
             ON DUPLICATE KEY UPDATE `id` = :param_1, `name` = :param_2"
        ]
    );
    assert_eq!(member.value("id"), Value::from(5));
}

#[test]
fn removed_children_are_deleted_as_orphans() {
    let storage = RecordingStorage::new();
    storage
        .returns(vec![row(json!({ "id": 1, "lastName": "Doe" }))])
        .returns(policy_rows())
        .returns(policy_rows());
    let db = db(&storage);
    let contacts = db.repository("Contact").unwrap();

    let mut contact = contacts.get(1).unwrap();
    contact
        .collection_mut("policies")
        .unwrap()
        .retain(|policy| policy.value("id") != Value::from(11));
    contacts.save(&mut contact, SaveOptions::default()).unwrap();

    assert_eq!(
        storage.writes(),
        vec!["DELETE FROM `policy` WHERE `id` = :param_1"]
    );
    assert_eq!(storage.params(3)["param_1"], Value::from(11));
}

#[test]
fn removed_children_are_detached_when_entities_are_kept() {
    let storage = RecordingStorage::new();
    storage
        .returns(vec![row(json!({ "id": 1, "lastName": "Doe" }))])
        .returns(policy_rows())
        .returns(policy_rows());
    let db = db(&storage);
    let contacts = db.repository("Contact").unwrap();

    let mut contact = contacts.get(1).unwrap();
    contact
        .collection_mut("policies")
        .unwrap()
        .retain(|policy| policy.value("id") != Value::from(11));
    contacts
        .save(&mut contact, SaveOptions::new().delete_entities(false))
        .unwrap();

    assert_eq!(
        storage.writes(),
        vec!["UPDATE `policy` SET `contact_id` = :param_1 WHERE `policy`.`id` = :param_2"]
    );
    assert_eq!(storage.params(3)["param_1"], Value::Null);
    assert_eq!(storage.params(3)["param_2"], Value::from(11));
}

#[test]
fn unloaded_children_are_left_alone() {
    let storage = RecordingStorage::new();
    storage.returns(vec![row(json!({ "id": 1, "lastName": "Doe" }))]);
    let db = db(&storage);
    let contacts = db.repository("Contact").unwrap();

    let mut contact = contacts.get(1).unwrap();
    contact.set("lastName", "Roe");
    contacts.save(&mut contact, SaveOptions::default()).unwrap();

    assert_eq!(
        storage.sql()[1..].to_vec(),
        vec!["UPDATE `contact` SET `last_name` = :param_1 WHERE `contact`.`id` = :param_2"]
    );
}

#[test]
fn new_many_to_many_children_are_linked() {
    let storage = RecordingStorage::new();
    let db = db(&storage);

    let mut post = Object::new("Post")
        .with("title", "Hello")
        .with_collection("tags", vec![Object::new("Tag").with("name", "rust")]);
    db.repository("Post")
        .unwrap()
        .save(&mut post, SaveOptions::default())
        .unwrap();

    assert_eq!(
        storage.sql(),
        vec![
            "INSERT INTO `post` SET `title` = :param_1",
            "INSERT INTO `tag` SET `name` = :param_1",
            "INSERT INTO `post_tag` SET `post_id` = :param_1, `tag_id` = :param_2 \
             ON DUPLICATE KEY UPDATE `post_id` = :param_1, `tag_id` = :param_2",
        ]
    );
    assert_eq!(storage.params(2)["param_1"], Value::from(101));
    assert_eq!(storage.params(2)["param_2"], Value::from(102));
}

#[test]
fn removed_many_to_many_children_are_unlinked() {
    let storage = RecordingStorage::new();
    storage
        .returns(vec![row(json!({ "id": 1, "title": "Hello" }))])
        .returns(vec![row(json!({ "tag_id": 3 })), row(json!({ "tag_id": 4 }))])
        .returns(vec![
            row(json!({ "id": 3, "name": "rust" })),
            row(json!({ "id": 4, "name": "orm" })),
        ])
        .returns(vec![row(json!({ "tag_id": 3 })), row(json!({ "tag_id": 4 }))]);
    let db = db(&storage);
    let posts = db.repository("Post").unwrap();

    let mut post = posts.get(1).unwrap();
    post.collection_mut("tags")
        .unwrap()
        .retain(|tag| tag.value("id") == Value::from(3));
    posts.save(&mut post, SaveOptions::default()).unwrap();

    assert_eq!(
        storage.writes(),
        vec!["DELETE FROM `post_tag` WHERE `post_id` = :param_1 AND `tag_id` = :param_2"]
    );
    assert_eq!(storage.params(4)["param_2"], Value::from(4));
}

#[test]
fn links_read_back_as_strings_are_kept() {
    let storage = RecordingStorage::new();
    storage
        .returns(vec![row(json!({ "id": 1, "title": "Hello" }))])
        .returns(vec![row(json!({ "tag_id": "3" }))])
        .returns(vec![row(json!({ "id": 3, "name": "rust" }))])
        .returns(vec![row(json!({ "tag_id": "3" }))]);
    let db = db(&storage);
    let posts = db.repository("Post").unwrap();

    let mut post = posts.get(1).unwrap();
    assert_eq!(post.collection("tags").unwrap().len(), 1);
    posts.save(&mut post, SaveOptions::default()).unwrap();

    assert!(storage.writes().is_empty());
}

#[test]
fn writable_scalar_join_is_upserted() {
    let storage = RecordingStorage::new();
    storage.returns(vec![row(json!({ "id": 1, "statusId": "A", "status": "A" }))]);
    let db = db(&storage);
    let accounts = db.repository("Account").unwrap();

    let mut account = accounts.get(1).unwrap();
    account.set("status", "Inactive");
    accounts.save(&mut account, SaveOptions::default()).unwrap();

    assert_eq!(
        storage.writes(),
        vec![
            "INSERT INTO `account_status` SET `id` = :param_1, `label` = :param_2 \
             ON DUPLICATE KEY UPDATE `id` = :param_1, `label` = :param_2"
        ]
    );
    assert_eq!(storage.params(1)["param_1"], Value::from("A"));
    assert_eq!(storage.params(1)["param_2"], Value::from("I"));
}

#[test]
fn embedded_columns_are_written_with_the_parent_row() {
    let storage = RecordingStorage::new();
    let db = db(&storage);

    let address = Object::new("Address").with("street", "Main St").with("town", "Leeds");
    let mut customer = Object::new("Customer")
        .with("name", "Acme")
        .with_object("address", address);
    db.repository("Customer")
        .unwrap()
        .save(&mut customer, SaveOptions::default())
        .unwrap();

    assert_eq!(
        storage.sql(),
        vec!["INSERT INTO `customer` SET `name` = :param_1, `address_street` = :param_2, `address_town` = :param_3"]
    );
    assert_eq!(storage.params(0)["param_3"], Value::from("Leeds"));
    assert_eq!(customer.value("id"), Value::from(101));
    assert!(!customer.object("address").unwrap().unwrap().is_new());
}

#[test]
fn changed_embedded_columns_update_the_parent_row() {
    let storage = RecordingStorage::new();
    storage.returns(vec![row(json!({
        "id": 1, "name": "Acme", "address_street": "Main St", "address_town": "Leeds",
    }))]);
    let db = db(&storage);
    let customers = db.repository("Customer").unwrap();

    let mut customer = customers.get(1).unwrap();
    customer
        .object_mut("address")
        .unwrap()
        .unwrap()
        .set("town", "York");
    customers.save(&mut customer, SaveOptions::default()).unwrap();

    assert_eq!(
        storage.writes(),
        vec!["UPDATE `customer` SET `address_town` = :param_1 WHERE `customer`.`id` = :param_2"]
    );
    assert_eq!(storage.params(1)["param_1"], Value::from("York"));
    assert_eq!(storage.params(1)["param_2"], Value::from(1));

    customers.save(&mut customer, SaveOptions::default()).unwrap();
    assert_eq!(storage.writes().len(), 1);
}

#[test]
fn objects_without_a_key_are_not_deleted() {
    let storage = RecordingStorage::new();
    let db = db(&storage);

    let member = Object::new("Member").with("name", "Ann");
    let deleted = db
        .repository("Member")
        .unwrap()
        .delete(&member, DeleteOptions::default())
        .unwrap();

    assert!(!deleted);
    assert!(storage.sql().is_empty());
}

#[test]
fn delete_cascades_to_children_first() {
    let storage = RecordingStorage::new();
    storage
        .returns(vec![row(json!({ "id": 1, "lastName": "Doe" }))])
        .returns(policy_rows());
    let db = db(&storage);
    let contacts = db.repository("Contact").unwrap();

    let contact = contacts.get(1).unwrap();
    assert!(contacts.delete(&contact, DeleteOptions::default()).unwrap());

    assert_eq!(
        storage.writes(),
        vec![
            "DELETE FROM `policy` WHERE `id` = :param_1",
            "DELETE FROM `policy` WHERE `id` = :param_1",
            "DELETE FROM `contact` WHERE `id` = :param_1",
        ]
    );
    assert_eq!(storage.params(2)["param_1"], Value::from(10));
    assert_eq!(storage.params(3)["param_1"], Value::from(11));
}

#[test]
fn delete_without_cascade_removes_only_the_row() {
    let storage = RecordingStorage::new();
    storage.returns(vec![row(json!({ "id": 1, "lastName": "Doe" }))]);
    let db = db(&storage);
    let contacts = db.repository("Contact").unwrap();

    let contact = contacts.get(1).unwrap();
    contacts
        .delete(&contact, DeleteOptions::new().cascade(false))
        .unwrap();

    assert_eq!(storage.writes(), vec!["DELETE FROM `contact` WHERE `id` = :param_1"]);
}

#[test]
fn entity_deletion_can_be_disabled() {
    let storage = RecordingStorage::new();
    storage.returns(vec![row(json!({ "id": 1, "lastName": "Doe" }))]);
    let config = Config::builder().disable_delete_entities(true).build().unwrap();
    let db = db_with(&storage, config);
    let contacts = db.repository("Contact").unwrap();

    let contact = contacts.get(1).unwrap();
    assert!(!contacts.delete(&contact, DeleteOptions::default()).unwrap());
    assert!(storage.writes().is_empty());

    assert!(contacts
        .delete(&contact, DeleteOptions::new().cascade(false).delete_entities(true))
        .unwrap());
    assert_eq!(storage.writes(), vec!["DELETE FROM `contact` WHERE `id` = :param_1"]);
}

#[test]
fn delete_options_skip_entity_deletion() {
    let storage = RecordingStorage::new();
    storage.returns(vec![row(json!({ "id": 1, "lastName": "Doe" }))]);
    let db = db(&storage);
    let contacts = db.repository("Contact").unwrap();

    let contact = contacts.get(1).unwrap();
    let deleted = contacts
        .delete(&contact, DeleteOptions::new().delete_entities(false))
        .unwrap();

    assert!(!deleted);
    assert!(storage.writes().is_empty());
}

#[test]
fn objects_of_another_class_are_rejected() {
    let storage = RecordingStorage::new();
    let db = db(&storage);

    let mut tag = Object::new("Tag").with("name", "rust");
    let err = db
        .repository("Post")
        .unwrap()
        .save(&mut tag, SaveOptions::default())
        .unwrap_err();

    assert!(err.is_query());
    assert!(storage.sql().is_empty());
}
