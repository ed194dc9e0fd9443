use relmap_core::{ObjectReference, Value};
use relmap_sql::{DeleteQueryBuilder, InsertQueryBuilder, UpdateQueryBuilder};

use pretty_assertions::assert_eq;

#[test]
fn insert_binds_every_assignment() {
    let stmt = InsertQueryBuilder::new("policy")
        .set("reference", "P-1")
        .set("contact_id", ObjectReference::new("Contact", 7))
        .build();

    assert_eq!(
        stmt.sql,
        "INSERT INTO `policy` SET `reference` = :param_1, `contact_id` = :param_2"
    );
    assert_eq!(stmt.params["param_2"], Value::from(7));
}

#[test]
fn replace_mode_updates_on_duplicate_key() {
    let stmt = InsertQueryBuilder::new("post_tag")
        .set("post_id", 1)
        .set("tag_id", 2)
        .replace(true)
        .build();

    assert_eq!(
        stmt.sql,
        "INSERT INTO `post_tag` SET `post_id` = :param_1, `tag_id` = :param_2 \
         ON DUPLICATE KEY UPDATE `post_id` = :param_1, `tag_id` = :param_2"
    );
    assert_eq!(stmt.params.len(), 2);
}

#[test]
fn empty_insert_uses_defaults() {
    let stmt = InsertQueryBuilder::new("audit").build();
    assert_eq!(stmt.sql, "INSERT INTO `audit` () VALUES ()");
}

#[test]
fn update_requires_assignments_and_key() {
    let stmt = UpdateQueryBuilder::new("contact")
        .set("last_name", "O'Brien")
        .key("id", 3)
        .build()
        .unwrap();

    assert_eq!(
        stmt.sql,
        "UPDATE `contact` SET `last_name` = :param_1 WHERE `contact`.`id` = :param_2"
    );
    assert_eq!(stmt.params["param_1"], Value::from("O'Brien"));

    assert!(UpdateQueryBuilder::new("contact").key("id", 3).build().is_none());
    assert!(UpdateQueryBuilder::new("contact")
        .set("last_name", "x")
        .key("id", ())
        .build()
        .is_none());
}

#[test]
fn delete_never_runs_without_a_key() {
    assert!(DeleteQueryBuilder::new("contact").build().is_none());
    assert!(DeleteQueryBuilder::new("contact").key("id", Value::Null).build().is_none());
    assert!(DeleteQueryBuilder::new("post_tag")
        .key("post_id", 1)
        .key("tag_id", ())
        .build()
        .is_none());

    let stmt = DeleteQueryBuilder::new("post_tag")
        .key("post_id", 1)
        .key("tag_id", 2)
        .build()
        .unwrap();
    assert_eq!(
        stmt.sql,
        "DELETE FROM `post_tag` WHERE `post_id` = :param_1 AND `tag_id` = :param_2"
    );
}
