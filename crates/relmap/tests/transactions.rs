mod support;

use support::{db, RecordingStorage};

use pretty_assertions::assert_eq;
use relmap::{Error, Object, SaveOptions};

#[test]
fn nested_levels_share_one_transaction() {
    let storage = RecordingStorage::new();
    let db = db(&storage);

    db.begin_transaction().unwrap();
    db.begin_transaction().unwrap();
    assert_eq!(db.transaction_depth(), 2);

    db.commit().unwrap();
    assert_eq!(storage.commits(), 0);

    db.commit().unwrap();
    assert_eq!((storage.begins(), storage.commits()), (1, 1));
    assert_eq!(db.transaction_depth(), 0);
}

#[test]
fn rollback_ends_every_level() {
    let storage = RecordingStorage::new();
    let db = db(&storage);

    db.begin_transaction().unwrap();
    db.begin_transaction().unwrap();
    db.rollback().unwrap();

    assert_eq!(db.transaction_depth(), 0);
    assert_eq!(
        (storage.begins(), storage.commits(), storage.rollbacks()),
        (1, 0, 1)
    );

    // Nothing is open anymore
    db.commit().unwrap();
    db.rollback().unwrap();
    assert_eq!((storage.commits(), storage.rollbacks()), (0, 1));
}

#[test]
fn closure_commits_on_success() {
    let storage = RecordingStorage::new();
    let db = db(&storage);

    let value = db
        .transaction(|| {
            db.transaction(|| Ok(42))
        })
        .unwrap();

    assert_eq!(value, 42);
    assert_eq!((storage.begins(), storage.commits(), storage.rollbacks()), (1, 1, 0));
}

#[test]
fn closure_rolls_back_on_error() {
    let storage = RecordingStorage::new();
    let db = db(&storage);

    let err = db
        .transaction(|| -> relmap::Result<()> { Err(Error::query("boom")) })
        .unwrap_err();

    assert!(err.is_query());
    assert_eq!((storage.commits(), storage.rollbacks()), (0, 1));
    assert_eq!(db.transaction_depth(), 0);
}

#[test]
fn failed_save_rolls_back() {
    let storage = RecordingStorage::new();
    storage.fail_on("INSERT INTO `policy`");
    let db = db(&storage);

    let mut policy = Object::new("Policy")
        .with("reference", "P-1")
        .with_object("contact", Object::new("Contact").with("lastName", "Doe"));
    let err = db
        .repository("Policy")
        .unwrap()
        .save(&mut policy, SaveOptions::default())
        .unwrap_err();

    assert!(err.is_storage());
    assert_eq!(storage.sql().len(), 2);
    assert_eq!((storage.begins(), storage.commits(), storage.rollbacks()), (1, 0, 1));
    assert!(policy.is_new());
}
