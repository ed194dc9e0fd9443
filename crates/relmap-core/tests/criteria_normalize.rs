use relmap_core::criteria::{normalize, normalize_order_by, Criteria, OrderBy};
use relmap_core::{CriteriaExpression, Operator, Qb, Value};

use serde_json::json;

#[test]
fn status_and_age() {
    let exprs = normalize(
        json!({ "status": "active", "age": { "operator": ">=", "value": 18 } }),
        "id",
    )
    .unwrap();

    assert_eq!(
        exprs,
        vec![
            CriteriaExpression::eq("status", "active"),
            CriteriaExpression::new("age", Operator::Ge, 18),
        ]
    );
}

#[test]
fn normalizing_twice_changes_nothing() {
    let inputs = [
        json!({ "status": "active", "age": { "operator": ">=", "value": 18 } }),
        json!([1, 2, 3]),
        json!(7),
        json!({ "contact": { "lastName": "Smith" }, "deleted": null }),
        json!({
            "price": {
                "operator": "between",
                "value": 10,
                "value2": 20,
                "or": { "featured": true },
            }
        }),
    ];

    for input in inputs {
        let once = normalize(input.clone(), "id").unwrap();
        let twice = normalize(once.clone(), "id").unwrap();
        assert_eq!(once, twice, "input: {input}");
    }
}

#[test]
fn plain_list_is_primary_key_in() {
    let exprs = normalize(json!([1, 2, 3]), "policyId").unwrap();

    assert_eq!(
        exprs,
        vec![CriteriaExpression::new(
            "policyId",
            Operator::In,
            Value::List(vec![1.into(), 2.into(), 3.into()])
        )]
    );
}

#[test]
fn nested_maps_become_paths() {
    let exprs = normalize(json!({ "contact": { "lastName": "Smith" } }), "id").unwrap();
    assert_eq!(exprs, vec![CriteriaExpression::eq("contact.lastName", "Smith")]);
}

#[test]
fn null_becomes_is() {
    let exprs = normalize(json!({ "deletedAt": null }), "id").unwrap();
    assert_eq!(exprs[0].operator, Operator::Is);
}

#[test]
fn builder_and_map_agree() {
    let built = Qb::new()
        .filter("status", Operator::Eq, "active")
        .and("age", Operator::Ge, 18);

    assert_eq!(
        normalize(built, "id").unwrap(),
        normalize(
            json!({ "status": "active", "age": { "operator": "GTE", "value": 18 } }),
            "id"
        )
        .unwrap()
    );
}

#[test]
fn invalid_shapes_are_query_errors() {
    let err = normalize(json!([{ "a": 1 }]), "id").unwrap_err();
    assert!(err.is_query());

    let err = normalize(json!({ "price": { "operator": "between", "value": 1 } }), "id").unwrap_err();
    assert!(err.is_query());

    let err = normalize(json!({ "age": { "operator": "roughly", "value": 1 } }), "id").unwrap_err();
    assert!(err.is_query());
}

#[test]
fn empty_criteria() {
    assert!(normalize(Criteria::None, "id").unwrap().is_empty());
    assert!(normalize(json!(null), "id").unwrap().is_empty());
}

#[test]
fn order_by_shapes_agree() {
    let expected = vec![OrderBy::desc("lastName"), OrderBy::asc("id")];

    assert_eq!(normalize_order_by(&json!("lastName DESC, id")).unwrap(), expected);
    assert_eq!(normalize_order_by(&json!(["lastName desc", "id"])).unwrap(), expected);
    assert_eq!(
        normalize_order_by(&json!({ "lastName": "DESC", "id": "ASC" })).unwrap(),
        expected
    );
}
