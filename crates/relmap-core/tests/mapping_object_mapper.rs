use relmap_core::class::{ClassDescriptor, ClassRegistry, PropertyDescriptor};
use relmap_core::provider::{ProviderChain, StaticProvider};
use relmap_core::schema::{Aggregate, Column, Relationship, Table};
use relmap_core::{Config, ObjectMapper};

use std::sync::Arc;

fn mapper(config: Config, classes: Vec<ClassDescriptor>) -> ObjectMapper {
    ObjectMapper::new(
        Arc::new(config),
        Arc::new(classes.into_iter().collect()),
        Arc::new(ProviderChain::default()),
    )
}

fn parent_and_user() -> Vec<ClassDescriptor> {
    vec![
        ClassDescriptor::new("Parent")
            .column("id", Column::named("id").primary_key().auto_increment())
            .scalar("name")
            .relationship("user", Relationship::one_to_one("User")),
        ClassDescriptor::new("User")
            .column("id", Column::named("id").primary_key())
            .scalar("email"),
    ]
}

#[test]
fn eager_one_to_one_is_expanded() {
    let mapper = mapper(Config::default(), parent_and_user());
    let collection = mapper.mapping_collection_for_class("Parent").unwrap();

    assert_eq!(collection.table_name(), "parent");
    assert_eq!(collection.primary_key_property(), "id");

    let user = collection.get("user").unwrap();
    assert!(user.is_expanded());
    assert_eq!(user.foreign_key_column(), Some("user_id"));

    let email = collection.get("user.email").unwrap();
    assert_eq!(email.alias, "user_email");
    assert_eq!(email.table_alias, "obj_alias_user");
    assert_eq!(
        email.full_column_name().as_deref(),
        Some("`obj_alias_user`.`email`")
    );
    assert!(collection.get_by_alias("user_id").unwrap().is_primary_key());
}

#[test]
fn self_referential_relationship_terminates() {
    let mapper = mapper(
        Config::default(),
        vec![ClassDescriptor::new("Employee")
            .scalar("id")
            .scalar("name")
            .relationship("manager", Relationship::many_to_one("Employee"))],
    );

    let collection = mapper.mapping_collection_for_class("Employee").unwrap();

    assert!(collection.get("manager").unwrap().is_expanded());
    assert!(collection.get("manager.name").is_some());

    let second = collection.get("manager.manager").unwrap();
    assert!(second.is_lazy());
    assert!(collection.get("manager.manager.name").is_none());
    assert_eq!(collection.relationship_keys().count(), 1);
}

#[test]
fn mutual_relationships_expand_each_key_once() {
    let mapper = mapper(
        Config::default(),
        vec![
            ClassDescriptor::new("Policy")
                .scalar("id")
                .relationship("contact", Relationship::many_to_one("Contact")),
            ClassDescriptor::new("Contact")
                .scalar("id")
                .relationship("policy", Relationship::many_to_one("Policy")),
        ],
    );

    let collection = mapper.mapping_collection_for_class("Policy").unwrap();

    assert!(collection.get("contact").unwrap().is_expanded());
    assert!(collection.get("contact.policy").unwrap().is_expanded());
    assert!(collection.get("contact.policy.contact").unwrap().is_lazy());
}

#[test]
fn max_depth_bounds_expansion() {
    let classes = vec![
        ClassDescriptor::new("A").scalar("id").relationship("b", Relationship::many_to_one("B")),
        ClassDescriptor::new("B").scalar("id").relationship("c", Relationship::many_to_one("C")),
        ClassDescriptor::new("C").scalar("id").scalar("name"),
    ];
    let config = Config::builder().max_depth(1).build().unwrap();
    let collection = mapper(config, classes).mapping_collection_for_class("A").unwrap();

    assert!(collection.get("b").unwrap().is_expanded());
    assert!(collection.get("b.c").unwrap().is_lazy());
    assert!(collection.get("b.c.name").is_none());
}

#[test]
fn to_many_is_lazy_by_default() {
    let mapper = mapper(
        Config::default(),
        vec![
            ClassDescriptor::new("Contact")
                .scalar("id")
                .relationship("policies", Relationship::one_to_many("Policy", "contact")),
            ClassDescriptor::new("Policy")
                .scalar("id")
                .relationship("contact", Relationship::many_to_one("Contact")),
        ],
    );

    let collection = mapper.mapping_collection_for_class("Contact").unwrap();
    let policies = collection.get("policies").unwrap();

    assert!(policies.is_lazy());
    let rel = policies.relationship.as_ref().unwrap();
    assert_eq!(rel.source_column(), "id");
    assert_eq!(rel.target_column(), "contact_id");
}

#[test]
fn missing_child_class_is_recorded() {
    let classes = vec![ClassDescriptor::new("Policy")
        .scalar("id")
        .relationship("contact", Relationship::many_to_one("Contact"))];

    let collection = mapper(Config::default(), classes.clone())
        .mapping_collection_for_class("Policy")
        .unwrap();
    assert!(collection.get("contact").is_none());
    assert_eq!(
        collection.errors(),
        ["mapping error on Policy::contact: child class `Contact` not found"]
    );

    let strict = Config::builder().strict_mapping(true).build().unwrap();
    let err = mapper(strict, classes)
        .mapping_collection_for_class("Policy")
        .unwrap_err();
    assert!(err.is_mapping());
}

#[test]
fn guessing_can_be_disabled() {
    let classes = vec![ClassDescriptor::new("Note")
        .column("id", Column::named("id").primary_key())
        .scalar("body")];

    let guessed = mapper(Config::default(), classes.clone())
        .mapping_collection_for_class("Note")
        .unwrap();
    assert!(guessed.get("body").is_some());

    let config = Config::builder().guess_mappings(false).build().unwrap();
    let collection = mapper(config, classes)
        .mapping_collection_for_class("Note")
        .unwrap();
    assert!(collection.get("body").is_none());
    assert!(collection.get("id").is_some());
}

#[test]
fn static_provider_fills_gaps() {
    let registry: ClassRegistry = vec![ClassDescriptor::new("Contact")
        .scalar("id")
        .column("lastName", Column::default().read_only(true))]
    .into_iter()
    .collect();

    let provider = ProviderChain::default().with(
        StaticProvider::new()
            .table("Contact", Table::named("crm_contacts"))
            .column("Contact", "lastName", Column::named("surname").read_only(false)),
    );

    let mapper = ObjectMapper::new(
        Arc::new(Config::default()),
        Arc::new(registry),
        Arc::new(provider),
    );
    let collection = mapper.mapping_collection_for_class("Contact").unwrap();

    assert_eq!(collection.table_name(), "crm_contacts");
    let last_name = collection.get("lastName").unwrap();
    assert_eq!(last_name.short_column_name(), Some("surname"));
    assert!(last_name.is_read_only());
}

#[test]
fn embedded_columns_live_in_parent_table() {
    let mapper = mapper(
        Config::default(),
        vec![
            ClassDescriptor::new("Customer")
                .scalar("id")
                .property(
                    PropertyDescriptor::object("address", "Address")
                        .with_relationship(Relationship::one_to_one("Address").embedded("address_")),
                ),
            ClassDescriptor::new("Address").scalar("street").scalar("town"),
        ],
    );

    let collection = mapper.mapping_collection_for_class("Customer").unwrap();
    let town = collection.get("address.town").unwrap();

    assert_eq!(town.full_column_name().as_deref(), Some("`customer`.`address_town`"));
    assert_eq!(town.alias, "address_town");
}

#[test]
fn scalar_join_and_aggregate() {
    let mapper = mapper(
        Config::default(),
        vec![
            ClassDescriptor::new("Contact")
                .scalar("id")
                .column("statusId", Column::default())
                .property(
                    PropertyDescriptor::scalar("status")
                        .with_relationship(Relationship::scalar("contact_status", "status_id", "id"))
                        .with_column(Column::named("label")),
                )
                .relationship("policies", Relationship::one_to_many("Policy", "contact"))
                .column(
                    "policyCount",
                    Column::default().aggregate(Aggregate::new("count", "policies", "id")),
                ),
            ClassDescriptor::new("Policy")
                .scalar("id")
                .relationship("contact", Relationship::many_to_one("Contact")),
        ],
    );

    let collection = mapper.mapping_collection_for_class("Contact").unwrap();

    let status = collection.get("status").unwrap();
    assert!(status.is_scalar_join());
    assert!(status.is_read_only());
    assert_eq!(
        status.full_column_name().as_deref(),
        Some("`obj_alias_status`.`label`")
    );

    let count = collection.get("policyCount").unwrap();
    assert!(count.is_aggregate());
    assert!(count.is_read_only());
    let source = count.aggregate_source.as_ref().unwrap();
    assert_eq!(source.table_alias, "obj_alias_policies");
    assert_eq!(source.column, "id");
}
