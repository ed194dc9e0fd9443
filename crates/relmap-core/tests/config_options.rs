use relmap_core::naming::NamingConvention;
use relmap_core::Config;

#[test]
fn defaults() {
    let config = Config::default();

    assert!(config.eager_load_to_one());
    assert!(!config.eager_load_to_many());
    assert!(config.guess_mappings());
    assert!(config.save_children_by_default());
    assert!(!config.strict_mapping());
    assert_eq!(config.max_depth(), 10);
}

#[test]
fn textual_options() {
    let config = Config::builder()
        .set_option("eagerLoadToMany", "true")
        .unwrap()
        .set_option("max_depth", "3")
        .unwrap()
        .set_option("column_naming_strategy", "as_is")
        .unwrap()
        .build()
        .unwrap();

    assert!(config.eager_load_to_many());
    assert_eq!(config.max_depth(), 3);
    assert_eq!(config.column_naming_strategy(), NamingConvention::AsIs);
}

#[test]
fn invalid_options_fail_fast() {
    let err = Config::builder().set_option("colour", "blue").unwrap_err();
    assert!(err.is_config());

    let err = Config::builder().set_option("max_depth", "deep").unwrap_err();
    assert!(err.is_config());

    let err = Config::builder().set_option("guess_mappings", "maybe").unwrap_err();
    assert!(err.is_config());

    let err = Config::builder().max_depth(0).build().unwrap_err();
    assert!(err.is_config());

    let err = Config::builder()
        .cache_directory("/definitely/not/a/directory")
        .build()
        .unwrap_err();
    assert!(err.is_config());
}

#[test]
fn mapping_hash_tracks_mapping_options_only() {
    let base = Config::default().mapping_hash();
    assert_eq!(base.len(), 64);

    let production = Config::builder().production_mode(true).build().unwrap();
    assert_eq!(production.mapping_hash(), base);

    let eager = Config::builder().eager_load_to_many(true).build().unwrap();
    assert_ne!(eager.mapping_hash(), base);
}
