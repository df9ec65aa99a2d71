//! Relation-aware access: translated paths from plain entities,
//! translated foreign keys, and select-related prefetching.

use lingua::core::config;
use lingua::prelude::*;
use lingua_testing_fixtures::{self as fixtures, Normal, Related, Standard, seed};

#[test]
fn aware_manager_filters_translated_fields_of_relations() {
    fixtures::install();
    let data = seed::dataset();

    let hits = Standard::query_translated()
        .filter_by("normal__translated_field", Value::text("English one"))
        .fetch()
        .unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, data.first);

    // "third" points at a ja-only master; under en nothing matches.
    let hits = Standard::query_translated()
        .filter_by("normal__translated_field", Value::text("Japanese three"))
        .fetch()
        .unwrap();
    assert!(hits.is_empty());
}

#[test]
fn aware_manager_honors_an_explicit_language() {
    fixtures::install();
    let data = seed::dataset();

    let hits = Standard::query_translated()
        .language("ja")
        .unwrap()
        .filter_by("normal__translated_field", Value::text("Japanese three"))
        .fetch()
        .unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, data.third);
}

#[test]
fn unaware_manager_refuses_translated_paths() {
    fixtures::install();
    seed::dataset();

    let err = Standard::query()
        .filter_by("normal__translated_field", Value::text("English one"))
        .fetch()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WrongAccessor);

    // The accessor name is just as unreachable.
    let err = Standard::query()
        .filter_by("normal__translations__translated_field", Value::text("x"))
        .fetch()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WrongAccessor);
}

#[test]
fn shared_paths_work_through_either_manager() {
    fixtures::install();
    let data = seed::dataset();

    let hits = Standard::query()
        .filter_by("normal__shared_field", Value::text("one"))
        .fetch()
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, data.first);

    let hits = Standard::query_translated()
        .filter_by("normal__shared_field", Value::text("one"))
        .fetch()
        .unwrap();
    assert_eq!(hits.len(), 1);
}

#[test]
fn projection_keys_include_the_translation_hop() {
    fixtures::install();
    seed::dataset();

    let rows = Standard::query_translated()
        .filter_by("standard_field", Value::text("first"))
        .values(&["normal__translated_field"])
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get("normal__translations__translated_field"),
        Some(&Value::text("English one"))
    );
}

#[test]
fn select_related_prefetches_the_translation_row() {
    fixtures::install();
    seed::dataset();

    let rows = Standard::query_translated()
        .select_related(&["normal"])
        .unwrap()
        .fetch_related()
        .unwrap();

    assert_eq!(rows.len(), 2);
    let (first, related) = &rows[0];
    assert_eq!(first.standard_field, "first");
    let entry = related.get("normal").unwrap();
    assert!(entry.translation.is_some());

    // "third" points at a ja-only master; the en translation slot
    // stays empty while the shared row is still prefetched.
    let (_, related) = &rows[1];
    let entry = related.get("normal").unwrap();
    assert!(entry.translation.is_none());
}

#[test]
fn select_related_requires_an_explicit_list() {
    fixtures::install();

    let err = Standard::query().select_related(&[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);

    let err = Normal::objects().select_related(&[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);

    let err = Standard::query().select_related(&["no_such"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FieldDoesNotExist);
}

#[test]
fn translated_foreign_keys_resolve_through_the_translation_row() {
    fixtures::install();
    let data = seed::dataset();

    let created = Related::objects()
        .language("en")
        .unwrap()
        .create(&[
            ("normal", Value::Uint(data.one)),
            ("translated_normal", Value::Uint(data.two)),
        ])
        .unwrap();

    let hits = Related::objects()
        .language("en")
        .unwrap()
        .filter_by("translated_normal__shared_field", Value::text("two"))
        .fetch_combined()
        .unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].pk(), created.pk());
}

#[test]
fn select_related_crosses_translated_foreign_keys() {
    fixtures::install();
    let data = seed::dataset();
    Related::objects()
        .language("en")
        .unwrap()
        .create(&[
            ("normal", Value::Uint(data.one)),
            ("translated_normal", Value::Uint(data.two)),
        ])
        .unwrap();

    let rows = Related::objects()
        .language("en")
        .unwrap()
        .select_related(&["translated_normal"])
        .unwrap()
        .fetch_combined()
        .unwrap();

    assert_eq!(rows.len(), 1);
    let nested = rows[0].related::<Normal>("translated_normal").unwrap().unwrap();
    assert_eq!(nested.shared_field, "two");
    assert_eq!(
        nested.cached_translation().unwrap().translated_field,
        "English two"
    );
}

#[test]
fn deep_prefetch_attaches_an_entry_per_hop() {
    fixtures::install();
    let data = seed::dataset();
    Related::objects()
        .language("en")
        .unwrap()
        .create(&[
            ("normal", Value::Uint(data.one)),
            ("translated_normal", Value::Uint(data.two)),
        ])
        .unwrap();

    let rows = Related::objects()
        .language("en")
        .unwrap()
        .select_related(&["normal"])
        .unwrap()
        .fetch_combined()
        .unwrap();

    let nested = rows[0].related::<Normal>("normal").unwrap().unwrap();
    assert_eq!(nested.shared_field, "one");
    assert_eq!(
        nested.cached_translation().unwrap().translated_field,
        "English one"
    );
}

#[test]
fn default_manager_honors_configuration() {
    fixtures::install();

    assert!(matches!(manager::<Normal>(), DefaultManager::Aware(_)));

    config::install(LinguaConfig {
        use_default_manager: false,
        ..LinguaConfig::default()
    });
    assert!(matches!(
        manager::<Normal>(),
        DefaultManager::SharedOnly(_)
    ));
}

#[test]
fn latest_and_earliest_rank_plain_rows() {
    fixtures::install();
    seed::dataset();

    let latest = Standard::query().latest("standard_field").unwrap();
    assert_eq!(latest.standard_field, "third");

    let earliest = Standard::query().earliest("standard_field").unwrap();
    assert_eq!(earliest.standard_field, "first");

    let err = Standard::query()
        .filter_by("standard_field", Value::text("missing"))
        .latest("standard_field")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
