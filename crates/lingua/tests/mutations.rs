//! Write-path semantics: attribute splitting on create, the update
//! split, cascade deletion, and the constraints guarding them.

use lingua::core::{obs, registry};
use lingua::core::model::ModelError;
use lingua::prelude::*;
use lingua_testing_fixtures::{self as fixtures, Normal, NormalFields, seed};

#[test]
fn create_splits_attributes_by_side() {
    fixtures::install();

    let mut created = Normal::objects()
        .language("en")
        .unwrap()
        .create(&[
            ("shared_field", Value::text("shared")),
            ("translated_field", Value::text("English")),
        ])
        .unwrap();

    assert!(created.pk() > 0);
    assert_eq!(created.shared_field, "shared");
    assert_eq!(created.translated_field().unwrap(), "English");
    assert_eq!(Normal::query().count().unwrap(), 1);
}

#[test]
fn create_with_explicit_master_adds_a_translation_only() {
    fixtures::install();
    let data = seed::dataset();

    // "two" is en-only; give it a ja side.
    let created = Normal::objects()
        .language("ja")
        .unwrap()
        .create(&[
            ("master", Value::Uint(data.two)),
            ("translated_field", Value::text("Japanese two")),
        ])
        .unwrap();

    assert_eq!(created.pk(), data.two);
    assert_eq!(Normal::query().count().unwrap(), 3);
    assert_eq!(
        Normal::objects().language("all").unwrap().count().unwrap(),
        5
    );
}

#[test]
fn create_refuses_shared_attributes_with_an_explicit_master() {
    fixtures::install();
    let data = seed::dataset();

    let err = Normal::objects()
        .language("ja")
        .unwrap()
        .create(&[
            ("master", Value::Uint(data.two)),
            ("shared_field", Value::text("renamed")),
            ("translated_field", Value::text("Japanese two")),
        ])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn create_requires_a_single_language() {
    fixtures::install();

    let err = Normal::objects()
        .language("all")
        .unwrap()
        .create(&[("shared_field", Value::text("x"))])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = Normal::objects()
        .create(&[
            ("language_code", Value::text("all")),
            ("shared_field", Value::text("x")),
        ])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn language_code_attribute_overrides_the_bound_mode() {
    fixtures::install();

    let created = Normal::objects()
        .language("en")
        .unwrap()
        .create(&[
            ("language_code", Value::text("ja")),
            ("shared_field", Value::text("shared")),
            ("translated_field", Value::text("日本語")),
        ])
        .unwrap();

    assert_eq!(created.language_code().unwrap().as_str(), "ja");
}

#[test]
fn duplicate_translation_rows_are_an_integrity_error() {
    fixtures::install();
    let data = seed::dataset();

    let err = Normal::objects()
        .language("en")
        .unwrap()
        .create(&[
            ("master", Value::Uint(data.one)),
            ("translated_field", Value::text("duplicate")),
        ])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);

    // The failed create left storage unchanged.
    assert_eq!(Normal::query().count().unwrap(), 3);
    assert_eq!(
        Normal::objects().language("all").unwrap().count().unwrap(),
        4
    );
}

#[test]
fn get_or_create_round_trips_on_the_same_attributes() {
    fixtures::install();

    let attrs = [
        ("shared_field", Value::text("four")),
        ("translated_field", Value::text("English four")),
    ];

    let queryset = Normal::objects().language("en").unwrap();
    let (row, created) = queryset.get_or_create(&attrs).unwrap();
    assert!(created);

    let (again, created) = queryset.get_or_create(&attrs).unwrap();
    assert!(!created);
    assert_eq!(again.pk(), row.pk());
    assert_eq!(Normal::query().count().unwrap(), 1);
}

#[test]
fn update_splits_shared_and_translated_writes() {
    fixtures::install();
    let data = seed::dataset();

    let touched = Normal::objects()
        .language("en")
        .unwrap()
        .update(&[
            ("shared_field", Value::text("x")),
            ("translated_field", Value::text("y")),
        ])
        .unwrap();
    assert_eq!(touched, 2);

    for mut row in Normal::objects()
        .language("en")
        .unwrap()
        .fetch_combined()
        .unwrap()
    {
        assert_eq!(row.shared_field, "x");
        assert_eq!(row.translated_field().unwrap(), "y");
    }

    // The shared write is visible from the ja side of "one", while its
    // ja translation keeps its text.
    let mut ja_one = Normal::objects()
        .language("ja")
        .unwrap()
        .get(FilterExpr::cond("pk", data.one))
        .unwrap();
    assert_eq!(ja_one.shared_field, "x");
    assert_eq!(ja_one.translated_field().unwrap(), "Japanese one");

    // "three" has no en translation and is fully untouched.
    let mut three = Normal::objects()
        .language("ja")
        .unwrap()
        .get(FilterExpr::cond("pk", data.three))
        .unwrap();
    assert_eq!(three.shared_field, "three");
    assert_eq!(three.translated_field().unwrap(), "Japanese three");
}

#[test]
fn update_refuses_reassigning_master_or_language() {
    fixtures::install();
    seed::dataset();

    let queryset = Normal::objects().language("en").unwrap();
    let err = queryset
        .update(&[("language_code", Value::text("ja"))])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = queryset.update(&[("master", Value::Uint(1))]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn delete_cascades_to_every_translation() {
    fixtures::install();
    seed::dataset();

    let removed = Normal::objects()
        .language("all")
        .unwrap()
        .delete()
        .unwrap();
    assert_eq!(removed, 3);

    assert_eq!(Normal::query().count().unwrap(), 0);
    assert_eq!(
        Normal::objects().language("all").unwrap().count().unwrap(),
        0
    );
}

#[test]
fn targeted_delete_takes_the_whole_master() {
    fixtures::install();
    let data = seed::dataset();

    // Matched through its en translation, deleted with its ja one.
    let removed = Normal::objects()
        .language("en")
        .unwrap()
        .filter_by("shared_field", Value::text("one"))
        .delete()
        .unwrap();
    assert_eq!(removed, 1);

    assert_eq!(Normal::query().count().unwrap(), 2);
    assert_eq!(
        Normal::objects().language("all").unwrap().count().unwrap(),
        2
    );
    assert!(
        Normal::objects()
            .language("ja")
            .unwrap()
            .filter(FilterExpr::cond("pk", data.one))
            .fetch()
            .unwrap()
            .is_empty()
    );
}

#[test]
fn delete_translations_leaves_shared_rows_intact() {
    fixtures::install();
    seed::dataset();

    let removed = Normal::objects()
        .language("en")
        .unwrap()
        .delete_translations()
        .unwrap();
    assert_eq!(removed, 2);

    assert_eq!(Normal::query().count().unwrap(), 3);
    assert_eq!(
        Normal::objects().language("all").unwrap().count().unwrap(),
        2
    );
}

#[test]
fn orphaned_translations_surface_uncombined() {
    fixtures::install();
    let data = seed::dataset();

    // Dropping the shared row through the plain manager leaves the
    // translation behind.
    Normal::query()
        .filter_by("id", Value::Uint(data.two))
        .delete()
        .unwrap();

    let rows = Normal::objects()
        .language("all")
        .unwrap()
        .fetch()
        .unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows.iter().filter(|row| row.is_orphan()).count(), 1);
    assert!(obs::report().orphans_yielded >= 1);

    // Combined terminals skip orphans.
    let combined = Normal::objects()
        .language("all")
        .unwrap()
        .fetch_combined()
        .unwrap();
    assert_eq!(combined.len(), 3);
}

#[test]
fn mixed_unique_together_is_refused_at_registration() {
    fixtures::install();

    let err = registry::register_translatable::<fixtures::MixedUnique>().unwrap_err();
    assert!(matches!(err, ModelError::MixedUniqueTogether { .. }));
}

#[test]
fn unknown_attributes_fail_with_a_hint() {
    fixtures::install();

    let err = Normal::objects()
        .language("en")
        .unwrap()
        .create(&[("no_such_field", Value::text("x"))])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FieldDoesNotExist);
    assert!(err.to_string().contains("no_such_field"));
}
