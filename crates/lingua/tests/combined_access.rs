//! The combined instance: attachment slot, autoload policy, and the
//! translate-then-save cycle.

use lingua::core::{config, obs};
use lingua::prelude::*;
use lingua_testing_fixtures::{self as fixtures, Normal, NormalFields, seed};

#[test]
fn translate_then_save_adds_a_language() {
    fixtures::install();
    let mut row = seed::normal("en", "shared", "English");

    let translation = row.translate(LanguageCode::new("ja"));
    translation.translated_field = "日本語".to_string();
    row.save().unwrap();

    let mut ja = Normal::objects().language("ja").unwrap().get_one().unwrap();
    assert_eq!(ja.shared_field, "shared");
    assert_eq!(ja.translated_field().unwrap(), "日本語");

    // The en row is untouched.
    let mut en = Normal::objects().language("en").unwrap().get_one().unwrap();
    assert_eq!(en.translated_field().unwrap(), "English");
}

#[test]
fn translate_then_save_never_duplicates_a_language_row() {
    fixtures::install();
    let mut row = seed::normal("en", "shared", "English");

    let translation = row.translate(LanguageCode::new("en"));
    translation.translated_field = "Updated English".to_string();
    row.save().unwrap();

    assert_eq!(
        Normal::objects().language("all").unwrap().count().unwrap(),
        1
    );
    let mut en = Normal::objects().language("en").unwrap().get_one().unwrap();
    assert_eq!(en.translated_field().unwrap(), "Updated English");
}

#[test]
fn translate_leaves_the_prior_translation_stored() {
    fixtures::install();
    let mut row = seed::normal("en", "shared", "English");

    row.translate(LanguageCode::new("ja"));
    assert_eq!(row.language_code().unwrap().as_str(), "ja");

    // Only attached, never saved: storage still holds the en row alone.
    assert_eq!(
        Normal::objects().language("all").unwrap().count().unwrap(),
        1
    );
}

#[test]
fn autoload_resolves_the_process_language() {
    fixtures::install();
    let created = seed::normal("en", "shared", "English");

    let shared = Normal::query()
        .get(FilterExpr::cond("id", created.pk()))
        .unwrap();
    let mut combined = Combined::new(shared);

    assert_eq!(
        combined.translated_value("translated_field").unwrap(),
        Value::text("English")
    );
    assert_eq!(combined.language_code().unwrap().as_str(), "en");
}

#[test]
fn autoload_off_raises_no_translation() {
    fixtures::install();
    let created = seed::normal("en", "shared", "English");
    config::install(LinguaConfig {
        autoload_translations: false,
        ..LinguaConfig::default()
    });

    let shared = Normal::query()
        .get(FilterExpr::cond("id", created.pk()))
        .unwrap();
    let mut combined = Combined::<Normal>::new(shared);

    let err = combined.translated_value("translated_field").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoTranslation);
}

#[test]
fn no_attachment_means_no_language() {
    fixtures::install();
    let created = seed::normal("en", "shared", "English");

    let shared = Normal::query()
        .get(FilterExpr::cond("id", created.pk()))
        .unwrap();
    let combined = Combined::<Normal>::new(shared);

    let err = combined.language_code().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoTranslation);
}

#[test]
fn translated_reads_after_fetch_hit_the_attachment() {
    fixtures::install();
    seed::dataset();

    let mut rows = Normal::objects()
        .language("en")
        .unwrap()
        .fetch_combined()
        .unwrap();

    let before = obs::report();
    for row in &mut rows {
        row.translated_field().unwrap();
    }
    let after = obs::report();

    assert_eq!(after.translations_loaded, before.translations_loaded);
    assert_eq!(after.queries_executed, before.queries_executed);
    assert_eq!(
        after.translation_cache_hits,
        before.translation_cache_hits + rows.len() as u64
    );
}

#[test]
fn get_translation_prefers_the_attachment() {
    fixtures::install();
    let row = seed::normal("en", "shared", "English");

    let before = obs::report();
    let attached = row.get_translation(&LanguageCode::new("en")).unwrap();
    let after = obs::report();

    assert_eq!(attached.translated_field, "English");
    assert_eq!(after.translations_loaded, before.translations_loaded);
    assert_eq!(
        after.translation_cache_hits,
        before.translation_cache_hits + 1
    );
}

#[test]
fn load_translation_attaches_unsaved_on_miss() {
    fixtures::install();
    let mut row = seed::normal("en", "shared", "English");
    let master_pk = row.pk();

    let translation = row
        .load_translation(&LanguageCode::new("ja"), true)
        .unwrap();

    assert_eq!(translation.pk(), 0);
    assert_eq!(translation.language_code().as_str(), "ja");
    assert_eq!(translation.master(), Some(master_pk));
}

#[test]
fn load_translation_without_enforce_keeps_the_attachment() {
    fixtures::install();
    let row = seed::normal("en", "shared", "English");
    seed::translate(row.pk(), "ja", "日本語");

    let mut row = Normal::objects()
        .language("en")
        .unwrap()
        .get_one()
        .unwrap();

    let kept = row.load_translation(&LanguageCode::new("ja"), false).unwrap();
    assert_eq!(kept.language_code().as_str(), "en");

    let loaded = row.load_translation(&LanguageCode::new("ja"), true).unwrap();
    assert_eq!(loaded.language_code().as_str(), "ja");
    assert_eq!(loaded.translated_field, "日本語");
}
