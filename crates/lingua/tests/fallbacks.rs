//! Fallback resolution: one combined row per master, best-ranked
//! language wins, deterministically.

use lingua::core::{config, obs};
use lingua::prelude::*;
use lingua_testing_fixtures::{self as fixtures, Normal, NormalFields, Related, seed};
use proptest::prelude::*;

#[test]
fn each_master_resolves_to_its_best_language() {
    fixtures::install();
    let data = seed::dataset();

    let rows = Normal::objects()
        .language("en")
        .unwrap()
        .fallbacks(&["ja"])
        .unwrap()
        .fetch_combined()
        .unwrap();

    assert_eq!(rows.len(), 3);
    let mut languages = std::collections::BTreeMap::new();
    for row in &rows {
        languages.insert(row.pk(), row.language_code().unwrap().as_str().to_string());
    }
    assert_eq!(languages[&data.one], "en");
    assert_eq!(languages[&data.two], "en");
    assert_eq!(languages[&data.three], "ja");

    // Only "three" needed the chain.
    assert_eq!(obs::report().fallbacks_resolved, 1);
}

#[test]
fn a_filter_hit_in_a_lower_ranked_language_still_yields_the_best_row() {
    fixtures::install();
    let data = seed::dataset();

    // "one" holds both languages; the filter matches only its "en" row.
    // The master qualifies, and resolution still ranks over everything
    // it has stored, so the "ja" primary wins.
    let rows = Normal::objects()
        .language("ja")
        .unwrap()
        .fallbacks(&["en"])
        .unwrap()
        .filter_by("translated_field", Value::text("English one"))
        .fetch_combined()
        .unwrap();

    assert_eq!(rows.len(), 1);
    let mut row = rows.into_iter().next().unwrap();
    assert_eq!(row.pk(), data.one);
    assert_eq!(row.language_code().unwrap().as_str(), "ja");
    assert_eq!(row.translated_field().unwrap(), "Japanese one");

    // The primary language was available, so nothing fell back.
    assert_eq!(obs::report().fallbacks_resolved, 0);
}

#[test]
fn untranslated_masters_are_omitted() {
    fixtures::install();
    seed::dataset();

    // A shared row with no translation at all.
    Normal::query()
        .create(&[("shared_field", Value::text("bare"))])
        .unwrap();

    let rows = Normal::objects()
        .language("en")
        .unwrap()
        .fallbacks(&["ja"])
        .unwrap()
        .fetch_combined()
        .unwrap();

    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|row| row.shared_field != "bare"));
}

#[test]
fn fallbacks_require_a_bound_language() {
    fixtures::install();

    let err = Normal::objects().fallbacks(&["ja"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = Normal::objects()
        .language("all")
        .unwrap()
        .fallbacks(&["ja"])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn empty_chain_takes_the_configured_default() {
    fixtures::install();
    let data = seed::dataset();
    config::install(LinguaConfig {
        fallback_languages: vec!["ja".to_string()],
        ..LinguaConfig::default()
    });

    let rows = Normal::objects()
        .language("en")
        .unwrap()
        .fallbacks(&[])
        .unwrap()
        .fetch_combined()
        .unwrap();

    assert_eq!(rows.len(), 3);
    let three = rows.iter().find(|row| row.pk() == data.three).unwrap();
    assert_eq!(three.language_code().unwrap().as_str(), "ja");
}

#[test]
fn projection_does_not_compose_with_fallbacks() {
    fixtures::install();
    seed::dataset();

    let queryset = Normal::objects()
        .language("en")
        .unwrap()
        .fallbacks(&["ja"])
        .unwrap();

    let err = queryset.values(&["shared_field"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);

    let err = queryset.values_list(&["shared_field"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);

    let err = queryset
        .clone()
        .defer(&["translated_field"])
        .unwrap()
        .fetch()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);

    let err = queryset
        .update(&[("shared_field", Value::text("x"))])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}

#[test]
fn prefetch_does_not_compose_with_fallbacks() {
    fixtures::install();
    seed::dataset();

    let err = Related::objects()
        .language("en")
        .unwrap()
        .fallbacks(&["ja"])
        .unwrap()
        .select_related(&["normal"])
        .unwrap()
        .fetch()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}

#[test]
fn filters_crossing_another_translation_table_are_refused() {
    fixtures::install();
    seed::dataset();

    let err = Related::objects()
        .language("en")
        .unwrap()
        .fallbacks(&["ja"])
        .unwrap()
        .filter_by("normal__translated_field", Value::text("English one"))
        .fetch()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Whatever subset of languages exists, and whichever one was
    /// inserted first, the resolved language is the best-ranked
    /// available one.
    #[test]
    fn resolution_is_insertion_order_independent(
        langs in proptest::sample::subsequence(vec!["en", "ja", "fr"], 1..=3),
        rotate in 0usize..3,
    ) {
        fixtures::install();
        config::install(LinguaConfig {
            languages: vec![
                ("en".to_string(), "English".to_string()),
                ("ja".to_string(), "Japanese".to_string()),
                ("fr".to_string(), "French".to_string()),
            ],
            ..LinguaConfig::default()
        });

        let mut order = langs.clone();
        let len = order.len();
        order.rotate_left(rotate % len);

        let master = seed::normal(order[0], "subject", &format!("text {}", order[0]));
        for lang in &order[1..] {
            seed::translate(master.pk(), lang, &format!("text {lang}"));
        }

        let rows = Normal::objects()
            .language("en").unwrap()
            .fallbacks(&["ja", "fr"]).unwrap()
            .fetch_combined().unwrap();

        prop_assert_eq!(rows.len(), 1);
        let expected = ["en", "ja", "fr"]
            .into_iter()
            .find(|lang| langs.contains(lang))
            .unwrap();
        prop_assert_eq!(rows[0].language_code().unwrap().as_str(), expected);
    }
}
