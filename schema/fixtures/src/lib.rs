//! Shared schema and seed data for the Lingua test suites.
//!
//! `Normal` is the canonical translatable entity, `Standard` a plain
//! entity referencing it, and `Related` a translatable entity with
//! both a shared and a translated foreign key. `install` resets the
//! process state and registers the schema; the `seed` module loads a
//! small known dataset through the public API.

use lingua::core::{config, obs, registry, store};

lingua::translatable_entity! {
    pub entity Normal {
        path = "fixtures::Normal";
        name = "Normal";
        table = "normal";
        fields { shared_field: String }
        translated NormalTranslation {
            fields { translated_field: String }
        }
        accessors NormalFields;
        ordering = [shared_field];
    }
}

lingua::plain_entity! {
    pub entity Standard {
        path = "fixtures::Standard";
        name = "Standard";
        table = "standard";
        fields { standard_field: String }
        relations { normal: Normal }
    }
}

lingua::translatable_entity! {
    pub entity Related {
        path = "fixtures::Related";
        name = "Related";
        table = "related";
        fields { }
        relations { normal: Normal }
        translated RelatedTranslation {
            fields { }
            relations { translated_normal: Normal }
        }
        accessors RelatedFields;
    }
}

// Declares a unique-together tuple mixing both sides of the split;
// registration must refuse it.
lingua::translatable_entity! {
    pub entity MixedUnique {
        path = "fixtures::MixedUnique";
        name = "MixedUnique";
        table = "mixed_unique";
        fields { shared_field: String }
        translated MixedUniqueTranslation {
            fields { translated_field: String }
        }
        accessors MixedUniqueFields;
        unique_together = [(shared_field, translated_field)];
    }
}

/// Reset process state (config, store, registry, counters) and
/// register the fixture schema.
pub fn install() {
    config::reset();
    store::reset();
    registry::reset();
    obs::reset_all();

    registry::register_translatable::<Normal>().expect("register Normal");
    registry::register_translatable::<Related>().expect("register Related");
    registry::register_plain::<Standard>().expect("register Standard");
}

/// Seed helpers. All data goes through the public query surface.
pub mod seed {
    use super::{Normal, Standard};
    use lingua::prelude::*;

    pub fn normal(language: &str, shared: &str, translated: &str) -> Combined<Normal> {
        Normal::objects()
            .language(language)
            .expect("known language")
            .create(&[
                ("shared_field", Value::text(shared)),
                ("translated_field", Value::text(translated)),
            ])
            .expect("create Normal")
    }

    pub fn translate(master: u64, language: &str, translated: &str) -> Combined<Normal> {
        Normal::objects()
            .language(language)
            .expect("known language")
            .create(&[
                ("master", Value::Uint(master)),
                ("translated_field", Value::text(translated)),
            ])
            .expect("create translation")
    }

    pub fn standard(field: &str, normal: u64) -> Standard {
        Standard::query()
            .create(&[
                ("standard_field", Value::text(field)),
                ("normal", Value::Uint(normal)),
            ])
            .expect("create Standard")
    }

    /// Canonical dataset: "one" in en and ja, "two" in en only,
    /// "three" in ja only, plus two `Standard` rows pointing at "one"
    /// and "three".
    pub fn dataset() -> Dataset {
        let one = normal("en", "one", "English one");
        translate(one.pk(), "ja", "Japanese one");
        let two = normal("en", "two", "English two");
        let three = normal("ja", "three", "Japanese three");

        let first = standard("first", one.pk());
        let third = standard("third", three.pk());

        Dataset {
            one: one.pk(),
            two: two.pk(),
            three: three.pk(),
            first: first.id,
            third: third.id,
        }
    }

    /// Primary keys of the canonical dataset.
    #[derive(Clone, Copy, Debug)]
    pub struct Dataset {
        pub one: u64,
        pub two: u64,
        pub three: u64,
        pub first: u64,
        pub third: u64,
    }
}
