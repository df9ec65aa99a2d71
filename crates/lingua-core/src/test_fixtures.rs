//! Shared in-crate test schema: a translatable entity, a plain entity
//! referencing it, and a translatable entity with a translated foreign
//! key. Unit tests call `setup` to get a clean process state and
//! `populate` for a small known dataset.

use crate::{
    config, obs, registry,
    store::{self, row::Row},
    value::Value,
};

pub const NORMAL: &str = "fixtures::Normal";
pub const NORMAL_TRANSLATION: &str = "fixtures::NormalTranslation";
pub const STANDARD: &str = "fixtures::Standard";
pub const RELATED: &str = "fixtures::Related";

crate::translatable_entity! {
    pub entity Normal {
        path = "fixtures::Normal";
        name = "Normal";
        table = "normal";
        fields { shared_field: String }
        translated NormalTranslation {
            fields { translated_field: String }
        }
        accessors NormalFields;
    }
}

crate::plain_entity! {
    pub entity Standard {
        path = "fixtures::Standard";
        name = "Standard";
        table = "standard";
        fields { normal_field: String }
        relations { normal: Normal }
    }
}

crate::translatable_entity! {
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

/// Reset config, store, registry and counters, then register the
/// fixture schema.
pub fn setup() {
    config::reset();
    store::reset();
    registry::reset();
    obs::reset_all();

    registry::register_translatable::<Normal>().unwrap();
    registry::register_translatable::<Related>().unwrap();
    registry::register_plain::<Standard>().unwrap();
}

pub fn insert_normal(shared_field: &str) -> u64 {
    let mut row = Row::new();
    row.set("shared_field", Value::text(shared_field));
    store::insert(NORMAL, row).unwrap()
}

pub fn insert_translation(master: u64, language: &str, translated_field: &str) -> u64 {
    let mut row = Row::new();
    row.set("master", Value::Uint(master));
    row.set("language_code", Value::text(language));
    row.set("translated_field", Value::text(translated_field));
    store::insert(NORMAL_TRANSLATION, row).unwrap()
}

pub fn insert_standard(normal_field: &str, normal: u64) -> u64 {
    let mut row = Row::new();
    row.set("normal_field", Value::text(normal_field));
    row.set("normal", Value::Uint(normal));
    store::insert(STANDARD, row).unwrap()
}

/// Three masters: "one" translated to en and ja, "two" to en only,
/// "three" to ja only. Two `Standard` rows pointing at "one" and
/// "three".
pub fn populate() {
    let one = insert_normal("one");
    insert_translation(one, "en", "English one");
    insert_translation(one, "ja", "Japanese one");

    let two = insert_normal("two");
    insert_translation(two, "en", "English two");

    let three = insert_normal("three");
    insert_translation(three, "ja", "Japanese three");

    insert_standard("first", one);
    insert_standard("third", three);
}
