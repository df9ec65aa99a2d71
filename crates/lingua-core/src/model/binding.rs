//! Model binding: validates a translatable declaration and derives the
//! per-side constraint sets installed on the store.
//!
//! Binding happens once per entity at registration; everything here is
//! pure and deterministic so declaration errors surface immediately.

use crate::{
    LANGUAGE_CODE_FIELD, MASTER_FIELD,
    model::{ModelError, entity::EntityModel},
};

///
/// BoundTranslation
///
/// The runtime outcome of binding one translatable entity: partitioned
/// constraint tuples and the derived translation table name.
///

#[derive(Clone, Debug)]
pub struct BoundTranslation {
    /// Unique tuples enforced on the shared table.
    pub shared_unique: Vec<Vec<String>>,
    /// Unique tuples enforced on the translation table. Always contains
    /// `(master, language_code)` first.
    pub translation_unique: Vec<Vec<String>>,
    /// Non-unique index tuples on the shared table.
    pub shared_index: Vec<Vec<String>>,
    /// Non-unique index tuples on the translation table.
    pub translation_index: Vec<Vec<String>>,
    /// Translation table name, `db_table` meta or derived from the shared
    /// table and the configured separator.
    pub translation_table: String,
}

///
/// Side
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Side {
    Shared,
    Translated,
}

/// Bind a translatable declaration.
///
/// `translated_fields` are the names moved to the translation side;
/// `db_table` is the optional explicit translation table name;
/// `separator` is the configured table-name separator.
pub fn validate_binding(
    shared: &EntityModel,
    translated_fields: &[&'static str],
    db_table: Option<&str>,
    separator: &str,
) -> Result<BoundTranslation, ModelError> {
    check_reserved(shared, translated_fields)?;
    check_clashes(shared, translated_fields)?;
    check_ordering(shared, translated_fields)?;

    let mut bound = BoundTranslation {
        shared_unique: Vec::new(),
        translation_unique: vec![vec![
            MASTER_FIELD.to_string(),
            LANGUAGE_CODE_FIELD.to_string(),
        ]],
        shared_index: Vec::new(),
        translation_index: Vec::new(),
        translation_table: db_table.map_or_else(
            || format!("{}{}translation", shared.table, separator),
            ToString::to_string,
        ),
    };

    for tuple in shared.unique_together {
        match partition_tuple(shared, translated_fields, tuple)? {
            Side::Shared => bound.shared_unique.push(owned(tuple)),
            Side::Translated => bound.translation_unique.push(owned(tuple)),
        }
    }

    for tuple in shared.index_together {
        match partition_tuple(shared, translated_fields, tuple) {
            Ok(Side::Shared) => bound.shared_index.push(owned(tuple)),
            Ok(Side::Translated) => bound.translation_index.push(owned(tuple)),
            Err(ModelError::MixedUniqueTogether { fields }) => {
                return Err(ModelError::MixedIndexTogether { fields });
            }
            Err(err) => return Err(err),
        }
    }

    Ok(bound)
}

fn owned(tuple: &[&'static str]) -> Vec<String> {
    tuple.iter().map(ToString::to_string).collect()
}

fn check_reserved(
    shared: &EntityModel,
    translated_fields: &[&'static str],
) -> Result<(), ModelError> {
    // language_code is a read-only descriptor on the shared side; master
    // is the synthesized foreign key. Neither may be declared.
    for reserved in [LANGUAGE_CODE_FIELD, MASTER_FIELD] {
        if shared.has_field(reserved) {
            return Err(ModelError::ReservedField {
                field: reserved.to_string(),
                side: "shared",
            });
        }
        if translated_fields.contains(&reserved) {
            return Err(ModelError::ReservedField {
                field: reserved.to_string(),
                side: "translated",
            });
        }
    }

    if translated_fields.contains(&shared.primary_key) {
        return Err(ModelError::ReservedField {
            field: shared.primary_key.to_string(),
            side: "translated",
        });
    }

    Ok(())
}

fn check_clashes(
    shared: &EntityModel,
    translated_fields: &[&'static str],
) -> Result<(), ModelError> {
    for field in translated_fields {
        if shared.has_field(field) {
            return Err(ModelError::SharedTranslatedClash {
                field: (*field).to_string(),
            });
        }
    }

    Ok(())
}

fn check_ordering(
    shared: &EntityModel,
    translated_fields: &[&'static str],
) -> Result<(), ModelError> {
    for field in shared.ordering {
        if translated_fields.contains(field) {
            return Err(ModelError::OrderingOnTranslated {
                field: (*field).to_string(),
            });
        }
        if !shared.has_field(field) {
            return Err(ModelError::OrderingUnknownField {
                field: (*field).to_string(),
            });
        }
    }

    Ok(())
}

fn partition_tuple(
    shared: &EntityModel,
    translated_fields: &[&'static str],
    tuple: &[&'static str],
) -> Result<Side, ModelError> {
    let mut side = None;

    for field in tuple {
        let this = if translated_fields.contains(field) {
            Side::Translated
        } else if shared.has_field(field) {
            Side::Shared
        } else {
            return Err(ModelError::UnknownTupleField {
                field: (*field).to_string(),
            });
        };

        match side {
            None => side = Some(this),
            Some(prev) if prev == this => {}
            Some(_) => {
                return Err(ModelError::MixedUniqueTogether {
                    fields: tuple.join(", "),
                });
            }
        }
    }

    // Empty tuples partition to the shared side; they are inert.
    Ok(side.unwrap_or(Side::Shared))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::field::FieldModel;

    const FIELDS: [FieldModel; 3] = [
        FieldModel { name: "id" },
        FieldModel { name: "shared_a" },
        FieldModel { name: "shared_b" },
    ];

    const fn model(
        ordering: &'static [&'static str],
        unique_together: &'static [&'static [&'static str]],
    ) -> EntityModel {
        EntityModel {
            path: "test::Thing",
            entity_name: "Thing",
            table: "thing",
            primary_key: "id",
            fields: &FIELDS,
            relations: &[],
            indexes: &[],
            ordering,
            unique_together,
            index_together: &[],
        }
    }

    #[test]
    fn derives_translation_table_name() {
        let m = model(&[], &[]);
        let bound = validate_binding(&m, &["title"], None, "_").unwrap();
        assert_eq!(bound.translation_table, "thing_translation");

        let bound = validate_binding(&m, &["title"], Some("thing_i18n"), "_").unwrap();
        assert_eq!(bound.translation_table, "thing_i18n");
    }

    #[test]
    fn master_language_unique_always_present() {
        let m = model(&[], &[]);
        let bound = validate_binding(&m, &["title"], None, "_").unwrap();
        assert_eq!(
            bound.translation_unique,
            vec![vec!["master".to_string(), "language_code".to_string()]]
        );
    }

    #[test]
    fn rejects_shared_translated_clash() {
        let m = model(&[], &[]);
        assert!(matches!(
            validate_binding(&m, &["shared_a"], None, "_"),
            Err(ModelError::SharedTranslatedClash { .. })
        ));
    }

    #[test]
    fn rejects_reserved_names() {
        let m = model(&[], &[]);
        assert!(matches!(
            validate_binding(&m, &["language_code"], None, "_"),
            Err(ModelError::ReservedField { .. })
        ));
    }

    #[test]
    fn rejects_ordering_on_translated() {
        static ORDERING: [&str; 1] = ["title"];
        let m = model(&ORDERING, &[]);
        assert!(matches!(
            validate_binding(&m, &["title"], None, "_"),
            Err(ModelError::OrderingOnTranslated { .. })
        ));
    }

    #[test]
    fn partitions_unique_together_by_side() {
        static SHARED_TUPLE: [&str; 2] = ["shared_a", "shared_b"];
        static TRANSLATED_TUPLE: [&str; 2] = ["title", "slug"];
        static TUPLES: [&[&str]; 2] = [&SHARED_TUPLE, &TRANSLATED_TUPLE];
        let m = model(&[], &TUPLES);

        let bound = validate_binding(&m, &["title", "slug"], None, "_").unwrap();
        assert_eq!(bound.shared_unique.len(), 1);
        // (master, language_code) plus the translated tuple
        assert_eq!(bound.translation_unique.len(), 2);
    }

    #[test]
    fn rejects_mixed_unique_together() {
        static MIXED: [&str; 2] = ["shared_a", "title"];
        static TUPLES: [&[&str]; 1] = [&MIXED];
        let m = model(&[], &TUPLES);

        assert!(matches!(
            validate_binding(&m, &["title"], None, "_"),
            Err(ModelError::MixedUniqueTogether { .. })
        ));
    }
}
