//! Entity declaration macros.
//!
//! `translatable_entity!` is the model-binding surface: it splits the
//! declared fields into a shared struct and a synthesized translation
//! struct, installs the schema models (including the `(master,
//! language_code)` unique constraint), and generates the typed
//! read-through accessors on [`Combined`].
//!
//! `plain_entity!` declares a non-translatable entity with the same
//! runtime contract, for entities that only *reference* translatable
//! ones.
//!
//! [`Combined`]: crate::combined::Combined

/// Shared expansion helpers. Not part of the public surface.
#[doc(hidden)]
#[macro_export]
macro_rules! __lingua_entity_impls {
    (
        $entity:ident,
        path = $path:expr,
        name = $name:expr,
        primary_key = "id",
        model = $model:expr,
        field_names = $field_names:expr,
        translatable = $translatable:expr,
        fields = [ $( ($fname:ident, $fty:ty) ),* $(,)? ]
    ) => {
        impl $crate::traits::Path for $entity {
            const PATH: &'static str = $path;
        }

        impl $crate::traits::EntityIdentity for $entity {
            const ENTITY_NAME: &'static str = $name;
            const PRIMARY_KEY: &'static str = "id";
        }

        impl $crate::traits::EntitySchema for $entity {
            const MODEL: &'static $crate::model::entity::EntityModel = $model;
            const FIELDS: &'static [&'static str] = $field_names;
            const TRANSLATABLE: bool = $translatable;
        }

        impl $crate::traits::EntityValue for $entity {
            fn pk(&self) -> u64 {
                self.id
            }

            fn set_pk(&mut self, pk: u64) {
                self.id = pk;
            }
        }

        impl $crate::traits::FieldValues for $entity {
            fn get_value(&self, field: &str) -> Option<$crate::value::Value> {
                if field == "id" {
                    return Some($crate::value::Value::Uint(self.id));
                }
                $(
                    if field == stringify!($fname) {
                        return Some($crate::traits::FieldValue::to_value(&self.$fname));
                    }
                )*
                None
            }
        }

        impl $crate::traits::FieldWrite for $entity {
            fn set_value(
                &mut self,
                field: &str,
                value: &$crate::value::Value,
            ) -> Result<(), $crate::value::CoercionError> {
                if field == "id" {
                    self.id = <u64 as $crate::traits::FieldValue>::from_value(value)
                        .ok_or_else(|| $crate::value::CoercionError::new(field, "u64"))?;
                    return Ok(());
                }
                $(
                    if field == stringify!($fname) {
                        self.$fname = <$fty as $crate::traits::FieldValue>::from_value(value)
                            .ok_or_else(|| {
                                $crate::value::CoercionError::new(field, stringify!($fty))
                            })?;
                        return Ok(());
                    }
                )*
                Err($crate::value::CoercionError::new(field, "declared field"))
            }
        }

        impl $crate::traits::FromRow for $entity {
            fn from_row(
                row: &$crate::store::row::Row,
            ) -> Result<Self, $crate::value::CoercionError> {
                let mut entity = Self::default();
                if let Some(value) = row.get("id") {
                    if !value.is_null() {
                        entity.id = <u64 as $crate::traits::FieldValue>::from_value(value)
                            .ok_or_else(|| $crate::value::CoercionError::new("id", "u64"))?;
                    }
                }
                $(
                    if let Some(value) = row.get(stringify!($fname)) {
                        if value.is_null() {
                            entity.$fname = Default::default();
                        } else {
                            entity.$fname =
                                <$fty as $crate::traits::FieldValue>::from_value(value)
                                    .ok_or_else(|| {
                                        $crate::value::CoercionError::new(
                                            stringify!($fname),
                                            stringify!($fty),
                                        )
                                    })?;
                        }
                    }
                )*
                Ok(entity)
            }
        }
    };
}

///
/// plain_entity
///
/// Declare a non-translatable entity. Relations are foreign keys to
/// other entities' primary keys; the relation name doubles as the
/// column name.
///

#[macro_export]
macro_rules! plain_entity {
    (
        $(#[$meta:meta])*
        $vis:vis entity $entity:ident {
            path = $path:expr;
            name = $name:expr;
            table = $table:expr;
            fields { $( $fname:ident : $fty:ty ),* $(,)? }
            $( relations { $( $rname:ident : $rtarget:ty ),* $(,)? } )?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Clone, Debug, Default, PartialEq, ::serde::Serialize, ::serde::Deserialize,
        )]
        $vis struct $entity {
            pub id: u64,
            $( pub $fname: $fty, )*
            $( $( pub $rname: u64, )* )?
        }

        impl $entity {
            #[doc(hidden)]
            pub const __MODEL: $crate::model::entity::EntityModel =
                $crate::model::entity::EntityModel {
                    path: $path,
                    entity_name: $name,
                    table: $table,
                    primary_key: "id",
                    fields: &[
                        $crate::model::field::FieldModel { name: "id" },
                        $( $crate::model::field::FieldModel { name: stringify!($fname) }, )*
                        $( $( $crate::model::field::FieldModel { name: stringify!($rname) }, )* )?
                    ],
                    relations: &[
                        $( $(
                            $crate::model::field::RelationModel {
                                name: stringify!($rname),
                                local_field: stringify!($rname),
                                target_path: <$rtarget as $crate::traits::Path>::PATH,
                                target_translatable:
                                    <$rtarget as $crate::traits::EntitySchema>::TRANSLATABLE,
                                on_translation: false,
                            },
                        )* )?
                    ],
                    indexes: &[],
                    ordering: &[],
                    unique_together: &[],
                    index_together: &[],
                };
        }

        $crate::__lingua_entity_impls! {
            $entity,
            path = $path,
            name = $name,
            primary_key = "id",
            model = &$entity::__MODEL,
            field_names = &[
                "id",
                $( stringify!($fname), )*
                $( $( stringify!($rname), )* )?
            ],
            translatable = false,
            fields = [
                $( ($fname, $fty), )*
                $( $( ($rname, u64), )* )?
            ]
        }
    };
}

///
/// translatable_entity
///
/// Declare a translatable entity: shared fields on the entity itself, a
/// `translated` grouping that becomes the synthesized translation
/// sibling, plus optional meta (`db_table`, `ordering`,
/// `unique_together`, `index_together`).
///
/// The synthesized translation carries `language_code`, a nullable
/// `master` foreign key (reverse-named `translations`), and every
/// declared translated field. Binding validation at registration
/// enforces the clash, ordering, and tuple-partition rules.
///

#[macro_export]
macro_rules! translatable_entity {
    (
        $(#[$meta:meta])*
        $vis:vis entity $entity:ident {
            path = $path:expr;
            name = $name:expr;
            table = $table:expr;
            $( db_table = $db_table:expr; )?
            fields { $( $sfname:ident : $sfty:ty ),* $(,)? }
            $( relations { $( $srname:ident : $srtarget:ty ),* $(,)? } )?
            translated $translation:ident {
                fields { $( $tfname:ident : $tfty:ty ),* $(,)? }
                $( relations { $( $trname:ident : $trtarget:ty ),* $(,)? } )?
            }
            accessors $accessors:ident;
            $( ordering = [ $( $ofield:ident ),* $(,)? ]; )?
            $( unique_together = [ $( ( $( $uf:ident ),+ $(,)? ) ),* $(,)? ]; )?
            $( index_together = [ $( ( $( $xf:ident ),+ $(,)? ) ),* $(,)? ]; )?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Clone, Debug, Default, PartialEq, ::serde::Serialize, ::serde::Deserialize,
        )]
        $vis struct $entity {
            pub id: u64,
            $( pub $sfname: $sfty, )*
            $( $( pub $srname: u64, )* )?
        }

        /// Synthesized translation row of the shared entity.
        #[derive(
            Clone, Debug, Default, PartialEq, ::serde::Serialize, ::serde::Deserialize,
        )]
        $vis struct $translation {
            pub id: u64,
            pub language_code: $crate::config::LanguageCode,
            pub master: Option<u64>,
            $( pub $tfname: $tfty, )*
            $( $( pub $trname: u64, )* )?
        }

        impl $entity {
            #[doc(hidden)]
            pub const __MODEL: $crate::model::entity::EntityModel =
                $crate::model::entity::EntityModel {
                    path: $path,
                    entity_name: $name,
                    table: $table,
                    primary_key: "id",
                    fields: &[
                        $crate::model::field::FieldModel { name: "id" },
                        $( $crate::model::field::FieldModel { name: stringify!($sfname) }, )*
                        $( $( $crate::model::field::FieldModel { name: stringify!($srname) }, )* )?
                    ],
                    relations: &[
                        $( $(
                            $crate::model::field::RelationModel {
                                name: stringify!($srname),
                                local_field: stringify!($srname),
                                target_path: <$srtarget as $crate::traits::Path>::PATH,
                                target_translatable:
                                    <$srtarget as $crate::traits::EntitySchema>::TRANSLATABLE,
                                on_translation: false,
                            },
                        )* )?
                    ],
                    indexes: &[],
                    ordering: &[ $( $( stringify!($ofield), )* )? ],
                    unique_together: &[
                        $( $( &[ $( stringify!($uf), )+ ], )* )?
                    ],
                    index_together: &[
                        $( $( &[ $( stringify!($xf), )+ ], )* )?
                    ],
                };

            #[doc(hidden)]
            pub const __TRANSLATION_MODEL: $crate::model::entity::EntityModel =
                $crate::model::entity::EntityModel {
                    path: concat!($path, "Translation"),
                    entity_name: concat!($name, "Translation"),
                    table: "translation",
                    primary_key: "id",
                    fields: &[
                        $crate::model::field::FieldModel { name: "id" },
                        $crate::model::field::FieldModel { name: "language_code" },
                        $crate::model::field::FieldModel { name: "master" },
                        $( $crate::model::field::FieldModel { name: stringify!($tfname) }, )*
                        $( $( $crate::model::field::FieldModel { name: stringify!($trname) }, )* )?
                    ],
                    relations: &[
                        $( $(
                            $crate::model::field::RelationModel {
                                name: stringify!($trname),
                                local_field: stringify!($trname),
                                target_path: <$trtarget as $crate::traits::Path>::PATH,
                                target_translatable:
                                    <$trtarget as $crate::traits::EntitySchema>::TRANSLATABLE,
                                on_translation: true,
                            },
                        )* )?
                    ],
                    indexes: &[
                        $crate::model::index::IndexModel {
                            fields: &["language_code"],
                            unique: false,
                        },
                        $crate::model::index::IndexModel {
                            fields: &["master"],
                            unique: false,
                        },
                    ],
                    ordering: &[],
                    unique_together: &[],
                    index_together: &[],
                };
        }

        $crate::__lingua_entity_impls! {
            $entity,
            path = $path,
            name = $name,
            primary_key = "id",
            model = &$entity::__MODEL,
            field_names = &[
                "id",
                $( stringify!($sfname), )*
                $( $( stringify!($srname), )* )?
            ],
            translatable = true,
            fields = [
                $( ($sfname, $sfty), )*
                $( $( ($srname, u64), )* )?
            ]
        }

        $crate::__lingua_entity_impls! {
            $translation,
            path = concat!($path, "Translation"),
            name = concat!($name, "Translation"),
            primary_key = "id",
            model = &$entity::__TRANSLATION_MODEL,
            field_names = &[
                "id",
                "language_code",
                "master",
                $( stringify!($tfname), )*
                $( $( stringify!($trname), )* )?
            ],
            translatable = false,
            fields = [
                (language_code, $crate::config::LanguageCode),
                (master, Option<u64>),
                $( ($tfname, $tfty), )*
                $( $( ($trname, u64), )* )?
            ]
        }

        impl $crate::traits::TranslatableKind for $entity {
            type Translation = $translation;

            const TRANSLATED_FIELDS: &'static [&'static str] = &[
                $( stringify!($tfname), )*
                $( $( stringify!($trname), )* )?
            ];

            const TRANSLATION_TABLE: Option<&'static str> =
                $crate::translatable_entity!(@db_table $( $db_table )?);

            const TRANSLATION_MODEL: &'static $crate::model::entity::EntityModel =
                &$entity::__TRANSLATION_MODEL;
        }

        impl $crate::traits::TranslationKind for $translation {
            type Master = $entity;

            fn language_code(&self) -> &$crate::config::LanguageCode {
                &self.language_code
            }

            fn master(&self) -> Option<u64> {
                self.master
            }

            fn set_master(&mut self, master: Option<u64>) {
                self.master = master;
            }

            fn new_unsaved(
                language: $crate::config::LanguageCode,
                master: Option<u64>,
            ) -> Self {
                Self {
                    language_code: language,
                    master,
                    ..Self::default()
                }
            }
        }

        // Typed read-through accessors: translated attributes read as
        // first-class on the combined instance, resolving the attached
        // translation under the autoload policy.
        $vis trait $accessors {
            $(
                fn $tfname(&mut self) -> Result<$tfty, $crate::error::Error>;
            )*
        }

        impl $accessors for $crate::combined::Combined<$entity> {
            $(
                fn $tfname(&mut self) -> Result<$tfty, $crate::error::Error> {
                    Ok(self.translated()?.$tfname.clone())
                }
            )*
        }
    };
    (@db_table $db_table:expr) => {
        Some($db_table)
    };
    (@db_table) => {
        None
    };
}
