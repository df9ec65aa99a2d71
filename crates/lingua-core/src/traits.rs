use crate::{
    config::LanguageCode,
    model::entity::EntityModel,
    store::row::Row,
    value::{CoercionError, Value},
};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Debug;

// ============================================================================
// FOUNDATIONAL KINDS
// ============================================================================

///
/// Path
/// Fully-qualified schema path.
///

pub trait Path {
    const PATH: &'static str;
}

// ============================================================================
// ENTITY IDENTITY & SCHEMA
// ============================================================================
//
// These traits describe *what an entity is*, not how it is stored
// or manipulated at runtime.
//

///
/// EntityIdentity
///
/// Semantic naming metadata about an entity.
///

pub trait EntityIdentity: Path {
    const ENTITY_NAME: &'static str;
    const PRIMARY_KEY: &'static str;
}

///
/// EntitySchema
///
/// Declared schema facts for an entity.
///

pub trait EntitySchema: EntityIdentity {
    const MODEL: &'static EntityModel;
    const FIELDS: &'static [&'static str];
    const TRANSLATABLE: bool = false;
}

// ============================================================================
// ENTITY VALUES
// ============================================================================

///
/// EntityValue
///
/// A concrete entity value exposing its primary key.
///

pub trait EntityValue {
    fn pk(&self) -> u64;
    fn set_pk(&mut self, pk: u64);
}

///
/// FieldValues
///
/// Read access to field values by name.
///

pub trait FieldValues {
    fn get_value(&self, field: &str) -> Option<Value>;
}

///
/// FieldWrite
///
/// Write access to field values by name. Unknown names and type
/// mismatches are coercion errors; callers decide how to surface them.
///

pub trait FieldWrite {
    fn set_value(&mut self, field: &str, value: &Value) -> Result<(), CoercionError>;
}

///
/// FromRow
///
/// Construct a typed entity from a stored row. Missing columns take the
/// field's default; this is what makes deferred projection representable
/// on plain structs.
///

pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self, CoercionError>;
}

///
/// EntityKind
///
/// Fully runtime-bound entity. This is the *maximum* entity contract and
/// should only be required by code that actually touches storage or
/// execution.
///

pub trait EntityKind:
    EntitySchema
    + EntityValue
    + FieldValues
    + FieldWrite
    + FromRow
    + Clone
    + Debug
    + Default
    + Serialize
    + DeserializeOwned
    + 'static
{
}

impl<T> EntityKind for T where
    T: EntitySchema
        + EntityValue
        + FieldValues
        + FieldWrite
        + FromRow
        + Clone
        + Debug
        + Default
        + Serialize
        + DeserializeOwned
        + 'static
{
}

// ============================================================================
// TRANSLATION CONTRACTS
// ============================================================================

///
/// TranslatableKind
///
/// A shared entity that splits language-dependent fields into a sibling
/// translation entity.
///

pub trait TranslatableKind: EntityKind {
    type Translation: TranslationKind<Master = Self>;

    /// Names of the fields that live on the translation side.
    const TRANSLATED_FIELDS: &'static [&'static str];

    /// Reverse-relation accessor name from shared to translations.
    const ACCESSOR: &'static str = "translations";

    /// Explicit translation table name (`db_table` meta); when `None`,
    /// the name derives from the shared table and the configured
    /// separator at binding time.
    const TRANSLATION_TABLE: Option<&'static str> = None;

    const TRANSLATION_MODEL: &'static EntityModel;
}

///
/// TranslationKind
///
/// The auto-generated language row of one [`TranslatableKind`].
///

pub trait TranslationKind: EntityKind {
    type Master: TranslatableKind<Translation = Self>;

    fn language_code(&self) -> &LanguageCode;

    fn master(&self) -> Option<u64>;

    fn set_master(&mut self, master: Option<u64>);

    /// Construct an unsaved translation row for `language`, optionally
    /// pre-bound to a master. Translated fields take their defaults.
    fn new_unsaved(language: LanguageCode, master: Option<u64>) -> Self;
}

// ============================================================================
// QUERY VALUE BOUNDARIES
// ============================================================================

///
/// FieldValue
///
/// Conversion boundary for values used in query predicates and rows.
/// Represents values that can appear on either side of predicates.
///

pub trait FieldValue {
    fn to_value(&self) -> Value;

    #[must_use]
    fn from_value(value: &Value) -> Option<Self>
    where
        Self: Sized;
}

impl FieldValue for &str {
    fn to_value(&self) -> Value {
        Value::Text((*self).to_string())
    }

    fn from_value(_value: &Value) -> Option<Self> {
        None
    }
}

impl FieldValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FieldValue for LanguageCode {
    fn to_value(&self) -> Value {
        Value::Text(self.as_str().to_string())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(v) => Some(Self::new(v.clone())),
            _ => None,
        }
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        if value.is_null() {
            return Some(None);
        }

        T::from_value(value).map(Some)
    }
}

// impl_field_value
#[macro_export]
macro_rules! impl_field_value {
    ( $( $type:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl $crate::traits::FieldValue for $type {
                fn to_value(&self) -> $crate::value::Value {
                    $crate::value::Value::$variant((*self).into())
                }

                fn from_value(value: &$crate::value::Value) -> Option<Self> {
                    match value {
                        $crate::value::Value::$variant(v) => (*v).try_into().ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_field_value!(
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Uint,
    u16 => Uint,
    u32 => Uint,
    u64 => Uint,
    bool => Bool,
);
