use crate::{
    traits::{EntitySchema, FieldValues},
    value::Value,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// Row
///
/// One stored record: an ordered field → value map. Rows are the wire
/// format between typed entities and the store; `FromRow` rebuilds the
/// typed side.
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Row(BTreeMap<String, Value>);

impl Row {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Field value, with missing columns read as Null.
    #[must_use]
    pub fn value_or_null(&self, field: &str) -> Value {
        self.0.get(field).cloned().unwrap_or(Value::Null)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Overlay `patch` onto this row.
    pub fn apply(&mut self, patch: &[(String, Value)]) {
        for (field, value) in patch {
            self.0.insert(field.clone(), value.clone());
        }
    }

    /// Project a typed entity into a row using its declared field list.
    #[must_use]
    pub fn from_entity<E>(entity: &E) -> Self
    where
        E: EntitySchema + FieldValues,
    {
        let mut row = Self::new();
        for field in E::MODEL.fields {
            row.set(field.name, entity.get_value(field.name).unwrap_or(Value::Null));
        }

        row
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
