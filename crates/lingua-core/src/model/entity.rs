use crate::model::{
    field::{FieldModel, RelationModel},
    index::IndexModel,
};

///
/// EntityModel
/// Minimal, macro-generated runtime model for one entity.
///

#[derive(Debug)]
pub struct EntityModel {
    /// Fully-qualified schema path (for dispatch and diagnostics).
    pub path: &'static str,
    /// Stable external name used in diagnostics.
    pub entity_name: &'static str,
    /// Base table name for derived DDL naming.
    pub table: &'static str,
    /// Primary key field name.
    pub primary_key: &'static str,
    /// Ordered field list (authoritative for runtime planning).
    pub fields: &'static [FieldModel],
    /// Declared foreign keys.
    pub relations: &'static [RelationModel],
    /// Index definitions.
    pub indexes: &'static [IndexModel],
    /// Declared default ordering (shared fields only; validated at binding).
    pub ordering: &'static [&'static str],
    /// Declared unique-together tuples as authored, unpartitioned.
    pub unique_together: &'static [&'static [&'static str]],
    /// Declared index-together tuples as authored, unpartitioned.
    pub index_together: &'static [&'static [&'static str]],
}

impl EntityModel {
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&RelationModel> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Field names in declaration order.
    #[must_use]
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }
}
