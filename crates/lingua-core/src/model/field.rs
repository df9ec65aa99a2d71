///
/// FieldModel
/// Minimal, macro-generated runtime model for one field.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FieldModel {
    pub name: &'static str,
}

///
/// RelationModel
///
/// A foreign key declared on an entity. `on_translation` marks a
/// translated foreign key, i.e. one whose column lives on the
/// translation side of the split.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RelationModel {
    /// Logical name used in query paths.
    pub name: &'static str,
    /// Column holding the target primary key.
    pub local_field: &'static str,
    /// Schema path of the referenced shared entity.
    pub target_path: &'static str,
    pub target_translatable: bool,
    pub on_translation: bool,
}
