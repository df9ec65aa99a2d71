///
/// IndexModel
/// Index definition; field order is significant.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IndexModel {
    pub fields: &'static [&'static str],
    pub unique: bool,
}
