//! Index models.

use crate::filter::SortDirection;

/// An index to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexModel {
    /// Key fields with their directions, in order.
    pub keys: Vec<(String, SortDirection)>,
    /// Explicit name. When absent the name is derived from the keys.
    pub name: Option<String>,
}

impl IndexModel {
    /// Single-field index.
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            keys: vec![(field.into(), direction)],
            name: None,
        }
    }

    /// Adds another key field.
    #[must_use]
    pub fn then(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.keys.push((field.into(), direction));
        self
    }

    /// Sets an explicit name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The name the index is stored under: the explicit one, or
    /// `<field>_<dir>` pairs joined by `_` (`level_1`, `level_-1_name_1`).
    pub fn index_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        self.keys
            .iter()
            .map(|(field, direction)| format!("{field}_{}", direction.as_i32()))
            .collect::<Vec<_>>()
            .join("_")
    }
}

/// An existing index, as listed by a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    /// Index name.
    pub name: String,
    /// Key fields with their directions.
    pub keys: Vec<(String, SortDirection)>,
}

impl From<&IndexModel> for IndexInfo {
    fn from(model: &IndexModel) -> Self {
        Self {
            name: model.index_name(),
            keys: model.keys.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_names() {
        assert_eq!(
            IndexModel::new("level", SortDirection::Ascending).index_name(),
            "level_1"
        );
        assert_eq!(
            IndexModel::new("level", SortDirection::Descending)
                .then("name", SortDirection::Ascending)
                .index_name(),
            "level_-1_name_1"
        );
    }

    #[test]
    fn explicit_name_wins() {
        let model = IndexModel::new("level", SortDirection::Ascending).named("by_level");
        assert_eq!(model.index_name(), "by_level");
        assert_eq!(IndexInfo::from(&model).name, "by_level");
    }
}
