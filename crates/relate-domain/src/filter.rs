use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterComparator {
    #[default]
    Equals,
    NotEquals,
    Contains,
}

/// Declarative predicate over one top-level field of an entity's JSON form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityFilter {
    pub field: String,
    pub value: String,
    #[serde(default, rename = "type")]
    pub comparator: FilterComparator,
}

impl EntityFilter {
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            comparator: FilterComparator::Equals,
        }
    }

    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            comparator: FilterComparator::Contains,
        }
    }

    fn matches(&self, entity: &Value) -> bool {
        let field = entity.get(&self.field).map(render_field);
        match self.comparator {
            FilterComparator::Equals => field.is_some_and(|v| v == self.value),
            FilterComparator::NotEquals => field.is_none_or(|v| v != self.value),
            FilterComparator::Contains => field.is_some_and(|v| v.contains(&self.value)),
        }
    }
}

fn render_field(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Keeps the entities matching every filter; an empty filter list keeps all.
pub fn apply_entity_filters<T: Serialize>(items: Vec<T>, filters: &[EntityFilter]) -> Vec<T> {
    if filters.is_empty() {
        return items;
    }
    items
        .into_iter()
        .filter(|item| {
            let Ok(value) = serde_json::to_value(item) else {
                return false;
            };
            filters.iter().all(|filter| filter.matches(&value))
        })
        .collect()
}
