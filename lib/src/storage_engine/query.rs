// lib/src/storage_engine/query.rs

use std::cmp::Ordering;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use models::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Equal { field: String, value: Value },
    Range { field: String, gte: Option<Value>, lte: Option<Value> },
    /// Case-insensitive substring match over any of `fields`.
    Search { fields: Vec<String>, text: String },
}

/// Filters, ordering and pagination applied to one collection. `id`,
/// `created_at` and `updated_at` address document metadata; every other name
/// addresses a top-level payload field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, SortOrder)>,
    pub offset: usize,
    pub limit: Option<usize>,
}

/// One page of results plus the number of matches before pagination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub total: usize,
    pub offset: usize,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn map<U, E, F>(self, f: F) -> Result<Page<U>, E>
    where
        F: FnMut(T) -> Result<U, E>,
    {
        Ok(Page {
            total: self.total,
            offset: self.offset,
            items: self.items.into_iter().map(f).collect::<Result<Vec<_>, E>>()?,
        })
    }
}

impl Query {
    pub fn new() -> Self {
        Query::default()
    }

    pub fn equal(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Equal {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn range(mut self, field: &str, gte: Option<Value>, lte: Option<Value>) -> Self {
        if gte.is_some() || lte.is_some() {
            self.filters.push(Filter::Range {
                field: field.to_string(),
                gte,
                lte,
            });
        }
        self
    }

    pub fn search(mut self, fields: &[&str], text: &str) -> Self {
        let text = text.trim();
        if !text.is_empty() {
            self.filters.push(Filter::Search {
                fields: fields.iter().map(|f| f.to_string()).collect(),
                text: text.to_lowercase(),
            });
        }
        self
    }

    pub fn order_by(mut self, field: &str, order: SortOrder) -> Self {
        self.order_by = Some((field.to_string(), order));
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.filters.iter().all(|filter| match filter {
            Filter::Equal { field, value } => field_value(document, field).as_ref() == Some(value),
            Filter::Range { field, gte, lte } => {
                let Some(actual) = field_value(document, field) else {
                    return false;
                };
                let above = gte.as_ref().map_or(true, |low| {
                    matches!(compare_values(&actual, low), Some(Ordering::Greater | Ordering::Equal))
                });
                let below = lte.as_ref().map_or(true, |high| {
                    matches!(compare_values(&actual, high), Some(Ordering::Less | Ordering::Equal))
                });
                above && below
            }
            Filter::Search { fields, text } => fields.iter().any(|field| {
                matches!(field_value(document, field), Some(Value::String(s)) if s.to_lowercase().contains(text.as_str()))
            }),
        })
    }

    /// Filters, sorts and paginates `documents`. Without an explicit order,
    /// documents come back oldest first with the id as tie breaker.
    pub fn apply(&self, documents: impl IntoIterator<Item = Document>) -> Page<Document> {
        let mut matched: Vec<Document> = documents.into_iter().filter(|d| self.matches(d)).collect();

        match &self.order_by {
            Some((field, order)) => matched.sort_by(|a, b| {
                let ordering = match (field_value(a, field), field_value(b, field)) {
                    (Some(x), Some(y)) => compare_values(&x, &y).unwrap_or(Ordering::Equal),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                let ordering = match order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                };
                ordering.then_with(|| a.id.cmp(&b.id))
            }),
            None => matched.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id))),
        }

        let total = matched.len();
        let items = matched
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect();
        Page {
            total,
            offset: self.offset,
            items,
        }
    }
}

fn field_value(document: &Document, field: &str) -> Option<Value> {
    match field {
        "id" => Some(Value::String(document.id.to_string())),
        "created_at" => Some(Value::String(document.created_at.to_rfc3339())),
        "updated_at" => Some(Value::String(document.updated_at.to_rfc3339())),
        _ => document.data.get(field).filter(|v| !v.is_null()).cloned(),
    }
}

/// Orders two JSON scalars. Numbers compare numerically, RFC 3339 strings
/// compare as instants, other strings lexically. Mixed types are unordered.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => {
            match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                (Ok(x), Ok(y)) => Some(x.cmp(&y)),
                _ => Some(x.cmp(y)),
            }
        }
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::DocumentId;
    use serde_json::json;

    fn doc(id: &str, data: Value) -> Document {
        Document::new("doctors", id.parse::<DocumentId>().unwrap(), data)
    }

    fn sample() -> Vec<Document> {
        vec![
            doc("a", json!({"name": "Ana Lima", "specialty": 1, "fee": 120})),
            doc("b", json!({"name": "Bruno Alves", "specialty": 2, "fee": 80})),
            doc("c", json!({"name": "Carla Anaya", "specialty": 1, "fee": 200})),
            doc("d", json!({"name": "Dan", "specialty": 3})),
        ]
    }

    fn ids(page: &Page<Document>) -> Vec<&str> {
        page.items.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn equality_and_search() {
        let page = Query::new().equal("specialty", 1).apply(sample());
        assert_eq!(page.total, 2);

        let page = Query::new().search(&["name"], "ANA").order_by("name", SortOrder::Asc).apply(sample());
        assert_eq!(ids(&page), vec!["a", "c"]);
    }

    #[test]
    fn range_excludes_missing_fields() {
        let page = Query::new()
            .range("fee", Some(json!(100)), None)
            .order_by("fee", SortOrder::Desc)
            .apply(sample());
        assert_eq!(ids(&page), vec!["c", "a"]);

        let page = Query::new().range("fee", None, Some(json!(120))).apply(sample());
        assert_eq!(page.total, 2);
    }

    #[test]
    fn pagination_reports_total() {
        let page = Query::new().order_by("name", SortOrder::Asc).offset(1).limit(2).apply(sample());
        assert_eq!(page.total, 4);
        assert_eq!(page.offset, 1);
        assert_eq!(ids(&page), vec!["b", "c"]);
    }

    #[test]
    fn timestamps_compare_as_instants() {
        let early = json!("2026-03-09T09:00:00.500Z");
        let late = json!("2026-03-09T09:00:01Z");
        assert_eq!(compare_values(&early, &late), Some(Ordering::Less));
        assert_eq!(compare_values(&json!(1), &json!("1")), None);
    }

    #[test]
    fn blank_search_and_empty_range_are_ignored() {
        let query = Query::new().search(&["name"], "   ").range("fee", None, None);
        assert!(query.filters.is_empty());
    }

    #[test]
    fn missing_fields_sort_last() {
        let page = Query::new().order_by("fee", SortOrder::Asc).apply(sample());
        assert_eq!(ids(&page), vec!["b", "a", "c", "d"]);
    }
}
