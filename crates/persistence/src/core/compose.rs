//! Query composition.
//!
//! Translates [`FilterParams`], [`SortParams`] and [`UpdateMap`] into
//! MongoDB filter, sort and update documents. The inputs are only read.

use bson::{Bson, Document, doc};

use crate::types::{FilterParams, IDS_FILTER_KEY, SortParams, UpdateMap, split_list};

use super::convert::ID_FIELD;

/// Builds a filter document from key/value criteria.
///
/// - a string value with more than one comma-separated token becomes
///   `{key: {$in: [...]}}`;
/// - any other value becomes an equality `{key: value}`, keeping its type;
/// - the key `ids` always becomes `{_id: {$in: [...]}}`, taking the tokens
///   of a string, the items of an array, or a single other value.
///
/// Empty criteria compose to `{}`, which matches every document.
///
/// # Example
///
/// ```
/// use bson::doc;
/// use mongodb_persistence::core::compose_filter;
/// use mongodb_persistence::types::FilterParams;
///
/// let filter = FilterParams::from_tuples([("key", "Key 1"), ("ids", "1,2")]).with("count", 5);
/// assert_eq!(
///     compose_filter(&filter),
///     doc! { "_id": { "$in": ["1", "2"] }, "count": 5, "key": "Key 1" },
/// );
/// ```
pub fn compose_filter(filter: &FilterParams) -> Document {
    let mut document = Document::new();
    for (key, value) in filter.iter() {
        if key == IDS_FILTER_KEY {
            let ids = match value {
                Bson::String(s) => split_list(s).into_iter().map(Bson::from).collect(),
                Bson::Array(items) => items.clone(),
                other => vec![other.clone()],
            };
            document.insert(ID_FIELD, doc! { "$in": ids });
            continue;
        }
        match value {
            Bson::String(s) if split_list(s).len() > 1 => {
                document.insert(key, doc! { "$in": split_list(s) });
            }
            other => {
                document.insert(key, other.clone());
            }
        }
    }
    document
}

/// Builds a filter matching any of the given identifiers.
pub fn compose_ids_filter(ids: Vec<Bson>) -> Document {
    doc! { ID_FIELD: { "$in": ids } }
}

/// Builds a filter matching one identifier.
pub fn compose_id_filter(id: Bson) -> Document {
    doc! { ID_FIELD: id }
}

/// Builds a multi-key sort document, `1` ascending and `-1` descending.
///
/// Returns `None` for an empty sort, meaning the driver's natural order.
pub fn compose_sort(sort: &SortParams) -> Option<Document> {
    if sort.is_empty() {
        return None;
    }
    Some(
        sort.iter()
            .map(|field| (field.name.clone(), Bson::Int32(if field.ascending { 1 } else { -1 })))
            .collect(),
    )
}

/// Builds a `$set` update document from field assignments.
///
/// An empty map composes to `{}`; callers must not send that to the store.
pub fn compose_update(update: &UpdateMap) -> Document {
    if update.is_empty() {
        return Document::new();
    }
    doc! { "$set": update.as_document().clone() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SortField;

    #[test]
    fn test_compose_empty_filter() {
        assert_eq!(compose_filter(&FilterParams::new()), Document::new());
    }

    #[test]
    fn test_compose_equality_and_membership() {
        let filter = FilterParams::new()
            .with("key", "Key 1")
            .with("content", "a, b")
            .with("inner_dummy.name", "x,");
        assert_eq!(
            compose_filter(&filter),
            doc! {
                "content": { "$in": ["a", "b"] },
                "inner_dummy.name": "x,",
                "key": "Key 1",
            }
        );
    }

    #[test]
    fn test_compose_ids_always_membership() {
        let filter = FilterParams::new().with("ids", "1");
        assert_eq!(compose_filter(&filter), doc! { "_id": { "$in": ["1"] } });
    }

    #[test]
    fn test_compose_keeps_value_types() {
        let filter = FilterParams::new()
            .with("count", 5)
            .with("active", true)
            .with("ratio", 0.5);
        assert_eq!(
            compose_filter(&filter),
            doc! { "active": true, "count": 5, "ratio": 0.5 }
        );
    }

    #[test]
    fn test_compose_typed_ids() {
        let filter = FilterParams::new().with("ids", 7);
        assert_eq!(compose_filter(&filter), doc! { "_id": { "$in": [7] } });

        let filter = FilterParams::new().with("ids", vec![Bson::Int32(1), Bson::Int32(2)]);
        assert_eq!(compose_filter(&filter), doc! { "_id": { "$in": [1, 2] } });
    }

    #[test]
    fn test_compose_filter_does_not_mutate_input() {
        let filter = FilterParams::new().with("ids", "1,2");
        let before = filter.clone();
        let _ = compose_filter(&filter);
        assert_eq!(filter, before);
    }

    #[test]
    fn test_compose_sort() {
        assert_eq!(compose_sort(&SortParams::new()), None);

        let sort = SortParams::new()
            .with(SortField::desc("key"))
            .with(SortField::asc("content"));
        let document = compose_sort(&sort).unwrap();
        assert_eq!(document, doc! { "key": -1, "content": 1 });
        let keys: Vec<_> = document.keys().collect();
        assert_eq!(keys, vec!["key", "content"]);
    }

    #[test]
    fn test_compose_update() {
        assert_eq!(compose_update(&UpdateMap::new()), Document::new());

        let update = UpdateMap::new()
            .with("content", "Modified")
            .with("inner_dummy.description", "Changed");
        assert_eq!(
            compose_update(&update),
            doc! { "$set": { "content": "Modified", "inner_dummy.description": "Changed" } }
        );
    }
}
