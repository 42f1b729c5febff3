//! Evaluation of MongoDB filter, sort and update documents against
//! in-memory documents.
//!
//! Supported filter syntax: implicit equality, `$eq`, `$ne`, `$in`, `$nin`,
//! `$gt`, `$gte`, `$lt`, `$lte`, `$exists`, and the `$and`/`$or`/`$nor`
//! combinators. Dot paths descend into sub-documents and across arrays.
//! Supported updates: `$set` and `$unset`.

use std::cmp::Ordering;

use bson::{Bson, Document};

use crate::error::{BackendError, StorageResult};

const BACKEND_NAME: &str = "memory";

/// Returns true if `document` satisfies `filter`.
pub(crate) fn matches(document: &Document, filter: &Document) -> StorageResult<bool> {
    for (key, condition) in filter {
        let satisfied = match key.as_str() {
            "$and" => all_match(document, condition, key)?,
            "$or" => any_match(document, condition, key)?,
            "$nor" => !any_match(document, condition, key)?,
            op if op.starts_with('$') => return Err(unsupported(op)),
            path => field_matches(&resolve(document, path), condition)?,
        };
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clauses<'a>(condition: &'a Bson, operator: &str) -> StorageResult<Vec<&'a Document>> {
    let Bson::Array(items) = condition else {
        return Err(invalid(format!("{operator} needs an array")));
    };
    items
        .iter()
        .map(|item| match item {
            Bson::Document(clause) => Ok(clause),
            _ => Err(invalid(format!("{operator} entries must be documents"))),
        })
        .collect()
}

fn all_match(document: &Document, condition: &Bson, operator: &str) -> StorageResult<bool> {
    for clause in clauses(condition, operator)? {
        if !matches(document, clause)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn any_match(document: &Document, condition: &Bson, operator: &str) -> StorageResult<bool> {
    for clause in clauses(condition, operator)? {
        if matches(document, clause)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Collects every value reachable through a dot path.
fn resolve<'a>(document: &'a Document, path: &str) -> Vec<&'a Bson> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut found = Vec::new();
    if let Some(value) = document.get(segments[0]) {
        descend(value, &segments[1..], &mut found);
    }
    found
}

fn descend<'a>(value: &'a Bson, path: &[&str], found: &mut Vec<&'a Bson>) {
    let Some((head, rest)) = path.split_first() else {
        found.push(value);
        return;
    };
    match value {
        Bson::Document(inner) => {
            if let Some(next) = inner.get(*head) {
                descend(next, rest, found);
            }
        }
        Bson::Array(items) => {
            if let Some(item) = head.parse::<usize>().ok().and_then(|i| items.get(i)) {
                descend(item, rest, found);
            }
            for item in items.iter().filter(|item| matches!(item, Bson::Document(_))) {
                descend(item, path, found);
            }
        }
        _ => {}
    }
}

fn is_operator_document(condition: &Bson) -> Option<&Document> {
    match condition {
        Bson::Document(inner)
            if !inner.is_empty() && inner.keys().all(|key| key.starts_with('$')) =>
        {
            Some(inner)
        }
        _ => None,
    }
}

fn field_matches(values: &[&Bson], condition: &Bson) -> StorageResult<bool> {
    let Some(operators) = is_operator_document(condition) else {
        return Ok(equals_any(values, condition));
    };

    for (operator, operand) in operators {
        let satisfied = match operator.as_str() {
            "$eq" => equals_any(values, operand),
            "$ne" => !equals_any(values, operand),
            "$in" => in_list(values, operand, operator)?,
            "$nin" => !in_list(values, operand, operator)?,
            "$gt" => compares_any(values, operand, |o| o == Ordering::Greater),
            "$gte" => compares_any(values, operand, |o| o != Ordering::Less),
            "$lt" => compares_any(values, operand, |o| o == Ordering::Less),
            "$lte" => compares_any(values, operand, |o| o != Ordering::Greater),
            "$exists" => exists_flag(operand) != values.is_empty(),
            other => return Err(unsupported(other)),
        };
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Equality with MongoDB semantics: a missing field equals `null`, and an
/// array field matches when it equals the operand or contains it.
fn equals_any(values: &[&Bson], expected: &Bson) -> bool {
    if values.is_empty() {
        return matches!(expected, Bson::Null);
    }
    values.iter().any(|value| {
        values_equal(value, expected)
            || matches!(value, Bson::Array(items) if items.iter().any(|item| values_equal(item, expected)))
    })
}

fn in_list(values: &[&Bson], operand: &Bson, operator: &str) -> StorageResult<bool> {
    let Bson::Array(candidates) = operand else {
        return Err(invalid(format!("{operator} needs an array")));
    };
    Ok(candidates
        .iter()
        .any(|candidate| equals_any(values, candidate)))
}

fn compares_any(values: &[&Bson], operand: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    let scalars = values.iter().flat_map(|value| match value {
        Bson::Array(items) => items.iter().collect::<Vec<_>>(),
        other => vec![*other],
    });
    scalars
        .filter_map(|value| compare_same_kind(value, operand))
        .any(accept)
}

fn exists_flag(operand: &Bson) -> bool {
    match operand {
        Bson::Boolean(flag) => *flag,
        Bson::Null => false,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        _ => true,
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

/// Orders two values of the same kind; `None` for values that cannot be
/// compared with each other.
fn compare_same_kind(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.cmp(y)),
        (Bson::Null, Bson::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn values_equal(a: &Bson, b: &Bson) -> bool {
    match compare_same_kind(a, b) {
        Some(ordering) => ordering == Ordering::Equal,
        None => a == b,
    }
}

/// Rank of a value's type in MongoDB's cross-type sort order.
fn type_rank(value: &Bson) -> u8 {
    match value {
        Bson::MinKey => 0,
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        Bson::RegularExpression(_) => 11,
        Bson::MaxKey => 13,
        _ => 12,
    }
}

fn sort_value<'a>(document: &'a Document, path: &str) -> &'a Bson {
    resolve(document, path).into_iter().next().unwrap_or(&Bson::Null)
}

/// Compares two documents by a sort document (`{field: 1 | -1, ...}`).
pub(crate) fn compare_documents(a: &Document, b: &Document, sort: &Document) -> Ordering {
    for (path, direction) in sort {
        let (x, y) = (sort_value(a, path), sort_value(b, path));
        let ordering = type_rank(x)
            .cmp(&type_rank(y))
            .then_with(|| compare_same_kind(x, y).unwrap_or(Ordering::Equal));
        let descending = as_number(direction).is_some_and(|d| d < 0.0);
        let ordering = if descending { ordering.reverse() } else { ordering };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Applies an update document in place.
pub(crate) fn apply_update(document: &mut Document, update: &Document) -> StorageResult<()> {
    if update.is_empty() {
        return Err(invalid("update document is empty".to_string()));
    }
    for (operator, fields) in update {
        let Bson::Document(fields) = fields else {
            return Err(invalid(format!("{operator} needs a document")));
        };
        match operator.as_str() {
            "$set" => {
                for (path, value) in fields {
                    set_path(document, path, value.clone())?;
                }
            }
            "$unset" => {
                for path in fields.keys() {
                    unset_path(document, path);
                }
            }
            other => return Err(unsupported(other)),
        }
    }
    Ok(())
}

fn set_path(document: &mut Document, path: &str, value: Bson) -> StorageResult<()> {
    let Some((head, rest)) = path.split_once('.') else {
        document.insert(path, value);
        return Ok(());
    };
    match document.get(head) {
        None | Some(Bson::Null) => {
            document.insert(head, Document::new());
        }
        Some(Bson::Document(_)) => {}
        Some(_) => {
            return Err(invalid(format!(
                "cannot create field '{rest}' inside non-document '{head}'"
            )));
        }
    }
    match document.get_document_mut(head) {
        Ok(inner) => set_path(inner, rest, value),
        Err(e) => Err(invalid(e.to_string())),
    }
}

fn unset_path(document: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            document.remove(path);
        }
        Some((head, rest)) => {
            if let Ok(inner) = document.get_document_mut(head) {
                unset_path(inner, rest);
            }
        }
    }
}

fn unsupported(operator: &str) -> crate::error::StorageError {
    BackendError::UnsupportedOperator {
        operator: operator.to_string(),
    }
    .into()
}

fn invalid(message: String) -> crate::error::StorageError {
    BackendError::Internal {
        backend_name: BACKEND_NAME.to_string(),
        message,
    }
    .into()
}
