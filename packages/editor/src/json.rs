//! Field-tail edits on serialized artboards, nodes and documents

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Structural equality where numbers compare by value (`1` == `1.0`)
pub fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| json_eq(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, a)| y.get(key).map_or(false, |b| json_eq(a, b)))
        }
        _ => a == b,
    }
}

pub(crate) fn get<'v>(root: &'v Value, tokens: &[String]) -> Option<&'v Value> {
    tokens.iter().try_fold(root, |current, token| match current {
        Value::Object(map) => map.get(token),
        Value::Array(items) => array_index(token).and_then(|i| items.get(i)),
        _ => None,
    })
}

fn get_mut<'v>(root: &'v mut Value, tokens: &[String]) -> Option<&'v mut Value> {
    let mut current = root;
    for token in tokens {
        current = match current {
            Value::Object(map) => map.get_mut(token)?,
            Value::Array(items) => items.get_mut(array_index(token)?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn array_index(token: &str) -> Option<usize> {
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Result of a field `add`
pub(crate) struct Added {
    /// Member value that the add overwrote
    pub previous: Option<Value>,
    /// Concrete last token (`-` resolved to an index)
    pub token: String,
}

pub(crate) fn add(root: &mut Value, tokens: &[String], value: Value) -> Option<Added> {
    let (last, parents) = tokens.split_last()?;
    match get_mut(root, parents)? {
        Value::Object(map) => Some(Added {
            previous: map.insert(last.clone(), value),
            token: last.clone(),
        }),
        Value::Array(items) => {
            let index = if last == "-" {
                items.len()
            } else {
                array_index(last).filter(|i| *i <= items.len())?
            };
            items.insert(index, value);
            Some(Added {
                previous: None,
                token: index.to_string(),
            })
        }
        _ => None,
    }
}

pub(crate) fn remove(root: &mut Value, tokens: &[String]) -> Option<Value> {
    let (last, parents) = tokens.split_last()?;
    match get_mut(root, parents)? {
        Value::Object(map) => map.remove(last),
        Value::Array(items) => {
            let index = array_index(last).filter(|i| *i < items.len())?;
            Some(items.remove(index))
        }
        _ => None,
    }
}

pub(crate) fn replace(root: &mut Value, tokens: &[String], value: Value) -> Option<Value> {
    let target = get_mut(root, tokens)?;
    Some(std::mem::replace(target, value))
}

/// Round-trip `target` through JSON, apply `edit`, and read it back
///
/// `Ok(None)` means the edit could not find its location; `target` is
/// left untouched in that case.
pub(crate) fn edit_as_json<T, R>(
    target: &mut T,
    edit: impl FnOnce(&mut Value) -> Option<R>,
) -> Result<Option<R>, serde_json::Error>
where
    T: Serialize + DeserializeOwned,
{
    let mut value = serde_json::to_value(&*target)?;
    let Some(result) = edit(&mut value) else {
        return Ok(None);
    };
    *target = serde_json::from_value(value)?;
    Ok(Some(result))
}
