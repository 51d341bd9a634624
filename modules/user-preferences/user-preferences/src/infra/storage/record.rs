//! DynamoDB item layout and update expressions for a preference set.
//!
//! One item per user:
//! `PK = "USER#<id>"`, `preferences` (map of strings), `createdAt`,
//! `updatedAt` (RFC 3339, UTC).

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use user_preferences_sdk::Preferences;

use crate::domain::repo::StoreError;

pub const PARTITION_KEY: &str = "PK";
pub const PREFERENCES_ATTR: &str = "preferences";
pub const CREATED_AT_ATTR: &str = "createdAt";
pub const UPDATED_AT_ATTR: &str = "updatedAt";

pub type Item = HashMap<String, AttributeValue>;

#[must_use]
pub fn partition_key(user_id: &str) -> String {
    format!("USER#{user_id}")
}

#[must_use]
pub fn key_attribute(user_id: &str) -> AttributeValue {
    AttributeValue::S(partition_key(user_id))
}

/// Current time in the stored timestamp format.
///
/// # Errors
/// Only if the clock is outside the RFC 3339 range.
pub fn timestamp(operation: &'static str) -> Result<AttributeValue, StoreError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map(AttributeValue::S)
        .map_err(|e| StoreError::unavailable(operation, e))
}

#[must_use]
pub fn to_attribute_map(preferences: &Preferences) -> AttributeValue {
    AttributeValue::M(
        preferences
            .iter()
            .map(|(k, v)| (k.clone(), AttributeValue::S(v.clone())))
            .collect(),
    )
}

/// Read the preference set out of an item.
///
/// `Ok(None)` when there is no item or it has no `preferences` attribute.
/// Entries that are not strings are skipped with a warning.
///
/// # Errors
/// `Malformed` when `preferences` is not a map.
pub fn preferences_from_item(
    item: Option<&Item>,
    operation: &'static str,
) -> Result<Option<Preferences>, StoreError> {
    let Some(map) = preferences_map(item, operation)? else {
        return Ok(None);
    };

    let mut preferences = Preferences::new();
    for (key, value) in map {
        if let Ok(s) = value.as_s() {
            preferences.insert(key.clone(), s.clone());
        } else {
            tracing::warn!(operation, key = %key, "skipping non-string preference value");
        }
    }
    Ok(Some(preferences))
}

/// Read a single entry out of a (possibly projected) item.
///
/// # Errors
/// `Malformed` when `preferences` is not a map.
pub fn value_from_item(
    item: Option<&Item>,
    key: &str,
    operation: &'static str,
) -> Result<Option<String>, StoreError> {
    let Some(map) = preferences_map(item, operation)? else {
        return Ok(None);
    };

    match map.get(key).map(AttributeValue::as_s) {
        Some(Ok(s)) => Ok(Some(s.clone())),
        Some(Err(_)) => {
            tracing::warn!(operation, key, "ignoring non-string preference value");
            Ok(None)
        }
        None => Ok(None),
    }
}

fn preferences_map<'a>(
    item: Option<&'a Item>,
    operation: &'static str,
) -> Result<Option<&'a HashMap<String, AttributeValue>>, StoreError> {
    match item.and_then(|i| i.get(PREFERENCES_ATTR)) {
        None => Ok(None),
        Some(attr) => attr
            .as_m()
            .map(Some)
            .map_err(|_| StoreError::malformed(operation, "preferences attribute is not a map")),
    }
}

/// A complete `UpdateItem` expression with its placeholder bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateExpression {
    pub update: String,
    pub condition: Option<String>,
    pub names: HashMap<String, String>,
    pub values: HashMap<String, AttributeValue>,
}

impl UpdateExpression {
    fn with_base_names() -> (HashMap<String, String>, HashMap<String, AttributeValue>) {
        let names = HashMap::from([
            ("#p".to_owned(), PREFERENCES_ATTR.to_owned()),
            ("#updated".to_owned(), UPDATED_AT_ATTR.to_owned()),
        ]);
        (names, HashMap::new())
    }

    /// Overwrite the whole set, keeping the original creation time.
    #[must_use]
    pub fn replace_all(preferences: &Preferences, now: AttributeValue) -> Self {
        let (mut names, mut values) = Self::with_base_names();
        names.insert("#created".to_owned(), CREATED_AT_ATTR.to_owned());
        values.insert(":prefs".to_owned(), to_attribute_map(preferences));
        values.insert(":now".to_owned(), now);
        Self {
            update: "SET #p = :prefs, #updated = :now, #created = if_not_exists(#created, :now)"
                .to_owned(),
            condition: None,
            names,
            values,
        }
    }

    /// Set each patch entry in place inside an existing map. Fails its
    /// condition when the set does not exist yet.
    #[must_use]
    pub fn merge_into_existing(patch: &Preferences, now: AttributeValue) -> Self {
        let (mut names, mut values) = Self::with_base_names();
        let mut assignments = Vec::with_capacity(patch.len() + 1);

        for (i, (key, value)) in patch.iter().enumerate() {
            let name = format!("#k{i}");
            let placeholder = format!(":v{i}");
            assignments.push(format!("#p.{name} = {placeholder}"));
            names.insert(name, key.clone());
            values.insert(placeholder, AttributeValue::S(value.clone()));
        }
        assignments.push("#updated = :now".to_owned());
        values.insert(":now".to_owned(), now);

        Self {
            update: format!("SET {}", assignments.join(", ")),
            condition: Some("attribute_exists(#p)".to_owned()),
            names,
            values,
        }
    }

    /// Create the set from the patch. Fails its condition when another
    /// writer created it first.
    #[must_use]
    pub fn create_from_patch(patch: &Preferences, now: AttributeValue) -> Self {
        let mut expr = Self::replace_all(patch, now);
        expr.condition = Some("attribute_not_exists(#p)".to_owned());
        expr
    }

    /// Remove one entry. Fails its condition when the set does not exist,
    /// so the item is never created by a delete.
    #[must_use]
    pub fn delete_key(key: &str, now: AttributeValue) -> Self {
        let (mut names, mut values) = Self::with_base_names();
        names.insert("#k".to_owned(), key.to_owned());
        values.insert(":now".to_owned(), now);
        Self {
            update: "REMOVE #p.#k SET #updated = :now".to_owned(),
            condition: Some("attribute_exists(#p)".to_owned()),
            names,
            values,
        }
    }
}
