#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::super::*;
    use aws_sdk_dynamodb::types::AttributeValue;
    use record::{Item, PREFERENCES_ATTR, UpdateExpression};
    use std::collections::HashMap;
    use user_preferences_sdk::Preferences;

    use crate::domain::repo::StoreError;

    fn now() -> AttributeValue {
        AttributeValue::S("2024-01-01T00:00:00Z".to_owned())
    }

    fn item_with(preferences: AttributeValue) -> Item {
        HashMap::from([
            ("PK".to_owned(), record::key_attribute("alice")),
            (PREFERENCES_ATTR.to_owned(), preferences),
        ])
    }

    #[test]
    fn test_partition_key_format() {
        assert_eq!(record::partition_key("alice"), "USER#alice");
        assert_eq!(
            record::key_attribute("a#b"),
            AttributeValue::S("USER#a#b".to_owned())
        );
    }

    #[test]
    fn test_missing_item_or_attribute_is_absent() {
        assert_eq!(record::preferences_from_item(None, "get_all").unwrap(), None);

        let bare: Item = HashMap::from([("PK".to_owned(), record::key_attribute("alice"))]);
        assert_eq!(
            record::preferences_from_item(Some(&bare), "get_all").unwrap(),
            None
        );
    }

    #[test]
    fn test_empty_map_is_present_and_empty() {
        let item = item_with(AttributeValue::M(HashMap::new()));
        assert_eq!(
            record::preferences_from_item(Some(&item), "get_all").unwrap(),
            Some(Preferences::new())
        );
    }

    #[test]
    fn test_non_string_entries_are_skipped() {
        let item = item_with(AttributeValue::M(HashMap::from([
            ("theme".to_owned(), AttributeValue::S("dark".to_owned())),
            ("count".to_owned(), AttributeValue::N("3".to_owned())),
        ])));
        let prefs = record::preferences_from_item(Some(&item), "get_all")
            .unwrap()
            .unwrap();
        assert_eq!(prefs.len(), 1);
        assert_eq!(prefs.get("theme"), Some("dark"));
    }

    #[test]
    fn test_non_map_attribute_is_malformed() {
        let item = item_with(AttributeValue::S("oops".to_owned()));
        let err = record::preferences_from_item(Some(&item), "get_all").unwrap_err();
        assert!(matches!(err, StoreError::Malformed { operation: "get_all", .. }));
        assert_eq!(err.kind(), "malformed");

        let err = record::value_from_item(Some(&item), "theme", "get_one").unwrap_err();
        assert!(matches!(err, StoreError::Malformed { operation: "get_one", .. }));
    }

    #[test]
    fn test_value_from_projected_item() {
        let item = item_with(AttributeValue::M(HashMap::from([(
            "theme".to_owned(),
            AttributeValue::S("dark".to_owned()),
        )])));
        assert_eq!(
            record::value_from_item(Some(&item), "theme", "get_one").unwrap(),
            Some("dark".to_owned())
        );
        assert_eq!(
            record::value_from_item(Some(&item), "lang", "get_one").unwrap(),
            None
        );
        assert_eq!(record::value_from_item(None, "theme", "get_one").unwrap(), None);
    }

    #[test]
    fn test_replace_all_keeps_creation_time() {
        let prefs: Preferences = [("theme", "dark")].into_iter().collect();
        let expr = UpdateExpression::replace_all(&prefs, now());

        assert!(expr.update.contains("#created = if_not_exists(#created, :now)"));
        assert_eq!(expr.condition, None);
        assert_eq!(expr.names["#created"], "createdAt");
        assert_eq!(expr.names["#updated"], "updatedAt");
        assert_eq!(expr.values[":prefs"], record::to_attribute_map(&prefs));
    }

    #[test]
    fn test_merge_sets_each_key_in_place() {
        let patch: Preferences = [("lang", "fr"), ("tz", "UTC")].into_iter().collect();
        let expr = UpdateExpression::merge_into_existing(&patch, now());

        // Keys iterate in byte order: lang, tz
        assert_eq!(
            expr.update,
            "SET #p.#k0 = :v0, #p.#k1 = :v1, #updated = :now"
        );
        assert_eq!(expr.condition.as_deref(), Some("attribute_exists(#p)"));
        assert_eq!(expr.names["#k0"], "lang");
        assert_eq!(expr.names["#k1"], "tz");
        assert_eq!(expr.values[":v0"], AttributeValue::S("fr".to_owned()));
        assert_eq!(expr.values[":v1"], AttributeValue::S("UTC".to_owned()));
        assert!(!expr.names.contains_key("#created"));
    }

    #[test]
    fn test_keys_never_appear_inline() {
        let patch: Preferences = [("a.b #c", "x")].into_iter().collect();
        let expr = UpdateExpression::merge_into_existing(&patch, now());
        assert!(!expr.update.contains("a.b"));
        assert_eq!(expr.names["#k0"], "a.b #c");
    }

    #[test]
    fn test_largest_merge_fits_expression_limit() {
        let cfg = crate::config::PreferencesConfig::default();
        let patch: Preferences = (0..cfg.max_preference_keys)
            .map(|i| (format!("{i:0>width$}", width = cfg.max_key_length), "v".to_owned()))
            .collect();
        assert_eq!(patch.len(), crate::config::MAX_KEYS_PER_REQUEST);

        let expr = UpdateExpression::merge_into_existing(&patch, now());
        // DynamoDB caps an update expression at 4 KB
        assert!(
            expr.update.len() <= 4096,
            "update expression is {} bytes",
            expr.update.len()
        );
        assert_eq!(expr.names.len(), patch.len() + 2);
    }

    #[test]
    fn test_create_from_patch_requires_absence() {
        let patch: Preferences = [("lang", "fr")].into_iter().collect();
        let expr = UpdateExpression::create_from_patch(&patch, now());
        assert_eq!(expr.condition.as_deref(), Some("attribute_not_exists(#p)"));
        assert!(expr.update.starts_with("SET #p = :prefs"));
    }

    #[test]
    fn test_delete_key_is_conditional() {
        let expr = UpdateExpression::delete_key("theme", now());
        assert_eq!(expr.update, "REMOVE #p.#k SET #updated = :now");
        assert_eq!(expr.condition.as_deref(), Some("attribute_exists(#p)"));
        assert_eq!(expr.names["#k"], "theme");
    }
}
