//! Group settings map, policy presets, and field-level diffing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The `whoCanPostMessage` value that marks a group as public.
pub const PUBLIC_POST_POLICY: &str = "ANYONE_CAN_POST";

/// Settings of a group as returned by the Groups Settings API.
///
/// The API models settings as a flat object of policy fields; values are
/// mostly strings ("true"/"false" included), with the odd integer. A
/// `BTreeMap` keeps update bodies deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupSettings(pub BTreeMap<String, Value>);

impl GroupSettings {
    /// Value of a policy field, when present and a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// True if the group accepts posts from outside the domain.
    pub fn is_public(&self) -> bool {
        self.get_str("whoCanPostMessage") == Some(PUBLIC_POST_POLICY)
    }

    /// Fields from `desired` whose value differs from the stored one.
    ///
    /// A key absent from the stored settings counts as differing. The result
    /// is exactly the body to send in a settings update; empty means no
    /// update is required.
    pub fn diff(&self, desired: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        desired
            .iter()
            .filter(|(k, v)| self.get_str(k) != Some(v.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Console-equivalent defaults applied to newly created groups.
///
/// Some defaults differ between console-created and API-created groups; this
/// set matches the console.
pub fn default_group_settings() -> BTreeMap<String, String> {
    [
        ("whoCanJoin", "ALL_IN_DOMAIN_CAN_JOIN"),
        ("whoCanViewMembership", "ALL_IN_DOMAIN_CAN_VIEW"),
        ("whoCanPostMessage", "ALL_IN_DOMAIN_CAN_POST"),
        ("whoCanInvite", "ALL_MEMBERS_CAN_INVITE"),
        ("isArchived", "true"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Override making a group externally postable and contactable.
pub fn public_group_settings() -> BTreeMap<String, String> {
    [
        ("whoCanPostMessage", PUBLIC_POST_POLICY),
        ("whoCanContactOwner", "ANYONE_CAN_CONTACT"),
        ("messageModerationLevel", "MODERATE_NONE"),
        ("spamModerationLevel", "ALLOW"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(fields: Value) -> GroupSettings {
        serde_json::from_value(fields).unwrap()
    }

    #[test]
    fn test_is_public() {
        let public = settings(json!({"whoCanPostMessage": "ANYONE_CAN_POST"}));
        assert!(public.is_public());

        let internal = settings(json!({"whoCanPostMessage": "ALL_IN_DOMAIN_CAN_POST"}));
        assert!(!internal.is_public());

        assert!(!GroupSettings::default().is_public());
    }

    #[test]
    fn test_diff_no_changes() {
        let current = settings(json!({
            "whoCanPostMessage": "ANYONE_CAN_POST",
            "spamModerationLevel": "ALLOW"
        }));
        let desired = BTreeMap::from([
            ("whoCanPostMessage".to_string(), "ANYONE_CAN_POST".to_string()),
            ("spamModerationLevel".to_string(), "ALLOW".to_string()),
        ]);

        assert!(current.diff(&desired).is_empty());
    }

    #[test]
    fn test_diff_only_changed_fields() {
        let current = settings(json!({
            "whoCanPostMessage": "ALL_IN_DOMAIN_CAN_POST",
            "whoCanContactOwner": "ANYONE_CAN_CONTACT",
            "messageModerationLevel": "MODERATE_ALL_MESSAGES",
            "spamModerationLevel": "ALLOW"
        }));

        let diff = current.diff(&public_group_settings());
        assert_eq!(diff.len(), 2);
        assert_eq!(
            diff.get("whoCanPostMessage").map(String::as_str),
            Some("ANYONE_CAN_POST")
        );
        assert_eq!(
            diff.get("messageModerationLevel").map(String::as_str),
            Some("MODERATE_NONE")
        );
    }

    #[test]
    fn test_diff_missing_key_counts_as_changed() {
        let current = GroupSettings::default();
        let desired = BTreeMap::from([("isArchived".to_string(), "true".to_string())]);

        let diff = current.diff(&desired);
        assert_eq!(diff.get("isArchived").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_diff_ignores_non_string_stored_values() {
        // maxMessageBytes comes back as an integer; a desired string never
        // matches it and is resent.
        let current = settings(json!({"maxMessageBytes": 26214400}));
        let desired = BTreeMap::from([("maxMessageBytes".to_string(), "26214400".to_string())]);

        assert_eq!(current.diff(&desired).len(), 1);
    }

    #[test]
    fn test_presets() {
        let defaults = default_group_settings();
        assert_eq!(defaults.len(), 5);
        assert_eq!(
            defaults.get("whoCanJoin").map(String::as_str),
            Some("ALL_IN_DOMAIN_CAN_JOIN")
        );

        let public = public_group_settings();
        assert_eq!(public.len(), 4);
        assert_eq!(
            public.get("whoCanPostMessage").map(String::as_str),
            Some(PUBLIC_POST_POLICY)
        );
    }
}
