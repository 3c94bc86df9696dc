//! Consent categories and the persisted preference record.
//!
//! `ConsentPreferences` can only be built through constructors that pin
//! `necessary` to `true`, and records read back from storage go through
//! `StoredPreferences`, which coerces it. No value of the type can carry
//! `necessary == false`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ConsentError, ConsentResult};

/// One tracked permission dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsentCategory {
    /// Strictly required for the site to work. Always granted.
    Necessary,
    /// Usage analytics collaborators.
    Analytics,
    /// Marketing and advertising collaborators.
    Marketing,
    /// Non-essential personalization collaborators.
    Functional,
}

impl ConsentCategory {
    pub const ALL: [ConsentCategory; 4] = [
        ConsentCategory::Necessary,
        ConsentCategory::Analytics,
        ConsentCategory::Marketing,
        ConsentCategory::Functional,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentCategory::Necessary => "necessary",
            ConsentCategory::Analytics => "analytics",
            ConsentCategory::Marketing => "marketing",
            ConsentCategory::Functional => "functional",
        }
    }

    /// Whether the user is allowed to toggle this category.
    pub fn is_locked(&self) -> bool {
        matches!(self, ConsentCategory::Necessary)
    }
}

impl fmt::Display for ConsentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user-controllable part of a decision: what the detail panel toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsentSelection {
    pub analytics: bool,
    pub marketing: bool,
    pub functional: bool,
}

impl ConsentSelection {
    pub fn all() -> Self {
        Self {
            analytics: true,
            marketing: true,
            functional: true,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self, category: ConsentCategory) -> bool {
        match category {
            ConsentCategory::Necessary => true,
            ConsentCategory::Analytics => self.analytics,
            ConsentCategory::Marketing => self.marketing,
            ConsentCategory::Functional => self.functional,
        }
    }

    pub fn set(&mut self, category: ConsentCategory, enabled: bool) -> ConsentResult<()> {
        match category {
            ConsentCategory::Necessary => return Err(ConsentError::LockedCategory(category)),
            ConsentCategory::Analytics => self.analytics = enabled,
            ConsentCategory::Marketing => self.marketing = enabled,
            ConsentCategory::Functional => self.functional = enabled,
        }
        Ok(())
    }
}

/// A complete, immutable consent decision.
///
/// Serialized as a JSON object with exactly the four boolean fields
/// `necessary`, `analytics`, `marketing` and `functional`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "StoredPreferences")]
pub struct ConsentPreferences {
    necessary: bool,
    analytics: bool,
    marketing: bool,
    functional: bool,
}

impl ConsentPreferences {
    pub fn accept_all() -> Self {
        Self::from_selection(ConsentSelection::all())
    }

    pub fn reject_all() -> Self {
        Self::from_selection(ConsentSelection::none())
    }

    pub fn from_selection(selection: ConsentSelection) -> Self {
        Self {
            necessary: true,
            analytics: selection.analytics,
            marketing: selection.marketing,
            functional: selection.functional,
        }
    }

    pub fn necessary(&self) -> bool {
        self.necessary
    }

    pub fn analytics(&self) -> bool {
        self.analytics
    }

    pub fn marketing(&self) -> bool {
        self.marketing
    }

    pub fn functional(&self) -> bool {
        self.functional
    }

    pub fn allows(&self, category: ConsentCategory) -> bool {
        self.selection().is_enabled(category)
    }

    pub fn selection(&self) -> ConsentSelection {
        ConsentSelection {
            analytics: self.analytics,
            marketing: self.marketing,
            functional: self.functional,
        }
    }

    pub fn to_json(&self) -> ConsentResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a persisted record. Anything that is not a JSON object is
    /// rejected; see `StoredPreferences` for per-field handling.
    pub fn from_json(raw: &str) -> ConsentResult<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            return Err(ConsentError::Serialization(
                <serde_json::Error as serde::de::Error>::custom(
                    "consent record must be a JSON object",
                ),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }
}

impl From<ConsentSelection> for ConsentPreferences {
    fn from(selection: ConsentSelection) -> Self {
        Self::from_selection(selection)
    }
}

/// On-disk shape of a record. The key carries no schema version, so
/// missing categories read as not granted and unknown fields are ignored.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct StoredPreferences {
    necessary: bool,
    analytics: bool,
    marketing: bool,
    functional: bool,
}

impl Default for StoredPreferences {
    fn default() -> Self {
        Self {
            necessary: true,
            analytics: false,
            marketing: false,
            functional: false,
        }
    }
}

impl From<StoredPreferences> for ConsentPreferences {
    fn from(stored: StoredPreferences) -> Self {
        if !stored.necessary {
            tracing::warn!("stored consent record had necessary=false; coercing to true");
        }
        Self::from_selection(ConsentSelection {
            analytics: stored.analytics,
            marketing: stored.marketing,
            functional: stored.functional,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn every_selection() -> Vec<ConsentSelection> {
        let mut out = Vec::new();
        for analytics in [false, true] {
            for marketing in [false, true] {
                for functional in [false, true] {
                    out.push(ConsentSelection {
                        analytics,
                        marketing,
                        functional,
                    });
                }
            }
        }
        out
    }

    #[test]
    fn necessary_is_true_for_every_selection() {
        for selection in every_selection() {
            let prefs = ConsentPreferences::from_selection(selection);
            assert!(prefs.necessary());
            assert_eq!(prefs.selection(), selection);
        }
    }

    #[test]
    fn accept_and_reject_all() {
        let all = ConsentPreferences::accept_all();
        assert!(all.analytics() && all.marketing() && all.functional());

        let none = ConsentPreferences::reject_all();
        assert!(none.necessary());
        assert!(!none.analytics() && !none.marketing() && !none.functional());
    }

    #[test]
    fn serializes_exactly_four_fields() {
        let prefs = ConsentPreferences::from_selection(ConsentSelection {
            analytics: true,
            marketing: false,
            functional: true,
        });
        let value: serde_json::Value =
            serde_json::from_str(&prefs.to_json().expect("json")).expect("parse");
        assert_eq!(
            value,
            json!({
                "necessary": true,
                "analytics": true,
                "marketing": false,
                "functional": true
            })
        );
    }

    #[test]
    fn stored_necessary_false_is_coerced() {
        let prefs = ConsentPreferences::from_json(
            r#"{"necessary":false,"analytics":true,"marketing":false,"functional":false}"#,
        )
        .expect("parse");
        assert!(prefs.necessary());
        assert!(prefs.analytics());
    }

    #[test]
    fn missing_fields_read_as_not_granted() {
        let prefs = ConsentPreferences::from_json(r#"{"analytics":true}"#).expect("parse");
        assert!(prefs.necessary());
        assert!(prefs.analytics());
        assert!(!prefs.marketing());
        assert!(!prefs.functional());
    }

    #[test]
    fn extra_fields_are_ignored() {
        let prefs = ConsentPreferences::from_json(
            r#"{"necessary":true,"analytics":false,"marketing":true,"functional":false,"social":true}"#,
        )
        .expect("parse");
        assert!(prefs.marketing());
    }

    #[test]
    fn non_object_records_are_rejected() {
        for raw in ["[true,true,true,true]", "null", "true", "\"yes\"", "{not json"] {
            assert!(ConsentPreferences::from_json(raw).is_err(), "accepted {raw}");
        }
    }

    #[test]
    fn non_boolean_field_is_rejected() {
        assert!(ConsentPreferences::from_json(r#"{"analytics":"yes"}"#).is_err());
    }

    #[test]
    fn selection_refuses_necessary_toggle() {
        let mut selection = ConsentSelection::none();
        let err = selection
            .set(ConsentCategory::Necessary, false)
            .expect_err("locked");
        assert!(matches!(
            err,
            ConsentError::LockedCategory(ConsentCategory::Necessary)
        ));
        selection
            .set(ConsentCategory::Marketing, true)
            .expect("toggle");
        assert!(selection.marketing);
    }

    #[test]
    fn accept_all_allows_every_category() {
        let all = ConsentPreferences::accept_all();
        let none = ConsentPreferences::reject_all();
        for category in ConsentCategory::ALL {
            assert!(all.allows(category));
            assert_eq!(none.allows(category), category.is_locked());
        }
    }

    #[test]
    fn allows_matches_flags() {
        let prefs = ConsentPreferences::from_selection(ConsentSelection {
            analytics: false,
            marketing: true,
            functional: false,
        });
        assert!(prefs.allows(ConsentCategory::Necessary));
        assert!(!prefs.allows(ConsentCategory::Analytics));
        assert!(prefs.allows(ConsentCategory::Marketing));
        assert!(!prefs.allows(ConsentCategory::Functional));
    }
}
