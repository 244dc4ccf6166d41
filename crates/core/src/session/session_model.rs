use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where the user plays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Locality {
    pub zipcode: Option<String>,
    pub city: Option<String>,
}

/// Profile record as stored by the backend and delivered by push updates.
///
/// Every attribute besides the id may be missing before the first full load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winstreak: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// The signed-in user as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub display_name: Option<String>,
    pub winstreak: Option<u32>,
    pub locality: Locality,
}

impl Session {
    /// A session known only by its identity; attributes arrive later.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: None,
            winstreak: None,
            locality: Locality::default(),
        }
    }

    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            user_id: profile.user_id.clone(),
            display_name: profile.display_name.clone(),
            winstreak: profile.winstreak,
            locality: Locality {
                zipcode: profile.zipcode.clone(),
                city: profile.city.clone(),
            },
        }
    }

    /// Name passed to the join call. Falls back to the user id.
    pub fn join_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.user_id)
    }

    pub fn eligibility_bucket(&self) -> EligibilityBucket {
        EligibilityBucket {
            winstreak: self.winstreak.unwrap_or(0),
            zipcode: self.locality.zipcode.clone(),
            city: self.locality.city.clone(),
        }
    }

    /// Replace every attribute from a pushed record. Attributes the record
    /// does not carry become unknown; nothing is merged.
    pub fn apply_profile(&mut self, profile: &UserProfile) {
        *self = Self::from_profile(profile);
    }

    pub fn to_profile(&self) -> UserProfile {
        UserProfile {
            user_id: self.user_id.clone(),
            display_name: self.display_name.clone(),
            winstreak: self.winstreak,
            zipcode: self.locality.zipcode.clone(),
            city: self.locality.city.clone(),
            updated_at: None,
        }
    }
}

/// Attributes the backend uses to pick primary-mode candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityBucket {
    pub winstreak: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}
