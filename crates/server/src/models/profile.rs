//! Profile models.
//!
//! A profile row doubles as the claim record for its code: the row is created
//! exactly when the code is claimed and its `code` and `account_id` are never
//! reassigned afterwards.

use chrono::{DateTime, Utc};
use serde::Serialize;

use qrtag_core::{
    AccountId, Age, ClaimStatus, Code, Email, PhotoRef, ProfileId, SocialHandle, SocialPlatform,
};

/// A bound profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: ProfileId,
    pub account_id: AccountId,
    pub code: Code,
    /// Email given at registration, absent for claims made without one.
    pub email: Option<Email>,
    pub display_name: String,
    pub age: Option<Age>,
    pub bio: Option<String>,
    pub instagram: Option<SocialHandle>,
    pub tiktok: Option<SocialHandle>,
    pub twitter: Option<SocialHandle>,
    pub photo: Option<PhotoRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// The claim this profile represents.
    #[must_use]
    pub fn claim_record(&self) -> ClaimRecord {
        ClaimRecord {
            code: self.code.clone(),
            claimed_by: self.account_id,
            claimed_at: self.created_at,
        }
    }

    /// Handle stored for a platform, if any.
    #[must_use]
    pub const fn handle(&self, platform: SocialPlatform) -> Option<&SocialHandle> {
        match platform {
            SocialPlatform::Instagram => self.instagram.as_ref(),
            SocialPlatform::Tiktok => self.tiktok.as_ref(),
            SocialPlatform::Twitter => self.twitter.as_ref(),
        }
    }

    /// Links for every platform with a stored handle, in display order.
    #[must_use]
    pub fn social_links(&self) -> Vec<SocialLink> {
        SocialPlatform::ALL
            .into_iter()
            .filter_map(|platform| {
                let handle = self.handle(platform)?;
                platform.profile_url(handle).map(|url| SocialLink {
                    platform,
                    handle: handle.clone(),
                    url: url.into(),
                })
            })
            .collect()
    }

    /// The view shown to anyone who scans the code.
    #[must_use]
    pub fn to_public(&self) -> PublicProfile {
        PublicProfile {
            code: self.code.clone(),
            display_name: self.display_name.clone(),
            age: self.age,
            bio: self.bio.clone(),
            photo: self.photo.clone(),
            socials: self.social_links(),
            claimed_at: self.created_at,
        }
    }
}

/// Fields required to create a profile, i.e. to claim a code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub account_id: AccountId,
    pub code: Code,
    pub email: Option<Email>,
}

/// A partial update to a profile.
///
/// `None` leaves a field untouched. For optional columns `Some(None)` clears
/// the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub display_name: Option<String>,
    pub age: Option<Option<Age>>,
    pub bio: Option<Option<String>>,
    pub instagram: Option<Option<SocialHandle>>,
    pub tiktok: Option<Option<SocialHandle>>,
    pub twitter: Option<Option<SocialHandle>>,
    pub photo: Option<PhotoRef>,
}

impl ProfilePatch {
    /// Whether the patch would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.age.is_none()
            && self.bio.is_none()
            && self.instagram.is_none()
            && self.tiktok.is_none()
            && self.twitter.is_none()
            && self.photo.is_none()
    }

    /// Apply the patch in place. Does not touch `updated_at`.
    pub fn apply_to(self, profile: &mut Profile) {
        if let Some(name) = self.display_name {
            profile.display_name = name;
        }
        if let Some(age) = self.age {
            profile.age = age;
        }
        if let Some(bio) = self.bio {
            profile.bio = bio;
        }
        if let Some(handle) = self.instagram {
            profile.instagram = handle;
        }
        if let Some(handle) = self.tiktok {
            profile.tiktok = handle;
        }
        if let Some(handle) = self.twitter {
            profile.twitter = handle;
        }
        if let Some(photo) = self.photo {
            profile.photo = Some(photo);
        }
    }
}

/// Record of a successful claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRecord {
    pub code: Code,
    pub claimed_by: AccountId,
    pub claimed_at: DateTime<Utc>,
}

impl ClaimRecord {
    /// The status this record puts its code in.
    #[must_use]
    pub const fn status(&self) -> ClaimStatus {
        ClaimStatus::Claimed {
            claimed_by: self.claimed_by,
            claimed_at: self.claimed_at,
        }
    }
}

/// A resolved link to a social profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SocialLink {
    pub platform: SocialPlatform,
    pub handle: SocialHandle,
    pub url: String,
}

/// Public view of a profile. Omits the email and account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub code: Code,
    pub display_name: String,
    pub age: Option<Age>,
    pub bio: Option<String>,
    pub photo: Option<PhotoRef>,
    pub socials: Vec<SocialLink>,
    pub claimed_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> Profile {
        let now = Utc::now();
        Profile {
            id: ProfileId::new(1),
            account_id: AccountId::generate(),
            code: Code::parse("ab12cd34").unwrap(),
            email: Some(Email::parse("sari@example.com").unwrap()),
            display_name: "Sari".to_string(),
            age: None,
            bio: Some("hello".to_string()),
            instagram: SocialHandle::parse_optional("sari"),
            tiktok: None,
            twitter: SocialHandle::parse_optional("@sari_x"),
            photo: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_social_links_skip_missing_handles() {
        let links = sample().social_links();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].url, "https://instagram.com/sari");
        assert_eq!(links[1].url, "https://twitter.com/sari_x");
    }

    #[test]
    fn test_patch_clears_and_keeps() {
        let mut profile = sample();
        let patch = ProfilePatch {
            bio: Some(None),
            age: Some(Some(Age::try_from(30).unwrap())),
            ..ProfilePatch::default()
        };
        patch.apply_to(&mut profile);

        assert_eq!(profile.bio, None);
        assert_eq!(profile.age.unwrap().years(), 30);
        assert_eq!(profile.display_name, "Sari");
        assert!(profile.instagram.is_some());
    }

    #[test]
    fn test_empty_patch() {
        assert!(ProfilePatch::default().is_empty());
        let patch = ProfilePatch {
            display_name: Some("x".to_string()),
            ..ProfilePatch::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_public_view_hides_email() {
        let json = serde_json::to_value(sample().to_public()).unwrap();
        assert!(json.get("email").is_none());
        assert!(json.get("accountId").is_none());
        assert_eq!(json["displayName"], "Sari");
        assert_eq!(json["socials"][0]["platform"], "instagram");
    }

    #[test]
    fn test_claim_record_status() {
        let profile = sample();
        let record = profile.claim_record();
        assert_eq!(record.claimed_by, profile.account_id);
        assert!(record.status().is_claimed());
    }
}
