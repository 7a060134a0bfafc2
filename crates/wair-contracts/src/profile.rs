use serde::{Deserialize, Serialize};

pub const MAX_GALLERY_PHOTOS: usize = 10;

/// Appearance attributes inferred from the latest profile photo. Best effort:
/// may be stale or missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileAttributes {
    #[serde(deserialize_with = "crate::de::null_as_default")]
    pub gender: String,
    #[serde(deserialize_with = "crate::de::null_as_default")]
    pub hair: String,
    #[serde(deserialize_with = "crate::de::null_as_default")]
    pub skin_tone: String,
    #[serde(deserialize_with = "crate::de::null_as_default")]
    pub body_type: String,
    #[serde(deserialize_with = "crate::de::null_as_default")]
    pub summary: String,
}

impl ProfileAttributes {
    /// Fills `summary` from the other fields.
    pub fn summarise(mut self) -> Self {
        self.summary = format!(
            "{} skin, {}, {} build",
            self.skin_tone, self.hair, self.body_type
        );
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    /// Encoded photos, newest first. Index 0 is the primary photo.
    pub gallery: Vec<String>,
    pub attributes: Option<ProfileAttributes>,
}

impl Profile {
    pub fn primary_photo(&self) -> Option<&str> {
        self.gallery.first().map(String::as_str)
    }

    pub fn photo(&self, index: usize) -> Option<&str> {
        self.gallery.get(index).map(String::as_str)
    }

    pub fn add_photo(&mut self, photo: String) {
        self.gallery.insert(0, photo);
        self.gallery.truncate(MAX_GALLERY_PHOTOS);
    }

    pub fn remove_photo(&mut self, index: usize) -> Option<String> {
        if index < self.gallery.len() {
            return Some(self.gallery.remove(index));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gallery_is_bounded_and_newest_first() {
        let mut profile = Profile::default();
        for idx in 0..12 {
            profile.add_photo(format!("photo-{idx}"));
        }
        assert_eq!(profile.gallery.len(), MAX_GALLERY_PHOTOS);
        assert_eq!(profile.primary_photo(), Some("photo-11"));
        assert_eq!(profile.gallery.last().map(String::as_str), Some("photo-2"));
    }

    #[test]
    fn remove_photo_ignores_out_of_range() {
        let mut profile = Profile::default();
        profile.add_photo("a".to_string());
        assert_eq!(profile.remove_photo(3), None);
        assert_eq!(profile.remove_photo(0).as_deref(), Some("a"));
        assert!(profile.primary_photo().is_none());
    }

    #[test]
    fn attributes_tolerate_null_fields() -> anyhow::Result<()> {
        let attrs: ProfileAttributes = serde_json::from_value(serde_json::json!({
            "gender": "Man",
            "hair": null,
            "bodyType": "Tall",
            "skinTone": null
        }))?;
        assert_eq!(attrs.gender, "Man");
        assert!(attrs.hair.is_empty());
        assert_eq!(attrs.body_type, "Tall");
        Ok(())
    }

    #[test]
    fn summary_reads_naturally() {
        let attrs = ProfileAttributes {
            gender: "Woman".to_string(),
            hair: "long brown hair".to_string(),
            skin_tone: "olive".to_string(),
            body_type: "athletic".to_string(),
            summary: String::new(),
        }
        .summarise();
        assert_eq!(attrs.summary, "olive skin, long brown hair, athletic build");
    }
}
