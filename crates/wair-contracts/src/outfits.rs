use serde::{Deserialize, Serialize};

use crate::wardrobe::WardrobeItem;

/// An outfit as proposed by the stylist, before its item descriptions have
/// been matched against the wardrobe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Outfit {
    #[serde(deserialize_with = "crate::de::null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "crate::de::null_as_default")]
    pub occasion: String,
    #[serde(deserialize_with = "crate::de::null_as_default")]
    pub items: Vec<String>,
    #[serde(deserialize_with = "crate::de::null_as_default")]
    pub reasoning: String,
    #[serde(deserialize_with = "crate::de::null_as_default")]
    pub styling_tip: String,
}

/// An outfit whose items are real wardrobe records. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedOutfit {
    pub name: String,
    pub occasion: String,
    pub items: Vec<WardrobeItem>,
    pub reasoning: String,
    pub styling_tip: String,
}

impl ResolvedOutfit {
    /// Attaches resolved items to a proposal; `None` when nothing resolved.
    pub fn from_outfit(outfit: Outfit, items: Vec<WardrobeItem>) -> Option<Self> {
        if items.is_empty() {
            return None;
        }
        Some(Self {
            name: outfit.name,
            occasion: outfit.occasion,
            items,
            reasoning: outfit.reasoning,
            styling_tip: outfit.styling_tip,
        })
    }
}

/// The JSON shape the stylist is asked to answer with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StylistReply {
    #[serde(deserialize_with = "crate::de::null_as_default")]
    pub response_text: String,
    #[serde(deserialize_with = "crate::de::null_as_default")]
    pub outfits: Vec<Outfit>,
}
