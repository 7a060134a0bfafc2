use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_FORMALITY: u8 = 1;
pub const MAX_FORMALITY: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Top,
    Bottom,
    Shoes,
    Outerwear,
    Dress,
    Accessory,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Top,
        Category::Bottom,
        Category::Shoes,
        Category::Outerwear,
        Category::Dress,
        Category::Accessory,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Top => "Top",
            Self::Bottom => "Bottom",
            Self::Shoes => "Shoes",
            Self::Outerwear => "Outerwear",
            Self::Dress => "Dress",
            Self::Accessory => "Accessory",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        let category = match normalized.as_str() {
            "top" | "tops" => Self::Top,
            "bottom" | "bottoms" => Self::Bottom,
            "shoes" | "shoe" => Self::Shoes,
            "outerwear" => Self::Outerwear,
            "dress" | "dresses" => Self::Dress,
            "accessory" | "accessories" => Self::Accessory,
            _ => return Err(format!("unknown category '{}'", raw.trim())),
        };
        Ok(category)
    }
}

/// Lowercased `color subcategory category`, the exact-match key used during
/// resolution.
pub fn search_key(color: &str, subcategory: &str, category: Category) -> String {
    format!("{color} {subcategory} {category}").to_lowercase()
}

/// Fields supplied when an item is created. Everything derived (id, search
/// key, timestamp) is filled in by [`WardrobeItem::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWardrobeItem {
    pub category: Category,
    pub subcategory: String,
    pub color: String,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default = "default_formality")]
    pub formality: u8,
    pub image: String,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_formality() -> u8 {
    5
}

/// A catalogued garment.
///
/// Items are immutable: an edit is a delete followed by a create, so the
/// cached `search_key` can never drift from the fields it is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredWardrobeItem")]
pub struct WardrobeItem {
    id: String,
    category: Category,
    subcategory: String,
    color: String,
    material: Option<String>,
    formality: u8,
    image: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    search_key: String,
}

impl WardrobeItem {
    pub fn new(id: impl Into<String>, draft: NewWardrobeItem, created_at: DateTime<Utc>) -> Self {
        let search_key = search_key(&draft.color, &draft.subcategory, draft.category);
        Self {
            id: id.into(),
            category: draft.category,
            subcategory: draft.subcategory,
            color: draft.color,
            material: draft
                .material
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            formality: draft.formality.clamp(MIN_FORMALITY, MAX_FORMALITY),
            image: draft.image,
            description: draft.description,
            created_at,
            search_key,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn subcategory(&self) -> &str {
        &self.subcategory
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn material(&self) -> Option<&str> {
        self.material.as_deref()
    }

    pub fn formality(&self) -> u8 {
        self.formality
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn search_key(&self) -> &str {
        &self.search_key
    }

    /// "`color subcategory`", the phrase prompts ask the stylist to quote.
    pub fn label(&self) -> String {
        format!("{} {}", self.color, self.subcategory)
    }

    /// Copy of the editable fields, for the delete-and-recreate edit path.
    pub fn to_draft(&self) -> NewWardrobeItem {
        NewWardrobeItem {
            category: self.category,
            subcategory: self.subcategory.clone(),
            color: self.color.clone(),
            material: self.material.clone(),
            formality: self.formality,
            image: self.image.clone(),
            description: self.description.clone(),
        }
    }
}

// Stored documents may carry a stale or missing searchKey; it is ignored and
// rebuilt on load.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredWardrobeItem {
    id: String,
    category: Category,
    subcategory: String,
    color: String,
    #[serde(default)]
    material: Option<String>,
    #[serde(default = "default_formality")]
    formality: u8,
    #[serde(default)]
    image: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
}

impl From<StoredWardrobeItem> for WardrobeItem {
    fn from(stored: StoredWardrobeItem) -> Self {
        WardrobeItem::new(
            stored.id,
            NewWardrobeItem {
                category: stored.category,
                subcategory: stored.subcategory,
                color: stored.color,
                material: stored.material,
                formality: stored.formality,
                image: stored.image,
                description: stored.description,
            },
            stored.created_at,
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn draft(color: &str, subcategory: &str, category: Category) -> NewWardrobeItem {
        NewWardrobeItem {
            category,
            subcategory: subcategory.to_string(),
            color: color.to_string(),
            material: Some("Cotton".to_string()),
            formality: 5,
            image: "data:image/jpeg;base64,AAAA".to_string(),
            description: None,
        }
    }

    #[test]
    fn search_key_is_lowercase_color_subcategory_category() {
        for category in Category::ALL {
            let item = WardrobeItem::new("id-1", draft("Navy", "Denim Jacket", category), Utc::now());
            assert_eq!(
                item.search_key(),
                format!("navy denim jacket {}", category.as_str().to_lowercase())
            );
        }
    }

    #[test]
    fn stale_search_key_is_rebuilt_on_load() -> anyhow::Result<()> {
        let item: WardrobeItem = serde_json::from_value(json!({
            "id": "abc",
            "category": "Shoes",
            "subcategory": "Heels",
            "color": "Black",
            "formality": 7,
            "image": "/images/heels.jpg",
            "searchKey": "something else entirely",
            "createdAt": "2024-05-01T10:00:00Z"
        }))?;
        assert_eq!(item.search_key(), "black heels shoes");
        assert_eq!(item.material(), None);
        Ok(())
    }

    #[test]
    fn formality_is_clamped() {
        let mut high = draft("Red", "Gown", Category::Dress);
        high.formality = 42;
        assert_eq!(WardrobeItem::new("a", high, Utc::now()).formality(), 10);

        let mut low = draft("Red", "Gown", Category::Dress);
        low.formality = 0;
        assert_eq!(WardrobeItem::new("b", low, Utc::now()).formality(), 1);
    }

    #[test]
    fn category_parses_loosely() {
        assert_eq!("top".parse::<Category>(), Ok(Category::Top));
        assert_eq!(" Accessories ".parse::<Category>(), Ok(Category::Accessory));
        assert_eq!("SHOES".parse::<Category>(), Ok(Category::Shoes));
        assert!("hat".parse::<Category>().is_err());
    }

    #[test]
    fn blank_material_is_dropped() {
        let mut raw = draft("Grey", "Blazer", Category::Outerwear);
        raw.material = Some("  ".to_string());
        assert_eq!(WardrobeItem::new("x", raw, Utc::now()).material(), None);
    }
}
