//! Maps the stylist's free-text item references back to wardrobe records and
//! builds the inventory listings that keep its vocabulary closed.

use indexmap::IndexMap;
use wair_contracts::{Category, Outfit, ResolvedOutfit, WardrobeItem};

/// A predicate over `(raw description, lowercased description, item)`.
pub type MatchPredicate = fn(&str, &str, &WardrobeItem) -> bool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    ExactId,
    SearchKey,
    Partial,
    CategoryColor,
}

/// Strictest first. Each tier is tried against the whole inventory before the
/// next one is considered.
pub const MATCH_TIERS: &[(MatchTier, MatchPredicate)] = &[
    (MatchTier::ExactId, exact_id),
    (MatchTier::SearchKey, exact_search_key),
    (MatchTier::Partial, partial_containment),
    (MatchTier::CategoryColor, category_and_color),
];

pub fn exact_id(raw: &str, _lower: &str, item: &WardrobeItem) -> bool {
    raw == item.id()
}

pub fn exact_search_key(_raw: &str, lower: &str, item: &WardrobeItem) -> bool {
    lower == item.search_key()
}

pub fn partial_containment(raw: &str, lower: &str, item: &WardrobeItem) -> bool {
    let label = item.label().to_lowercase();
    label.contains(lower)
        || lower.contains(&label)
        || lower.contains(&item.subcategory().to_lowercase())
        || category_and_color(raw, lower, item)
}

pub fn category_and_color(_raw: &str, lower: &str, item: &WardrobeItem) -> bool {
    lower.contains(&item.category().as_str().to_lowercase())
        && lower.contains(&item.color().to_lowercase())
}

/// First item hit by the strictest matching tier, with the tier that hit.
/// Ties inside a tier go to the earliest inventory item. A blank description
/// matches nothing.
pub fn match_item<'a>(
    description: &str,
    inventory: &'a [WardrobeItem],
) -> Option<(MatchTier, &'a WardrobeItem)> {
    if description.trim().is_empty() {
        return None;
    }
    let lower = description.to_lowercase();
    MATCH_TIERS.iter().find_map(|(tier, predicate)| {
        inventory
            .iter()
            .find(|item| predicate(description, &lower, item))
            .map(|item| (*tier, item))
    })
}

pub fn match_tier(description: &str, inventory: &[WardrobeItem]) -> Option<MatchTier> {
    match_item(description, inventory).map(|(tier, _)| tier)
}

/// Resolves each description to at most one item. Unmatched descriptions are
/// dropped; an item matched twice is kept once, at its first position.
pub fn resolve(descriptions: &[String], inventory: &[WardrobeItem]) -> Vec<WardrobeItem> {
    let mut resolved: Vec<WardrobeItem> = Vec::new();
    for description in descriptions {
        match match_item(description, inventory) {
            Some((tier, item)) => {
                tracing::debug!(description = %description, item = item.id(), ?tier, "resolved wardrobe item");
                if !resolved.iter().any(|existing| existing.id() == item.id()) {
                    resolved.push(item.clone());
                }
            }
            None => {
                tracing::debug!(description = %description, "no wardrobe match, dropping description");
            }
        }
    }
    resolved
}

/// Resolves every outfit and discards those left without any real item.
pub fn resolve_outfits(outfits: Vec<Outfit>, inventory: &[WardrobeItem]) -> Vec<ResolvedOutfit> {
    outfits
        .into_iter()
        .filter_map(|outfit| {
            let items = resolve(&outfit.items, inventory);
            let name = outfit.name.clone();
            let resolved = ResolvedOutfit::from_outfit(outfit, items);
            if resolved.is_none() {
                tracing::info!(outfit = %name, "discarding outfit with no wardrobe items");
            }
            resolved
        })
        .collect()
}

/// Inventory grouped by category in first-seen order, one quoted
/// "color subcategory" per line with its material.
pub fn categorized_listing(items: &[WardrobeItem]) -> String {
    let mut groups: IndexMap<Category, Vec<&WardrobeItem>> = IndexMap::new();
    for item in items {
        groups.entry(item.category()).or_default().push(item);
    }
    groups
        .iter()
        .map(|(category, members)| {
            let lines = members
                .iter()
                .map(|item| {
                    format!(
                        "  - \"{}\" (Material: {})",
                        item.label(),
                        item.material().unwrap_or("N/A")
                    )
                })
                .collect::<Vec<String>>();
            format!("{category}s:\n{}", lines.join("\n"))
        })
        .collect::<Vec<String>>()
        .join("\n\n")
}

/// Comma-separated "color subcategory (category)" summary.
pub fn inventory_summary(items: &[WardrobeItem]) -> String {
    items
        .iter()
        .map(|item| format!("{} ({})", item.label(), item.category()))
        .collect::<Vec<String>>()
        .join(", ")
}
