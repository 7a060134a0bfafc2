//! Prompt texts sent to the generative models.

use wair_contracts::chat::{ChatMessage, Role};
use wair_contracts::{ProfileAttributes, WardrobeItem};

use crate::resolver::{categorized_listing, inventory_summary};

/// Messages of context replayed with each outfit request.
pub const HISTORY_WINDOW: usize = 10;
/// Items whose images go along with a try-on request.
pub const TRY_ON_REFERENCE_ITEMS: usize = 3;
pub const DEFAULT_CRITIQUE_COMMENT: &str = "Rate my outfit";

pub const QUICK_START_SUGGESTIONS: [&str; 4] = [
    "Date night look 💕",
    "Job interview outfit",
    "Casual brunch style",
    "Night out with friends",
];

pub const STYLIST_PERSONA: &str = "You are WAIR, an expert fashion stylist AI with deep knowledge of:
- Color theory (complementary, analogous, monochromatic palettes)
- Occasion-appropriate dressing (casual, business, formal, date night, etc.)
- Body-flattering silhouettes and proportions
- Current fashion trends and timeless style principles
- Fabric combinations and seasonal appropriateness

Your goal is to create cohesive, stylish outfits that make users feel confident.";

pub const CRITIQUE_PERSONA: &str =
    "You are WAIR, an expert fashion stylist AI. Analyze the user's uploaded outfit photo.";

const STYLING_INSTRUCTIONS: &str = r#"STYLING INSTRUCTIONS:
1. ONLY use items from the wardrobe above - use EXACT descriptions (e.g., "Blue Blue Jeans", "Black Leather Jacket")
2. Create complete outfits: top + bottom (or dress) + shoes + optional accessories
3. Apply color coordination:
   - Neutrals (black, white, grey, beige) pair with everything
   - Use the 3-color rule maximum
   - Consider complementary or analogous color schemes
4. Match formality levels across all pieces
5. Consider the occasion/context mentioned
6. Explain WHY items work together (color, style, occasion fit)

Create 2 outfit options with different vibes/styles when possible.

Return JSON:
{
  "responseText": "string (friendly greeting + brief style advice, use emoji sparingly)",
  "outfits": [
    {
      "name": "string (catchy outfit name like 'Casual Friday' or 'Weekend Brunch')",
      "occasion": "string (where to wear this)",
      "items": ["exact item description 1", "exact item description 2", "exact item description 3"],
      "reasoning": "string (explain color coordination, style balance, why it works)",
      "stylingTip": "string (one specific tip to elevate this look)"
    }
  ]
}"#;

pub const GARMENT_ANALYSIS_PROMPT: &str = r#"Analyze this clothing item. Return JSON: {
  "category": "Top"|"Bottom"|"Shoes"|"Outerwear"|"Accessory"|"Dress",
  "subcategory": "string (specific type like 'Denim Jacket', 'Sneakers', etc.)",
  "color": "string (main color)",
  "material": "string (fabric/material type)"
}"#;

pub const PROFILE_ANALYSIS_PROMPT: &str = r#"Analyze this person's appearance for a fashion app. Return JSON: {
  "gender": "Woman"|"Man"|"Non-Binary",
  "hair": "string (color and style)",
  "bodyType": "string (general build)",
  "skinTone": "string (general tone)"
}"#;

/// `(role, content)` pairs for the last [`HISTORY_WINDOW`] messages, skipping
/// entries with nothing to say.
pub fn conversation_history(messages: &[ChatMessage]) -> Vec<(Role, String)> {
    let start = messages.len().saturating_sub(HISTORY_WINDOW);
    messages[start..]
        .iter()
        .map(|message| (message.role, message.history_content()))
        .filter(|(_, content)| !content.is_empty())
        .collect()
}

pub fn profile_context(attributes: Option<&ProfileAttributes>) -> String {
    attributes
        .and_then(|attributes| serde_json::to_string(attributes).ok())
        .unwrap_or_else(|| "Unknown".to_string())
}

pub fn outfit_prompt(
    request: &str,
    attributes: Option<&ProfileAttributes>,
    wardrobe: &[WardrobeItem],
    history: &[ChatMessage],
) -> String {
    let conversation = conversation_history(history)
        .into_iter()
        .map(|(role, content)| format!("{}: {content}", role.as_str()))
        .collect::<Vec<String>>()
        .join("\n");
    format!(
        "USER PROFILE:\n{}\n\nWARDROBE INVENTORY:\n{}\n\nCONVERSATION CONTEXT:\n{}\n\nUSER REQUEST: \"{}\"\n\n{}",
        profile_context(attributes),
        categorized_listing(wardrobe),
        conversation,
        request,
        STYLING_INSTRUCTIONS
    )
}

pub fn critique_prompt(comment: &str) -> String {
    let comment = if comment.trim().is_empty() {
        DEFAULT_CRITIQUE_COMMENT
    } else {
        comment
    };
    format!(
        r#"Analyze this outfit photo. User's comment: "{comment}".

Provide:
1. Overall rating (1-10)
2. 3 specific things that work well
3. 1-2 constructive suggestions for improvement

Return JSON: {{
  "responseText": "string (formatted response with emoji and bullet points for readability)",
  "outfits": []
}}"#
    )
}

pub fn insights_prompt(items: &[WardrobeItem]) -> String {
    format!(
        r#"Analyze this wardrobe inventory.
Inventory: {}.
Return JSON: {{
  "style": "string (dominant style description, 2 sentences)",
  "palette": ["color1", "color2", "color3"],
  "missing": ["item1", "item2", "item3"] (3 specific items to complete this wardrobe)
}}"#,
        inventory_summary(items)
    )
}

pub fn surprise_request(item: &WardrobeItem) -> String {
    format!(
        "Build a creative outfit around my {}. Make it something unexpected!",
        item.label()
    )
}

pub fn try_on_prompt(items: &[WardrobeItem]) -> String {
    let clothing = items
        .iter()
        .map(|item| format!("- {}", item.label()))
        .collect::<Vec<String>>()
        .join(", ");
    format!(
        "Create a FULL BODY fashion photograph from head to toe. SUBJECT: The exact same person from the first reference image (same face, hair color, skin tone, body type). CLOTHING: Dress this person in: {clothing}. REQUIREMENTS: MUST show complete full body from head to feet, standing pose facing camera, person's face and features must match reference photo exactly, professional fashion photography with studio lighting, clean white or neutral background, high fashion editorial style, show entire outfit clearly visible. Generate a single realistic photograph."
    )
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use wair_contracts::{Category, NewWardrobeItem, ResolvedOutfit};

    use super::*;

    fn item(color: &str, subcategory: &str, category: Category) -> WardrobeItem {
        WardrobeItem::new(
            format!("{color}-{subcategory}"),
            NewWardrobeItem {
                category,
                subcategory: subcategory.to_string(),
                color: color.to_string(),
                material: Some("Cotton".to_string()),
                formality: 5,
                image: String::new(),
                description: None,
            },
            Utc::now(),
        )
    }

    #[test]
    fn history_keeps_last_ten_non_empty_entries() {
        let mut messages = (0..12)
            .map(|index| ChatMessage::user(format!("message {index}"), None))
            .collect::<Vec<ChatMessage>>();
        messages.push(ChatMessage::user("", Some("data:image/jpeg;base64,AA".to_string())));
        let mut outfit_only = ChatMessage::assistant("", Vec::new());
        outfit_only.text = None;
        outfit_only.outfits = vec![ResolvedOutfit {
            name: "Brunch".to_string(),
            occasion: String::new(),
            items: vec![item("White", "Blouse", Category::Top)],
            reasoning: String::new(),
            styling_tip: String::new(),
        }];
        messages.push(outfit_only);

        let history = conversation_history(&messages);
        assert_eq!(history.len(), 9);
        assert_eq!(history[0], (Role::User, "message 4".to_string()));
        assert_eq!(
            history.last(),
            Some(&(Role::Assistant, "Suggested outfits: Brunch".to_string()))
        );
    }

    #[test]
    fn outfit_prompt_carries_every_context_block() {
        let wardrobe = vec![
            item("Black", "Dress", Category::Dress),
            item("Black", "Heels", Category::Shoes),
        ];
        let history = vec![
            ChatMessage::user("Hi", None),
            ChatMessage::assistant("Hello! How can I help?", Vec::new()),
        ];
        let prompt = outfit_prompt("Date night", None, &wardrobe, &history);

        assert!(prompt.starts_with("USER PROFILE:\nUnknown\n\nWARDROBE INVENTORY:\nDresss:"));
        assert!(prompt.contains("  - \"Black Heels\" (Material: Cotton)"));
        assert!(prompt.contains("CONVERSATION CONTEXT:\nuser: Hi\nassistant: Hello! How can I help?"));
        assert!(prompt.contains("USER REQUEST: \"Date night\""));
        assert!(prompt.contains("Use the 3-color rule maximum"));
        assert!(prompt.contains("\"stylingTip\""));
    }

    #[test]
    fn profile_context_is_attribute_json() {
        let attributes = ProfileAttributes {
            gender: "Woman".to_string(),
            hair: "Brown curls".to_string(),
            skin_tone: "Olive".to_string(),
            body_type: "Athletic".to_string(),
            summary: String::new(),
        }
        .summarise();
        let context = profile_context(Some(&attributes));
        assert!(context.contains("\"skinTone\":\"Olive\""));
        assert!(context.contains("\"summary\":\"Olive skin, Brown curls, Athletic build\""));
    }

    #[test]
    fn critique_prompt_defaults_blank_comment() {
        assert!(critique_prompt("  ").contains("User's comment: \"Rate my outfit\"."));
        assert!(critique_prompt("Too casual?").contains("User's comment: \"Too casual?\"."));
    }

    #[test]
    fn item_driven_prompts_use_labels() {
        let sweater = item("Cream", "Knit Sweater", Category::Top);
        assert_eq!(
            surprise_request(&sweater),
            "Build a creative outfit around my Cream Knit Sweater. Make it something unexpected!"
        );
        let jeans = item("Blue", "Blue Jeans", Category::Bottom);
        assert!(try_on_prompt(&[sweater.clone(), jeans.clone()])
            .contains("Dress this person in: - Cream Knit Sweater, - Blue Blue Jeans."));
        assert!(insights_prompt(&[sweater, jeans])
            .contains("Inventory: Cream Knit Sweater (Top), Blue Blue Jeans (Bottom)."));
    }
}
