//! Starter wardrobe and gallery for new users.

use chrono::Utc;
use rand::Rng;
use sha2::{Digest, Sha256};
use wair_contracts::{Category, NewWardrobeItem, Profile, ProfileAttributes, WardrobeItem};

struct DemoGarment {
    category: Category,
    subcategory: &'static str,
    color: &'static str,
    material: &'static str,
    image: &'static str,
}

const fn garment(
    category: Category,
    subcategory: &'static str,
    color: &'static str,
    material: &'static str,
    image: &'static str,
) -> DemoGarment {
    DemoGarment {
        category,
        subcategory,
        color,
        material,
        image,
    }
}

const DEMO_GARMENTS: [DemoGarment; 27] = [
    garment(Category::Top, "White Blouse", "White", "Cotton", "/images/wardrobe/tops/01-white-blouse.jpg"),
    garment(Category::Top, "Black T-Shirt", "Black", "Cotton", "/images/wardrobe/tops/02-black-top.jpg"),
    garment(Category::Top, "Striped Shirt", "Blue/White", "Cotton", "/images/wardrobe/tops/03-striped-shirt.jpg"),
    garment(Category::Top, "Knit Sweater", "Cream", "Wool", "/images/wardrobe/tops/04-sweater.jpg"),
    garment(Category::Top, "Tank Top", "White", "Cotton", "/images/wardrobe/tops/05-tank-top.jpg"),
    garment(Category::Top, "Silk Blouse", "Pink", "Silk", "/images/wardrobe/tops/06-blouse.jpg"),
    garment(Category::Bottom, "Blue Jeans", "Blue", "Denim", "/images/wardrobe/bottoms/01-blue-jeans.jpg"),
    garment(Category::Bottom, "Black Pants", "Black", "Cotton", "/images/wardrobe/bottoms/02-black-pants.jpg"),
    garment(Category::Bottom, "Midi Skirt", "Brown", "Polyester", "/images/wardrobe/bottoms/03-skirt.jpg"),
    garment(Category::Bottom, "Denim Shorts", "Light Blue", "Denim", "/images/wardrobe/bottoms/04-shorts.jpg"),
    garment(Category::Bottom, "Tailored Trousers", "Beige", "Wool Blend", "/images/wardrobe/bottoms/05-trousers.jpg"),
    garment(Category::Dress, "Red Gown", "Red", "Satin", "/images/wardrobe/dresses/01-black-dress.jpg"),
    garment(Category::Dress, "Floral Dress", "Multi", "Cotton", "/images/wardrobe/dresses/02-floral-dress.jpg"),
    garment(Category::Dress, "Summer Dress", "Yellow", "Linen", "/images/wardrobe/dresses/03-summer-dress.jpg"),
    garment(Category::Dress, "Evening Dress", "Navy", "Silk", "/images/wardrobe/dresses/04-evening-dress.jpg"),
    garment(Category::Outerwear, "Blazer", "Grey", "Wool", "/images/wardrobe/outerwear/01-blazer.jpg"),
    garment(Category::Outerwear, "Leather Jacket", "Black", "Leather", "/images/wardrobe/outerwear/02-leather-jacket.jpg"),
    garment(Category::Outerwear, "Denim Jacket", "Blue", "Denim", "/images/wardrobe/outerwear/03-denim-jacket.jpg"),
    garment(Category::Outerwear, "Wool Coat", "Camel", "Wool", "/images/wardrobe/outerwear/04-coat.jpg"),
    garment(Category::Shoes, "Sneakers", "Red", "Mesh", "/images/wardrobe/shoes/01-sneakers.jpg"),
    garment(Category::Shoes, "Heels", "Black", "Patent Leather", "/images/wardrobe/shoes/02-heels.jpg"),
    garment(Category::Shoes, "Ankle Boots", "Brown", "Leather", "/images/wardrobe/shoes/03-boots.jpg"),
    garment(Category::Shoes, "Sandals", "Tan", "Leather", "/images/wardrobe/shoes/04-sandals.jpg"),
    garment(Category::Accessory, "Handbag", "Red", "Leather", "/images/wardrobe/accessories/01-handbag.jpg"),
    garment(Category::Accessory, "Sunglasses", "Black", "Plastic", "/images/wardrobe/accessories/02-sunglasses.jpg"),
    garment(Category::Accessory, "Watch", "Silver", "Stainless Steel", "/images/wardrobe/accessories/03-watch.jpg"),
    garment(Category::Accessory, "Scarf", "Multi", "Cashmere", "/images/wardrobe/accessories/04-scarf.jpg"),
];

pub const DEMO_GALLERY_IMAGES: [&str; 5] = [
    "/images/models/model-01.jpg",
    "/images/models/model-02.jpg",
    "/images/models/model-03.jpg",
    "/images/models/model-04.jpg",
    "/images/models/model-05.jpg",
];

/// Drafts for the starter wardrobe. Formality is rolled per call.
pub fn demo_drafts() -> Vec<NewWardrobeItem> {
    let mut rng = rand::thread_rng();
    DEMO_GARMENTS
        .iter()
        .map(|garment| NewWardrobeItem {
            category: garment.category,
            subcategory: garment.subcategory.to_string(),
            color: garment.color.to_string(),
            material: Some(garment.material.to_string()),
            formality: rng.gen_range(1..=9),
            image: garment.image.to_string(),
            description: Some(format!(
                "A stylish {} {} made of {}",
                garment.color, garment.subcategory, garment.material
            )),
        })
        .collect()
}

/// Stable id for a demo draft so reseeding replaces instead of duplicating.
pub fn demo_item_id(draft: &NewWardrobeItem) -> String {
    let mut hasher = Sha256::new();
    hasher.update(draft.category.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(draft.subcategory.as_bytes());
    hasher.update([0]);
    hasher.update(draft.color.as_bytes());
    hasher.update([0]);
    hasher.update(draft.image.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("demo-{}", &digest[..16])
}

pub fn demo_wardrobe() -> Vec<WardrobeItem> {
    let now = Utc::now();
    demo_drafts()
        .into_iter()
        .map(|draft| {
            let id = demo_item_id(&draft);
            WardrobeItem::new(id, draft, now)
        })
        .collect()
}

pub fn demo_gallery() -> Vec<String> {
    DEMO_GALLERY_IMAGES.iter().map(|path| path.to_string()).collect()
}

/// Profile given to users who have never saved one.
pub fn demo_profile() -> Profile {
    Profile {
        gallery: demo_gallery(),
        attributes: Some(ProfileAttributes {
            gender: "Woman".to_string(),
            hair: "Brunette".to_string(),
            skin_tone: "Light".to_string(),
            body_type: "Slim".to_string(),
            summary: "Demo Profile".to_string(),
        }),
    }
}
