pub mod chat;
pub mod de;
pub mod errors;
pub mod events;
pub mod outfits;
pub mod profile;
pub mod stores;
pub mod wardrobe;

pub use errors::{ApiError, ApiErrorKind};
pub use outfits::{Outfit, ResolvedOutfit, StylistReply};
pub use profile::{Profile, ProfileAttributes};
pub use wardrobe::{Category, NewWardrobeItem, WardrobeItem};
