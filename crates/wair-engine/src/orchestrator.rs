//! Chat turns, photo analysis and virtual try-on, composed from the
//! generative clients, the image codec and the wardrobe resolver.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use wair_contracts::chat::ChatMessage;
use wair_contracts::de::null_as_default;
use wair_contracts::events::{ChatMode, EventLog, StylingEvent};
use wair_contracts::{
    ApiError, Category, NewWardrobeItem, Profile, ProfileAttributes, ResolvedOutfit,
    StylistReply, WardrobeItem,
};

use crate::codec::ImageCodec;
use crate::config::{EngineConfig, DEFAULT_MAX_IMAGE_WIDTH};
use crate::image_client::GenerativeImageClient;
use crate::prompts;
use crate::resolver::resolve_outfits;
use crate::state::AppState;
use crate::text_client::GenerativeTextClient;
use crate::transport::{HttpTransport, Transport};

pub const FALLBACK_REPLY: &str =
    "I'm having trouble responding right now. Please try again in a moment.";
pub const OFFLINE_MESSAGE: &str = "You are offline. Please reconnect to send messages.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatRequest {
    pub text: String,
    /// Inline image attached to the message; switches the turn to photo
    /// critique.
    pub image: Option<String>,
}

impl ChatRequest {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }

    pub fn photo(text: impl Into<String>, image: String) -> Self {
        Self {
            text: text.into(),
            image: Some(image),
        }
    }
}

/// Both halves of a turn as they were stored. `error` is set when the reply is
/// the fallback message.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub user_message: ChatMessage,
    pub reply: ChatMessage,
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawGarment")]
pub struct GarmentAnalysis {
    pub category: Category,
    pub subcategory: String,
    pub color: String,
    pub material: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawGarment {
    #[serde(deserialize_with = "null_as_default")]
    category: String,
    #[serde(deserialize_with = "null_as_default")]
    subcategory: String,
    #[serde(deserialize_with = "null_as_default")]
    color: String,
    #[serde(deserialize_with = "null_as_default")]
    material: String,
}

impl TryFrom<RawGarment> for GarmentAnalysis {
    type Error = String;

    fn try_from(raw: RawGarment) -> Result<Self, Self::Error> {
        let category = raw
            .category
            .parse::<Category>()
            .map_err(|_| format!("unknown garment category {:?}", raw.category))?;
        Ok(Self {
            category,
            subcategory: raw.subcategory.trim().to_string(),
            color: raw.color.trim().to_string(),
            material: Some(raw.material.trim().to_string()).filter(|value| !value.is_empty()),
        })
    }
}

impl GarmentAnalysis {
    pub fn into_item(self, image: String, formality: u8) -> NewWardrobeItem {
        NewWardrobeItem {
            category: self.category,
            subcategory: self.subcategory,
            color: self.color,
            material: self.material,
            formality,
            image,
            description: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub profile: Profile,
    /// Why attributes were not refreshed. The photo is stored regardless.
    pub warning: Option<ApiError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardrobeInsights {
    #[serde(deserialize_with = "null_as_default")]
    pub style: String,
    #[serde(deserialize_with = "null_as_default")]
    pub palette: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TryOnResult {
    pub image: String,
    /// Reference images sent, subject photo included.
    pub references: usize,
}

pub struct StylingOrchestrator {
    text: GenerativeTextClient,
    image: GenerativeImageClient,
    codec: ImageCodec,
    events: Option<EventLog>,
    max_image_width: u32,
}

impl StylingOrchestrator {
    pub fn new(config: EngineConfig) -> Self {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(config.request_timeout));
        let codec = ImageCodec::new(config.request_timeout);
        Self::from_parts(
            GenerativeTextClient::new(config.clone(), transport.clone()),
            GenerativeImageClient::new(config, transport),
            codec,
        )
    }

    pub fn from_parts(
        text: GenerativeTextClient,
        image: GenerativeImageClient,
        codec: ImageCodec,
    ) -> Self {
        Self {
            text,
            image,
            codec,
            events: None,
            max_image_width: DEFAULT_MAX_IMAGE_WIDTH,
        }
    }

    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = Some(events);
        self
    }

    /// Inline, width-bounded JPEG for any local path, URL or data URL.
    pub fn prepare_photo(&self, source: &str) -> Result<String> {
        let canonical = self.codec.to_canonical_encoding(source)?;
        Ok(self.codec.resize(&canonical, self.max_image_width))
    }

    /// Runs one chat turn in `session_id`. Model failures do not fail the
    /// call: the stored reply becomes the fallback message and the error is
    /// returned in the turn.
    pub fn send_message(
        &self,
        state: &AppState,
        session_id: &str,
        request: ChatRequest,
    ) -> Result<ChatTurn> {
        if request.text.trim().is_empty() && request.image.is_none() {
            bail!("nothing to send: message text and photo are both empty");
        }
        if !state.is_online() {
            bail!(OFFLINE_MESSAGE);
        }

        let history = state.messages(session_id)?;
        let wardrobe = state.wardrobe()?;
        let profile = state.profile()?;

        let user_message = ChatMessage::user(request.text.clone(), request.image.clone());
        state.append_message(session_id, user_message.clone())?;
        self.emit(StylingEvent::ChatRequest {
            chat: session_id.to_string(),
            mode: if request.image.is_some() {
                ChatMode::Critique
            } else {
                ChatMode::Outfits
            },
            history: history.len(),
            wardrobe: wardrobe.len(),
        });

        let generated = match request.image.as_deref() {
            Some(image) => self.text.generate_as::<StylistReply>(
                &prompts::critique_prompt(&request.text),
                Some(prompts::CRITIQUE_PERSONA),
                Some(image),
            ),
            None => self.text.generate_as::<StylistReply>(
                &prompts::outfit_prompt(
                    &request.text,
                    profile.attributes.as_ref(),
                    &wardrobe,
                    &history,
                ),
                Some(prompts::STYLIST_PERSONA),
                None,
            ),
        };

        let (reply, error) = match generated {
            Ok(generated) => {
                let proposed = generated.outfits.len();
                let outfits = resolve_outfits(generated.outfits, &wardrobe);
                self.emit(StylingEvent::OutfitsResolved {
                    chat: session_id.to_string(),
                    proposed,
                    kept: outfits.len(),
                    items: outfits.iter().map(|outfit| outfit.items.len()).collect(),
                });
                (ChatMessage::assistant(generated.response_text, outfits), None)
            }
            Err(err) => {
                tracing::warn!(chat = session_id, code = err.kind.code(), "stylist reply failed: {err}");
                self.emit(StylingEvent::ChatFailed {
                    chat: session_id.to_string(),
                    code: err.kind,
                    message: err.message.clone(),
                });
                (ChatMessage::assistant_error(FALLBACK_REPLY), Some(err))
            }
        };

        state.append_message(session_id, reply.clone())?;
        if error.is_none() {
            self.emit(StylingEvent::ChatReply {
                chat: session_id.to_string(),
                outfits: reply.outfits.len(),
            });
        }
        Ok(ChatTurn {
            user_message,
            reply,
            error,
        })
    }

    /// Picks one wardrobe item at random and asks for an outfit around it.
    pub fn surprise_me(&self, state: &AppState, session_id: &str) -> Result<ChatTurn> {
        let wardrobe = state.wardrobe()?;
        let item = wardrobe
            .choose(&mut rand::thread_rng())
            .context("wardrobe is empty, add an item first")?;
        tracing::info!(item = item.id(), "surprise pick");
        self.send_message(
            state,
            session_id,
            ChatRequest::text(prompts::surprise_request(item)),
        )
    }

    /// Infers category, subcategory, color and material from an inline photo.
    /// An unknown category is a parse failure and is retried as one.
    pub fn analyze_garment(&self, image: &str) -> Result<GarmentAnalysis, ApiError> {
        let analysis = self.text.generate_as::<GarmentAnalysis>(
            prompts::GARMENT_ANALYSIS_PROMPT,
            None,
            Some(image),
        )?;
        self.emit(StylingEvent::GarmentAnalyzed {
            category: analysis.category,
            subcategory: analysis.subcategory.clone(),
            color: analysis.color.clone(),
        });
        Ok(analysis)
    }

    /// Adds `source` to the front of the profile gallery and refreshes the
    /// inferred attributes from it. A failed analysis keeps the previous
    /// attributes and is reported as a warning.
    pub fn analyze_profile_photo(&self, state: &AppState, source: &str) -> Result<ProfileUpdate> {
        let photo = self.prepare_photo(source)?;
        let mut profile = state.profile()?;

        let warning = match self.text.generate_as::<ProfileAttributes>(
            prompts::PROFILE_ANALYSIS_PROMPT,
            None,
            Some(&photo),
        ) {
            Ok(attributes) => {
                let attributes = attributes.summarise();
                self.emit(StylingEvent::ProfileAnalyzed {
                    summary: attributes.summary.clone(),
                });
                profile.attributes = Some(attributes);
                None
            }
            Err(err) => {
                tracing::warn!(code = err.kind.code(), "profile analysis failed, keeping photo: {err}");
                Some(err)
            }
        };

        profile.add_photo(photo);
        state.update_profile(profile.clone())?;
        Ok(ProfileUpdate { profile, warning })
    }

    pub fn wardrobe_insights(&self, items: &[WardrobeItem]) -> Result<WardrobeInsights, ApiError> {
        let insights = self
            .text
            .generate_as::<WardrobeInsights>(&prompts::insights_prompt(items), None, None)?;
        self.emit(StylingEvent::InsightsReady {
            items: items.len(),
            palette: insights.palette.clone(),
        });
        Ok(insights)
    }

    /// Renders `photo` wearing `outfit`. Garment images that cannot be loaded
    /// are left out of the references; the subject photo is required.
    pub fn try_on(&self, photo: &str, outfit: &ResolvedOutfit) -> Result<TryOnResult> {
        if photo.trim().is_empty() {
            bail!("select a profile photo before trying on an outfit");
        }
        let subject = self
            .codec
            .to_canonical_encoding(photo)
            .context("failed to load the selected profile photo")?;

        let mut references = vec![subject];
        for item in outfit.items.iter().take(prompts::TRY_ON_REFERENCE_ITEMS) {
            if item.image().is_empty() {
                continue;
            }
            match self.codec.to_canonical_encoding(item.image()) {
                Ok(encoded) => references.push(encoded),
                Err(err) => {
                    tracing::warn!(item = item.id(), "skipping garment image: {err:#}");
                }
            }
        }

        let prompt = prompts::try_on_prompt(&outfit.items);
        match self.image.generate_image(&prompt, &references) {
            Ok(image) => {
                self.emit(StylingEvent::TryOnReady {
                    outfit: outfit.name.clone(),
                    references: references.len(),
                });
                Ok(TryOnResult {
                    image,
                    references: references.len(),
                })
            }
            Err(err) => {
                self.emit(StylingEvent::TryOnFailed {
                    outfit: outfit.name.clone(),
                    code: err.kind,
                    message: err.message.clone(),
                });
                Err(err.into())
            }
        }
    }

    /// Logging is best effort; a failed append never fails the action.
    fn emit(&self, event: StylingEvent) {
        let Some(events) = &self.events else {
            return;
        };
        let name = event.name();
        if let Err(err) = events.append(event) {
            tracing::warn!(event = name, "failed to append styling event: {err:#}");
        }
    }
}
