pub mod codec;
pub mod config;
pub mod demo;
pub mod image_client;
pub mod orchestrator;
pub mod prompts;
pub mod resolver;
pub mod retry;
pub mod state;
pub mod text_client;
pub mod transport;

pub use codec::ImageCodec;
pub use config::EngineConfig;
pub use image_client::GenerativeImageClient;
pub use orchestrator::{
    ChatRequest, ChatTurn, GarmentAnalysis, ProfileUpdate, StylingOrchestrator, TryOnResult,
    WardrobeInsights,
};
pub use retry::RetryPolicy;
pub use state::AppState;
pub use text_client::GenerativeTextClient;
