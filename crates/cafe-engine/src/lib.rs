//! cafe-engine: Headless core of the CaféBot coffee assistant
//!
//! This crate holds everything that does not draw to a terminal:
//! - Chat conversation state with canned and remote reply modes
//! - Roast-analysis upload state and result parsing
//! - Image modal with a counted scroll lock
//! - HTTP client for the coffee-expert and roast-analysis endpoints
//! - A dispatcher that runs widget commands on tokio

pub mod analysis;
pub mod canned;
pub mod client;
pub mod config;
pub mod conversation;
pub mod dispatch;
pub mod error;
pub mod modal;
pub mod scene;
pub mod upload;

// Re-export commonly used types
pub use analysis::{AnalysisDetails, AnalysisResult, Chart};
pub use client::{CoffeeApi, HttpClient};
pub use config::{ChatMode, Config, ConfigError, DelayRange, UploadMode};
pub use conversation::{
    ChatCommand, ChatReply, ChatRequest, Conversation, ConversationSettings, Message, RequestId,
    Resolution, Sender,
};
pub use dispatch::{Command, Completion, Dispatcher};
pub use error::{TransportError, ValidationError};
pub use modal::{decode_chart, png_dimensions, ChartError, ImageModal, ModalImage, ScrollLock};
pub use scene::HeroScene;
pub use upload::{
    PreviewRegistry, SelectedFile, UploadCommand, UploadPhase, UploadSettings, UploadWidget,
};

/// Returns the engine version.
pub fn engine_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_version() {
        let version = engine_version();
        assert!(!version.is_empty());
        assert!(version.starts_with("0."));
    }
}
