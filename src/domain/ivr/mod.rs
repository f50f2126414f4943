//! IVR bounded context - menu-driven dialog per call

pub mod menu;
pub mod session;

pub use menu::{IvrMenu, IvrMenuBuilder, IvrOption, MenuStore, OptionAction};
pub use session::{IvrSession, SessionContext, SessionStatus, SessionStore};

use async_trait::async_trait;

/// Port to the external speech-to-text collaborator
///
/// Used only when an input arrives as speech. Failures degrade to treating
/// the input as unresolved text; the dialog continues.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn speech_to_text(
        &self,
        audio_ref: &str,
        language: &str,
    ) -> crate::domain::shared::Result<String>;
}
