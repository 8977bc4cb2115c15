//! Assistant orchestration
//!
//! Folds the engine's view of a device into a prompt for an injected
//! generation backend and keeps the conversation history in the session
//! store. The backend is an external collaborator: when it is absent or
//! fails, the caller gets the configured fallback message and nothing is
//! recorded as a reply.

mod prompt;

pub use prompt::{build_prompt, crop_reference, plain_text};

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::AssistantConfig;
use crate::context::{SessionStore, Turn};
use crate::types::{CropProfile, DiagnosticResult, Reading};

/// Natural-language generation seam
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate a reply for `prompt`, given the prior turns of the conversation
    async fn generate(&self, prompt: &str, history: &[Turn]) -> Result<String>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// What the assistant knows about the device when a message arrives
#[derive(Debug, Clone, Copy)]
pub struct ChatContext<'a> {
    pub crop: &'a CropProfile,
    pub latest: Option<&'a Reading>,
    /// Fresh verdict, if the caller just evaluated one
    pub diagnostic: Option<&'a DiagnosticResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    /// Reset trigger; canned greeting
    Greeting,
    Backend,
    /// Backend missing or failed
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatReply {
    pub text: String,
    pub source: ReplySource,
}

pub struct Assistant {
    config: AssistantConfig,
    sessions: Arc<SessionStore>,
    backend: Option<Arc<dyn GenerationBackend>>,
}

impl Assistant {
    pub fn new(
        config: AssistantConfig,
        sessions: Arc<SessionStore>,
        backend: Option<Arc<dyn GenerationBackend>>,
    ) -> Self {
        Self {
            config,
            sessions,
            backend,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Case-insensitive exact match against the configured phrase set
    pub fn is_reset_trigger(&self, message: &str) -> bool {
        let normalized = message.trim().to_lowercase();
        self.config
            .reset_phrases
            .iter()
            .any(|p| p.trim().to_lowercase() == normalized)
    }

    pub fn greeting(&self) -> String {
        format!(
            "Hello! I'm {}, your crop monitoring assistant. How can I help?\n\
             1. Crop diagnosis\n\
             2. Current telemetry\n\
             3. Open the dashboard",
            self.config.name
        )
    }

    /// Handle one inbound message for `session_id`
    pub async fn respond(
        &self,
        session_id: &str,
        message: &str,
        ctx: ChatContext<'_>,
    ) -> ChatReply {
        if self.is_reset_trigger(message) {
            self.sessions.reset(session_id);
            return ChatReply {
                text: self.greeting(),
                source: ReplySource::Greeting,
            };
        }

        if let Some(diagnostic) = ctx.diagnostic {
            self.sessions.set_diagnostic(session_id, diagnostic.clone());
        }
        let diagnostic = ctx
            .diagnostic
            .cloned()
            .or_else(|| self.sessions.last_diagnostic(session_id));

        let prompt = build_prompt(&self.config, ctx.crop, ctx.latest, diagnostic.as_ref(), message);
        // Snapshot so no session lock is held across the await
        let history = self.sessions.turns(session_id);

        let Some(backend) = self.backend.as_ref() else {
            debug!(session_id, "No generation backend configured");
            return self.fallback();
        };

        match backend.generate(&prompt, &history).await {
            Ok(raw) => {
                let text = plain_text(&raw);
                self.sessions.append_exchange(session_id, message, text.clone());
                info!(
                    session_id,
                    backend = backend.backend_name(),
                    turns = history.len() + 2,
                    "Assistant reply generated"
                );
                ChatReply {
                    text,
                    source: ReplySource::Backend,
                }
            }
            Err(e) => {
                warn!(
                    session_id,
                    backend = backend.backend_name(),
                    error = %e,
                    "Generation backend failed, returning fallback"
                );
                self.fallback()
            }
        }
    }

    fn fallback(&self) -> ChatReply {
        ChatReply {
            text: self.config.fallback_message.clone(),
            source: ReplySource::Fallback,
        }
    }
}
