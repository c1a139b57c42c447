//! # AI Actions
//!
//! Validates a requested rewrite action and builds the request sent to the
//! generation service, along with the intent line shown in the transcript.
//!
//! ## Rules
//!
//! - Unknown action names are rejected before any I/O
//! - `Custom Prompt...` needs a non-blank instruction; its text may be empty
//! - `Continue Writing` works from the text before the cursor, so it may be empty
//! - Every other action needs selected text

use serde::{Deserialize, Serialize};

use crate::errors::{EditorError, ValidationError};

/// How much text before the cursor `Continue Writing` sends along
pub const CONTINUE_CONTEXT_CHARS: usize = 1000;

/// Intent line for actions without a canned one
pub const FALLBACK_INTENT: &str = "Working on your request...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    #[serde(rename = "Expand")]
    Expand,
    #[serde(rename = "Continue Writing")]
    ContinueWriting,
    #[serde(rename = "Summarize")]
    Summarize,
    #[serde(rename = "Translate to English")]
    TranslateToEnglish,
    #[serde(rename = "Custom Prompt...")]
    Custom,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::Expand,
        ActionKind::ContinueWriting,
        ActionKind::Summarize,
        ActionKind::TranslateToEnglish,
        ActionKind::Custom,
    ];

    /// Menu label, also used on the wire
    pub fn label(self) -> &'static str {
        match self {
            Self::Expand => "Expand",
            Self::ContinueWriting => "Continue Writing",
            Self::Summarize => "Summarize",
            Self::TranslateToEnglish => "Translate to English",
            Self::Custom => "Custom Prompt...",
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Self::Expand => "expand",
            Self::ContinueWriting => "continue",
            Self::Summarize => "summarize",
            Self::TranslateToEnglish => "translate",
            Self::Custom => "custom",
        }
    }

    /// Resolve a menu label or short id, ignoring case
    pub fn parse(name: &str) -> Result<Self, EditorError> {
        let wanted = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| {
                kind.label().eq_ignore_ascii_case(wanted) || kind.id().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| EditorError::UnsupportedAction(name.to_string()))
    }

    /// Canned transcript line announcing what the assistant is about to do
    pub fn intent(self) -> &'static str {
        match self {
            Self::Expand => "Expanding the selected text with more detail...",
            Self::ContinueWriting => "Continuing from where your text leaves off...",
            Self::Summarize => "Summarizing the selected text...",
            Self::TranslateToEnglish => "Translating the selected text into English...",
            Self::Custom => FALLBACK_INTENT,
        }
    }

    fn needs_selection(self) -> bool {
        matches!(
            self,
            Self::Expand | Self::Summarize | Self::TranslateToEnglish
        )
    }
}

/// Payload handed to the generation service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub action: ActionKind,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_instruction: Option<String>,
}

impl ActionRequest {
    /// Build a validated request.
    ///
    /// `text` is the source span already extracted with [`source_text`].
    pub fn build(
        action: ActionKind,
        text: impl Into<String>,
        custom_instruction: Option<&str>,
    ) -> Result<Self, EditorError> {
        let text = text.into();
        let instruction = custom_instruction
            .map(str::trim)
            .filter(|instruction| !instruction.is_empty());

        if action == ActionKind::Custom && instruction.is_none() {
            return Err(ValidationError::MissingInstruction.into());
        }
        if action.needs_selection() && text.trim().is_empty() {
            return Err(ValidationError::EmptySelection(action.label()).into());
        }

        Ok(Self {
            action,
            text,
            custom_instruction: match action {
                ActionKind::Custom => instruction.map(str::to_string),
                _ => None,
            },
        })
    }

    pub fn intent(&self) -> &'static str {
        self.action.intent()
    }

    /// Transcript line recorded for the user's side of the exchange
    pub fn summary(&self) -> String {
        match &self.custom_instruction {
            Some(instruction) => {
                format!("{}: {}", self.action.label().trim_end_matches('.'), instruction)
            }
            None => self.action.label().to_string(),
        }
    }
}

/// Parse `name` and build a request in one step
pub fn dispatch(
    name: &str,
    text: impl Into<String>,
    custom_instruction: Option<&str>,
) -> Result<ActionRequest, EditorError> {
    let action = ActionKind::parse(name)?;
    ActionRequest::build(action, text, custom_instruction)
}

/// Extract the text an action works on.
///
/// `start`/`end` are char offsets of the selection.
pub fn source_text(action: ActionKind, document: &str, start: usize, end: usize) -> String {
    let (start, end) = (start.min(end), start.max(end));
    match action {
        ActionKind::ContinueWriting => {
            let from = end.saturating_sub(CONTINUE_CONTEXT_CHARS);
            document.chars().skip(from).take(end - from).collect()
        }
        _ => document.chars().skip(start).take(end - start).collect(),
    }
}
