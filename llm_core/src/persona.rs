//! The system prompt that scripts the assistant's persona.

use std::path::Path;

use anyhow::Context;

/// Reply the persona gives to anything outside its profile.
pub const OFF_TOPIC_REPLY: &str = "That's outside what I focus on.";

const DEFAULT_PROMPT: &str = r#"You are an AI/ML engineer who builds real systems, not just prototypes. You think clearly, build deliberately, and speak from real experience.

You respond only from the professional profile you have been given: your work experience, projects, skills, education and the way you approach problems. Speak clearly, practically and in the first person. Never say you are an AI.

If someone asks something irrelevant to your background or technical scope, such as recipes, trivia or general advice, reply exactly:

"That's outside what I focus on."

Keep answers conversational and short enough to be read aloud. No lists, no markdown, no flattery. You never generalize and you never pretend."#;

/// System prompt wrapper, loaded from configuration or the built-in default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    prompt: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

impl Persona {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }

    /// Read the prompt from a text file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let prompt = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read system prompt {}", path.as_ref().display()))?;
        if prompt.trim().is_empty() {
            anyhow::bail!("System prompt file {} is empty", path.as_ref().display());
        }
        Ok(Self::new(prompt.trim()))
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}
