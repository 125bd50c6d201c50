/*!
 * Prompt templates for subtitle translation.
 */

/// Message sent on every follow-up turn of a session
pub const CONTINUE_MESSAGE: &str = "continue";

/// Separator placed between the parts of a multi-part message
pub const MESSAGE_PART_SEPARATOR: &str = "\n---\n";

/// Closing instruction of the opening message
const CLOSING_INSTRUCTION: &str = "Translate the provided subtitle file. Maintain SRT format and timing.";

/// Instruction template for subtitle translation.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// The default instruction for subtitle translation.
    pub const SUBTITLE_TRANSLATOR: &'static str = "You are a professional subtitle translator. Your task is to translate subtitles from {source_language} to {target_language}.
Maintain the SRT format and timing. Fix capitalization where needed. Preserve any special formatting or tags.
Context for this translation: {context}
Translate the content naturally, considering the context and maintaining the original tone and style.";

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Create the default subtitle translator template.
    pub fn subtitle_translator() -> Self {
        Self::new(Self::SUBTITLE_TRANSLATOR)
    }

    /// Render the template with the given variables.
    pub fn render(&self, source_language: &str, target_language: &str, context: &str) -> String {
        self.template
            .replace("{source_language}", source_language)
            .replace("{target_language}", target_language)
            .replace("{context}", context)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::subtitle_translator()
    }
}

/// Builder for the opening message of a translation session.
#[derive(Debug, Clone)]
pub struct TranslationPromptBuilder {
    template: PromptTemplate,
    source_language: String,
    target_language: String,
    context: String,
}

impl TranslationPromptBuilder {
    /// Create a builder for the given language pair.
    pub fn new(source_language: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            template: PromptTemplate::default(),
            source_language: source_language.into(),
            target_language: target_language.into(),
            context: String::new(),
        }
    }

    /// Set the free-form context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Parts of the opening message: instruction, full input, closing instruction.
    pub fn opening_parts(&self, subtitle_text: &str) -> Vec<String> {
        vec![
            self.template.render(&self.source_language, &self.target_language, &self.context),
            subtitle_text.to_string(),
            CLOSING_INSTRUCTION.to_string(),
        ]
    }

    /// The opening message as sent over the session.
    pub fn build_opening_message(&self, subtitle_text: &str) -> String {
        self.opening_parts(subtitle_text).join(MESSAGE_PART_SEPARATOR)
    }
}
