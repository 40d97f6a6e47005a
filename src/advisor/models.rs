use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Chat completion request
//
//   { "model": "...", "messages": [ { "role": "user", "content": "..." } ] }
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

impl<'a> ChatRequest<'a> {
    /// A single user turn carrying `prompt`.
    pub fn user(model: &'a str, prompt: &'a str) -> Self {
        Self {
            model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
        }
    }
}

// ---------------------------------------------------------------------------
// Chat completion response
//
// Only `choices[0].message.content` is read; everything else the provider
// sends back (usage, ids, finish reasons) is ignored.
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: String,
}

impl ChatResponse {
    /// Trimmed text of the first choice, if the provider returned any.
    pub fn first_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_owned())
    }
}
