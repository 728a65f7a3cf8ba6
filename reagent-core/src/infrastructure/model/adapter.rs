//! Message adapters - convert chat messages to wire formats

use crate::domain::ChatMessage;
use serde_json::{Value, json};

pub struct MessageAdapter;

impl MessageAdapter {
    /// Convert messages to OpenAI-style format.
    ///
    /// A message with an image becomes a content-part list with a text part
    /// and an `image_url` part.
    pub fn to_openai_format(messages: &[ChatMessage]) -> Vec<Value> {
        messages
            .iter()
            .map(|msg| match &msg.image {
                None => json!({
                    "role": msg.role.as_str(),
                    "content": msg.content.clone()
                }),
                Some(image) => json!({
                    "role": msg.role.as_str(),
                    "content": [
                        {"type": "text", "text": msg.content.clone()},
                        {"type": "image_url", "image_url": {"url": image_url(image)}}
                    ]
                }),
            })
            .collect()
    }
}

/// URLs and data URIs pass through; anything else is taken as base64 PNG.
pub fn image_url(image: &str) -> String {
    let image = image.trim();
    if image.starts_with("http://") || image.starts_with("https://") || image.starts_with("data:") {
        image.to_string()
    } else {
        format!("data:image/png;base64,{image}")
    }
}
