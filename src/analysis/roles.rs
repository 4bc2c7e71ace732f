//! Speaker role classification
//!
//! Shows the first utterances of a call to a chat model and asks which
//! speaker is the agent and which the client. Any failure yields an empty
//! mapping; phrases of unmapped speakers keep a `None` role.

use crate::analysis::json;
use crate::domain::models::{Phrase, Role};
use crate::domain::prompts::{PromptKind, PromptTemplates};
use crate::error::Result;
use crate::ports::llm::{LlmConfig, LlmServicePort};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Keys under which a model sometimes nests the speaker map
const NESTED_KEYS: [&str; 3] = ["speakers", "speaker_roles", "result"];

pub struct SpeakerRoleClassifier {
    llm: Arc<dyn LlmServicePort>,
    config: LlmConfig,
    sample_size: usize,
}

impl SpeakerRoleClassifier {
    pub fn new(llm: Arc<dyn LlmServicePort>, config: LlmConfig, sample_size: usize) -> Self {
        Self {
            llm,
            config,
            sample_size: sample_size.max(1),
        }
    }

    /// Map each speaker label to a role. Never fails.
    pub async fn classify(&self, phrases: &[Phrase]) -> HashMap<String, Role> {
        if phrases.is_empty() {
            return HashMap::new();
        }

        match self.try_classify(phrases).await {
            Ok(roles) => {
                log::info!("Classified {} speaker(s)", roles.len());
                roles
            }
            Err(e) => {
                log::warn!("Role classification degraded, no roles assigned: {}", e);
                HashMap::new()
            }
        }
    }

    async fn try_classify(&self, phrases: &[Phrase]) -> Result<HashMap<String, Role>> {
        let sample = phrases
            .iter()
            .take(self.sample_size)
            .map(Phrase::speaker_line)
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = PromptTemplates::render(PromptKind::SpeakerRoles, &sample);

        let raw = self.llm.complete_json(&prompt, &self.config).await?;
        let value = json::parse_response(&raw)?;

        let mut labels: Vec<&str> = phrases.iter().map(|p| p.speaker.as_str()).collect();
        labels.sort_unstable();
        labels.dedup();

        Ok(parse_roles(&value, &labels))
    }
}

/// Set the role of every phrase whose speaker is in `roles`
pub fn apply_roles(phrases: &mut [Phrase], roles: &HashMap<String, Role>) {
    for phrase in phrases.iter_mut() {
        phrase.role = roles.get(&phrase.speaker).copied();
    }
}

fn parse_roles(value: &Value, labels: &[&str]) -> HashMap<String, Role> {
    let mut roles = HashMap::new();

    let nested = json::find_key(value, "roles", &NESTED_KEYS);
    let source = match nested {
        Some(inner) if inner.is_object() || inner.is_array() => inner,
        _ => value,
    };

    match source {
        Value::Object(map) => {
            for (key, role) in map {
                if let (Some(label), Some(role)) =
                    (resolve_label(key, labels), role.as_str().and_then(Role::from_label))
                {
                    roles.insert(label, role);
                }
            }
        }
        // [{"speaker": "A", "role": "agent"}, ...]
        Value::Array(entries) => {
            for entry in entries {
                let speaker = entry.get("speaker").and_then(Value::as_str);
                let role = entry.get("role").and_then(Value::as_str);
                if let (Some(label), Some(role)) = (
                    speaker.and_then(|s| resolve_label(s, labels)),
                    role.and_then(Role::from_label),
                ) {
                    roles.insert(label, role);
                }
            }
        }
        _ => {}
    }

    roles
}

/// Match a key such as "Speaker A", "speaker_a" or "A" to a known speaker label
fn resolve_label(key: &str, labels: &[&str]) -> Option<String> {
    let key = key.trim();
    if let Some(label) = labels.iter().find(|label| **label == key) {
        return Some(label.to_string());
    }

    let stripped = strip_speaker_prefix(key);
    labels
        .iter()
        .find(|label| {
            label.eq_ignore_ascii_case(stripped)
                || strip_speaker_prefix(label).eq_ignore_ascii_case(stripped)
        })
        .map(|label| label.to_string())
}

fn strip_speaker_prefix(key: &str) -> &str {
    let key = key.trim();
    let lowered = key.to_ascii_lowercase();
    let rest = if lowered.starts_with("speaker") {
        &key["speaker".len()..]
    } else {
        key
    };
    rest.trim_start_matches(|c: char| c == ' ' || c == '_' || c == '-' || c == ':')
        .trim()
}
