//! Prompt templates for the language-model steps
//!
//! Every template asks for a JSON object and documents the key the parser
//! looks for first. Parsers also accept a list of fallback keys, see
//! `analysis::json`.

/// Kind of language-model task in the analysis pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    SpeakerRoles,
    Topics,
    Sentiment,
}

/// A system/user prompt pair ready to send to a chat model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
}

/// Default prompt templates for each task
pub struct PromptTemplates;

impl PromptTemplates {
    /// System prompt for speaker role classification
    pub fn speaker_roles_system() -> &'static str {
        "You are an expert in analyzing call center conversations. Identify which speaker is the agent and which is the client."
    }

    /// User prompt for speaker role classification
    pub fn speaker_roles() -> &'static str {
        r#"Below is the beginning of a call center conversation. Identify which speaker is the agent and which is the client.

{transcript}

Return your answer as a JSON object with the speaker labels as keys and "agent" or "client" as values, for example: {"A": "agent", "B": "client"}."#
    }

    /// System prompt for topic extraction
    pub fn topics_system() -> &'static str {
        "You are an expert in analyzing call center conversations. Identify the 3 most important topics discussed in the conversation."
    }

    /// User prompt for topic extraction
    pub fn topics() -> &'static str {
        r#"Below is the transcript of a call center conversation. Identify the 3 most important topics that were discussed. Each topic must be at most 3 words long and written in the language of the conversation.

{transcript}

Return your answer as a JSON object of the form {"topics": ["topic one", "topic two", "topic three"]}."#
    }

    /// System prompt for single-call sentiment scoring
    pub fn sentiment_system() -> &'static str {
        "You are a sentiment analysis engine. You score every message independently and answer only with JSON."
    }

    /// User prompt for single-call sentiment scoring
    pub fn sentiment() -> &'static str {
        r#"Score the sentiment of each of the following numbered messages. For every message give positive, negative and neutral scores between 0 and 1 that sum to 1.

{messages}

Return a JSON object of the form {"messages": [{"index": 0, "positive": 0.1, "negative": 0.1, "neutral": 0.8}]} with one entry per message, keeping the original indexes."#
    }

    /// System prompt for answering a question over stored call chunks
    pub fn question_system() -> &'static str {
        r#"You answer questions for agents of a call center working with multiple companies. Reply only with a JSON object of the form {"answer": "..."}."#
    }

    /// Opening of a question prompt; the question and transcript chunks follow it
    pub fn question_context() -> &'static str {
        "The following are pieces of a transcript or from multiple transcripts from calls between a call center and a client company. \
Use this information to answer the subsequent question as accurately as possible *only if it clearly contains the answer or allows a strong inference*. \
If the answer is directly stated in the transcript, give it, but don't use the word 'transcript' to refer to your source, say 'como se mencionó durante una llamada previa.'. \
If it can be reasonably inferred, explain your reasoning. \
If the context seems off-topic, vague, or unhelpful, IGNORE it completely and answer the question from general knowledge. \
If the answer cannot be found or reasonably inferred, ignore all context and answer as you would if you only got the question and no additional data"
    }

    /// System prompt for follow-up insights about a company's recent call
    pub fn insights_system() -> &'static str {
        r#"Eres un asistente útil para un agente de soporte a cliente. Tu tarea es dar 3 insights que este agente pueda encontrar útiles para mejorar su trabajo con una empresa cliente específica. Solo respondes en JSON con el siguiente formato: {"insights": ["insight1", "insight2", "insight3"]}, sin usar formato markdown."#
    }

    /// Opening of a suggestions prompt; transcript chunks follow it
    pub fn suggestions_context() -> &'static str {
        "The following are pieces of a transcript or from multiple transcripts from calls between a call center and a client company. This might be a complete or uncomplete transcript, or may also contain chunks from multiple transcripts. \
Use this information to generate 3 prompt suggestions or follow up questions that a user could ask. \
Don't mention your source, only give the suggestions. \
If the context seems vague, or unhelpful, IGNORE it completely and give 3 suggestions an agent could ask ChatGPT so as to enhance their performance or gain insights from similar cases or colleagues. \
If you can't get reasonably inferred questions, ignore all context and answer as you would if you had received only the prompt with no additional information."
    }

    /// Get the (system, user) templates for a task
    pub fn for_kind(kind: PromptKind) -> (&'static str, &'static str) {
        match kind {
            PromptKind::SpeakerRoles => (Self::speaker_roles_system(), Self::speaker_roles()),
            PromptKind::Topics => (Self::topics_system(), Self::topics()),
            PromptKind::Sentiment => (Self::sentiment_system(), Self::sentiment()),
        }
    }

    /// Fill a template's placeholder and pair it with its system prompt
    pub fn render(kind: PromptKind, body: &str) -> ChatPrompt {
        let (system, user) = Self::for_kind(kind);
        let placeholder = match kind {
            PromptKind::Sentiment => "{messages}",
            PromptKind::SpeakerRoles | PromptKind::Topics => "{transcript}",
        };
        ChatPrompt {
            system: system.to_string(),
            user: user.replace(placeholder, body),
        }
    }
}
