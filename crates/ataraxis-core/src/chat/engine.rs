// Scripted response engine.
//
// Replies come from an ordered keyword table: the first keyword that occurs
// anywhere in the lower-cased input wins. Table order is the only tie-break,
// so the table is a `Vec`, never a map. Input that matches nothing gets a
// random generic reply.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Deserialize;
use tracing::debug;

use crate::assistant::AssistantError;

/// One row of the keyword table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeywordReply {
    pub keyword: String,
    pub reply: String,
}

impl KeywordReply {
    pub fn new(keyword: impl Into<String>, reply: impl Into<String>) -> Self {
        KeywordReply {
            keyword: keyword.into(),
            reply: reply.into(),
        }
    }
}

const GREETING: &str =
    "Hello! I'm your Ataraxis AI oncology assistant. How can I help you today?";
const WELCOME_BACK: &str = "You're welcome! I'm here to assist you anytime.";

const BUILTIN_TABLE: &[(&str, &str)] = &[
    ("hello", GREETING),
    ("hi", GREETING),
    (
        "help",
        "I can help with patient risk assessment, treatment recommendations, and interpreting pathology results. What would you like to know?",
    ),
    (
        "treatment",
        "Treatment recommendations are based on multiple factors including cancer type, stage, biomarkers, and patient history. Would you like me to explain a specific treatment approach?",
    ),
    (
        "risk",
        "Risk assessment is calculated using our proprietary algorithm that considers histological features, biomarkers, and clinical data. The C-index indicates the model's predictive accuracy.",
    ),
    (
        "biomarkers",
        "I analyze key biomarkers including ER, PR, HER2 status, Ki-67 proliferation index, tumor infiltrating lymphocytes (TILs), and genetic markers when available.",
    ),
    (
        "model",
        "Our AI model is trained on over 50,000 pathology slides with known outcomes. It uses a deep learning approach combined with a Cox proportional hazards model for survival analysis.",
    ),
    (
        "accuracy",
        "The model's accuracy varies by cancer type, but generally achieves a C-index between 0.70-0.85, which is comparable to or better than traditional prognostic tools.",
    ),
    (
        "override",
        "You can override AI recommendations when clinical judgment suggests a different approach. All overrides are logged for quality improvement and auditing purposes.",
    ),
    ("thank", WELCOME_BACK),
    ("thanks", WELCOME_BACK),
    (
        "bye",
        "Goodbye! Feel free to reach out if you have more questions later.",
    ),
];

const BUILTIN_FALLBACKS: &[&str] = &[
    "I understand this is important. Could you provide more details so I can better assist you?",
    "I'm not sure I fully understand. Could you rephrase your question?",
    "That's an interesting question. Let me help you find the most relevant information.",
    "I'd be happy to help with that. Could you specify which patient or case you're referring to?",
];

/// The built-in keyword table, in match order.
pub fn builtin_table() -> Vec<KeywordReply> {
    BUILTIN_TABLE
        .iter()
        .map(|(k, r)| KeywordReply::new(*k, *r))
        .collect()
}

/// The built-in generic replies used when nothing matches.
pub fn builtin_fallbacks() -> Vec<String> {
    BUILTIN_FALLBACKS.iter().map(|s| s.to_string()).collect()
}

pub struct ResponseEngine {
    table: Vec<KeywordReply>,
    fallbacks: Vec<String>,
    rng: StdRng,
}

impl ResponseEngine {
    /// Build an engine from an ordered table and a non-empty fallback list.
    ///
    /// Keywords are lower-cased here so matching against lower-cased input
    /// stays case-insensitive whatever the table's source.
    pub fn new(table: Vec<KeywordReply>, fallbacks: Vec<String>) -> Result<Self, AssistantError> {
        if fallbacks.is_empty() {
            return Err(AssistantError::NoFallbackReplies);
        }
        let table = table
            .into_iter()
            .map(|row| KeywordReply {
                keyword: row.keyword.to_lowercase(),
                reply: row.reply,
            })
            .collect();
        Ok(ResponseEngine {
            table,
            fallbacks,
            rng: StdRng::from_entropy(),
        })
    }

    /// Engine over the built-in table and fallbacks.
    pub fn builtin() -> Self {
        ResponseEngine {
            table: builtin_table(),
            fallbacks: builtin_fallbacks(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Make fallback choices reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn table(&self) -> &[KeywordReply] {
        &self.table
    }

    pub fn fallbacks(&self) -> &[String] {
        &self.fallbacks
    }

    /// Reply of the first keyword (in table order) contained in `input`.
    pub fn match_keyword(&self, input: &str) -> Option<&str> {
        let lowered = input.to_lowercase();
        self.table
            .iter()
            .find(|row| lowered.contains(row.keyword.as_str()))
            .map(|row| {
                debug!(keyword = %row.keyword, "keyword matched");
                row.reply.as_str()
            })
    }

    /// Decide what the assistant says in response to `input`. Never fails.
    pub fn reply(&mut self, input: &str) -> String {
        if let Some(reply) = self.match_keyword(input) {
            return reply.to_string();
        }
        match self.fallbacks.choose(&mut self.rng) {
            Some(reply) => reply.clone(),
            // `new` refuses an empty fallback list.
            None => String::new(),
        }
    }

    /// Expose the rng so the reveal planner shares one seeded source.
    pub(crate) fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}
