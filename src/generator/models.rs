use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Free,
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelOption {
    pub id: &'static str,
    pub name: &'static str,
    pub tier: ModelTier,
}

pub const MODEL_OPTIONS: &[ModelOption] = &[
    ModelOption {
        id: "llama-3.3-70b-versatile",
        name: "Llama 3 70B (Free)",
        tier: ModelTier::Free,
    },
    ModelOption {
        id: "llama3-70b-8192",
        name: "Llama 3 70B (High Performance)",
        tier: ModelTier::Paid,
    },
    ModelOption {
        id: "mixtral-8x7b-32768",
        name: "Mixtral 8x7B (Balanced)",
        tier: ModelTier::Paid,
    },
];

pub fn default_model_id() -> &'static str {
    MODEL_OPTIONS[0].id
}

pub fn is_known_model(id: &str) -> bool {
    MODEL_OPTIONS.iter().any(|option| option.id == id)
}
