mod dialogue;
mod eval;

pub use dialogue::{ChoiceEntry, Dialogue, DialogueOptions, DialogueState, DEFAULT_MAX_STEPS};
pub use eval::evaluate_expression;
