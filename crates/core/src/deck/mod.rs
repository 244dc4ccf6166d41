//! Gesture-driven deck over the candidate queue.

mod deck_machine;
mod deck_model;

pub use deck_machine::DeckStateMachine;
pub use deck_model::*;
