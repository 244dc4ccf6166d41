//! Session identity and the user's profile attributes.

mod session_model;
mod session_state;
mod session_traits;

pub use session_model::*;
pub use session_state::*;
pub use session_traits::*;
