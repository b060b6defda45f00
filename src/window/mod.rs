// ABOUTME: Window module — keeps the conversation sent to the model within bounds.
// ABOUTME: A simple count/token trimmer and a pairing-aware trimmer share one estimator.

pub mod pairing;
pub mod tokens;
pub mod trim;

pub use pairing::{TrimStrategy, has_tool_pairs, trim_with_pairs};
pub use tokens::{estimate_message_tokens, estimate_tokens, estimate_with};
pub use trim::trim_window;
