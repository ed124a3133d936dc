//! Prompt templates
//!
//! Each template renders to a system prompt and a user prompt.

mod embedded;
mod library;

pub use embedded::{NAMES, get_embedded};
pub use library::{PromptLibrary, PromptPair, USER_MARKER};
