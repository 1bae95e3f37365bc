//! The prompt contract.
//!
//! Maps a node, its organisation and the scan policy to the instruction
//! document sent to a decision provider. The prompt embeds a literal example
//! of the response schema; parsing the response is not its concern.

mod generator;

pub use generator::generate_prompt;
