//! Public chat messages.

/// A single public chat message as decoded by the protocol layer.
///
/// The text stays in the client's packed form; the engine only moves it
/// from the speaker's queue into their update block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    /// Text colour code.
    pub colour: u8,
    /// Text effect code.
    pub effects: u8,
    /// Packed message text.
    pub text: Vec<u8>,
}

impl ChatMessage {
    /// Create a chat message.
    pub fn new(colour: u8, effects: u8, text: impl Into<Vec<u8>>) -> Self {
        Self {
            colour,
            effects,
            text: text.into(),
        }
    }
}
