//! The engine's view of a player's network session.

use super::update::PlayerUpdate;

/// Connection owned by the network layer.
///
/// The engine only polls liveness, delivers one [`PlayerUpdate`] per
/// tick, and closes the session on logout. `send_update` is called from
/// worker threads during the update phase and must not block on the
/// engine.
pub trait Session: Send + Sync {
    /// Whether the client is still connected.
    fn is_connected(&self) -> bool;

    /// Close the connection. Called once when the player is removed.
    fn close(&self);

    /// Deliver this tick's update package.
    fn send_update(&self, update: &PlayerUpdate);
}
