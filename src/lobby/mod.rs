//! Lobby module providing the match lifecycle from formation to payout.
//!
//! This module implements:
//! - LobbyRegistry: lobby creation, retirement, and the joinable-lobby
//!   invariant
//! - LobbyLifecycle: join/leave, grid submission, forming timer, and the
//!   guarded start/finish transitions
//! - Typed lobby/player models and the lobby error taxonomy
//! - GameConfig: engine tuning with env overrides
//!
//! ## Architecture
//!
//! Lobbies are records in the shared store, not in-process objects. The
//! registry keeps the set of active lobby ids and guarantees new arrivals
//! always find exactly one empty forming lobby; the lifecycle mutates a
//! single lobby at a time and spawns its background tasks (forming timer
//! on first join, number caller on start). Concurrent start triggers are
//! serialized by a short-lived store lease rather than an in-process lock.

pub mod config;
pub mod errors;
pub mod lifecycle;
pub mod models;
pub mod registry;

pub use config::{ConfigError, GameConfig};
pub use errors::{LobbyError, LobbyResult};
pub use lifecycle::LobbyLifecycle;
pub use models::{Grid, GridSubmission, Lobby, LobbyId, LobbyStatus, LobbySummary, Player, PlayerId};
pub use registry::LobbyRegistry;
