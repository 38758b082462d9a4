//! # Cosmic Bingo
//!
//! A real-money bingo lobby and game engine.
//!
//! Players join a forming lobby, submit a 3x3 grid of numbers, and once the
//! game starts numbers are called on a timer until someone claims a win
//! that checks out against the call history. The engine owns the lobby
//! state machine, the background timers, and the bookkeeping that keeps
//! starts and payouts single-shot under concurrent requests; HTTP routing,
//! authentication, and payment settlement live elsewhere.
//!
//! ## Architecture
//!
//! All state lives in an injected key-value store: lobby and player
//! records as hashes, the call history as a list, active-lobby membership
//! as a set. Request handlers and background tasks (the forming timer, the
//! number caller) coordinate only through that store: each task re-reads
//! ground truth before acting and self-terminates when the lobby has moved
//! on. The one hard mutual-exclusion primitive is a create-if-absent lease
//! that serializes the forming -> active transition.
//!
//! A lobby moves strictly forward through three phases:
//!
//! - **Forming**: accepting joins, leaves, and grid submissions, bounded
//!   by a deadline armed at the first join
//! - **Active**: numbers called on a fixed interval; claims verified
//!   against the stored grid and the call history
//! - **Finished**: winner (or none) recorded exactly once; the pot is
//!   reported for settlement by the payment layer
//!
//! ## Core Modules
//!
//! - [`lobby`]: registry, lifecycle state machine, models, configuration
//! - [`game`]: grid validation, win patterns, number calling, claims
//! - [`store`]: the key-value abstraction and the typed record adapter
//!
//! ## Example
//!
//! ```
//! use cosmic_bingo::{GameConfig, LobbyLifecycle, LobbyRegistry, LobbyRepository, MemoryStore};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let repo = LobbyRepository::new(Arc::new(MemoryStore::new()));
//! let config = GameConfig::default();
//! let registry = LobbyRegistry::new(repo.clone(), config.clone());
//! let lifecycle = LobbyLifecycle::new(repo, config, registry.clone());
//!
//! let lobby = registry.create_lobby().await.unwrap();
//! let summary = lifecycle.add_player(lobby.id, "alice").await.unwrap();
//! assert_eq!(summary.pot, summary.buy_in_amount);
//! # }
//! ```

/// Game-phase logic: cards, win patterns, number calling, claims.
pub mod game;
pub use game::{
    ClaimOutcome, ClaimVerifier, GridError, NumberCaller, WinPattern, check_win_patterns,
    validate_grid,
};

/// Lobby registry, lifecycle state machine, models, and configuration.
pub mod lobby;
pub use lobby::{
    ConfigError, GameConfig, Grid, GridSubmission, Lobby, LobbyError, LobbyId, LobbyLifecycle,
    LobbyRegistry, LobbyResult, LobbyStatus, LobbySummary, Player, PlayerId,
};

/// The shared store abstraction and typed record access.
pub mod store;
pub use store::{KeyValueStore, LobbyRepository, MemoryStore, StoreError, StoreResult};
