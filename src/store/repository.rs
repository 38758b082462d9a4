//! Typed access to lobby state in the shared store.
//!
//! The repository owns key naming and field encoding; everything above it
//! works with `Lobby`/`Player` values. Record hashes hold one string per
//! field (timestamps as RFC 3339, numbers and grids as JSON), the called
//! history is an append-only list, and membership lives in sets so players
//! can be enumerated without key scans.

use super::{KeyValueStore, StoreError, StoreResult};
use crate::lobby::models::{Grid, Lobby, LobbyId, LobbyStatus, Player};
use chrono::{DateTime, Utc};
use std::{collections::HashMap, str::FromStr, sync::Arc, time::Duration};
use uuid::Uuid;

const ACTIVE_LOBBIES_KEY: &str = "lobbies:active";

fn lobby_key(id: LobbyId) -> String {
    format!("lobby:{id}")
}

fn players_key(id: LobbyId) -> String {
    format!("lobby:{id}:players")
}

fn player_key(id: LobbyId, player_id: &str) -> String {
    format!("lobby:{id}:player:{player_id}")
}

fn calls_key(id: LobbyId) -> String {
    format!("lobby:{id}:numbers_called")
}

fn start_lease_key(id: LobbyId) -> String {
    format!("lobby:{id}:start_lease")
}

fn corrupt(field: &str, reason: impl ToString) -> StoreError {
    StoreError::Corrupt {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn require_field<T>(fields: &HashMap<String, String>, name: &str) -> StoreResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = fields.get(name).ok_or_else(|| corrupt(name, "missing"))?;
    raw.parse().map_err(|e: T::Err| corrupt(name, e))
}

fn optional_field<T>(fields: &HashMap<String, String>, name: &str) -> StoreResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match fields.get(name) {
        None => Ok(None),
        Some(raw) if raw.is_empty() => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|e: T::Err| corrupt(name, e)),
    }
}

fn lobby_fields(lobby: &Lobby) -> Vec<(String, String)> {
    let mut fields = vec![
        ("id".to_string(), lobby.id.to_string()),
        ("name".to_string(), lobby.name.clone()),
        ("status".to_string(), lobby.status.to_string()),
        ("buy_in_amount".to_string(), lobby.buy_in_amount.to_string()),
        ("pot".to_string(), lobby.pot.to_string()),
        ("created_at".to_string(), lobby.created_at.to_rfc3339()),
    ];
    if let Some(winner) = &lobby.winner {
        fields.push(("winner".to_string(), winner.clone()));
    }
    if let Some(deadline) = lobby.forming_deadline {
        fields.push(("forming_deadline".to_string(), deadline.to_rfc3339()));
    }
    if let Some(started_at) = lobby.started_at {
        fields.push(("started_at".to_string(), started_at.to_rfc3339()));
    }
    if let Some(finished_at) = lobby.finished_at {
        fields.push(("finished_at".to_string(), finished_at.to_rfc3339()));
    }
    if let Some(latest) = lobby.latest_number {
        fields.push(("latest_number".to_string(), latest.to_string()));
    }
    if let Some(previous) = lobby.previous_number {
        fields.push(("previous_number".to_string(), previous.to_string()));
    }
    fields
}

fn lobby_from_fields(fields: &HashMap<String, String>) -> StoreResult<Lobby> {
    Ok(Lobby {
        id: require_field(fields, "id")?,
        name: require_field(fields, "name")?,
        status: require_field(fields, "status")?,
        buy_in_amount: require_field(fields, "buy_in_amount")?,
        pot: require_field(fields, "pot")?,
        winner: optional_field(fields, "winner")?,
        created_at: require_field(fields, "created_at")?,
        forming_deadline: optional_field(fields, "forming_deadline")?,
        started_at: optional_field(fields, "started_at")?,
        finished_at: optional_field(fields, "finished_at")?,
        latest_number: optional_field(fields, "latest_number")?,
        previous_number: optional_field(fields, "previous_number")?,
    })
}

fn player_fields(player: &Player) -> StoreResult<Vec<(String, String)>> {
    let numbers =
        serde_json::to_string(&player.numbers).map_err(|e| corrupt("numbers", e))?;
    let mut fields = vec![
        ("player_id".to_string(), player.id.clone()),
        ("numbers".to_string(), numbers),
        ("ready".to_string(), player.ready.to_string()),
        ("active".to_string(), player.active.to_string()),
        ("joined_at".to_string(), player.joined_at.to_rfc3339()),
    ];
    if let Some(grid) = &player.grid {
        let grid = serde_json::to_string(grid).map_err(|e| corrupt("grid", e))?;
        fields.push(("grid".to_string(), grid));
    }
    Ok(fields)
}

fn player_from_fields(fields: &HashMap<String, String>) -> StoreResult<Player> {
    let numbers: Vec<u8> = match fields.get("numbers") {
        None => Vec::new(),
        Some(raw) => serde_json::from_str(raw).map_err(|e| corrupt("numbers", e))?,
    };
    let grid: Option<Grid> = match fields.get("grid") {
        None => None,
        Some(raw) => Some(serde_json::from_str(raw).map_err(|e| corrupt("grid", e))?),
    };
    Ok(Player {
        id: require_field(fields, "player_id")?,
        numbers,
        grid,
        ready: require_field(fields, "ready")?,
        active: require_field(fields, "active")?,
        joined_at: require_field(fields, "joined_at")?,
    })
}

/// Typed lobby/player record access over an injected [`KeyValueStore`].
#[derive(Clone)]
pub struct LobbyRepository {
    store: Arc<dyn KeyValueStore>,
}

impl LobbyRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Write a full lobby record and apply its bounded lifetime.
    pub async fn put_lobby(&self, lobby: &Lobby, ttl: Duration) -> StoreResult<()> {
        let key = lobby_key(lobby.id);
        self.store.hash_set(&key, lobby_fields(lobby)).await?;
        self.store.expire(&key, ttl).await
    }

    /// Read a lobby record; `None` when absent or expired.
    pub async fn fetch_lobby(&self, id: LobbyId) -> StoreResult<Option<Lobby>> {
        let fields = self.store.hash_get_all(&lobby_key(id)).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        lobby_from_fields(&fields).map(Some)
    }

    /// Transition a lobby to active.
    pub async fn mark_active(&self, id: LobbyId, started_at: DateTime<Utc>) -> StoreResult<()> {
        self.store
            .hash_set(
                &lobby_key(id),
                vec![
                    ("status".to_string(), LobbyStatus::Active.to_string()),
                    ("started_at".to_string(), started_at.to_rfc3339()),
                ],
            )
            .await
    }

    /// Transition a lobby to finished, recording the winner when there is
    /// one. Callers check status first; see `LobbyLifecycle::finish_game`.
    pub async fn mark_finished(
        &self,
        id: LobbyId,
        winner: Option<&str>,
        finished_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut fields = vec![
            ("status".to_string(), LobbyStatus::Finished.to_string()),
            ("finished_at".to_string(), finished_at.to_rfc3339()),
        ];
        if let Some(winner) = winner {
            fields.push(("winner".to_string(), winner.to_string()));
        }
        self.store.hash_set(&lobby_key(id), fields).await
    }

    pub async fn set_forming_deadline(
        &self,
        id: LobbyId,
        deadline: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.store
            .hash_set(
                &lobby_key(id),
                vec![("forming_deadline".to_string(), deadline.to_rfc3339())],
            )
            .await
    }

    pub async fn clear_forming_deadline(&self, id: LobbyId) -> StoreResult<()> {
        self.store
            .hash_remove(&lobby_key(id), &["forming_deadline"])
            .await
    }

    /// Atomically adjust the pot, returning the new total.
    pub async fn adjust_pot(&self, id: LobbyId, delta: i64) -> StoreResult<i64> {
        self.store.hash_increment(&lobby_key(id), "pot", delta).await
    }

    /// Write a player record and index it in the lobby's membership set.
    pub async fn put_player(
        &self,
        lobby_id: LobbyId,
        player: &Player,
        ttl: Duration,
    ) -> StoreResult<()> {
        let key = player_key(lobby_id, &player.id);
        self.store.hash_set(&key, player_fields(player)?).await?;
        self.store.expire(&key, ttl).await?;
        let members = players_key(lobby_id);
        self.store.set_add(&members, player.id.clone()).await?;
        self.store.expire(&members, ttl).await
    }

    pub async fn fetch_player(
        &self,
        lobby_id: LobbyId,
        player_id: &str,
    ) -> StoreResult<Option<Player>> {
        let fields = self
            .store
            .hash_get_all(&player_key(lobby_id, player_id))
            .await?;
        if fields.is_empty() {
            return Ok(None);
        }
        player_from_fields(&fields).map(Some)
    }

    /// All player records for a lobby. Members whose record has already
    /// expired are skipped.
    pub async fn fetch_players(&self, lobby_id: LobbyId) -> StoreResult<Vec<Player>> {
        let mut players = Vec::new();
        for player_id in self.store.set_members(&players_key(lobby_id)).await? {
            if let Some(player) = self.fetch_player(lobby_id, &player_id).await? {
                players.push(player);
            }
        }
        Ok(players)
    }

    pub async fn player_count(&self, lobby_id: LobbyId) -> StoreResult<usize> {
        Ok(self.store.set_members(&players_key(lobby_id)).await?.len())
    }

    /// Delete a player record entirely (voluntary leave during forming).
    pub async fn remove_player(&self, lobby_id: LobbyId, player_id: &str) -> StoreResult<()> {
        self.store.remove(&player_key(lobby_id, player_id)).await?;
        self.store
            .set_remove(&players_key(lobby_id), player_id)
            .await
    }

    /// Store a submitted (or auto-filled) card and flip the ready flag.
    pub async fn set_player_ready(
        &self,
        lobby_id: LobbyId,
        player_id: &str,
        grid: &Grid,
    ) -> StoreResult<()> {
        let numbers =
            serde_json::to_string(&grid.numbers()).map_err(|e| corrupt("numbers", e))?;
        let encoded = serde_json::to_string(grid).map_err(|e| corrupt("grid", e))?;
        self.store
            .hash_set(
                &player_key(lobby_id, player_id),
                vec![
                    ("numbers".to_string(), numbers),
                    ("grid".to_string(), encoded),
                    ("ready".to_string(), true.to_string()),
                ],
            )
            .await
    }

    /// Kick: the player stops counting toward transition decisions.
    pub async fn set_player_inactive(
        &self,
        lobby_id: LobbyId,
        player_id: &str,
    ) -> StoreResult<()> {
        self.store
            .hash_set(
                &player_key(lobby_id, player_id),
                vec![("active".to_string(), false.to_string())],
            )
            .await
    }

    /// Append to the call history and refresh the cached latest/previous
    /// fields on the lobby record. Only the number caller writes here.
    pub async fn append_called_number(&self, lobby_id: LobbyId, number: u8) -> StoreResult<()> {
        let key = lobby_key(lobby_id);
        let previous = self.store.hash_get(&key, "latest_number").await?;
        self.store
            .list_push(&calls_key(lobby_id), number.to_string())
            .await?;
        let mut fields = vec![("latest_number".to_string(), number.to_string())];
        if let Some(previous) = previous {
            fields.push(("previous_number".to_string(), previous));
        }
        self.store.hash_set(&key, fields).await
    }

    /// The full call history, oldest first.
    pub async fn called_numbers(&self, lobby_id: LobbyId) -> StoreResult<Vec<u8>> {
        self.store
            .list_range(&calls_key(lobby_id))
            .await?
            .iter()
            .map(|raw| raw.parse().map_err(|e| corrupt("numbers_called", e)))
            .collect()
    }

    /// Lobby ids currently registered as forming or active.
    pub async fn active_lobby_ids(&self) -> StoreResult<Vec<LobbyId>> {
        self.store
            .set_members(ACTIVE_LOBBIES_KEY)
            .await?
            .iter()
            .map(|raw| Uuid::parse_str(raw).map_err(|e| corrupt("lobby_id", e)))
            .collect()
    }

    pub async fn register_lobby(&self, id: LobbyId) -> StoreResult<()> {
        self.store
            .set_add(ACTIVE_LOBBIES_KEY, id.to_string())
            .await
    }

    /// Remove a lobby from the active set; happens exactly once, at finish
    /// (or lazily, when a record is found to have expired).
    pub async fn retire_lobby(&self, id: LobbyId) -> StoreResult<()> {
        self.store
            .set_remove(ACTIVE_LOBBIES_KEY, &id.to_string())
            .await
    }

    /// The start-game lease: true when this caller now holds it. Never
    /// released explicitly; it expires on its own.
    pub async fn acquire_start_lease(&self, id: LobbyId, ttl: Duration) -> StoreResult<bool> {
        self.store
            .put_if_absent(&start_lease_key(id), "held".to_string(), ttl)
            .await
    }

    /// Refresh the bounded lifetime of everything belonging to a lobby.
    pub async fn refresh_lobby_ttl(&self, id: LobbyId, ttl: Duration) -> StoreResult<()> {
        self.store.expire(&lobby_key(id), ttl).await?;
        self.store.expire(&calls_key(id), ttl).await?;
        let members = players_key(id);
        for player_id in self.store.set_members(&members).await? {
            self.store
                .expire(&player_key(id, &player_id), ttl)
                .await?;
        }
        self.store.expire(&members, ttl).await
    }

    /// Delete every key belonging to a lobby and drop it from the active
    /// set. Used when the registry collapses surplus empty lobbies.
    pub async fn delete_lobby(&self, id: LobbyId) -> StoreResult<()> {
        let members = players_key(id);
        for player_id in self.store.set_members(&members).await? {
            self.store.remove(&player_key(id, &player_id)).await?;
        }
        self.store.remove(&members).await?;
        self.store.remove(&calls_key(id)).await?;
        self.store.remove(&lobby_key(id)).await?;
        self.retire_lobby(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn repo() -> LobbyRepository {
        LobbyRepository::new(Arc::new(MemoryStore::new()))
    }

    fn sample_lobby() -> Lobby {
        Lobby {
            id: Uuid::new_v4(),
            name: "Nebula".to_string(),
            status: LobbyStatus::Forming,
            buy_in_amount: 3500,
            pot: 0,
            winner: None,
            created_at: Utc::now(),
            forming_deadline: None,
            started_at: None,
            finished_at: None,
            latest_number: None,
            previous_number: None,
        }
    }

    #[tokio::test]
    async fn test_lobby_roundtrip_with_optional_fields() {
        let repo = repo();
        let mut lobby = sample_lobby();
        lobby.winner = Some("alice".to_string());
        lobby.started_at = Some(Utc::now());
        lobby.latest_number = Some(42);

        repo.put_lobby(&lobby, Duration::from_secs(600)).await.unwrap();
        let fetched = repo.fetch_lobby(lobby.id).await.unwrap().unwrap();

        assert_eq!(fetched.id, lobby.id);
        assert_eq!(fetched.winner.as_deref(), Some("alice"));
        assert_eq!(fetched.latest_number, Some(42));
        assert_eq!(fetched.forming_deadline, None);
        // RFC 3339 keeps sub-second precision through the roundtrip
        assert_eq!(fetched.created_at, lobby.created_at);
    }

    #[tokio::test]
    async fn test_missing_lobby_reads_as_none() {
        assert_eq!(repo().fetch_lobby(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_player_roundtrip_and_membership() {
        let repo = repo();
        let lobby = sample_lobby();
        let player = Player {
            id: "alice".to_string(),
            numbers: Vec::new(),
            grid: None,
            ready: false,
            active: true,
            joined_at: Utc::now(),
        };

        repo.put_player(lobby.id, &player, Duration::from_secs(600))
            .await
            .unwrap();
        assert_eq!(repo.player_count(lobby.id).await.unwrap(), 1);

        let fetched = repo.fetch_player(lobby.id, "alice").await.unwrap().unwrap();
        assert_eq!(fetched, player);

        let grid = Grid([[1, 2, 3], [4, 5, 6], [7, 8, 9]]);
        repo.set_player_ready(lobby.id, "alice", &grid).await.unwrap();
        let ready = repo.fetch_player(lobby.id, "alice").await.unwrap().unwrap();
        assert!(ready.ready);
        assert_eq!(ready.grid, Some(grid));
        assert_eq!(ready.numbers, grid.numbers());

        repo.remove_player(lobby.id, "alice").await.unwrap();
        assert_eq!(repo.player_count(lobby.id).await.unwrap(), 0);
        assert_eq!(repo.fetch_player(lobby.id, "alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_called_numbers_update_cached_fields() {
        let repo = repo();
        let lobby = sample_lobby();
        repo.put_lobby(&lobby, Duration::from_secs(600)).await.unwrap();

        repo.append_called_number(lobby.id, 17).await.unwrap();
        let after_one = repo.fetch_lobby(lobby.id).await.unwrap().unwrap();
        assert_eq!(after_one.latest_number, Some(17));
        assert_eq!(after_one.previous_number, None);

        repo.append_called_number(lobby.id, 4).await.unwrap();
        let after_two = repo.fetch_lobby(lobby.id).await.unwrap().unwrap();
        assert_eq!(after_two.latest_number, Some(4));
        assert_eq!(after_two.previous_number, Some(17));

        assert_eq!(repo.called_numbers(lobby.id).await.unwrap(), vec![17, 4]);
    }

    #[tokio::test]
    async fn test_start_lease_acquired_once() {
        let repo = repo();
        let id = Uuid::new_v4();
        let ttl = Duration::from_secs(30);
        assert!(repo.acquire_start_lease(id, ttl).await.unwrap());
        assert!(!repo.acquire_start_lease(id, ttl).await.unwrap());
    }

    #[tokio::test]
    async fn test_active_set_registration() {
        let repo = repo();
        let id = Uuid::new_v4();
        repo.register_lobby(id).await.unwrap();
        assert_eq!(repo.active_lobby_ids().await.unwrap(), vec![id]);
        repo.retire_lobby(id).await.unwrap();
        assert!(repo.active_lobby_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_lobby_drops_everything() {
        let repo = repo();
        let lobby = sample_lobby();
        repo.put_lobby(&lobby, Duration::from_secs(600)).await.unwrap();
        repo.register_lobby(lobby.id).await.unwrap();
        let player = Player {
            id: "bob".to_string(),
            numbers: Vec::new(),
            grid: None,
            ready: false,
            active: true,
            joined_at: Utc::now(),
        };
        repo.put_player(lobby.id, &player, Duration::from_secs(600))
            .await
            .unwrap();
        repo.append_called_number(lobby.id, 9).await.unwrap();

        repo.delete_lobby(lobby.id).await.unwrap();
        assert_eq!(repo.fetch_lobby(lobby.id).await.unwrap(), None);
        assert_eq!(repo.player_count(lobby.id).await.unwrap(), 0);
        assert!(repo.called_numbers(lobby.id).await.unwrap().is_empty());
        assert!(repo.active_lobby_ids().await.unwrap().is_empty());
    }
}
