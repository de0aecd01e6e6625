//! Server state management
//!
//! The game registry owns every live game, keyed by id. Games enter on
//! create/load and leave on close. The map lock is held only to look a game
//! up; each game has its own lock, so turns in different games do not wait
//! on each other.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use circles_core::{Catalog, Game, GameConfig, GameError, SaveState};

pub type GameId = u64;

/// Server-wide shared state
#[derive(Debug)]
pub struct ServerState {
    pub catalog: Arc<Catalog>,
    /// Settings for new games before per-request overrides
    pub defaults: GameConfig,
    games: RwLock<HashMap<GameId, Arc<Mutex<Game>>>>,
    next_id: AtomicU64,
}

impl ServerState {
    pub fn new(catalog: Arc<Catalog>, defaults: GameConfig) -> Self {
        Self {
            catalog,
            defaults,
            games: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn insert(&self, game: Game) -> GameId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.games
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(Mutex::new(game)));
        id
    }

    fn game(&self, id: GameId) -> Option<Arc<Mutex<Game>>> {
        self.games
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Start a game and register it
    pub fn create(&self, config: GameConfig) -> Result<GameId, GameError> {
        let game = Game::start(config, self.catalog.clone())?;
        let seed = game.seed();
        let id = self.insert(game);
        tracing::info!("Game {} created (seed {})", id, seed);
        Ok(id)
    }

    /// Rebuild a game from a save document and register it
    pub fn load(&self, config: GameConfig, save: &SaveState) -> Result<GameId, GameError> {
        let game = Game::load(config, self.catalog.clone(), save)?;
        let id = self.insert(game);
        tracing::info!("Game {} loaded at round {}", id, save.round);
        Ok(id)
    }

    /// Read access to one game
    pub fn with_game<R>(&self, id: GameId, f: impl FnOnce(&Game) -> R) -> Option<R> {
        let game = self.game(id)?;
        let guard = game.lock().unwrap_or_else(PoisonError::into_inner);
        Some(f(&guard))
    }

    /// Exclusive access to one game; one caller mutates a game at a time
    pub fn with_game_mut<R>(&self, id: GameId, f: impl FnOnce(&mut Game) -> R) -> Option<R> {
        let game = self.game(id)?;
        let mut guard = game.lock().unwrap_or_else(PoisonError::into_inner);
        Some(f(&mut guard))
    }

    /// Evict a game, dropping uncommitted purchases first
    pub fn close(&self, id: GameId) -> bool {
        let removed = self
            .games
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        match removed {
            Some(game) => {
                let mut game = game.lock().unwrap_or_else(PoisonError::into_inner);
                game.before_closed();
                tracing::info!("Game {} closed at round {}", id, game.round());
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.games.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new(Arc::new(Catalog::default()), GameConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lifecycle() {
        let state = ServerState::default();
        let a = state.create(GameConfig::default().with_seed(1)).unwrap();
        let b = state.create(GameConfig::default().with_seed(2)).unwrap();
        assert_ne!(a, b);
        assert_eq!(state.len(), 2);

        assert_eq!(state.with_game(a, |game| game.round()), Some(1));
        assert!(state.close(a));
        assert!(!state.close(a));
        assert_eq!(state.with_game(a, |game| game.round()), None);
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_games_lock_independently() {
        let state = ServerState::default();
        let a = state.create(GameConfig::default().with_seed(1)).unwrap();
        let b = state.create(GameConfig::default().with_seed(2)).unwrap();

        // a turn in progress on `a` does not block `b` or the registry
        let seen = state.with_game_mut(a, |game| {
            let other = state.with_game_mut(b, |other| other.round());
            let created = state.create(GameConfig::default().with_seed(3)).ok();
            (game.round(), other, created.is_some())
        });
        assert_eq!(seen, Some((1, Some(1), true)));
        assert_eq!(state.len(), 3);
    }

    #[test]
    fn test_reload_after_close() {
        let state = ServerState::default();
        let id = state.create(GameConfig::default().with_seed(3)).unwrap();
        let save = state.with_game(id, |game| game.save()).unwrap();
        assert!(state.close(id));

        let reloaded = state.load(GameConfig::default(), &save).unwrap();
        assert_eq!(state.with_game(reloaded, |game| game.save()), Some(save));
    }
}
