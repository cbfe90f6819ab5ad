//! Deck - group transport over a fixed set of players
//!
//! **Why**: The grid view drives several independent engines with one
//! button press. The deck only filters by state and forwards commands; it
//! owns no playback logic, and a failure in one engine never aborts the
//! broadcast to the others (engine errors surface through each engine's own
//! observer).
//!
//! **Used by**: CLI harness, GUI layer

use log::debug;

use crate::player::{Player, PlayerState};

/// Fixed, ordered collection of playback engines.
///
/// Cardinality is set at construction and never changes; the deck never
/// recreates engines, only forwards commands to them.
pub struct Deck {
    players: Vec<Player>,
}

/// Default grid size (2x2).
pub const DEFAULT_DECK_SIZE: usize = 4;

impl Default for Deck {
    fn default() -> Self {
        Self::new(DEFAULT_DECK_SIZE)
    }
}

impl Deck {
    /// Create a deck of `count` empty engines.
    pub fn new(count: usize) -> Self {
        Self {
            players: (0..count).map(|_| Player::new()).collect(),
        }
    }

    /// Create a deck from pre-built engines.
    pub fn with_players(players: Vec<Player>) -> Self {
        Self { players }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Player> {
        self.players.get(index)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    /// Start every Opened or Paused engine. Playing engines are already
    /// advancing (idempotence) and Closed engines have nothing to play.
    pub fn play_all(&self) {
        debug!("deck: play all");
        for player in &self.players {
            match player.state() {
                PlayerState::Opened | PlayerState::Paused => player.play(),
                PlayerState::Playing | PlayerState::Closed => {}
            }
        }
    }

    /// Pause every Playing engine; others are untouched.
    pub fn pause_all(&self) {
        debug!("deck: pause all");
        for player in &self.players {
            if player.state() == PlayerState::Playing {
                player.pause();
            }
        }
    }

    /// Restart every non-Closed engine.
    pub fn restart_all(&self) {
        debug!("deck: restart all");
        for player in &self.players {
            if player.state() != PlayerState::Closed {
                player.restart();
            }
        }
    }

    /// Close every engine (joins all decode threads).
    pub fn close_all(&self) {
        debug!("deck: close all");
        for player in &self.players {
            player.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ChannelObserver, PlayerEvent};
    use crate::source::testing::ScriptedSource;
    use crossbeam_channel::Receiver;
    use std::sync::Arc;
    use std::time::Duration;

    fn observed_deck(count: usize) -> (Deck, Vec<Receiver<PlayerEvent>>) {
        let deck = Deck::new(count);
        let mut receivers = Vec::new();
        for player in deck.players() {
            let (tx, rx) = crossbeam_channel::unbounded();
            player.set_observer(Arc::new(ChannelObserver::new(tx)));
            receivers.push(rx);
        }
        (deck, receivers)
    }

    /// Test: pause_all with 2 Playing and 2 Closed engines
    /// Validates: Only the Playing pair is paused; Closed engines stay
    /// Closed and raise no events
    #[test]
    fn test_pause_all_filters_by_state() {
        let (deck, receivers) = observed_deck(4);

        for i in 0..2 {
            deck.get(i)
                .unwrap()
                .open_source(Box::new(ScriptedSource::new(10_000, 50.0)), format!("s{i}"));
        }
        deck.play_all();
        assert_eq!(deck.get(0).unwrap().state(), PlayerState::Playing);
        assert_eq!(deck.get(1).unwrap().state(), PlayerState::Playing);

        deck.pause_all();
        assert_eq!(deck.get(0).unwrap().state(), PlayerState::Paused);
        assert_eq!(deck.get(1).unwrap().state(), PlayerState::Paused);
        assert_eq!(deck.get(2).unwrap().state(), PlayerState::Closed);
        assert_eq!(deck.get(3).unwrap().state(), PlayerState::Closed);

        assert!(receivers[2].try_recv().is_err());
        assert!(receivers[3].try_recv().is_err());

        deck.close_all();
    }

    /// Test: play_all skips Closed engines
    /// Validates: No engine leaves Closed without an open
    #[test]
    fn test_play_all_skips_closed() {
        let (deck, receivers) = observed_deck(2);
        deck.get(0)
            .unwrap()
            .open_source(Box::new(ScriptedSource::new(100, 50.0)), "only");

        deck.play_all();
        assert_eq!(deck.get(0).unwrap().state(), PlayerState::Playing);
        assert_eq!(deck.get(1).unwrap().state(), PlayerState::Closed);
        assert!(receivers[1].try_recv().is_err());

        deck.close_all();
    }

    /// Test: restart_all isolates per-engine failures
    /// Validates: A failing seek in one engine does not stop the broadcast
    #[test]
    fn test_restart_all_continues_past_failure() {
        let (deck, receivers) = observed_deck(3);

        let mut bad = ScriptedSource::new(10, 50.0);
        bad.fail_seek = true;
        deck.get(0).unwrap().open_source(Box::new(bad), "bad");
        deck.get(1)
            .unwrap()
            .open_source(Box::new(ScriptedSource::new(10, 50.0)), "good");
        // engine 2 stays Closed

        deck.restart_all();

        assert_eq!(deck.get(0).unwrap().state(), PlayerState::Opened);
        assert_eq!(deck.get(1).unwrap().state(), PlayerState::Playing);
        assert_eq!(deck.get(2).unwrap().state(), PlayerState::Closed);

        assert!(matches!(
            receivers[0].try_recv().unwrap(),
            PlayerEvent::Error(_)
        ));

        deck.close_all();
    }

    /// Test: engines are independent
    /// Validates: Opening and playing one engine has no observable effect
    /// on a sibling's state or frame stream
    #[test]
    fn test_engine_independence() {
        let (deck, receivers) = observed_deck(2);

        deck.get(0)
            .unwrap()
            .open_source(Box::new(ScriptedSource::new(50, 50.0)), "a");
        deck.get(1)
            .unwrap()
            .open_source(Box::new(ScriptedSource::new(50, 50.0)), "b");

        deck.get(0).unwrap().play();
        std::thread::sleep(Duration::from_millis(300));

        assert_eq!(deck.get(0).unwrap().state(), PlayerState::Playing);
        assert_eq!(deck.get(1).unwrap().state(), PlayerState::Opened);
        assert!(receivers[1].try_recv().is_err());
        assert!(deck.get(1).unwrap().frames().try_take().is_none());

        deck.close_all();
    }
}
