//! Benchmark utilities.

use chessdb_core::{Config, EntityIndex};
use chessdb_testkit::Player;
use rand::distributions::Alphanumeric;
use rand::Rng;

fn random_name(rng: &mut impl Rng, len: usize) -> String {
    (0..len).map(|_| char::from(rng.sample(Alphanumeric))).collect()
}

/// Generates a player with random names.
pub fn random_player(rng: &mut impl Rng) -> Player {
    let last = random_name(rng, 12);
    let first = random_name(rng, 8);
    Player::new(&last, &first)
}

/// Generates `count` random players.
pub fn random_players(count: usize) -> Vec<Player> {
    let mut rng = rand::thread_rng();
    (0..count).map(|_| random_player(&mut rng)).collect()
}

/// Builds an in-memory index holding `players`, added in one batch.
pub fn populated_index(players: &[Player]) -> EntityIndex<Player> {
    let index = EntityIndex::in_memory(Config::default());
    index
        .batch(|txn| {
            for player in players {
                txn.add(player.clone())?;
            }
            Ok(())
        })
        .expect("populate benchmark index");
    index
}
