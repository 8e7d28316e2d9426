//! End-to-end scenarios over the player index.

use chessdb_core::{Config, CoreError, EntityId, EntityIndex};
use chessdb_testkit::prelude::*;

fn last_names(players: &[Player]) -> Vec<&str> {
    players.iter().map(|p| p.last_name.as_str()).collect()
}

fn ascending(index: &EntityIndex<Player>) -> Vec<Player> {
    index
        .stream_ascending()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

#[test]
fn deleted_id_is_reused_by_next_add() {
    with_temp_index(|index| {
        let mut stored = Vec::new();
        for player in scenarios::elite_players().into_iter().take(3) {
            stored.push(index.add(player).unwrap());
        }
        assert_eq!(
            last_names(&ascending(index)),
            ["Aronian", "Carlsen", "Caruana"]
        );

        let caruana = stored[1].id.unwrap();
        assert!(index.delete_entity(&Player::new("Caruana", "Fabiano")).unwrap());
        index.validate_structure().unwrap();
        assert_eq!(index.count().unwrap(), 2);
        assert_eq!(index.get(caruana).unwrap(), None);

        let ding = index.add(Player::new("Ding", "Liren")).unwrap();
        assert_eq!(ding.id, Some(caruana));
        assert_eq!(index.capacity().unwrap(), 3);
        assert_eq!(
            last_names(&ascending(index)),
            ["Aronian", "Carlsen", "Ding"]
        );
        index.validate_structure().unwrap();
    });
}

#[test]
fn duplicate_keys_are_all_kept() {
    with_temp_index(|index| {
        let first = index.add(Player::new("Polgar", "Judit")).unwrap();
        index.add(Player::new("Anand", "Viswanathan")).unwrap();
        let second = index.add(Player::new("Polgar", "Judit")).unwrap();

        let key = Player::new("Polgar", "Judit");
        let all = index.get_all(&key).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, first.id);
        assert_eq!(all[1].id, second.id);
        assert!(index.get_any(&key).unwrap().is_some());

        match index.get_by_key(&key) {
            Err(CoreError::DuplicateKey { first: a, second: b }) => {
                assert_eq!(Some(a), first.id);
                assert_eq!(Some(b), second.id);
            }
            other => panic!("expected DuplicateKey, got {other:?}"),
        }
    });
}

#[test]
fn iterator_fails_fast_after_insert() {
    with_temp_index(|index| {
        for player in scenarios::elite_players() {
            index.add(player).unwrap();
        }
        let mut iter = index.stream_ascending().unwrap();
        assert!(iter.next().unwrap().is_ok());

        index.add(Player::new("Nakamura", "Hikaru")).unwrap();

        let err = iter.next().unwrap().unwrap_err();
        assert!(err.is_concurrent_modification());
        assert!(iter.next().is_none());
    });
}

#[test]
fn navigation_between_neighbours() {
    let test_index = TestIndex::<Player>::memory();
    for player in scenarios::elite_players() {
        test_index.add(player).unwrap();
    }

    assert_eq!(test_index.first().unwrap().unwrap().last_name, "Aronian");
    assert_eq!(test_index.last().unwrap().unwrap().last_name, "Ding");

    let after = test_index.next_of(&Player::key("Carlsen")).unwrap().unwrap();
    assert_eq!(after.last_name, "Carlsen");
    let after = test_index.next_of(&Player::new("Carlsen", "Magnus")).unwrap().unwrap();
    assert_eq!(after.last_name, "Caruana");
    let before = test_index.previous_of(&Player::key("Carlsen")).unwrap().unwrap();
    assert_eq!(before.last_name, "Aronian");
    assert!(test_index.previous_of(&Player::key("Aronian")).unwrap().is_none());

    let descending: Vec<Player> = test_index
        .stream_descending_from(&Player::key("Caruana"))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(last_names(&descending), ["Carlsen", "Aronian"]);
}

#[test]
fn identity_scan_skips_tombstones() {
    let test_index = TestIndex::<Player>::memory_with(Config::default().scan_batch_size(2));
    let ids: Vec<EntityId> = (0..7)
        .map(|i| {
            test_index
                .add(Player::new(&format!("P{i}"), ""))
                .unwrap()
                .id
                .unwrap()
        })
        .collect();
    test_index.delete(ids[1]).unwrap();
    test_index.delete(ids[4]).unwrap();

    let seen: Vec<EntityId> = test_index
        .iter_from(EntityId::new(1))
        .unwrap()
        .map(|p| p.unwrap().id.unwrap())
        .collect();
    assert_eq!(seen, [ids[2], ids[3], ids[5], ids[6]]);
}

#[test]
fn failed_batch_leaves_file_untouched() {
    let test_index = TestIndex::<Player>::file();
    for player in scenarios::elite_players() {
        test_index.add(player).unwrap();
    }
    let path = test_index.path().unwrap();
    let before = std::fs::read(&path).unwrap();

    let result: Result<(), CoreError> = test_index.batch(|txn| {
        txn.add(Player::new("Gukesh", "Dommaraju"))?;
        txn.delete(EntityId::new(0))?;
        txn.put(EntityId::new(99), Player::new("Nobody", ""))?;
        Ok(())
    });
    assert!(matches!(result, Err(CoreError::EntityNotFound { .. })));
    assert_eq!(std::fs::read(&path).unwrap(), before);
    assert_eq!(test_index.count().unwrap(), 4);
}

#[test]
fn committed_batch_survives_reopen() {
    let test_index = TestIndex::<Player>::file();
    test_index
        .batch(|txn| {
            for player in scenarios::numbered_players(40) {
                txn.add(player)?;
            }
            Ok(())
        })
        .unwrap();
    test_index.delete(EntityId::new(7)).unwrap();

    let test_index = test_index.reopen();
    assert_eq!(test_index.count().unwrap(), 39);
    assert_eq!(test_index.capacity().unwrap(), 40);
    test_index.validate_structure().unwrap();
    let reused = test_index.add(Player::new("Reused", "")).unwrap();
    assert_eq!(reused.id, Some(EntityId::new(7)));
}

#[test]
fn in_memory_copy_persists_on_close() {
    let source = TestIndex::<Player>::file();
    for player in scenarios::elite_players() {
        source.add(player).unwrap();
    }
    let path = source.path().unwrap();
    let dir = source.dir().unwrap().to_path_buf();
    source.close().unwrap();

    let loaded = EntityIndex::<Player>::open_into_memory(&path, Config::default()).unwrap();
    assert!(loaded.path().is_none());
    loaded.add(Player::new("Firouzja", "Alireza")).unwrap();
    let target = dir.join("copy.chx");
    loaded.persist_on_close(&target);
    loaded.close().unwrap();
    assert!(!loaded.is_open());
    assert!(matches!(loaded.count(), Err(CoreError::IndexClosed)));

    let reopened = EntityIndex::<Player>::open(&target, Config::default()).unwrap();
    assert_eq!(reopened.count().unwrap(), 5);
    reopened.validate_structure().unwrap();
    assert_eq!(
        last_names(&ascending(&reopened)),
        ["Aronian", "Carlsen", "Caruana", "Ding", "Firouzja"]
    );
}

#[test]
fn create_refuses_existing_file() {
    with_file_index(|index, path| {
        index.add(Player::new("Kramnik", "Vladimir")).unwrap();
        index.close().unwrap();
        assert!(EntityIndex::<Player>::create(path, Config::default()).is_err());
        let missing = path.with_file_name("missing.chx");
        let config = Config::default().create_if_missing(false);
        assert!(EntityIndex::<Player>::open(&missing, config).is_err());
    });
}
