//! Randomized operation sequences checked against a reference model.

use chessdb_core::{CoreError, CoreResult, Entity};
use chessdb_testkit::prelude::*;
use proptest::prelude::*;
use std::cmp::Ordering;

fn run_in_batches(index: &TestIndex<Player>, model: &mut PlayerModel, ops: &[IndexOp], size: usize) {
    for chunk in ops.chunks(size.max(1)) {
        index
            .batch(|txn| {
                for op in chunk {
                    model.apply(txn, op)?;
                }
                Ok(())
            })
            .unwrap();
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn index_tracks_model(ops in index_op_sequence_strategy(1, 120), size in 1usize..8) {
        let index = TestIndex::<Player>::memory();
        let mut model = PlayerModel::new();
        run_in_batches(&index, &mut model, &ops, size);

        index.validate_structure().unwrap();
        let diff = model.diff(&index).unwrap();
        prop_assert!(diff.is_none(), "{}", diff.unwrap_or_default());
    }

    #[test]
    fn ascending_and_descending_agree(ops in index_op_sequence_strategy(1, 80)) {
        let index = TestIndex::<Player>::memory();
        let mut model = PlayerModel::new();
        run_in_batches(&index, &mut model, &ops, 1);

        let up: Vec<Player> = index.stream_ascending().unwrap().collect::<CoreResult<_>>().unwrap();
        let mut down: Vec<Player> = index.stream_descending().unwrap().collect::<CoreResult<_>>().unwrap();
        down.reverse();
        prop_assert!(up.windows(2).all(|w| w[0].compare(&w[1]) != Ordering::Greater));
        let up_keys: Vec<_> = up.iter().map(Player::full_name).collect();
        let down_keys: Vec<_> = down.iter().map(Player::full_name).collect();
        prop_assert_eq!(up_keys, down_keys);
        prop_assert_eq!(up.len() as u32, index.count().unwrap());
    }

    #[test]
    fn aborted_batch_changes_nothing(
        setup in index_op_sequence_strategy(1, 40),
        doomed in index_op_sequence_strategy(1, 40),
    ) {
        let index = TestIndex::<Player>::memory();
        let mut model = PlayerModel::new();
        run_in_batches(&index, &mut model, &setup, 4);
        let version = index.version();

        let mut scratch = model.clone();
        let result: CoreResult<()> = index.batch(|txn| {
            for op in &doomed {
                scratch.apply(txn, op)?;
            }
            Err(CoreError::invalid_operation("abort"))
        });
        prop_assert!(result.is_err());
        prop_assert_eq!(index.version(), version);
        let diff = model.diff(&index).unwrap();
        prop_assert!(diff.is_none(), "{}", diff.unwrap_or_default());
    }

    #[test]
    fn file_index_matches_memory_index(ops in index_op_sequence_strategy(1, 60)) {
        let file = TestIndex::<Player>::file();
        let mut model = PlayerModel::new();
        run_in_batches(&file, &mut model, &ops, 3);

        let file = file.reopen();
        file.validate_structure().unwrap();
        let diff = model.diff(&file).unwrap();
        prop_assert!(diff.is_none(), "{}", diff.unwrap_or_default());
    }

    #[test]
    fn lookups_find_every_live_player(ops in index_op_sequence_strategy(1, 80)) {
        let index = TestIndex::<Player>::memory();
        let mut model = PlayerModel::new();
        run_in_batches(&index, &mut model, &ops, 5);

        for player in model.by_identity() {
            let id = player.id.unwrap();
            let stored = index.get(id).unwrap();
            prop_assert_eq!(stored.as_ref(), Some(player));
            let matches = index.get_all(player).unwrap();
            prop_assert!(matches.iter().any(|p| p.id == Some(id)));
            let expected = model
                .by_identity()
                .filter(|p| p.compare(player) == Ordering::Equal)
                .count();
            prop_assert_eq!(matches.len(), expected);
            match index.get_by_key(player) {
                Ok(found) => prop_assert_eq!(expected, usize::from(found.is_some())),
                Err(CoreError::DuplicateKey { .. }) => prop_assert!(expected > 1),
                Err(err) => prop_assert!(false, "unexpected error {}", err),
            }
        }
    }
}
