//! Property tests comparing `Vector` against `std::vec::Vec`.

use mempool::PoolManager;
use mempool_collections::{MAP_CAP, Vector};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Add(u8),
    Remove(usize),
    RemoveValue(u8),
    Pop,
    Clear,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => any::<u8>().prop_map(Op::Add),
        2 => (0usize..40).prop_map(Op::Remove),
        2 => any::<u8>().prop_map(Op::RemoveValue),
        2 => Just(Op::Pop),
        1 => Just(Op::Clear),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn vector_matches_model(ops in proptest::collection::vec(op(), 1..300)) {
        let manager = PoolManager::new(256).unwrap();
        let mut vector = Vector::new(&manager).unwrap();
        let mut model: Vec<u8> = Vec::new();

        for op in ops {
            match op {
                Op::Add(value) => {
                    vector.add(value);
                    model.push(value);
                }
                Op::Remove(index) => {
                    let expected = (index < model.len()).then(|| model.remove(index));
                    prop_assert_eq!(vector.remove(index), expected);
                }
                Op::RemoveValue(value) => {
                    let expected = model.iter().rposition(|&v| v == value).map(|i| model.remove(i));
                    prop_assert_eq!(vector.remove_value(&value), expected.is_some());
                }
                Op::Pop => prop_assert_eq!(vector.pop(), model.pop()),
                Op::Clear => {
                    vector.clear();
                    model.clear();
                    prop_assert_eq!(vector.capacity(), MAP_CAP);
                }
            }

            prop_assert_eq!(vector.as_slice(), model.as_slice());
            prop_assert_eq!(vector.front(), model.first().copied());
            prop_assert_eq!(vector.back(), model.last().copied());
            prop_assert!(vector.capacity() >= vector.len().max(MAP_CAP));
            prop_assert!(vector.capacity().is_power_of_two());
        }
    }
}
