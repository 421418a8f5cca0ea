use mrtools::action::Action;
use mrtools::record::{Record, FAILURE_MODE, FUNCTION, PARENT_ID};
use mrtools::store::{ensure_all, Gateway, RecordStore};
use mrtools::tree::{Forest, Node};
use mrtools::types::NodeId;
use proptest::prelude::*;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

/// Parent pointers of a valid forest: node `i + 1` is a root or hangs below
/// a node with a smaller id.
fn arb_parents() -> impl Strategy<Value = Vec<Option<NodeId>>> {
    prop::collection::vec((any::<bool>(), any::<prop::sample::Index>()), 1..40).prop_map(
        |picks| {
            picks
                .into_iter()
                .enumerate()
                .map(|(i, (root, index))| {
                    if i == 0 || root {
                        None
                    } else {
                        Some(index.index(i) as NodeId + 1)
                    }
                })
                .collect()
        },
    )
}

fn record(id: NodeId, parent: Option<NodeId>) -> Record {
    let schema = if id % 3 == 0 && parent.is_some() {
        &FAILURE_MODE
    } else {
        &FUNCTION
    };
    let mut r = Record::with_defaults(schema);
    r.set_id(id);
    r.set(PARENT_ID, parent);
    r
}

fn build(parents: &[Option<NodeId>], reversed: bool) -> Forest {
    let mut forest = Forest::new();
    let mut ids: Vec<usize> = (0..parents.len()).collect();
    if reversed {
        ids.reverse();
    }
    for i in ids {
        forest.attach(Node::new(record(i as NodeId + 1, parents[i])));
    }
    forest
}

fn ancestors_of(parents: &[Option<NodeId>], id: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut current = parents[(id - 1) as usize];
    while let Some(p) = current {
        out.push(p);
        current = parents[(p - 1) as usize];
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn ordered_view_is_a_preorder(parents in arb_parents()) {
        let mut forest = build(&parents, false);
        let order = forest.ordered_ids();
        prop_assert_eq!(order.len(), parents.len());
        let position: HashMap<NodeId, usize> =
            order.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        for &id in &order {
            for ancestor in ancestors_of(&parents, id) {
                prop_assert!(position[&ancestor] < position[&id]);
            }
            // descendants occupy the slots right after the node
            let subtree = forest.subtree_ids(id);
            let start = position[&id];
            let slots: BTreeSet<usize> = subtree.iter().map(|d| position[d]).collect();
            let expected: BTreeSet<usize> = (start..start + subtree.len()).collect();
            prop_assert_eq!(slots, expected);
        }
    }

    #[test]
    fn compare_is_antisymmetric_and_matches_order(parents in arb_parents()) {
        let mut forest = build(&parents, false);
        let order = forest.ordered_ids();
        for (i, &a) in order.iter().enumerate() {
            for (j, &b) in order.iter().enumerate() {
                let ab = forest.compare(a, b).unwrap().to_ordering();
                let ba = forest.compare(b, a).unwrap().to_ordering();
                prop_assert_eq!(ab, ba.reverse());
                prop_assert_eq!(ab, i.cmp(&j));
            }
        }
    }

    #[test]
    fn reconstruction_is_idempotent_and_order_independent(parents in arb_parents()) {
        let mut forest = build(&parents, false);
        let first = forest.ordered_ids();
        let paths: Vec<Vec<NodeId>> = first.iter().map(|&id| forest.path_of(id)).collect();

        forest.reconstruct();
        prop_assert_eq!(&forest.ordered_ids(), &first);
        let again: Vec<Vec<NodeId>> = first.iter().map(|&id| forest.path_of(id)).collect();
        prop_assert_eq!(&again, &paths);

        let mut reversed = build(&parents, true);
        prop_assert_eq!(reversed.ordered_ids(), first);
    }

    #[test]
    fn sort_keys_never_put_a_node_before_its_ancestors(parents in arb_parents()) {
        let mut forest = build(&parents, false);
        // deep chains overflow the key space and get no keys at all
        let keys: HashMap<NodeId, u128> = forest
            .sort_keys()
            .into_iter()
            .filter_map(|(id, key)| key.map(|k| (id, k)))
            .collect();
        for (&id, &key) in &keys {
            for ancestor in ancestors_of(&parents, id) {
                if let Some(&ancestor_key) = keys.get(&ancestor) {
                    prop_assert_eq!(ancestor_key.cmp(&key), Ordering::Less);
                }
            }
        }
    }

    #[test]
    fn add_then_remove_parent_restores_the_set(
        existing in prop::collection::btree_set(1i64..500, 1..12),
        extra in 500i64..1000,
    ) {
        let mut action = Action::new();
        for &id in &existing {
            action.add_parent(id);
        }
        let before = action.parents().clone();
        prop_assert!(action.add_parent(extra));
        prop_assert!(action.remove_parent(extra));
        prop_assert_eq!(action.parents(), &before);
        prop_assert!(!action.add_parent(*existing.iter().next().unwrap()));
    }

    #[test]
    fn deleting_a_subtree_leaves_no_descendant(
        parents in arb_parents(),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut gw = Gateway::open_in_memory().unwrap();
        ensure_all(&mut gw, false);
        for (i, &parent) in parents.iter().enumerate() {
            let mut row = record(i as NodeId + 1, parent);
            prop_assert!(gw.upsert(&mut row));
        }
        let mut forest = Forest::load(&mut gw, None);
        let target = pick.index(parents.len()) as NodeId + 1;
        let doomed: BTreeSet<NodeId> = forest.subtree_ids(target).into_iter().collect();
        prop_assert!(forest.delete_subtree(&mut gw, target, None));

        let mut reloaded = Forest::load(&mut gw, None);
        let remaining = reloaded.ordered_ids();
        prop_assert_eq!(remaining.len(), parents.len() - doomed.len());
        prop_assert!(remaining.iter().all(|id| !doomed.contains(id)));
    }
}
