//! Model check: every operation sequence leaves an `ObservableList` equal to
//! a plain `Vec` driven the same way, and a mirror rebuilt from the change
//! events agrees with both.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use tether_collections::{CollectionAction, ObservableList};

#[derive(Debug, Clone)]
enum Op {
    Insert(usize, u8),
    Push(u8),
    RemoveAt(usize),
    Set(usize, u8),
    Move(usize, usize),
    InsertRange(usize, Vec<u8>),
    RemoveRange(usize, usize),
    Reset(Vec<u8>),
    Clear,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..12usize, any::<u8>()).prop_map(|(i, v)| Op::Insert(i, v)),
        any::<u8>().prop_map(Op::Push),
        (0..12usize).prop_map(Op::RemoveAt),
        (0..12usize, any::<u8>()).prop_map(|(i, v)| Op::Set(i, v)),
        (0..12usize, 0..12usize).prop_map(|(a, b)| Op::Move(a, b)),
        (0..12usize, prop::collection::vec(any::<u8>(), 0..4))
            .prop_map(|(i, v)| Op::InsertRange(i, v)),
        (0..12usize, 0..4usize).prop_map(|(s, c)| Op::RemoveRange(s, c)),
        prop::collection::vec(any::<u8>(), 0..6).prop_map(Op::Reset),
        Just(Op::Clear),
    ]
}

/// Apply `op` to the model; returns whether it should succeed.
fn apply_model(model: &mut Vec<u8>, op: &Op) -> bool {
    let len = model.len();
    match op {
        Op::Insert(i, v) if *i <= len => model.insert(*i, *v),
        Op::Push(v) => model.push(*v),
        Op::RemoveAt(i) if *i < len => {
            model.remove(*i);
        }
        Op::Set(i, v) if *i < len => model[*i] = *v,
        Op::Move(a, b) if *a < len && *b < len => {
            let item = model.remove(*a);
            model.insert(*b, item);
        }
        Op::InsertRange(i, items) if *i <= len => {
            model.splice(*i..*i, items.iter().copied());
        }
        Op::RemoveRange(s, c) if s + c <= len => {
            model.drain(*s..s + c);
        }
        Op::Reset(items) => *model = items.clone(),
        Op::Clear => model.clear(),
        _ => return false,
    }
    true
}

fn apply_list(list: &ObservableList<u8>, op: &Op) -> bool {
    match op {
        Op::Insert(i, v) => list.insert(*i, *v).is_ok(),
        Op::Push(v) => list.push(*v).is_ok(),
        Op::RemoveAt(i) => list.remove_at(*i).is_ok(),
        Op::Set(i, v) => list.set(*i, *v).is_ok(),
        Op::Move(a, b) => list.move_item(*a, *b).is_ok(),
        Op::InsertRange(i, items) => list.insert_range(*i, items.iter().copied()).is_ok(),
        Op::RemoveRange(s, c) => list.remove_range(*s, *c).is_ok(),
        Op::Reset(items) => list.reset(items.iter().copied()).is_ok(),
        Op::Clear => list.clear().is_ok(),
    }
}

proptest! {
    #[test]
    fn list_matches_vec_model(ops in prop::collection::vec(arb_op(), 0..40)) {
        let list = ObservableList::new();
        let mut model = Vec::new();
        let mirror = Rc::new(RefCell::new(Vec::new()));
        let events = Rc::new(RefCell::new(0usize));

        let (m, e, l) = (Rc::clone(&mirror), Rc::clone(&events), list.clone());
        let _sub = list.subscribe(move |change| {
            *e.borrow_mut() += 1;
            change.apply_to(&mut m.borrow_mut(), || l.to_vec());
        });

        for op in &ops {
            let before = *events.borrow();
            let expected = apply_model(&mut model, op);
            let actual = apply_list(&list, op);
            prop_assert_eq!(actual, expected, "outcome of {:?}", op);

            let raised = *events.borrow() - before;
            prop_assert!(raised <= 1, "{:?} raised {} events", op, raised);
            if !actual {
                prop_assert_eq!(raised, 0);
            }
            prop_assert_eq!(list.to_vec(), model.clone());
            prop_assert_eq!(mirror.borrow().clone(), model.clone());
        }
    }

    #[test]
    fn move_event_indices_match_the_call(
        items in prop::collection::vec(any::<u8>(), 1..10),
        a in 0..10usize,
        b in 0..10usize,
    ) {
        let len = items.len();
        prop_assume!(a < len && b < len);
        let list = ObservableList::from_vec(items.clone());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = list.subscribe(move |c| s.borrow_mut().push(c.clone()));

        list.move_item(a, b).unwrap();
        let seen = seen.borrow();
        prop_assert_eq!(seen.len(), 1);
        prop_assert_eq!(seen[0].action(), CollectionAction::Move);
        prop_assert_eq!(seen[0].old_index(), Some(a));
        prop_assert_eq!(seen[0].new_index(), Some(b));
        prop_assert_eq!(seen[0].new_items(), &[items[a]][..]);
    }
}
