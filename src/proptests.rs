use super::*;

use crate::hash::hash_key;
use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::HashMap;

/// Keys drawn from small domains so inserts, lookups and erases collide often.
#[derive(Clone, Debug, Arbitrary)]
enum KeySeed {
    Null,
    Boolean(bool),
    Integer(#[proptest(strategy = "-8i64..8")] i64),
    Float(#[proptest(strategy = "(-8i32..8).prop_map(|n| f64::from(n) / 2.0)")] f64),
    String(#[proptest(regex = "[a-c]{0,2}")] String),
}

impl KeySeed {
    fn element(&self) -> Element {
        match self {
            KeySeed::Null => Element::Null,
            KeySeed::Boolean(b) => Element::from(*b),
            KeySeed::Integer(n) => Element::from(*n),
            KeySeed::Float(x) => Element::from(*x),
            KeySeed::String(s) => Element::from(s.as_str()),
        }
    }
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 4)]
    Insert(KeySeed, i64),
    #[proptest(weight = 2)]
    InsertOrAssign(KeySeed, i64),
    #[proptest(weight = 1)]
    Assign(KeySeed, i64),
    #[proptest(weight = 3)]
    Erase(KeySeed),
    #[proptest(weight = 3)]
    Find(KeySeed),
    #[proptest(weight = 1)]
    Take,
}

fn validate_against(t: &Object, m: &HashMap<Element, Element>) {
    t.check_invariants();
    assert_eq!(t.len(), m.len());
    for (key, value) in t {
        assert_eq!(m.get(key), Some(value), "unexpected entry for {key:?}");
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence_hashmap(ops in prop::collection::vec(any::<Op>(), 0..=1000)) {
        let mut t = Object::new();
        let mut m: HashMap<Element, Element> = HashMap::new();
        let mut last_capacity = 0;

        for op in ops {
            match op {
                Op::Insert(seed, v) => {
                    let key = seed.element();
                    let absent = !m.contains_key(&key);
                    let (stored, inserted) = t.insert(&key, v);
                    prop_assert_eq!(inserted, absent);
                    let expected = m.entry(key).or_insert_with(|| Element::from(v));
                    prop_assert_eq!(&*stored, &*expected);
                }
                Op::InsertOrAssign(seed, v) => {
                    let key = seed.element();
                    let (stored, inserted) = t.insert_or_assign(&key, v);
                    prop_assert_eq!(&*stored, &Element::from(v));
                    prop_assert_eq!(inserted, m.insert(key, Element::from(v)).is_none());
                }
                Op::Assign(seed, v) => {
                    let key = seed.element();
                    t[&key] = Element::from(v);
                    m.insert(key, Element::from(v));
                }
                Op::Erase(seed) => {
                    let key = seed.element();
                    let before = t.len();
                    let erased = t.erase(&key);
                    prop_assert_eq!(erased, m.remove(&key).is_some());
                    prop_assert_eq!(t.len(), before - usize::from(erased));
                    prop_assert!(t.find(&key).is_none());
                }
                Op::Find(seed) => {
                    let key = seed.element();
                    prop_assert_eq!(t.get(&key), m.get(&key));
                    prop_assert_eq!(t.contains(&key), m.contains_key(&key));
                    match m.get(&key) {
                        Some(value) => {
                            prop_assert_eq!(t.at(&key), Ok(value));
                        }
                        None => {
                            prop_assert_eq!(t.at(&key), Err(Error::NotFound));
                        }
                    }
                }
                Op::Take => {
                    let moved = t.take();
                    prop_assert_eq!(t.len(), 0);
                    prop_assert_eq!(t.capacity(), 0);
                    prop_assert!(t.iter().next().is_none());
                    t = moved;
                }
            }

            prop_assert_eq!(t.len(), m.len());
            prop_assert!(t.capacity() >= last_capacity, "capacity shrank");
            last_capacity = t.capacity();
        }

        validate_against(&t, &m);
    }

    #[test]
    fn prop_equal_elements_hash_equal(a in any::<KeySeed>(), b in any::<KeySeed>()) {
        let (ea, eb) = (a.element(), b.element());
        if ea.kind() != eb.kind() {
            prop_assert_ne!(&ea, &eb);
        }
        if ea == eb {
            prop_assert_eq!(hash_key(ea.view()), hash_key(eb.view()));
        }
        prop_assert_eq!(ea == eb, ea.view() == eb.view());
    }

    #[test]
    fn prop_macro_matches_sequential_insert(pairs in prop::collection::vec((any::<KeySeed>(), any::<i64>()), 0..64)) {
        let mut sequential = Object::new();
        for (seed, v) in &pairs {
            sequential.insert(seed.element(), *v);
        }
        let collected: Object = pairs.iter().map(|(seed, v)| (seed.element(), *v)).collect();
        prop_assert_eq!(&collected, &sequential);
        collected.check_invariants();
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

fn mixed_keys() -> Vec<Element> {
    vec![
        Element::Null,
        Element::from(false),
        Element::from(5),
        Element::from(5.0),
        Element::from("5"),
        Element::from(""),
    ]
}

#[test]
fn exhaustive_insert_order_mixed_kinds() {
    let keys = mixed_keys();
    let expected: Object = keys
        .iter()
        .enumerate()
        .map(|(i, k)| (k.clone(), i as i64))
        .collect();

    for_each_permutation(&keys, |perm| {
        let mut t = Object::new();
        for k in perm {
            let i = keys.iter().position(|x| *x == k).unwrap() as i64;
            assert!(t.insert(k, i).1);
        }
        t.check_invariants();
        assert_eq!(t, expected);
    });
}

#[test]
fn exhaustive_erase_order_mixed_kinds() {
    let keys = mixed_keys();
    let base: Object = keys.iter().map(|k| (k.clone(), ())).collect();

    for_each_permutation(&keys, |perm| {
        let mut t = base.clone();
        for k in perm {
            assert!(t.erase(&k));
            assert!(!t.contains(&k));
            t.check_invariants();
        }
        assert!(t.is_empty());
        assert_eq!(t.capacity(), base.capacity());
    });
}
