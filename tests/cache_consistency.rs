use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rankset::{Config, DocId, Engine, ErrorKind};

fn engine() -> Engine {
    Engine::new(Config {
        cache_workers: 2,
        cache_sweep_interval_ms: 50,
        ..Config::default()
    })
    .unwrap()
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Polls until the intersection of `list` is built.
fn cached(engine: &Engine, list: &[&str]) -> Arc<rankset::index::membership::Index> {
    let names = names(list);
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(index) = engine.cache().get(&names, engine.registry()).unwrap() {
            return index;
        }
        assert!(Instant::now() < deadline, "intersection {:?} never built", list);
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn changes_keep_cached_intersection_current() {
    let engine = engine();
    engine.create_index("A");
    engine.create_index("B");
    // x = 1, y = 2, z = 3
    for id in [1, 2, 3, 9] {
        engine.add("A", DocId(id)).unwrap();
    }
    for id in [1, 2, 7] {
        engine.add("B", DocId(id)).unwrap();
    }

    let result = cached(&engine, &["A", "B"]);
    assert_eq!(result.ids(), vec![DocId(1), DocId(2)]);

    engine.add("B", DocId(3)).unwrap();
    assert!(result.contains(DocId(3)));

    engine.remove("B", DocId(1)).unwrap();
    assert!(!result.contains(DocId(1)));

    // 8 is in neither source yet
    engine.add("B", DocId(8)).unwrap();
    assert!(!result.contains(DocId(8)));
    engine.add("A", DocId(8)).unwrap();
    assert!(result.contains(DocId(8)));

    assert_eq!(result.ids(), vec![DocId(2), DocId(3), DocId(8)]);
}

#[test]
fn name_order_does_not_matter() {
    let engine = engine();
    engine.create_index("a");
    engine.create_index("b");
    engine.add("a", DocId(1)).unwrap();
    engine.add("b", DocId(1)).unwrap();

    let first = cached(&engine, &["b", "a"]);
    let second = cached(&engine, &["a", "b"]);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(engine.cache().len(), 1);
    assert_eq!(engine.stats().cache.builds_enqueued, 1);
}

#[test]
fn cached_and_direct_answers_agree_under_churn() {
    let engine = Arc::new(engine());
    engine.create_sort("n");
    for name in ["p", "q", "r"] {
        engine.create_index(name);
    }
    let mut rng = StdRng::seed_from_u64(11);
    for id in 0..500u32 {
        engine.set_score("n", DocId(id), rng.gen_range(0..1000)).unwrap();
        for name in ["p", "q", "r"] {
            if rng.gen_bool(0.5) {
                engine.add(name, DocId(id)).unwrap();
            }
        }
    }
    cached(&engine, &["p", "q", "r"]);

    let writer = {
        let engine = engine.clone();
        thread::spawn(move || {
            let mut rng = StdRng::seed_from_u64(12);
            for _ in 0..2000 {
                let id = DocId(rng.gen_range(0..500));
                let name = ["p", "q", "r"][rng.gen_range(0..3)];
                if rng.gen_bool(0.5) {
                    engine.add(name, id).unwrap();
                } else {
                    engine.remove(name, id).unwrap();
                }
            }
        })
    };
    let readers: Vec<_> = (0..3)
        .map(|_| {
            let engine = engine.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    let result = engine
                        .query("n")
                        .where_index("p")
                        .where_index("q")
                        .where_index("r")
                        .limit(50)
                        .execute()
                        .unwrap();
                    assert!(result.len() <= 50);
                }
            })
        })
        .collect();
    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    // quiescent: the cached intersection equals a fresh one
    let result = cached(&engine, &["p", "q", "r"]);
    let p = engine.index("p").unwrap();
    let q = engine.index("q").unwrap();
    let r = engine.index("r").unwrap();
    let expected: Vec<DocId> = p
        .ids()
        .into_iter()
        .filter(|id| q.contains(*id) && r.contains(*id))
        .collect();
    assert_eq!(result.ids(), expected);
}

#[test]
fn concurrent_first_queries_build_once() {
    let engine = Arc::new(engine());
    engine.create_sort("n");
    engine.create_index("a");
    engine.create_index("b");
    for id in 0..100u32 {
        engine.set_score("n", DocId(id), id as i64).unwrap();
        engine.add("a", DocId(id)).unwrap();
        if id % 3 == 0 {
            engine.add("b", DocId(id)).unwrap();
        }
    }

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = engine.clone();
            thread::spawn(move || {
                let result = engine.query("n").where_index("a").where_index("b").execute().unwrap();
                let ids: Vec<u32> = result.ids().iter().map(|id| id.0).collect();
                assert_eq!(ids, vec![0, 3, 6, 9, 12, 15, 18, 21, 24, 27]);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    cached(&engine, &["a", "b"]);
    assert_eq!(engine.stats().cache.builds_enqueued, 1);
}

#[test]
fn dropped_index_invalidates_its_entries() {
    let engine = engine();
    engine.create_sort("n");
    engine.create_index("a");
    engine.create_index("b");
    engine.add("a", DocId(1)).unwrap();
    engine.add("b", DocId(1)).unwrap();
    cached(&engine, &["a", "b"]);

    engine.drop_index("b").unwrap();
    assert!(engine.cache().is_empty());
    let err = engine
        .query("n")
        .where_index("a")
        .where_index("b")
        .execute()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownReference);
}

#[test]
fn shutdown_leaves_queries_working() {
    let engine = engine();
    engine.create_sort("n");
    engine.create_index("a");
    engine.create_index("b");
    for id in 0..5u32 {
        engine.set_score("n", DocId(id), id as i64).unwrap();
        engine.add("a", DocId(id)).unwrap();
        engine.add("b", DocId(id)).unwrap();
    }
    engine.shutdown();

    let result = engine.query("n").where_index("a").where_index("b").execute().unwrap();
    assert_eq!(result.len(), 5);
    assert_eq!(engine.stats().cache.builds_dropped, 1);
}
