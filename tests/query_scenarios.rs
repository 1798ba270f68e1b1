use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rankset::{Condition, Config, DocId, Engine, ErrorKind};

fn engine() -> Engine {
    Engine::new(Config { cache_workers: 2, ..Config::default() }).unwrap()
}

fn ids(result: &rankset::ResultSet) -> Vec<u32> {
    result.ids().iter().map(|id| id.0).collect()
}

#[test]
fn range_then_offset_on_loaded_sort() {
    let engine = engine();
    engine.create_sort("score");
    for score in 1..=6i64 {
        engine.set_score("score", DocId(score as u32 * 100), score).unwrap();
    }
    let sort = engine.sort("score").unwrap();

    let scores: Vec<i64> = sort
        .forwards()
        .range(1, 3)
        .offset(0)
        .map(|id| sort.score(id).unwrap())
        .collect();
    assert_eq!(scores, vec![2, 3, 4]);

    let scores: Vec<i64> = sort
        .forwards()
        .range(1, 3)
        .offset(1)
        .map(|id| sort.score(id).unwrap())
        .collect();
    assert_eq!(scores, vec![3, 4]);
}

#[test]
fn no_index_desc_returns_everything_reversed() {
    let engine = engine();
    engine.create_sort("created");
    let loaded: Vec<u32> = vec![42, 7, 19, 3, 88, 61, 5];
    for (pos, id) in loaded.iter().enumerate() {
        engine.set_score("created", DocId(*id), pos as i64).unwrap();
    }

    let result = engine.query("created").desc().execute().unwrap();
    let mut expected = loaded.clone();
    expected.reverse();
    assert_eq!(ids(&result), expected);
    assert!(!result.has_more());

    // same through a static sort
    engine.load_static_sort("created", loaded.iter().map(|id| DocId(*id)));
    let result = engine.query("created").desc().execute().unwrap();
    assert_eq!(ids(&result), expected);
}

#[test]
fn two_indexes_intersect_in_sort_order() {
    let engine = engine();
    engine.create_sort("price");
    // ids 1..=11, cheapest is 11
    for id in 1..=11u32 {
        engine.set_score("price", DocId(id), 1000 - id as i64).unwrap();
    }
    engine.create_index("red");
    engine.create_index("large");
    for id in [1, 2, 3, 5, 8, 9, 11] {
        engine.add("red", DocId(id)).unwrap();
    }
    for id in [2, 4, 8, 10, 11] {
        engine.add("large", DocId(id)).unwrap();
    }

    for _ in 0..3 {
        let result = engine
            .query("price")
            .where_index("red")
            .where_index("large")
            .execute()
            .unwrap();
        assert_eq!(ids(&result), vec![11, 8, 2]);
        assert!(!result.has_more());
    }
}

#[test]
fn pagination_walks_the_whole_match_set() {
    let engine = engine();
    engine.create_sort("n");
    engine.create_index("odd");
    for id in 0..200u32 {
        engine.set_score("n", DocId(id), id as i64).unwrap();
        if id % 2 == 1 {
            engine.add("odd", DocId(id)).unwrap();
        }
    }

    let mut seen = Vec::new();
    let mut offset = 0;
    loop {
        let result = engine
            .query("n")
            .where_index("odd")
            .offset(offset)
            .limit(7)
            .execute()
            .unwrap();
        seen.extend(ids(&result));
        if !result.has_more() {
            break;
        }
        offset += 7;
    }
    let expected: Vec<u32> = (0..200).filter(|id| id % 2 == 1).collect();
    assert_eq!(seen, expected);
}

#[test]
fn totals_are_exact_or_capped() {
    let engine = Engine::new(Config { max_total: 50, ..Config::default() }).unwrap();
    engine.create_sort("n");
    engine.create_index("all");
    for id in 0..100u32 {
        engine.set_score("n", DocId(id), id as i64).unwrap();
        engine.add("all", DocId(id)).unwrap();
    }

    let result = engine.query("n").include_total().execute().unwrap();
    assert_eq!(result.total(), Some(100));

    let result = engine.query("n").where_index("all").include_total().execute().unwrap();
    assert_eq!(result.total(), Some(50));
    assert!(result.is_total_capped());

    let result = engine
        .query("n")
        .filter(Condition::between("n", 10, 19))
        .include_total()
        .execute()
        .unwrap();
    assert_eq!(result.total(), Some(10));
    assert!(!result.is_total_capped());
}

#[test]
fn totals_stay_capped_when_the_page_passes_the_cap() {
    let engine = Engine::new(Config { max_total: 50, ..Config::default() }).unwrap();
    engine.create_sort("n");
    engine.create_index("all");
    for id in 0..100u32 {
        engine.set_score("n", DocId(id), id as i64).unwrap();
        engine.add("all", DocId(id)).unwrap();
    }

    // "all" covers the whole sort, so this walks the sort
    let result = engine
        .query("n")
        .where_index("all")
        .offset(60)
        .limit(50)
        .include_total()
        .execute()
        .unwrap();
    assert_eq!(result.len(), 40);
    assert_eq!(result.total(), Some(50));
    assert!(result.is_total_capped());
    assert!(!result.has_more());

    // a small driver is walked directly; same cap rule
    let engine = Engine::new(Config { max_total: 2, ..Config::default() }).unwrap();
    engine.create_sort("n");
    engine.create_index("few");
    for id in 0..100u32 {
        engine.set_score("n", DocId(id), id as i64).unwrap();
        if id < 3 {
            engine.add("few", DocId(id)).unwrap();
        }
    }
    let result = engine
        .query("n")
        .where_index("few")
        .limit(10)
        .include_total()
        .execute()
        .unwrap();
    assert_eq!(ids(&result), vec![0, 1, 2]);
    assert_eq!(result.total(), Some(2));
    assert!(result.is_total_capped());
}

#[test]
fn ranked_conditions_match_brute_force() {
    let engine = engine();
    engine.create_sort("age");
    engine.create_sort("rank");
    let mut rng = StdRng::seed_from_u64(7);
    let mut ages = Vec::new();
    for id in 0..300u32 {
        let age = rng.gen_range(0..60i64);
        ages.push(age);
        engine.set_score("age", DocId(id), age).unwrap();
        engine.set_score("rank", DocId(id), id as i64).unwrap();
    }

    let cases = [
        (Condition::equal("age", 30), Box::new(|a: i64| a == 30) as Box<dyn Fn(i64) -> bool>),
        (Condition::between("age", 10, 20), Box::new(|a: i64| (10..=20).contains(&a))),
        (Condition::less_than("age", 5), Box::new(|a: i64| a < 5)),
        (Condition::less_than_or_equal("age", 5), Box::new(|a: i64| a <= 5)),
        (Condition::greater_than("age", 55), Box::new(|a: i64| a > 55)),
        (Condition::greater_than_or_equal("age", 55), Box::new(|a: i64| a >= 55)),
    ];
    for (condition, keep) in cases {
        let key = condition.key();
        let result = engine.query("rank").filter(condition).limit(100).execute().unwrap();
        let expected: Vec<u32> = (0..300u32).filter(|id| keep(ages[*id as usize])).take(100).collect();
        assert_eq!(ids(&result), expected, "{}", key);
    }
}

#[test]
fn union_filters_and_reports_longest_member() {
    let engine = engine();
    engine.create_sort("n");
    for (name, members) in [("a", vec![1u32, 2, 3]), ("b", vec![3, 4]), ("c", vec![5])] {
        engine.create_index(name);
        for id in members {
            engine.add(name, DocId(id)).unwrap();
        }
    }
    for id in 0..10u32 {
        engine.set_score("n", DocId(id), id as i64).unwrap();
    }

    let result = engine
        .query("n")
        .filter(Condition::union(&["a", "b"]))
        .execute()
        .unwrap();
    assert_eq!(ids(&result), vec![1, 2, 3, 4]);

    // the length estimate is the longest member (3), not the union size (4)
    let bound = Condition::union(&["a", "b"]).on(engine.registry()).unwrap();
    assert_eq!(bound.len(), 3);
    assert!(!bound.can_iterate());
    let err = bound.iter(rankset::Direction::Asc).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::IllegalIteration);
}

#[test]
fn unknown_names_surface_to_the_caller() {
    let engine = engine();
    engine.create_sort("n");
    engine.create_index("a");

    let err = engine.query("missing").execute().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownReference);
    assert!(err.to_string().contains("missing"));

    let err = engine
        .query("n")
        .filter(Condition::equal("nope", 1))
        .execute()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownReference);

    let err = engine
        .query("n")
        .where_index("a")
        .where_index("ghost")
        .execute()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownReference);
    assert!(engine.cache().is_empty());
}

#[test]
fn pooled_objects_are_reused() {
    let engine = Engine::new(Config { query_pool_size: 2, result_pool_size: 2, ..Config::default() }).unwrap();
    engine.create_sort("n");
    engine.set_score("n", DocId(1), 1).unwrap();

    for _ in 0..20 {
        let result = engine.query("n").execute().unwrap();
        assert_eq!(result.len(), 1);
        result.close();
    }
    let stats = engine.stats();
    assert_eq!(stats.result_pool.checkouts, 20);
    assert_eq!(stats.result_pool.transient, 0);
    assert_eq!(stats.query_pool.transient, 0);

    // holding more than the pool has falls back to fresh values
    let held: Vec<_> = (0..3).map(|_| engine.query("n").execute().unwrap()).collect();
    assert_eq!(engine.stats().result_pool.transient, 1);
    drop(held);
    assert_eq!(engine.stats().result_pool.available, 2);
}
