pub mod core;
pub mod index;
pub mod query;
pub mod search;
pub mod memory;
pub mod cache;

pub use crate::core::config::Config;
pub use crate::core::engine::Engine;
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::types::{DocId, Direction, Score};
pub use crate::query::condition::Condition;
pub use crate::search::results::ResultSet;

/*
┌──────────────────────────────────────────────────────────────────────────────┐
│                          RANKSET STRUCT ARCHITECTURE                         │
└──────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────── CORE ──────────────────────────────────────┐
│  struct Engine                                                               │
│  │ config: Config                    // limits, planner, cache, pools        │
│  │ registry: Registry                // named indexes + sorts (IndexFetcher) │
│  │ cache: IntersectionCache          // memoized multi-index intersections   │
│  │ planner: QueryPlanner             // index-driven vs sort-driven          │
│  │ queries: Arc<Pool<QueryState>>                                            │
│  │ results: Arc<Pool<ResultSet>>                                             │
└──────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────── INDEX ─────────────────────────────────────┐
│  struct Index            RwLock<RoaringBitmap>, membership only              │
│  enum SortedIndex                                                            │
│  ├─ Dynamic(SkipList)    arena nodes, per-level widths, O(log n) rank/seek   │
│  └─ Static(StaticSort)   padded Vec<Option<DocId>>, append/prepend only      │
│  struct SortIter<'a>     holds the sort's read lock until dropped/closed     │
└──────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────── QUERY ─────────────────────────────────────┐
│  Query::execute()                                                            │
│    0 indexes  → Sort scan                                                    │
│    1 index    → bind directly                                                │
│    N indexes  → cache.get(names) ─ hit  → cached intersection                │
│                                  └ miss → raw indexes (build queued)         │
│    + ranked / union filters → QueryPlanner::order + plan → executor          │
└──────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────── CACHE ─────────────────────────────────────┐
│  lookup: RwLock<HashMap<key, Arc<CacheItem>>>                                │
│  buckets: source name → ChangeBucket { key → Arc<CacheItem> }                │
│  lru: Mutex<LruCache<key, Arc<CacheItem>>>                                   │
│  build workers ◄── bounded queue (try_send, drop on full)                    │
│  maintenance   ◄── lru queue + tick(sweep interval) + shutdown               │
└──────────────────────────────────────────────────────────────────────────────┘
*/
