pub mod membership;
pub mod skiplist;
pub mod static_sort;
pub mod sorted;
pub mod registry;
