pub mod condition;
pub mod planner;
pub mod builder;
