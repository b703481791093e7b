pub mod pool;
pub mod question_store;
