pub mod question_pool;
pub mod store;
