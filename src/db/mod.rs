pub mod pool;

pub use pool::Pools;
