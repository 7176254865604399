pub mod hash;
pub mod metric;
pub mod resource;
pub mod scope;

pub use metric::MetricDimensionManager;
pub use resource::ResourceManager;
pub use scope::ScopeManager;
