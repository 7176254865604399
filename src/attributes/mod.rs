pub mod router;

pub use router::{AttributeRouter, OwnerKind};
