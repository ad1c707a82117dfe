pub mod writer;

pub use writer::{MetricsRow, StoreWriter};
