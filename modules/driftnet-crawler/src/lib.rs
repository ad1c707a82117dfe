pub mod crawler;
pub mod fetch;
pub mod frontier;
pub mod normalize;
pub mod relevance;
pub mod traits;

pub use crawler::{Crawler, CrawlStats};
pub use frontier::{Frontier, FrontierTask};
