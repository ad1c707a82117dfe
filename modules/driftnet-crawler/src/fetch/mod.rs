pub mod gate;
pub mod hn;
pub mod reddit;

pub use gate::RateGate;
pub use hn::HackerNewsClient;
pub use reddit::RedditClient;
