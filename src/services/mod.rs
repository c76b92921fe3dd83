pub mod catalog;
pub mod coordinator;
pub mod detector;
pub mod poller;
pub mod queue;
pub mod recommendations;
pub mod swipe;

pub use catalog::{CatalogClient, MovieSource};
pub use coordinator::SessionCoordinator;
pub use poller::StatsPoller;
pub use queue::{MovieQueueManager, QueueMode};
pub use recommendations::{RecommendationClient, RecommendationProvider};
pub use swipe::SwipeProcessor;
