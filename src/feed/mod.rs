mod notifier;

pub use notifier::{ChangeFeedNotifier, FeedUpdate};
