pub mod feed;
pub mod notifications;
pub mod queue;

pub use feed::*;
pub use notifications::*;
pub use queue::*;
