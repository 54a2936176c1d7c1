pub mod booking;
pub mod consistency;
pub mod lifecycle;
pub mod store;

pub use booking::*;
pub use consistency::*;
pub use lifecycle::*;
pub use store::*;
