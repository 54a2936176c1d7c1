pub mod availability;
pub mod directory;

pub use availability::*;
pub use directory::*;
