pub mod availability;
pub mod booking;
pub mod catalog;
pub mod pricing;
pub mod provider;
pub mod slots;

pub use availability::*;
pub use booking::*;
pub use catalog::*;
pub use pricing::*;
pub use provider::*;
pub use slots::*;
