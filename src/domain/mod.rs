pub mod business;
pub mod catalog;
pub mod group_order;
pub mod order;

pub use business::*;
pub use catalog::*;
pub use group_order::*;
pub use order::*;
