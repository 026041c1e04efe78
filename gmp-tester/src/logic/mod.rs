pub mod policy;
pub mod reports;
pub mod tester;

pub use policy::{GameplayStrategy, parse_strategies};
pub use tester::*;
