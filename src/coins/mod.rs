pub mod address;
pub use address::*;

pub mod amount;
pub use amount::*;

pub mod coin;
pub use coin::*;

pub mod decimal;
pub use decimal::*;

pub mod staking;
