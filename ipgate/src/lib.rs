pub mod conf;
pub mod error;
pub mod filter;
pub mod gate;
pub mod range;
pub mod shared;
pub mod utils;
