pub mod classifier;
pub mod indicators;
pub mod metrics;


pub use classifier::*;
pub use indicators::*;
pub use metrics::*;
