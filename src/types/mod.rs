pub mod asset;
pub mod candle;
pub mod signal;
pub mod source;

pub use asset::*;
pub use candle::*;
pub use signal::*;
pub use source::*;
