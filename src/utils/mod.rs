pub mod decoders;
pub mod ss58;

pub use ss58::*;
