//! Hotspot analysis: selecting the most divergent edge of a
//! decomposition and describing the clade below it.

pub mod clade;
pub mod runner;
pub mod select;

pub use clade::profile_clade;
pub use runner::{emd_unifrac, hotspot, hotspot_pairs};
pub use select::select_hotspot;
