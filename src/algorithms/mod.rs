pub mod overlap;
pub mod shift_search;

pub use overlap::*;
pub use shift_search::*;
