pub mod drive;
pub mod market_data;
pub mod util;
