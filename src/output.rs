mod daily_csv;
mod manifest;
mod storage;

pub use daily_csv::*;
pub use manifest::*;
pub use storage::*;
