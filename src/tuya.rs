mod client;
mod device;
mod sign;
mod status;

pub use client::*;
pub use device::*;
pub use sign::*;
pub use status::*;
