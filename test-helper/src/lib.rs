mod addr;
mod directory;

pub use addr::{get_unused_addr, unreachable_endpoint};
pub use directory::{producer, MockDirectory};
