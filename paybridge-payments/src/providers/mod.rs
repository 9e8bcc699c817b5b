//! Payment provider implementations

pub mod memory;
pub mod paddle;
pub mod square;
pub mod stripe;

pub use memory::MemoryGateway;
pub use paddle::PaddleGateway;
pub use square::SquareGateway;
pub use stripe::{StripeGateway, STRIPE_API_BASE};
