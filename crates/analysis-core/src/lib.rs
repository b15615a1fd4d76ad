pub mod error;
pub mod provider;
pub mod stats;
pub mod traits;
pub mod types;

pub use error::*;
pub use provider::InMemoryQuoteProvider;
pub use traits::*;
pub use types::*;
