pub mod models;
pub mod payloads;
pub mod traits;

pub use models::*;
pub use payloads::*;
pub use traits::*;
