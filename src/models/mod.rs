mod models;
pub use models::*;
mod wire;
pub use wire::*;
