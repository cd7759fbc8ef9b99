pub mod database;
pub mod session;

pub use database::Engine;
pub use session::Session;
