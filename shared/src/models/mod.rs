pub mod character;
pub mod conversation;
pub mod message;
pub mod settings;
pub mod user;

pub use character::*;
pub use conversation::*;
pub use message::*;
pub use settings::*;
pub use user::*;
