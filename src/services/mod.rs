pub mod atom;
pub mod discord;
pub mod hatena;
pub mod wsse;

pub use discord::{DiscordNotifier, DiscordTarget};
pub use hatena::{HatenaAccount, HatenaClient};
