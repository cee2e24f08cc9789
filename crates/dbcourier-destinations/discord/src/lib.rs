mod notifier;
mod transmitter;
mod webhook;

pub use notifier::DiscordNotifier;
pub use transmitter::DiscordTransmitter;
pub use webhook::{Embed, EmbedField, WebhookClient};
