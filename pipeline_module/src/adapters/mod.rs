//! Provider adapters.
//!
//! Webhook payload types, the outbound direct-message payload, and the
//! OAuth-signed HTTP client for the Twitter API.

pub mod oauth1;
pub mod twitter;

pub use oauth1::OAuthCredentials;
pub use twitter::{
    DirectMessageReply, ProviderError, TwitterClient, TwitterDirectMessageEvent,
    TwitterWebhookPayload,
};
