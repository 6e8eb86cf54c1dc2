pub mod codec;
pub mod models;
pub mod store;

pub use codec::CookieCodec;
pub use models::{OAuthState, UserSession};
pub use store::SessionStore;
