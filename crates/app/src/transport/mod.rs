mod http;
mod keychain;

pub use http::HttpTransport;
pub use keychain::KeyringSecretStore;
