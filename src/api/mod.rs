//! Backend access: transport, credential storage and typed resource clients.

pub mod credentials;
pub mod services;
pub mod transport;

pub use credentials::FileCredentialStore;
pub use services::{AuthService, DevPulseService, GitHubService};
pub use transport::{ApiClient, LoginPrompt};
