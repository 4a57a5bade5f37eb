pub mod endpoint;
pub mod health;
pub mod proxy;
pub mod token;

pub use endpoint::{CatalogEndpoint, CatalogParameter, CatalogPath, ValidationError};
pub use proxy::{CatalogProxy, ProxyError, UpstreamBody, UpstreamResponse};
pub use token::{
    AccessToken, AuthError, ClientCredentialsTokenProvider, TokenError, TokenProvider,
};
