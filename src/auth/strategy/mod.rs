//! Authentication strategies for platform services.

mod http_basic;
mod login_page;
mod no_auth;
mod token;
mod traits;

use async_trait::async_trait;
use secrecy::ExposeSecret;

pub use http_basic::HttpBasicStrategy;
pub use login_page::{BAD_CREDENTIALS_MARKER, LoginPageStrategy, extract_csrf_token};
pub use no_auth::NoAuthStrategy;
pub use token::{
    DEFAULT_TOKEN_LIFETIME_SECS, EXPIRES_IN_MARGIN_SECS, TOKEN_FIELD, TokenFlavor, TokenStrategy,
};
pub use traits::AuthStrategy;

use crate::Result;
use crate::auth::{AuthMaterial, Credentials};
use crate::client::{Session, SessionOptions};
use crate::config::{ClientConfiguration, ClientType, PlatformSettings};

/// Closed set of strategies a registry can build.
#[derive(Debug)]
pub enum ClientAuth {
    NoAuth(NoAuthStrategy),
    HttpBasic(HttpBasicStrategy),
    LoginPage(LoginPageStrategy),
    Token(TokenStrategy),
}

impl ClientAuth {
    /// Build the strategy and session for `configuration`.
    ///
    /// Credentials are validated here; no endpoint is contacted.
    pub async fn from_configuration(
        configuration: &ClientConfiguration,
        settings: &PlatformSettings,
    ) -> Result<Self> {
        let options = SessionOptions::from_configuration(configuration, settings);

        let auth = match configuration.client_type() {
            ClientType::NoAuth => ClientAuth::NoAuth(NoAuthStrategy::new(Session::new(options).await?)),
            ClientType::Webhdfs => {
                ClientAuth::NoAuth(NoAuthStrategy::new(Session::webhdfs(options).await?))
            }
            ClientType::HttpBasic => {
                let credentials = credentials_of(configuration)?;
                ClientAuth::HttpBasic(HttpBasicStrategy::new(
                    Session::new(options).await?,
                    &credentials,
                ))
            }
            ClientType::LoginPage => {
                let credentials = credentials_of(configuration)?;
                ClientAuth::LoginPage(LoginPageStrategy::new(
                    Session::new(options).await?,
                    credentials,
                    settings.csrf_field.clone(),
                ))
            }
            ClientType::BearerTokenCf => {
                token_auth(configuration, settings, options, TokenFlavor::CloudFoundry).await?
            }
            ClientType::BearerTokenUaa => {
                token_auth(configuration, settings, options, TokenFlavor::UaaPassword).await?
            }
            ClientType::UaaClientCredentials => {
                token_auth(configuration, settings, options, TokenFlavor::UaaClientCredentials)
                    .await?
            }
            ClientType::BearerTokenK8s => {
                token_auth(configuration, settings, options, TokenFlavor::KubernetesService).await?
            }
        };
        Ok(auth)
    }

    fn inner(&self) -> &dyn AuthStrategy {
        match self {
            ClientAuth::NoAuth(s) => s,
            ClientAuth::HttpBasic(s) => s,
            ClientAuth::LoginPage(s) => s,
            ClientAuth::Token(s) => s,
        }
    }
}

fn credentials_of(configuration: &ClientConfiguration) -> Result<Credentials> {
    let (username, password) = configuration.credentials()?;
    Ok(Credentials::new(username, password.expose_secret()))
}

async fn token_auth(
    configuration: &ClientConfiguration,
    settings: &PlatformSettings,
    options: SessionOptions,
    flavor: TokenFlavor,
) -> Result<ClientAuth> {
    let credentials = credentials_of(configuration)?;
    let token_url = settings.token_url(flavor)?;
    Ok(ClientAuth::Token(TokenStrategy::new(
        Session::new(options).await?,
        flavor,
        token_url,
        credentials,
    )))
}

#[async_trait]
impl AuthStrategy for ClientAuth {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    async fn authenticated(&self) -> bool {
        self.inner().authenticated().await
    }

    async fn authenticate(&self) -> Result<AuthMaterial> {
        self.inner().authenticate().await
    }

    async fn material(&self) -> AuthMaterial {
        self.inner().material().await
    }

    fn session(&self) -> &Session {
        self.inner().session()
    }
}
