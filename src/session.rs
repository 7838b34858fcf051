// Session token resolver for the GraphQL service
// The service hands out its bearer token as a cookie in response to a bootstrap request

use crate::models::User;
use crate::transport::{ApiRequest, Transport, TransportError};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::Url;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

pub const ACCOUNT_PATH: &str = "/go/drive/account";
pub const TOKEN_COOKIE: &str = "driveToken";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("invalid account URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("bootstrap request failed: {0}")]
    Bootstrap(#[from] TransportError),

    #[error("authentication token missing: no `{0}` cookie was set")]
    MissingToken(&'static str),
}

// Bearer token for the GraphQL service, valid for a single run
#[derive(Clone, PartialEq)]
pub struct SessionCredential(String);

impl SessionCredential {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionCredential(***)")
    }
}

pub struct SessionResolver {
    jar: Arc<Jar>,
    account_url: Url,
}

impl SessionResolver {
    // Every resolver starts with an empty jar of its own
    pub fn new(base_url: &str) -> Result<Self, SessionError> {
        let raw = format!("{}{}", base_url.trim_end_matches('/'), ACCOUNT_PATH);
        let account_url = Url::parse(&raw).map_err(|e| SessionError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            jar: Arc::new(Jar::default()),
            account_url,
        })
    }

    // Handed to the transport so that cookies set by the service end up here
    pub fn jar(&self) -> Arc<Jar> {
        Arc::clone(&self.jar)
    }

    pub fn account_url(&self) -> &Url {
        &self.account_url
    }

    pub async fn resolve<T>(
        &self,
        transport: &T,
        user: &User,
    ) -> Result<SessionCredential, SessionError>
    where
        T: Transport + ?Sized,
    {
        let request = ApiRequest::get(self.account_url.as_str()).with_query([
            ("customerReference", user.reference.clone()),
            ("customerId", user.id.to_string()),
            ("firstName", user.first_name.clone()),
            ("lastName", user.last_name.clone()),
            ("email", user.email.clone()),
        ]);

        debug!(url = %self.account_url, "requesting session cookie");
        transport.send(request).await?;

        let credential = self.token_from_jar()?;
        info!("session token acquired");
        Ok(credential)
    }

    pub fn token_from_jar(&self) -> Result<SessionCredential, SessionError> {
        self.jar
            .cookies(&self.account_url)
            .and_then(|header| {
                header
                    .to_str()
                    .ok()
                    .and_then(|cookies| find_cookie(cookies, TOKEN_COOKIE))
            })
            .map(SessionCredential)
            .ok_or(SessionError::MissingToken(TOKEN_COOKIE))
    }
}

// `cookies` is a Cookie header value: `a=1; b=2`
fn find_cookie(cookies: &str, name: &str) -> Option<String> {
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}
