// Client for the REST service holding the user profile and the reservation history

use crate::config::{ClientConfig, PagingConfig};
use crate::models::{Reservation, User};
use crate::pagination::{collect_pages, PageCursor};
use crate::transport::{execute, ApiRequest, HttpTransport, Transport, TransportError};
use anyhow::Context;
use tracing::info;

pub struct RestClient<T: Transport> {
    base_url: String,
    token: String,
    paging: PagingConfig,
    transport: T,
}

impl<T: Transport> RestClient<T> {
    pub fn new(base_url: &str, token: &str, paging: PagingConfig, transport: T) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            paging,
            transport,
        }
    }

    pub async fn user(&self) -> Result<User, TransportError> {
        let request = ApiRequest::get(format!("{}/me/", self.base_url)).with_bearer(&self.token);
        let user: User = execute(&self.transport, request).await?;
        info!(user_id = user.id, "resolved user");
        Ok(user)
    }

    pub async fn reservations(&self, user_id: i64) -> Result<Vec<Reservation>, TransportError> {
        let cursor = PageCursor::pages(
            self.paging.reservations_first_page,
            self.paging.reservations_page_step,
        );
        collect_pages("reservations", cursor, |page| {
            self.reservation_page(user_id, page)
        })
        .await
    }

    async fn reservation_page(
        &self,
        user_id: i64,
        page: u64,
    ) -> Result<Vec<Reservation>, TransportError> {
        let url = format!(
            "{}/users/{}/reservations/pages/{}/?orderBy=desc",
            self.base_url, user_id, page
        );
        execute(&self.transport, ApiRequest::get(url).with_bearer(&self.token)).await
    }
}

impl RestClient<HttpTransport> {
    pub fn from_config(config: &ClientConfig) -> anyhow::Result<Self> {
        let token = config.rest_token()?;
        let transport =
            HttpTransport::new(config.timeout()).context("failed to create HTTP client")?;
        Ok(Self::new(&config.rest_base_url, token, config.paging, transport))
    }
}

pub async fn fetch_user(config: &ClientConfig) -> anyhow::Result<User> {
    let client = RestClient::from_config(config).context("failed to create client")?;
    client
        .user()
        .await
        .context("failed to get details about user")
}

// Producer for the reservation dataset
pub async fn fetch_reservations(config: &ClientConfig) -> anyhow::Result<Vec<Reservation>> {
    let client = RestClient::from_config(config).context("failed to create client")?;
    let user = client
        .user()
        .await
        .context("failed to get details about user")?;
    client
        .reservations(user.id)
        .await
        .context("failed to get reservations")
}
