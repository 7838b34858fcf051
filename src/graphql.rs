// Client for the GraphQL service holding invoices and credit vouchers
// Requests carry the session token obtained through `SessionResolver`

use crate::config::{ClientConfig, PagingConfig};
use crate::models::{Bill, Financials, RemoteInvoice, User, Voucher};
use crate::pagination::{collect_pages, PageCursor};
use crate::rest_api;
use crate::session::{SessionCredential, SessionResolver};
use crate::transport::{execute, ApiRequest, HttpTransport, Transport, TransportError};
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const GRAPHQL_PATH: &str = "/drive/graphql";

const INVOICES_QUERY: &str = r#"query GetInvoices($limit: Int!, $offset: Int, $invoiceStatus: InvoiceStatus) {
  viewer {
    invoices(limit: $limit, offset: $offset, invoiceStatus: $invoiceStatus) {
      date
      total {
        amount
      }
    }
  }
}"#;

const VOUCHERS_QUERY: &str = r#"query getCreditVouchers($limit: Int!, $offset: Int!) {
  viewer {
    creditVouchers(limit: $limit, offset: $offset) {
      edges {
        node {
          id
          value
          grantedAt
        }
      }
    }
  }
}"#;

#[derive(Debug, Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: PageVariables,
}

#[derive(Debug, Serialize)]
struct PageVariables {
    limit: u64,
    offset: u64,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<D> {
    data: Option<D>,
    #[serde(default)]
    errors: Vec<GraphqlErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ViewerData<V> {
    viewer: V,
}

#[derive(Debug, Deserialize)]
struct InvoicesViewer {
    #[serde(default)]
    invoices: Vec<RemoteInvoice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VouchersViewer {
    credit_vouchers: VoucherConnection,
}

#[derive(Debug, Deserialize)]
struct VoucherConnection {
    #[serde(default)]
    edges: Vec<VoucherEdge>,
}

#[derive(Debug, Deserialize)]
struct VoucherEdge {
    node: Voucher,
}

pub struct GraphqlClient<T: Transport> {
    endpoint: String,
    token: SessionCredential,
    paging: PagingConfig,
    transport: T,
}

impl<T: Transport> GraphqlClient<T> {
    pub fn new(
        base_url: &str,
        token: SessionCredential,
        paging: PagingConfig,
        transport: T,
    ) -> Self {
        Self {
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), GRAPHQL_PATH),
            token,
            paging,
            transport,
        }
    }

    pub async fn bills(&self) -> Result<Vec<Bill>, TransportError> {
        let limit = self.paging.bills_limit;
        let cursor = PageCursor::offsets(limit, self.paging.bills_offset_step);
        collect_pages("bills", cursor, |offset| self.bill_page(limit, offset)).await
    }

    pub async fn vouchers(&self) -> Result<Vec<Voucher>, TransportError> {
        let limit = self.paging.vouchers_limit;
        let cursor = PageCursor::offsets(limit, self.paging.vouchers_offset_step);
        collect_pages("vouchers", cursor, |offset| self.voucher_page(limit, offset)).await
    }

    async fn bill_page(&self, limit: u64, offset: u64) -> Result<Vec<Bill>, TransportError> {
        let data: ViewerData<InvoicesViewer> =
            self.query(INVOICES_QUERY, limit, offset).await?;
        Ok(data.viewer.invoices.into_iter().map(Bill::from).collect())
    }

    async fn voucher_page(&self, limit: u64, offset: u64) -> Result<Vec<Voucher>, TransportError> {
        let data: ViewerData<VouchersViewer> =
            self.query(VOUCHERS_QUERY, limit, offset).await?;
        let vouchers: Vec<Voucher> = data
            .viewer
            .credit_vouchers
            .edges
            .into_iter()
            .map(|edge| edge.node)
            .collect();
        for voucher in &vouchers {
            debug!(value = voucher.value, granted_at = %voucher.granted_at, "voucher");
        }
        Ok(vouchers)
    }

    async fn query<D: DeserializeOwned>(
        &self,
        query: &str,
        limit: u64,
        offset: u64,
    ) -> Result<D, TransportError> {
        let envelope = GraphqlRequest {
            query,
            variables: PageVariables { limit, offset },
        };
        let request = ApiRequest::post(self.endpoint.as_str())
            .with_bearer(self.token.as_str())
            .with_json(&envelope)?;

        let response: GraphqlResponse<D> = execute(&self.transport, request).await?;
        if !response.errors.is_empty() {
            let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
            return Err(TransportError::Graphql(messages.join("; ")));
        }
        response
            .data
            .ok_or_else(|| TransportError::Graphql("response carried no data".to_string()))
    }

    pub async fn financials(&self) -> anyhow::Result<Financials> {
        let bills = self.bills().await.context("failed to get bills")?;
        let vouchers = self.vouchers().await.context("failed to get vouchers")?;
        info!(
            bills = bills.len(),
            vouchers = vouchers.len(),
            "collected financials"
        );
        Ok(Financials { bills, vouchers })
    }
}

impl GraphqlClient<HttpTransport> {
    // Runs the cookie handshake over a transport sharing the resolver's jar
    pub async fn connect(config: &ClientConfig, user: &User) -> anyhow::Result<Self> {
        let resolver = SessionResolver::new(&config.graphql_base_url)?;
        let transport = HttpTransport::with_cookie_jar(config.timeout(), resolver.jar())
            .context("failed to create HTTP client")?;
        let token = resolver
            .resolve(&transport, user)
            .await
            .context("failed to find token")?;
        Ok(Self::new(
            &config.graphql_base_url,
            token,
            config.paging,
            transport,
        ))
    }
}

// Producer for the financial dataset
pub async fn fetch_financials(config: &ClientConfig) -> anyhow::Result<Financials> {
    let user = rest_api::fetch_user(config)
        .await
        .context("failed to get user details")?;
    let client = GraphqlClient::connect(config, &user)
        .await
        .context("failed to create GraphQL client")?;
    client.financials().await
}
