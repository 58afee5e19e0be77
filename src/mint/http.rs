//! HTTP transport for the legacy v0 mint REST API

use super::{
    CheckFeesRequest, CheckFeesResponse, CheckSpendableRequest, CheckSpendableResponse, MeltRequest,
    MeltResponse, MintConnector, MintRequest, MintResponse, PostMintResponse, RequestMintResponse,
    SplitRequest, SplitResponse,
};
use crate::error::{WalletError, WalletResult};
use crate::types::{KeysetId, MintKeys};
use crate::utils::network_config::validate_mint_url;
use crate::utils::{build_client, extract_domain, MintConfig};
use crate::{log_debug, log_warn};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

const MODULE: &str = "mint::http";

/// [`MintConnector`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpMintConnector {
    client: Client,
}

impl HttpMintConnector {
    pub fn new(config: &MintConfig) -> WalletResult<Self> {
        Ok(Self {
            client: build_client(config)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn endpoint(mint_url: &str, path: &str) -> WalletResult<String> {
        let validation = validate_mint_url(mint_url);
        match validation.url {
            Some(base) if validation.is_valid => Ok(format!("{}/{}", base, path)),
            _ => Err(WalletError::invalid_mint_url(format!(
                "{}: {}",
                mint_url,
                validation.errors.join("; ")
            ))),
        }
    }

    /// Send a request and resolve the body into `T` or an issuer error
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, url: &str) -> WalletResult<T> {
        log_debug!(MODULE, "Mint request", domain = extract_domain(url));

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        match MintResponse::<T>::parse(&body) {
            Ok(MintResponse::Success(value)) if status.is_success() => Ok(value),
            Ok(MintResponse::Success(_)) => Err(WalletError::mint_error(format!(
                "Mint returned HTTP {}",
                status.as_u16()
            ))),
            Ok(MintResponse::Error(err)) => Err(err.into()),
            Err(e) if !status.is_success() => {
                log_warn!(MODULE, "Unparseable mint error", status = status.as_u16());
                Err(WalletError::mint_error(format!("Mint returned HTTP {}", status.as_u16()))
                    .with_details(e.message))
            }
            Err(e) => Err(e),
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: String) -> WalletResult<T> {
        self.send(self.client.get(&url), &url).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, url: String, body: &B) -> WalletResult<T> {
        self.send(self.client.post(&url).json(body), &url).await
    }
}

impl MintConnector for HttpMintConnector {
    async fn get_keys(&self, mint_url: &str, keyset_id: Option<&KeysetId>) -> WalletResult<MintKeys> {
        let path = match keyset_id {
            Some(id) => format!("keys/{}", id.url_safe()),
            None => "keys".to_string(),
        };
        self.get(Self::endpoint(mint_url, &path)?).await
    }

    async fn request_mint(&self, mint_url: &str, amount: u64) -> WalletResult<RequestMintResponse> {
        self.get(Self::endpoint(mint_url, &format!("mint?amount={}", amount))?)
            .await
    }

    async fn mint(&self, mint_url: &str, request: &MintRequest, hash: &str) -> WalletResult<PostMintResponse> {
        let mut url = url::Url::parse(&Self::endpoint(mint_url, "mint")?)?;
        url.query_pairs_mut().append_pair("hash", hash);
        self.post(url.to_string(), request).await
    }

    async fn split(&self, mint_url: &str, request: &SplitRequest) -> WalletResult<SplitResponse> {
        self.post(Self::endpoint(mint_url, "split")?, request).await
    }

    async fn melt(&self, mint_url: &str, request: &MeltRequest) -> WalletResult<MeltResponse> {
        self.post(Self::endpoint(mint_url, "melt")?, request).await
    }

    async fn check_fees(&self, mint_url: &str, request: &CheckFeesRequest) -> WalletResult<CheckFeesResponse> {
        self.post(Self::endpoint(mint_url, "checkfees")?, request).await
    }

    async fn check(&self, mint_url: &str, request: &CheckSpendableRequest) -> WalletResult<CheckSpendableResponse> {
        self.post(Self::endpoint(mint_url, "check")?, request).await
    }
}
