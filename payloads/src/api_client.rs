use crate::{requests, responses};
use reqwest::StatusCode;
use serde::Serialize;

type ReqwestResult = Result<reqwest::Response, reqwest::Error>;

/// An API client for interfacing with the backend.
pub struct APIClient {
    pub address: String,
    pub inner_client: reqwest::Client,
}

/// Helper methods for http actions
impl APIClient {
    fn format_url(&self, path: &str) -> String {
        format!("{}/api/{path}", &self.address)
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> ReqwestResult {
        self.inner_client
            .post(self.format_url(path))
            .json(body)
            .send()
            .await
    }

    async fn empty_post(&self, path: &str) -> ReqwestResult {
        self.inner_client.post(self.format_url(path)).send().await
    }

    async fn empty_get(&self, path: &str) -> ReqwestResult {
        self.inner_client.get(self.format_url(path)).send().await
    }
}

/// Methods on the backend API
impl APIClient {
    pub async fn health_check(&self) -> Result<(), ClientError> {
        let response = self.empty_get("health_check").await?;
        ok_empty(response).await
    }

    pub async fn create_account(
        &self,
        details: &requests::CreateAccount,
    ) -> Result<(), ClientError> {
        let response = self.post("create_account", details).await?;
        ok_empty(response).await
    }

    pub async fn login(
        &self,
        details: &requests::LoginCredentials,
    ) -> Result<(), ClientError> {
        let response = self.post("login", &details).await?;
        ok_empty(response).await
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        let response = self.empty_post("logout").await?;
        ok_empty(response).await
    }

    /// Check if the user is logged in.
    pub async fn login_check(&self) -> Result<bool, ClientError> {
        let response = self.empty_post("login_check").await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::UNAUTHORIZED => Ok(false),
            _ => Err(ClientError::APIError(
                response.status(),
                response.text().await?,
            )),
        }
    }

    pub async fn change_password(
        &self,
        details: &requests::ChangePassword,
    ) -> Result<responses::SuccessMessage, ClientError> {
        let response = self.post("change_password", details).await?;
        ok_body(response).await
    }

    /// Get the current user's profile information.
    pub async fn user_profile(
        &self,
    ) -> Result<responses::UserProfile, ClientError> {
        let response = self.empty_get("user_profile").await?;
        ok_body(response).await
    }

    // Account operations

    pub async fn get_balance(
        &self,
    ) -> Result<responses::BalanceInfo, ClientError> {
        let response = self.empty_get("get_balance").await?;
        ok_body(response).await
    }

    pub async fn get_transactions(
        &self,
        details: &requests::GetTransactions,
    ) -> Result<Vec<responses::TransactionEntry>, ClientError> {
        let response = self.post("get_transactions", details).await?;
        ok_body(response).await
    }

    pub async fn lookup_account(
        &self,
        details: &requests::LookupAccount,
    ) -> Result<responses::AccountIdentity, ClientError> {
        let response = self.post("lookup_account", details).await?;
        ok_body(response).await
    }

    // Over-the-counter handshake

    pub async fn initiate_transfer(
        &self,
        details: &requests::InitiateTransfer,
    ) -> Result<responses::TransferIntent, ClientError> {
        let response = self.post("initiate_transfer", details).await?;
        ok_body(response).await
    }

    pub async fn get_transfer_intent(
        &self,
        details: &requests::GetTransferIntent,
    ) -> Result<responses::TransferIntent, ClientError> {
        let response = self.post("get_transfer_intent", details).await?;
        ok_body(response).await
    }

    pub async fn confirm_transfer(
        &self,
        details: &requests::ConfirmTransfer,
    ) -> Result<responses::TransferReceipt, ClientError> {
        let response = self.post("confirm_transfer", details).await?;
        ok_body(response).await
    }

    pub async fn cancel_transfer_intent(
        &self,
        details: &requests::CancelTransferIntent,
    ) -> Result<(), ClientError> {
        let response = self.post("cancel_transfer_intent", details).await?;
        ok_empty(response).await
    }

    // Card operations

    pub async fn create_card(&self) -> Result<responses::Card, ClientError> {
        let response = self.empty_post("create_card").await?;
        ok_body(response).await
    }

    pub async fn get_card(&self) -> Result<responses::Card, ClientError> {
        let response = self.empty_get("get_card").await?;
        ok_body(response).await
    }

    pub async fn set_card_frozen(
        &self,
        details: &requests::SetCardFrozen,
    ) -> Result<responses::Card, ClientError> {
        let response = self.post("set_card_frozen", details).await?;
        ok_body(response).await
    }

    pub async fn fund_card(
        &self,
        details: &requests::FundCard,
    ) -> Result<responses::Card, ClientError> {
        let response = self.post("fund_card", details).await?;
        ok_body(response).await
    }

    // Investment operations

    pub async fn list_investment_options(
        &self,
    ) -> Result<Vec<responses::InvestmentOption>, ClientError> {
        let response = self.empty_get("list_investment_options").await?;
        ok_body(response).await
    }

    pub async fn get_investment_profile(
        &self,
    ) -> Result<responses::InvestmentProfile, ClientError> {
        let response = self.empty_get("get_investment_profile").await?;
        ok_body(response).await
    }

    pub async fn fund_investment(
        &self,
        details: &requests::FundInvestment,
    ) -> Result<responses::InvestmentProfile, ClientError> {
        let response = self.post("fund_investment", details).await?;
        ok_body(response).await
    }

    pub async fn buy_investment(
        &self,
        details: &requests::BuyInvestment,
    ) -> Result<responses::InvestmentHolding, ClientError> {
        let response = self.post("buy_investment", details).await?;
        ok_body(response).await
    }

    pub async fn list_investment_holdings(
        &self,
    ) -> Result<Vec<responses::InvestmentHolding>, ClientError> {
        let response = self.empty_get("list_investment_holdings").await?;
        ok_body(response).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// An unhandled API error to display, containing response text.
    #[error("{1}")]
    APIError(StatusCode, String),
    #[error("Network error. Please check your connection.")]
    Network(#[from] reqwest::Error),
}

/// Deserialize a successful request into the desired type, or return an
/// appropriate error.
pub async fn ok_body<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(ClientError::APIError(
            response.status(),
            response.text().await?,
        ));
    }
    Ok(response.json::<T>().await?)
}

/// Check that an empty response is OK, returning a ClientError if not.
pub async fn ok_empty(response: reqwest::Response) -> Result<(), ClientError> {
    if !response.status().is_success() {
        return Err(ClientError::APIError(
            response.status(),
            response.text().await?,
        ));
    }
    Ok(())
}
