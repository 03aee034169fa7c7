//! Explicit configuration for the BigQuery warehouse.
//!
//! Built once at process start and passed in; no component reads the
//! environment on its own. The token is wrapped in [`SecretString`] so
//! debug and log output never carry it.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default project hosting the public `crypto_bitcoin` dataset.
pub const DEFAULT_DATA_PROJECT: &str = "bigquery-public-data";

/// Default dataset name.
pub const DEFAULT_DATASET: &str = "crypto_bitcoin";

/// Default REST endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://bigquery.googleapis.com";

/// Default rows per result page.
pub const DEFAULT_PAGE_SIZE: u32 = 5_000;

/// Configuration for [`crate::BigQueryWarehouse`].
#[derive(Debug, Clone)]
pub struct BigQueryConfig {
    /// Project billed for query jobs. Required.
    pub billing_project: String,
    /// Project hosting the dataset.
    pub data_project: String,
    /// Dataset containing the `transactions` and `inputs` tables.
    pub dataset: String,
    /// OAuth bearer token for the REST API. Required; redacted in Debug.
    pub access_token: SecretString,
    /// Rows fetched per result page.
    pub page_size: u32,
    /// REST endpoint; overridable for tests.
    pub endpoint: String,
}

impl BigQueryConfig {
    /// Configuration with defaults for everything but the identities.
    pub fn new(billing_project: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            billing_project: billing_project.into(),
            data_project: DEFAULT_DATA_PROJECT.to_string(),
            dataset: DEFAULT_DATASET.to_string(),
            access_token: SecretString::new(access_token.into()),
            page_size: DEFAULT_PAGE_SIZE,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Override the dataset-hosting project.
    pub fn with_data_project(mut self, project: impl Into<String>) -> Self {
        self.data_project = project.into();
        self
    }

    /// Override the dataset name.
    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = dataset.into();
        self
    }

    /// Override the page size.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Override the REST endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Check the configuration before any store or network access.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        use secrecy::ExposeSecret;

        if self.billing_project.is_empty() {
            return Err(ConfigError::MissingBillingProject);
        }
        if self.access_token.expose_secret().is_empty() {
            return Err(ConfigError::MissingAccessToken);
        }
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        Ok(())
    }

    /// Fully qualified transactions table.
    pub fn transactions_table(&self) -> String {
        format!("{}.{}.transactions", self.data_project, self.dataset)
    }

    /// Fully qualified spending-inputs table.
    pub fn inputs_table(&self) -> String {
        format!("{}.{}.inputs", self.data_project, self.dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_public_dataset() {
        let config = BigQueryConfig::new("my-billing", "token");
        assert_eq!(
            config.transactions_table(),
            "bigquery-public-data.crypto_bitcoin.transactions"
        );
        assert_eq!(
            config.inputs_table(),
            "bigquery-public-data.crypto_bitcoin.inputs"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_billing_project_rejected() {
        let config = BigQueryConfig::new("", "token");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingBillingProject)
        ));
    }

    #[test]
    fn missing_token_rejected() {
        let config = BigQueryConfig::new("my-billing", "");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingAccessToken)
        ));
    }

    #[test]
    fn zero_page_size_rejected() {
        let config = BigQueryConfig::new("my-billing", "token").with_page_size(0);
        assert!(matches!(config.validate(), Err(ConfigError::ZeroPageSize)));
    }

    #[test]
    fn token_redacted_in_debug_output() {
        let config = BigQueryConfig::new("my-billing", "very-secret-token");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("very-secret-token"));
    }
}
