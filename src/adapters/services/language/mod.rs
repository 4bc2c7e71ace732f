//! Language analysis adapters
//!
//! - Azure AI Language: document sentiment and conversation summarization

pub mod azure;

pub use azure::AzureLanguageService;
