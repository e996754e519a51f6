mod core;
mod endpoints;

pub use self::core::AzureDevOpsClient;
