mod client;
mod fields;
mod links;
mod mappers;
mod provider;
#[cfg(test)]
mod tests;

pub use provider::AzureDevOpsProvider;
