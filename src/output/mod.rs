mod exports;
mod progress;
mod styling;
mod summary;
mod tables;

pub use exports::export_json;
pub use progress::FetchProgress;
pub use styling::{brand, muted, notice};
pub use summary::{
    render_builds, render_dashboard, render_projects, render_pull_requests, render_release_stages,
    render_releases,
};

/// Prints the azdash banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        brand("📋 azdash"),
        muted(env!("CARGO_PKG_VERSION")),
        muted("Azure DevOps Dashboard")
    );
}
