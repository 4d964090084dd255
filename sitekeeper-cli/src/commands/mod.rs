pub mod site;
pub mod theme;

use sitekeeper_core::Settings;
use sitekeeper_runner::CancellationToken;
use sitekeeper_store::{open_stores, SiteStore};

/// Everything a subcommand needs: the stores and a Ctrl-C cancellation token.
pub struct Context {
    pub store: SiteStore,
    pub cancel: CancellationToken,
}

impl Context {
    /// Must be called inside the tokio runtime.
    pub fn open(settings: &Settings) -> Self {
        let cancel = CancellationToken::new();
        {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("interrupted, cancelling running commands");
                    cancel.cancel();
                }
            });
        }
        Self {
            store: open_stores(settings),
            cancel,
        }
    }
}
