use std::sync::Arc;

use eyre::Result;

use lumina_chat::ConversationController;
use lumina_gemini::client::GeminiClient;
use lumina_storage::credential::CredentialStore;
use lumina_storage::kv::{FileStore, KeyValueStore};
use lumina_storage::profile::ProfileStore;
use lumina_storage::sessions::SessionCounterStore;

mod repl;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let kv: Arc<dyn KeyValueStore> = Arc::new(FileStore::open_default()?);
    let credentials = CredentialStore::from_env(Arc::clone(&kv));
    let provider = Arc::new(GeminiClient::new(credentials.clone()));

    let controller = ConversationController::new(
        provider,
        ProfileStore::new(Arc::clone(&kv)),
        SessionCounterStore::new(Arc::clone(&kv)),
        credentials,
    );

    repl::run(controller).await
}
