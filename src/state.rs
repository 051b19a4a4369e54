use std::sync::Arc;

use crate::config::ServerConfig;
use crate::external::quote_provider::QuoteProvider;
use crate::store::QuotationStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub quote_provider: Arc<dyn QuoteProvider>,
    pub store: Arc<dyn QuotationStore>,
}
