//! Service wiring shared by `main.rs` and the black-box tests.

use std::sync::Arc;

use medstock_auth::Hs256Tokens;
use medstock_catalog::DescriptionSource;
use medstock_infra::{
    AccountService, CatalogService, IdentityAdapter, MovementEngine, StockStore,
};

/// Everything a handler needs, behind one `Extension`.
pub struct AppServices {
    pub accounts: AccountService,
    pub catalog: CatalogService,
    pub engine: MovementEngine,
    pub tokens: Arc<Hs256Tokens>,
    pub identity: IdentityAdapter,
}

impl AppServices {
    pub fn new(
        store: Arc<dyn StockStore>,
        descriptions: Arc<dyn DescriptionSource>,
        tokens: Arc<Hs256Tokens>,
    ) -> Self {
        Self {
            accounts: AccountService::new(Arc::clone(&store), Arc::clone(&tokens)),
            catalog: CatalogService::new(Arc::clone(&store), descriptions),
            engine: MovementEngine::new(Arc::clone(&store)),
            tokens,
            identity: IdentityAdapter::new(store),
        }
    }
}
