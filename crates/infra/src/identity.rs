//! Identity resolution for the request path.
//!
//! Tokens carry only the subject email; the adapter turns that into the
//! full operator record before a handler runs. An email that no longer
//! resolves (deleted account with a still-valid token) is treated as
//! unauthenticated, not as a missing resource.

use std::sync::Arc;

use medstock_auth::Operator;
use medstock_core::{DomainError, DomainResult};

use crate::store::StockStore;

#[derive(Clone)]
pub struct IdentityAdapter {
    store: Arc<dyn StockStore>,
}

impl IdentityAdapter {
    pub fn new(store: Arc<dyn StockStore>) -> Self {
        Self { store }
    }

    pub async fn current(&self, email: &str) -> DomainResult<Operator> {
        self.store
            .find_operator_by_email(email)
            .await?
            .ok_or(DomainError::Unauthenticated)
    }
}
