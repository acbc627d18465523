//! Operator accounts: signup, login, and operator CRUD.

use std::sync::Arc;

use chrono::Utc;

use medstock_auth::{
    hash_password, verify_password, Hs256Tokens, NewOperator, Operator, Role,
};
use medstock_core::{DomainError, DomainResult, FieldErrors, OperatorId};

use crate::store::{StockStore, StoreError};

const MIN_PASSWORD_LEN: usize = 8;

/// Fields an operator may change on their own record.
#[derive(Debug, Clone, Default)]
pub struct OperatorUpdate {
    pub name: Option<String>,
    pub password: Option<String>,
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn StockStore>,
    tokens: Arc<Hs256Tokens>,
}

impl AccountService {
    pub fn new(store: Arc<dyn StockStore>, tokens: Arc<Hs256Tokens>) -> Self {
        Self { store, tokens }
    }

    /// Register an operator and log them straight in.
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Option<Role>,
    ) -> DomainResult<String> {
        let mut errors = FieldErrors::new();
        if name.trim().is_empty() {
            errors.push("name", "must not be blank");
        }
        if email.trim().is_empty() {
            errors.push("email", "must not be blank");
        } else if !email.contains('@') {
            errors.push("email", "must be a valid email address");
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            errors.push(
                "password",
                format!("must be at least {MIN_PASSWORD_LEN} characters"),
            );
        }
        errors.into_result()?;

        let password_hash = hash_password(password)
            .map_err(|e| DomainError::internal(format!("password hashing failed: {e}")))?;
        let new_operator = NewOperator {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password_hash,
            role: role.unwrap_or_default(),
        };

        let operator = match self.store.insert_operator(&new_operator).await {
            Ok(operator) => operator,
            Err(StoreError::Conflict(_)) => {
                return Err(DomainError::conflict("email already exists"))
            }
            Err(other) => return Err(other.into()),
        };

        tracing::info!(operator = %operator.email, "operator signed up");
        self.tokens
            .issue(&operator.email, Utc::now())
            .map_err(|e| DomainError::internal(format!("token signing failed: {e}")))
    }

    /// Exchange credentials for a token. An unknown email is reported as
    /// not found; a known email with the wrong password is unauthenticated.
    pub async fn login(&self, email: &str, password: &str) -> DomainResult<String> {
        let operator = self
            .store
            .find_operator_by_email(email)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("operator '{email}' not found")))?;

        if !verify_password(password, &operator.password_hash) {
            tracing::warn!(operator = %email, "login rejected, bad password");
            return Err(DomainError::Unauthenticated);
        }

        self.tokens
            .issue(&operator.email, Utc::now())
            .map_err(|e| DomainError::internal(format!("token signing failed: {e}")))
    }

    pub async fn list(&self) -> DomainResult<Vec<Operator>> {
        Ok(self.store.list_operators().await?)
    }

    pub async fn get(&self, id: OperatorId) -> DomainResult<Operator> {
        self.store
            .get_operator(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("operator {id} not found")))
    }

    /// Update name and/or password; absent fields keep their value.
    pub async fn update(&self, id: OperatorId, update: &OperatorUpdate) -> DomainResult<Operator> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                errors.push("name", "must not be blank");
            }
        }
        if let Some(password) = &update.password {
            if password.chars().count() < MIN_PASSWORD_LEN {
                errors.push(
                    "password",
                    format!("must be at least {MIN_PASSWORD_LEN} characters"),
                );
            }
        }
        errors.into_result()?;

        let mut operator = self.get(id).await?;
        if let Some(name) = &update.name {
            operator.name = name.trim().to_string();
        }
        if let Some(password) = &update.password {
            operator.password_hash = hash_password(password)
                .map_err(|e| DomainError::internal(format!("password hashing failed: {e}")))?;
        }
        operator.updated_at = Utc::now();

        match self.store.update_operator(&operator).await {
            Ok(()) => Ok(operator),
            Err(StoreError::NotFound) => {
                Err(DomainError::not_found(format!("operator {id} not found")))
            }
            Err(other) => Err(other.into()),
        }
    }

    pub async fn delete(&self, id: OperatorId) -> DomainResult<()> {
        match self.store.delete_operator(id).await {
            Ok(()) => {
                tracing::info!(%id, "operator deleted");
                Ok(())
            }
            Err(StoreError::NotFound) => {
                Err(DomainError::not_found(format!("operator {id} not found")))
            }
            Err(StoreError::InUse) => Err(DomainError::in_use(format!(
                "operator {id} has recorded transactions"
            ))),
            Err(other) => Err(other.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;

    fn service() -> (AccountService, MemStore) {
        let store = MemStore::new();
        let tokens = Arc::new(Hs256Tokens::new(b"test-secret"));
        (
            AccountService::new(Arc::new(store.clone()), tokens),
            store,
        )
    }

    #[tokio::test]
    async fn signup_then_login_roundtrip() {
        let (service, store) = service();
        let token = service
            .signup("Alice", "alice@example.com", "correct horse", None)
            .await
            .unwrap();
        assert!(!token.is_empty());

        let stored = store
            .find_operator_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(stored.password_hash, "correct horse");
        assert_eq!(stored.role, Role::User);

        service
            .login("alice@example.com", "correct horse")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn signup_aggregates_all_field_violations() {
        let (service, _) = service();
        let err = service.signup("", "not-an-email", "short", None).await.unwrap_err();
        let DomainError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        let fields: Vec<&str> = errors.iter().map(|(f, _)| f).collect();
        assert_eq!(fields, vec!["email", "name", "password"]);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let (service, _) = service();
        service
            .signup("Alice", "alice@example.com", "correct horse", None)
            .await
            .unwrap();
        let err = service
            .signup("Other Alice", "alice@example.com", "battery staple", None)
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::conflict("email already exists"));
    }

    #[tokio::test]
    async fn login_distinguishes_unknown_email_from_bad_password() {
        let (service, _) = service();
        service
            .signup("Alice", "alice@example.com", "correct horse", None)
            .await
            .unwrap();

        assert!(matches!(
            service.login("nobody@example.com", "whatever!").await,
            Err(DomainError::NotFound(_))
        ));
        assert!(matches!(
            service.login("alice@example.com", "wrong password").await,
            Err(DomainError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn update_rehashes_password_and_keeps_absent_fields() {
        let (service, store) = service();
        service
            .signup("Alice", "alice@example.com", "correct horse", None)
            .await
            .unwrap();
        let operator = store
            .find_operator_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();

        let updated = service
            .update(
                operator.id,
                &OperatorUpdate {
                    name: None,
                    password: Some("battery staple".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Alice");
        assert_ne!(updated.password_hash, operator.password_hash);

        service
            .login("alice@example.com", "battery staple")
            .await
            .unwrap();
    }
}
