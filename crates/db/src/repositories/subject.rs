//! Client and supplier registries.
//!
//! Their full CRUD lives elsewhere; the ledger only needs to create subjects
//! for seeding and tests and to check that a subject exists.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait};
use tally_core::ledger::LedgerError;
use tally_core::subledger::SubledgerKind;
use tally_shared::types::{ClientId, SupplierId};

use crate::entities::{clients, suppliers};
use crate::error::map_db_err;

/// Repository for clients and suppliers.
#[derive(Debug, Clone)]
pub struct SubjectRepository {
    db: DatabaseConnection,
}

impl SubjectRepository {
    /// Creates a new subject repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Registers a client.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an empty name, or a database error.
    pub async fn create_client(&self, name: &str) -> Result<ClientId, LedgerError> {
        let name = non_empty(name)?;
        let id = ClientId::new();
        clients::ActiveModel {
            id: Set(id.into_inner()),
            name: Set(name),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.db)
        .await
        .map_err(map_db_err)?;
        Ok(id)
    }

    /// Registers a supplier.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an empty name, or a database error.
    pub async fn create_supplier(&self, name: &str) -> Result<SupplierId, LedgerError> {
        let name = non_empty(name)?;
        let id = SupplierId::new();
        suppliers::ActiveModel {
            id: Set(id.into_inner()),
            name: Set(name),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.db)
        .await
        .map_err(map_db_err)?;
        Ok(id)
    }

    /// Gets a client.
    ///
    /// # Errors
    ///
    /// Returns `SubjectNotFound` if absent.
    pub async fn get_client(&self, id: ClientId) -> Result<clients::Model, LedgerError> {
        clients::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .ok_or(LedgerError::SubjectNotFound {
                kind: SubledgerKind::Client.to_string(),
                id: id.into_inner(),
            })
    }

    /// Gets a supplier.
    ///
    /// # Errors
    ///
    /// Returns `SubjectNotFound` if absent.
    pub async fn get_supplier(&self, id: SupplierId) -> Result<suppliers::Model, LedgerError> {
        suppliers::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .ok_or(LedgerError::SubjectNotFound {
                kind: SubledgerKind::Supplier.to_string(),
                id: id.into_inner(),
            })
    }
}

fn non_empty(name: &str) -> Result<String, LedgerError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::Validation("name must not be empty".to_string()));
    }
    Ok(trimmed.to_string())
}
