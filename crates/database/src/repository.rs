use crate::error::DbError;
use crate::store::{ConfigDefaults, StateStore};
use async_trait::async_trait;
use core_types::{CASH_SYMBOL, IndexedSymbol, NewIndexedSymbol, RebalanceConfig};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, Postgres};
use sqlx::Transaction;
use uuid::Uuid;

const SYMBOL_COLUMNS: &str = "id, symbol, locked, desired_percentage, current_percentage, current_price, amount, last_order_id, created_at, updated_at";
const CONFIG_COLUMNS: &str = "id, active, rebalance_threshold, order_timeout_secs, rebalance_frequency_secs, starting_balance, floating_percentage, created_at";

/// The `DbRepository` provides a high-level, application-specific interface
/// to the database. It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_symbol(
        tx: &mut Transaction<'_, Postgres>,
        new_symbol: &NewIndexedSymbol,
    ) -> Result<IndexedSymbol, DbError> {
        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM indexed_symbols WHERE symbol = $1")
            .bind(&new_symbol.symbol)
            .fetch_optional(&mut **tx)
            .await?;
        if exists.is_some() {
            return Err(DbError::Duplicate(new_symbol.symbol.clone()));
        }

        let query = format!(
            r#"
            INSERT INTO indexed_symbols (id, symbol, locked, desired_percentage, current_percentage, current_price, amount, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 0, $5, 0, NOW(), NOW())
            RETURNING {SYMBOL_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, IndexedSymbol>(&query)
            .bind(Uuid::new_v4())
            .bind(&new_symbol.symbol)
            .bind(new_symbol.locked)
            .bind(new_symbol.desired_percentage)
            .bind(new_symbol.current_price)
            .fetch_one(&mut **tx)
            .await?;
        Ok(created)
    }

    async fn write_symbol(
        tx: &mut Transaction<'_, Postgres>,
        symbol: &IndexedSymbol,
    ) -> Result<IndexedSymbol, DbError> {
        let query = format!(
            r#"
            UPDATE indexed_symbols
            SET locked = $2, desired_percentage = $3, current_percentage = $4,
                current_price = $5, amount = $6, last_order_id = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {SYMBOL_COLUMNS}
            "#
        );
        sqlx::query_as::<_, IndexedSymbol>(&query)
            .bind(symbol.id)
            .bind(symbol.locked)
            .bind(symbol.desired_percentage)
            .bind(symbol.current_percentage)
            .bind(symbol.current_price)
            .bind(symbol.amount)
            .bind(symbol.last_order_id.as_deref())
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(DbError::NotFound)
    }
}

#[async_trait]
impl StateStore for DbRepository {
    async fn ensure_configuration(&self, defaults: &ConfigDefaults) -> Result<bool, DbError> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM rebalance_configs LIMIT 1")
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO rebalance_configs (id, active, rebalance_threshold, order_timeout_secs, rebalance_frequency_secs, starting_balance, floating_percentage, created_at)
            VALUES ($1, FALSE, $2, $3, $4, $5, 0, NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(defaults.rebalance_threshold)
        .bind(defaults.order_timeout_secs)
        .bind(defaults.rebalance_frequency_secs)
        .bind(defaults.starting_balance)
        .execute(&mut *tx)
        .await?;

        // The cash symbol may survive a wiped configuration table.
        let cash: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM indexed_symbols WHERE symbol = $1")
            .bind(CASH_SYMBOL)
            .fetch_optional(&mut *tx)
            .await?;
        if cash.is_none() {
            let cash_symbol = NewIndexedSymbol {
                symbol: CASH_SYMBOL.to_string(),
                locked: false,
                desired_percentage: Decimal::ONE_HUNDRED,
                current_price: Decimal::ZERO,
            };
            Self::insert_symbol(&mut tx, &cash_symbol).await?;
        }

        tx.commit().await?;
        tracing::info!("Created the configuration record and the {} cash symbol.", CASH_SYMBOL);
        Ok(true)
    }

    async fn get_configuration(&self) -> Result<RebalanceConfig, DbError> {
        let query = format!(
            "SELECT {CONFIG_COLUMNS} FROM rebalance_configs ORDER BY created_at DESC LIMIT 1"
        );
        sqlx::query_as::<_, RebalanceConfig>(&query)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::NotFound)
    }

    async fn update_configuration(&self, config: &RebalanceConfig) -> Result<RebalanceConfig, DbError> {
        let query = format!(
            r#"
            UPDATE rebalance_configs
            SET active = $1, rebalance_threshold = $2, order_timeout_secs = $3,
                rebalance_frequency_secs = $4, starting_balance = $5, floating_percentage = $6
            WHERE id = (SELECT id FROM rebalance_configs ORDER BY created_at DESC LIMIT 1)
            RETURNING {CONFIG_COLUMNS}
            "#
        );
        sqlx::query_as::<_, RebalanceConfig>(&query)
            .bind(config.active)
            .bind(config.rebalance_threshold)
            .bind(config.order_timeout_secs)
            .bind(config.rebalance_frequency_secs)
            .bind(config.starting_balance)
            .bind(config.floating_percentage)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::NotFound)
    }

    async fn get_all_indexed_symbols(&self) -> Result<Vec<IndexedSymbol>, DbError> {
        let query = format!("SELECT {SYMBOL_COLUMNS} FROM indexed_symbols ORDER BY created_at ASC");
        let symbols = sqlx::query_as::<_, IndexedSymbol>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(symbols)
    }

    async fn get_indexed_symbol_by_id(&self, id: Uuid) -> Result<IndexedSymbol, DbError> {
        let query = format!("SELECT {SYMBOL_COLUMNS} FROM indexed_symbols WHERE id = $1");
        sqlx::query_as::<_, IndexedSymbol>(&query)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| if let sqlx::Error::RowNotFound = e { DbError::NotFound } else { e.into() })
    }

    async fn get_indexed_symbol_by_symbol(&self, symbol: &str) -> Result<Option<IndexedSymbol>, DbError> {
        let query = format!("SELECT {SYMBOL_COLUMNS} FROM indexed_symbols WHERE symbol = $1");
        let found = sqlx::query_as::<_, IndexedSymbol>(&query)
            .bind(symbol)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found)
    }

    async fn create_indexed_symbol(&self, new_symbol: &NewIndexedSymbol) -> Result<IndexedSymbol, DbError> {
        let mut tx = self.pool.begin().await?;
        let created = Self::insert_symbol(&mut tx, new_symbol).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn update_indexed_symbol(&self, symbol: &IndexedSymbol) -> Result<IndexedSymbol, DbError> {
        let mut tx = self.pool.begin().await?;
        let updated = Self::write_symbol(&mut tx, symbol).await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Runs the redistribution updates and the insert within a single transaction for atomicity.
    async fn insert_with_adjustments(
        &self,
        adjusted: &[IndexedSymbol],
        new_symbol: &NewIndexedSymbol,
    ) -> Result<IndexedSymbol, DbError> {
        let mut tx: Transaction<Postgres> = self.pool.begin().await?;

        for symbol in adjusted {
            Self::write_symbol(&mut tx, symbol).await?;
        }
        let created = Self::insert_symbol(&mut tx, new_symbol).await?;

        tx.commit().await?;
        Ok(created)
    }
}
