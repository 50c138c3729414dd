//! SQLite Listing Store
//!
//! Durable storage for listings and PSBT schedules with connection
//! pooling via r2d2. The single-active-listing-per-UTXO invariant is a
//! partial unique index over the non-terminal statuses, which closes the
//! race between concurrent admissions of the same UTXO: whichever insert
//! commits second hits the index.

use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, params_from_iter, ErrorCode, OptionalExtension};
use std::path::Path;
use std::time::Duration;

use super::{AddressRole, ListingStore, StorageError, StorageResult};
use crate::types::{Listing, ListingStatus, NewListing, PsbtStep, SpendFields, SubmitStep};

/// SQLite-backed listing store
pub struct SqliteListingStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteListingStore {
    /// Open (or create) the database at the given path and run migrations
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StorageError> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let manager = SqliteConnectionManager::file(db_path).with_init(init_connection);
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations()?;

        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self, StorageError> {
        let manager = SqliteConnectionManager::memory().with_init(init_connection);
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations()?;

        Ok(store)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StorageError> {
        self.pool
            .get()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    fn run_migrations(&self) -> Result<(), StorageError> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS listings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                asset_name TEXT NOT NULL,
                asset_qty TEXT NOT NULL,
                utxo_txid TEXT NOT NULL,
                utxo_vout INTEGER NOT NULL,
                start_block INTEGER NOT NULL,
                end_block INTEGER NOT NULL,
                blocks_after_end INTEGER NOT NULL DEFAULT 144,
                start_price_sats INTEGER NOT NULL,
                end_price_sats INTEGER NOT NULL,
                price_decrement INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'upcoming',
                spent_txid TEXT,
                spent_block INTEGER,
                spent_at INTEGER,
                recipient TEXT,
                seller TEXT,
                created_at INTEGER NOT NULL
            );

            -- Invariant: at most one non-terminal listing per UTXO.
            -- Terminal rows fall out of the index, so a UTXO can be
            -- relisted after its previous listing expired or was spent.
            CREATE UNIQUE INDEX IF NOT EXISTS idx_listings_live_utxo
                ON listings(utxo_txid, utxo_vout)
                WHERE status IN ('upcoming', 'active', 'finished');

            CREATE INDEX IF NOT EXISTS idx_listings_status ON listings(status);
            CREATE INDEX IF NOT EXISTS idx_listings_seller ON listings(seller);
            CREATE INDEX IF NOT EXISTS idx_listings_recipient ON listings(recipient);

            CREATE TABLE IF NOT EXISTS psbt_steps (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                listing_id INTEGER NOT NULL REFERENCES listings(id) ON DELETE CASCADE,
                block_number INTEGER NOT NULL,
                price_sats INTEGER NOT NULL,
                psbt_data TEXT NOT NULL,
                UNIQUE(listing_id, block_number)
            );
            "#,
        )
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }

    fn row_to_listing(row: &rusqlite::Row) -> rusqlite::Result<Listing> {
        let status_str: String = row.get("status")?;
        let status = status_str.parse().unwrap_or(ListingStatus::Upcoming);

        let qty_str: String = row.get("asset_qty")?;
        let asset_qty = qty_str.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e.into())
        })?;

        Ok(Listing {
            id: row.get("id")?,
            asset_name: row.get("asset_name")?,
            asset_qty,
            utxo_txid: row.get("utxo_txid")?,
            utxo_vout: row.get::<_, i64>("utxo_vout")? as u32,
            start_block: row.get::<_, i64>("start_block")? as u64,
            end_block: row.get::<_, i64>("end_block")? as u64,
            blocks_after_end: row.get::<_, i64>("blocks_after_end")? as u64,
            start_price_sats: row.get::<_, i64>("start_price_sats")? as u64,
            end_price_sats: row.get::<_, i64>("end_price_sats")? as u64,
            price_decrement: row.get::<_, i64>("price_decrement")? as u64,
            status,
            spent_txid: row.get("spent_txid")?,
            spent_block: row.get::<_, Option<i64>>("spent_block")?.map(|v| v as u64),
            spent_at: row.get::<_, Option<i64>>("spent_at")?.map(|v| v as u64),
            recipient: row.get("recipient")?,
            seller: row.get("seller")?,
            created_at: row.get::<_, i64>("created_at")? as u64,
        })
    }

    fn row_to_step(row: &rusqlite::Row) -> rusqlite::Result<PsbtStep> {
        Ok(PsbtStep {
            listing_id: row.get("listing_id")?,
            block_number: row.get::<_, i64>("block_number")? as u64,
            price_sats: row.get::<_, i64>("price_sats")? as u64,
            psbt_data: row.get("psbt_data")?,
        })
    }

    // Synchronous helpers behind the trait implementation

    fn insert_sync(&self, listing: &NewListing, steps: &[SubmitStep]) -> StorageResult<i64> {
        let outpoint = format!("{}:{}", listing.utxo_txid, listing.utxo_vout);
        let mut conn = self.conn()?;

        let tx = conn
            .transaction()
            .map_err(|e| map_write_err(e, &outpoint))?;

        tx.execute(
            r#"
            INSERT INTO listings (
                asset_name, asset_qty, utxo_txid, utxo_vout,
                start_block, end_block, blocks_after_end,
                start_price_sats, end_price_sats, price_decrement,
                status, seller, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7,
                ?8, ?9, ?10,
                'upcoming', ?11, ?12
            )
            "#,
            params![
                listing.asset_name,
                listing.asset_qty.to_string(),
                listing.utxo_txid,
                listing.utxo_vout as i64,
                listing.start_block as i64,
                listing.end_block as i64,
                listing.blocks_after_end as i64,
                listing.start_price_sats as i64,
                listing.end_price_sats as i64,
                listing.price_decrement as i64,
                listing.seller,
                listing.created_at as i64,
            ],
        )
        .map_err(|e| map_write_err(e, &outpoint))?;

        let id = tx.last_insert_rowid();

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO psbt_steps (listing_id, block_number, price_sats, psbt_data)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(|e| map_write_err(e, &outpoint))?;

            for step in steps {
                stmt.execute(params![
                    id,
                    step.block_number as i64,
                    step.price_sats as i64,
                    step.psbt_data,
                ])
                .map_err(|e| map_write_err(e, &outpoint))?;
            }
        }

        tx.commit().map_err(|e| map_write_err(e, &outpoint))?;

        Ok(id)
    }

    fn get_sync(&self, id: i64) -> StorageResult<Option<Listing>> {
        let conn = self.conn()?;

        conn.query_row("SELECT * FROM listings WHERE id = ?1", params![id], |row| {
            Self::row_to_listing(row)
        })
        .optional()
        .map_err(|e| StorageError::Database(e.to_string()))
    }

    fn step_for_sync(&self, listing_id: i64, block: u64) -> StorageResult<Option<PsbtStep>> {
        let conn = self.conn()?;

        conn.query_row(
            "SELECT * FROM psbt_steps WHERE listing_id = ?1 AND block_number = ?2",
            params![listing_id, block as i64],
            |row| Self::row_to_step(row),
        )
        .optional()
        .map_err(|e| StorageError::Database(e.to_string()))
    }

    fn steps_sync(&self, listing_id: i64) -> StorageResult<Vec<PsbtStep>> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare("SELECT * FROM psbt_steps WHERE listing_id = ?1 ORDER BY block_number ASC")
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let steps = stmt
            .query_map(params![listing_id], |row| Self::row_to_step(row))
            .map_err(|e| StorageError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(steps)
    }

    fn step_prices_sync(&self, listing_id: i64) -> StorageResult<Vec<u64>> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT price_sats FROM psbt_steps WHERE listing_id = ?1
                 ORDER BY price_sats DESC",
            )
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let prices = stmt
            .query_map(params![listing_id], |row| {
                Ok(row.get::<_, i64>(0)? as u64)
            })
            .map_err(|e| StorageError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(prices)
    }

    fn select_listings(
        &self,
        where_clause: &str,
        params: Vec<String>,
    ) -> StorageResult<Vec<Listing>> {
        let conn = self.conn()?;

        let sql = format!("SELECT * FROM listings {where_clause} ORDER BY created_at DESC, id DESC");
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let listings = stmt
            .query_map(params_from_iter(params), |row| Self::row_to_listing(row))
            .map_err(|e| StorageError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(listings)
    }

    fn advance_status_sync(
        &self,
        id: i64,
        from: ListingStatus,
        to: ListingStatus,
    ) -> StorageResult<bool> {
        let conn = self.conn()?;

        let rows = conn
            .execute(
                "UPDATE listings SET status = ?1 WHERE id = ?2 AND status = ?3",
                params![to.to_string(), id, from.to_string()],
            )
            .map_err(|e| map_write_err(e, &id.to_string()))?;

        Ok(rows > 0)
    }

    fn record_spend_sync(
        &self,
        id: i64,
        to: ListingStatus,
        spend: &SpendFields,
    ) -> StorageResult<bool> {
        let conn = self.conn()?;

        let rows = conn
            .execute(
                r#"
                UPDATE listings SET
                    status = ?1,
                    spent_txid = ?2,
                    spent_block = ?3,
                    spent_at = ?4,
                    recipient = ?5
                WHERE id = ?6 AND status IN ('upcoming', 'active', 'finished')
                "#,
                params![
                    to.to_string(),
                    spend.spent_txid,
                    spend.spent_block as i64,
                    spend.spent_at as i64,
                    spend.recipient,
                    id,
                ],
            )
            .map_err(|e| map_write_err(e, &id.to_string()))?;

        if rows > 0 {
            return Ok(true);
        }

        // Nothing matched: either the id is unknown or the listing is
        // already terminal, which duplicate events are expected to hit.
        let exists = conn
            .query_row(
                "SELECT 1 FROM listings WHERE id = ?1",
                params![id],
                |_| Ok(()),
            )
            .optional()
            .map_err(|e| StorageError::Database(e.to_string()))?
            .is_some();

        if exists {
            Ok(false)
        } else {
            Err(StorageError::NotFound(id.to_string()))
        }
    }
}

fn init_connection(conn: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.pragma_update(None, "foreign_keys", "ON")
}

fn map_write_err(e: rusqlite::Error, context: &str) -> StorageError {
    if let rusqlite::Error::SqliteFailure(ref err, _) = e {
        // UNIQUE constraint on the live-UTXO partial index
        if err.extended_code == 1555 || err.extended_code == 2067 {
            return StorageError::UtxoBusy(context.to_string());
        }
        if matches!(err.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) {
            return StorageError::Busy(e.to_string());
        }
    }
    StorageError::Database(e.to_string())
}

#[async_trait]
impl ListingStore for SqliteListingStore {
    async fn insert_listing(
        &self,
        listing: &NewListing,
        steps: &[SubmitStep],
    ) -> StorageResult<i64> {
        self.insert_sync(listing, steps)
    }

    async fn get(&self, id: i64) -> StorageResult<Option<Listing>> {
        self.get_sync(id)
    }

    async fn step_for(&self, listing_id: i64, block: u64) -> StorageResult<Option<PsbtStep>> {
        self.step_for_sync(listing_id, block)
    }

    async fn steps(&self, listing_id: i64) -> StorageResult<Vec<PsbtStep>> {
        self.steps_sync(listing_id)
    }

    async fn step_prices(&self, listing_id: i64) -> StorageResult<Vec<u64>> {
        self.step_prices_sync(listing_id)
    }

    async fn list(&self, statuses: &[ListingStatus]) -> StorageResult<Vec<Listing>> {
        if statuses.is_empty() {
            return self.select_listings("", Vec::new());
        }
        let placeholders = vec!["?"; statuses.len()].join(", ");
        self.select_listings(
            &format!("WHERE status IN ({placeholders})"),
            statuses.iter().map(|s| s.to_string()).collect(),
        )
    }

    async fn list_by_address(
        &self,
        address: &str,
        role: AddressRole,
        statuses: &[ListingStatus],
    ) -> StorageResult<Vec<Listing>> {
        let column = match role {
            AddressRole::Seller => "seller",
            AddressRole::Buyer => "recipient",
        };

        let mut params = vec![address.to_string()];
        let mut clause = format!("WHERE {column} = ?");
        if !statuses.is_empty() {
            let placeholders = vec!["?"; statuses.len()].join(", ");
            clause.push_str(&format!(" AND status IN ({placeholders})"));
            params.extend(statuses.iter().map(|s| s.to_string()));
        }

        self.select_listings(&clause, params)
    }

    async fn non_terminal(&self) -> StorageResult<Vec<Listing>> {
        self.select_listings(
            "WHERE status IN ('upcoming', 'active', 'finished')",
            Vec::new(),
        )
    }

    async fn watching_utxo(&self, txid: &str, vout: u32) -> StorageResult<Vec<Listing>> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(
                "SELECT * FROM listings
                 WHERE utxo_txid = ?1 AND utxo_vout = ?2
                 AND status IN ('upcoming', 'active', 'finished')",
            )
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let listings = stmt
            .query_map(params![txid, vout as i64], |row| Self::row_to_listing(row))
            .map_err(|e| StorageError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(listings)
    }

    async fn advance_status(
        &self,
        id: i64,
        from: ListingStatus,
        to: ListingStatus,
    ) -> StorageResult<bool> {
        self.advance_status_sync(id, from, to)
    }

    async fn record_spend(
        &self,
        id: i64,
        to: ListingStatus,
        spend: &SpendFields,
    ) -> StorageResult<bool> {
        self.record_spend_sync(id, to, spend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AssetQty;

    fn test_listing(txid: &str, start: u64, end: u64) -> NewListing {
        NewListing {
            asset_name: "RAREPEPE".to_string(),
            asset_qty: AssetQty::from_units(1),
            utxo_txid: txid.to_string(),
            utxo_vout: 0,
            start_block: start,
            end_block: end,
            blocks_after_end: 144,
            start_price_sats: 100_000,
            end_price_sats: 60_000,
            price_decrement: 10_000,
            seller: Some("bc1qseller".to_string()),
            created_at: 1_700_000_000,
        }
    }

    fn test_steps(start: u64, prices: &[u64]) -> Vec<SubmitStep> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &price)| SubmitStep {
                block_number: start + i as u64,
                price_sats: price,
                psbt_data: format!("cHNidP8-step-{i}"),
            })
            .collect()
    }

    fn spend(txid: &str) -> SpendFields {
        SpendFields {
            spent_txid: txid.to_string(),
            spent_block: 850_002,
            spent_at: 1_700_000_500,
            recipient: Some("bc1qbuyer".to_string()),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = SqliteListingStore::in_memory().unwrap();
        let id = store
            .insert_listing(
                &test_listing("aa", 850_000, 850_004),
                &test_steps(850_000, &[100_000, 90_000, 80_000, 70_000, 60_000]),
            )
            .await
            .unwrap();

        let listing = store.get(id).await.unwrap().unwrap();
        assert_eq!(listing.status, ListingStatus::Upcoming);
        assert_eq!(listing.asset_qty, AssetQty::from_units(1));
        assert_eq!(listing.seller.as_deref(), Some("bc1qseller"));
        assert!(listing.spent_txid.is_none());
    }

    #[tokio::test]
    async fn test_steps_round_trip() {
        let store = SqliteListingStore::in_memory().unwrap();
        let submitted = test_steps(850_000, &[100_000, 90_000, 80_000, 70_000, 60_000]);
        let id = store
            .insert_listing(&test_listing("aa", 850_000, 850_004), &submitted)
            .await
            .unwrap();

        let stored = store.steps(id).await.unwrap();
        assert_eq!(stored.len(), submitted.len());
        for (got, want) in stored.iter().zip(submitted.iter()) {
            assert_eq!(got.block_number, want.block_number);
            assert_eq!(got.price_sats, want.price_sats);
            assert_eq!(got.psbt_data, want.psbt_data);
        }

        let step = store.step_for(id, 850_002).await.unwrap().unwrap();
        assert_eq!(step.price_sats, 80_000);
        assert!(store.step_for(id, 850_005).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_live_utxo_conflict() {
        let store = SqliteListingStore::in_memory().unwrap();
        store
            .insert_listing(
                &test_listing("aa", 850_000, 850_004),
                &test_steps(850_000, &[100_000, 90_000, 80_000, 70_000, 60_000]),
            )
            .await
            .unwrap();

        let second = store
            .insert_listing(
                &test_listing("aa", 860_000, 860_004),
                &test_steps(860_000, &[100_000, 90_000, 80_000, 70_000, 60_000]),
            )
            .await;
        assert!(matches!(second, Err(StorageError::UtxoBusy(_))));
    }

    #[tokio::test]
    async fn test_relisting_after_terminal() {
        let store = SqliteListingStore::in_memory().unwrap();
        let id = store
            .insert_listing(
                &test_listing("aa", 850_000, 850_004),
                &test_steps(850_000, &[100_000, 90_000, 80_000, 70_000, 60_000]),
            )
            .await
            .unwrap();

        store
            .advance_status(id, ListingStatus::Upcoming, ListingStatus::Active)
            .await
            .unwrap();
        store
            .record_spend(id, ListingStatus::Sold, &spend("ff"))
            .await
            .unwrap();

        // Terminal listing frees the UTXO for a new one
        let second = store
            .insert_listing(
                &test_listing("aa", 860_000, 860_004),
                &test_steps(860_000, &[100_000, 90_000, 80_000, 70_000, 60_000]),
            )
            .await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_advance_status_requires_expected_from() {
        let store = SqliteListingStore::in_memory().unwrap();
        let id = store
            .insert_listing(
                &test_listing("aa", 850_000, 850_004),
                &test_steps(850_000, &[100_000, 90_000, 80_000, 70_000, 60_000]),
            )
            .await
            .unwrap();

        // Stale transition: listing is upcoming, not active
        let moved = store
            .advance_status(id, ListingStatus::Active, ListingStatus::Finished)
            .await
            .unwrap();
        assert!(!moved);

        let moved = store
            .advance_status(id, ListingStatus::Upcoming, ListingStatus::Active)
            .await
            .unwrap();
        assert!(moved);
        assert_eq!(
            store.get(id).await.unwrap().unwrap().status,
            ListingStatus::Active
        );
    }

    #[tokio::test]
    async fn test_terminal_status_is_sticky() {
        let store = SqliteListingStore::in_memory().unwrap();
        let id = store
            .insert_listing(
                &test_listing("aa", 850_000, 850_004),
                &test_steps(850_000, &[100_000, 90_000, 80_000, 70_000, 60_000]),
            )
            .await
            .unwrap();

        assert!(store
            .record_spend(id, ListingStatus::Sold, &spend("ff"))
            .await
            .unwrap());

        // Duplicate event: no effect, no error
        assert!(!store
            .record_spend(id, ListingStatus::Sold, &spend("ff"))
            .await
            .unwrap());

        // A conflicting classification cannot overwrite the terminal state
        assert!(!store
            .record_spend(id, ListingStatus::Closed, &spend("ee"))
            .await
            .unwrap());
        assert!(!store
            .advance_status(id, ListingStatus::Sold, ListingStatus::Active)
            .await
            .unwrap());

        let listing = store.get(id).await.unwrap().unwrap();
        assert_eq!(listing.status, ListingStatus::Sold);
        assert_eq!(listing.spent_txid.as_deref(), Some("ff"));
    }

    #[tokio::test]
    async fn test_record_spend_unknown_id() {
        let store = SqliteListingStore::in_memory().unwrap();
        let result = store
            .record_spend(999, ListingStatus::Sold, &spend("ff"))
            .await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_watching_and_filters() {
        let store = SqliteListingStore::in_memory().unwrap();
        let id_a = store
            .insert_listing(
                &test_listing("aa", 850_000, 850_004),
                &test_steps(850_000, &[100_000, 90_000, 80_000, 70_000, 60_000]),
            )
            .await
            .unwrap();
        let id_b = store
            .insert_listing(
                &test_listing("bb", 850_000, 850_004),
                &test_steps(850_000, &[100_000, 90_000, 80_000, 70_000, 60_000]),
            )
            .await
            .unwrap();

        let watching = store.watching_utxo("aa", 0).await.unwrap();
        assert_eq!(watching.len(), 1);
        assert_eq!(watching[0].id, id_a);
        assert!(store.watching_utxo("aa", 1).await.unwrap().is_empty());

        store
            .record_spend(id_b, ListingStatus::Closed, &spend("ff"))
            .await
            .unwrap();

        // Terminal listings drop out of the watch set and the sweep set
        assert!(store.watching_utxo("bb", 0).await.unwrap().is_empty());
        let non_terminal = store.non_terminal().await.unwrap();
        assert_eq!(non_terminal.len(), 1);
        assert_eq!(non_terminal[0].id, id_a);

        let closed = store.list(&[ListingStatus::Closed]).await.unwrap();
        assert_eq!(closed.len(), 1);
        let either = store
            .list(&[ListingStatus::Upcoming, ListingStatus::Closed])
            .await
            .unwrap();
        assert_eq!(either.len(), 2);

        let by_seller = store
            .list_by_address("bc1qseller", AddressRole::Seller, &[])
            .await
            .unwrap();
        assert_eq!(by_seller.len(), 2);
        let by_buyer = store
            .list_by_address("bc1qbuyer", AddressRole::Buyer, &[])
            .await
            .unwrap();
        assert_eq!(by_buyer.len(), 1);
        assert_eq!(by_buyer[0].id, id_b);
    }
}
