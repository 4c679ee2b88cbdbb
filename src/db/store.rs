use sqlx::SqlitePool;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::db::models::{Embed, EmbedDraft};
use crate::db::pool::{create_pool, run_migrations};
use crate::db::queries::embeds;
use crate::error::StoreError;

/// Durable embed storage with upsert-by-url semantics.
///
/// The database is opened lazily: the first operation (or an explicit
/// [`EmbedStore::init`]) creates the pool and applies migrations, and every
/// caller racing on that first open awaits the same initialization.
pub struct EmbedStore {
    database_url: String,
    pool: OnceCell<SqlitePool>,
}

impl EmbedStore {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            pool: OnceCell::new(),
        }
    }

    /// Open the database and create its schema if needed. Idempotent.
    /// A failed attempt leaves the store uninitialized so a later call retries.
    pub async fn init(&self) -> Result<(), StoreError> {
        self.pool().await.map(|_| ())
    }

    async fn pool(&self) -> Result<&SqlitePool, StoreError> {
        self.pool
            .get_or_try_init(|| async {
                let pool = create_pool(&self.database_url)
                    .await
                    .map_err(StoreError::Init)?;
                run_migrations(&pool).await.map_err(StoreError::Init)?;
                Ok(pool)
            })
            .await
    }

    /// Insert or update an embed and return its id.
    ///
    /// - With an explicit `id` the record is written as-is under that id.
    /// - Otherwise an existing record with the same url is updated in place,
    ///   keeping its original `id` and `url`. Metadata the draft does not
    ///   supply is kept unless the draft comes from a successful capture.
    /// - Otherwise a new record is inserted and gets a fresh id.
    ///
    /// The url path is one upsert statement with no surrounding transaction.
    pub async fn save(&self, draft: &EmbedDraft) -> Result<i64, StoreError> {
        if draft.url.is_empty() {
            return Err(StoreError::MissingUrl);
        }
        let pool = self.pool().await?;

        if let Some(id) = draft.id {
            let embed = Embed {
                id,
                url: draft.url.clone(),
                title: draft.title.clone(),
                description: draft.description.clone(),
                image_url: draft.image_url.clone(),
                date: draft.date.clone(),
            };
            embeds::put_embed(pool, &embed)
                .await
                .map_err(StoreError::query("update embed by id"))?;
            info!(id, url = %draft.url, "embed updated by id");
            return Ok(id);
        }

        let id = embeds::upsert_embed_by_url(pool, draft, draft.metadata_captured)
            .await
            .map_err(StoreError::query("save embed by url"))?;
        info!(id, url = %draft.url, "embed saved");
        Ok(id)
    }

    pub async fn get_all(&self) -> Result<Vec<Embed>, StoreError> {
        let pool = self.pool().await?;
        let rows = embeds::list_embeds(pool)
            .await
            .map_err(StoreError::query("list embeds"))?;
        debug!(count = rows.len(), "embeds loaded");
        Ok(rows)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Embed>, StoreError> {
        let pool = self.pool().await?;
        embeds::get_embed(pool, id)
            .await
            .map_err(StoreError::query("get embed by id"))
    }

    /// Exact url match. The stored url is never normalized.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Embed>, StoreError> {
        let pool = self.pool().await?;
        embeds::get_embed_by_url(pool, url)
            .await
            .map_err(StoreError::query("get embed by url"))
    }

    /// Remove one embed. Deleting an unknown id is not an error.
    pub async fn delete_by_id(&self, id: i64) -> Result<(), StoreError> {
        let pool = self.pool().await?;
        let removed = embeds::delete_embed(pool, id)
            .await
            .map_err(StoreError::query("delete embed"))?;
        info!(id, removed, "embed delete");
        Ok(())
    }

    pub async fn clear_all(&self) -> Result<(), StoreError> {
        let pool = self.pool().await?;
        let removed = embeds::clear_embeds(pool)
            .await
            .map_err(StoreError::query("clear embeds"))?;
        info!(removed, "all embeds cleared");
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let pool = self.pool().await?;
        embeds::count_embeds(pool)
            .await
            .map_err(StoreError::query("count embeds"))
    }
}
