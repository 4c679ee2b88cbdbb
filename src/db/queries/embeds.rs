use sqlx::SqliteExecutor;

use crate::db::models::{Embed, EmbedDraft};

/// List every saved embed, oldest id first.
pub async fn list_embeds<'e, E>(executor: E) -> Result<Vec<Embed>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Embed>(
        "SELECT id, url, title, description, image_url, date FROM embeds ORDER BY id ASC",
    )
    .fetch_all(executor)
    .await
}

pub async fn get_embed<'e, E>(executor: E, id: i64) -> Result<Option<Embed>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Embed>(
        "SELECT id, url, title, description, image_url, date FROM embeds WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Exact-match lookup through the unique url index. No normalization.
pub async fn get_embed_by_url<'e, E>(executor: E, url: &str) -> Result<Option<Embed>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Embed>(
        "SELECT id, url, title, description, image_url, date FROM embeds WHERE url = ?",
    )
    .bind(url)
    .fetch_optional(executor)
    .await
}

/// Insert a record for `draft.url`, or update the row that already owns it,
/// in one statement. Returns the id of the written row.
///
/// With `replace_metadata` the draft's title, description and image are
/// written as given; otherwise absent values keep the stored ones.
pub async fn upsert_embed_by_url<'e, E>(
    executor: E,
    draft: &EmbedDraft,
    replace_metadata: bool,
) -> Result<i64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let sql = if replace_metadata {
        "INSERT INTO embeds (url, title, description, image_url, date) VALUES (?, ?, ?, ?, ?) \
         ON CONFLICT(url) DO UPDATE SET \
           title = excluded.title, \
           description = excluded.description, \
           image_url = excluded.image_url, \
           date = excluded.date \
         RETURNING id"
    } else {
        "INSERT INTO embeds (url, title, description, image_url, date) VALUES (?, ?, ?, ?, ?) \
         ON CONFLICT(url) DO UPDATE SET \
           title = COALESCE(excluded.title, embeds.title), \
           description = COALESCE(excluded.description, embeds.description), \
           image_url = COALESCE(excluded.image_url, embeds.image_url), \
           date = excluded.date \
         RETURNING id"
    };

    sqlx::query_scalar(sql)
        .bind(&draft.url)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.image_url)
        .bind(&draft.date)
        .fetch_one(executor)
        .await
}

/// Write a record under its own id, inserting it if the id is unused.
///
/// Conflicts are resolved on `id` only: a url already owned by another row
/// fails with a unique-constraint error instead of replacing that row.
pub async fn put_embed<'e, E>(executor: E, embed: &Embed) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO embeds (id, url, title, description, image_url, date) \
         VALUES (?, ?, ?, ?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET \
           url = excluded.url, \
           title = excluded.title, \
           description = excluded.description, \
           image_url = excluded.image_url, \
           date = excluded.date",
    )
    .bind(embed.id)
    .bind(&embed.url)
    .bind(&embed.title)
    .bind(&embed.description)
    .bind(&embed.image_url)
    .bind(&embed.date)
    .execute(executor)
    .await?;
    Ok(())
}

/// Delete one embed. Returns the number of rows removed (0 when absent).
pub async fn delete_embed<'e, E>(executor: E, id: i64) -> Result<u64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM embeds WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn clear_embeds<'e, E>(executor: E) -> Result<u64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM embeds").execute(executor).await?;
    Ok(result.rows_affected())
}

pub async fn count_embeds<'e, E>(executor: E) -> Result<i64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_scalar("SELECT COUNT(*) FROM embeds")
        .fetch_one(executor)
        .await
}
