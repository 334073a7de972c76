//! SQLite-backed implementation of the `IdentifierCache` port.
//!
//! Lists are keyed by name, categories by (list, title) and interests by
//! (category, name). Saving an existing key replaces its remote id, so an
//! object re-created remotely overwrites the stale entry.

use std::sync::Arc;

use async_trait::async_trait;
use mailsync_core::IdentifierCache;
use mailsync_domain::{CategoryRef, InterestRef, ListRef, Result as DomainResult};
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;

use super::manager::{map_join_error, map_sql_error, DbManager};

const LIST_UPSERT_SQL: &str = "INSERT INTO lists (remote_id, name) VALUES (?1, ?2)
     ON CONFLICT(name) DO UPDATE SET remote_id = excluded.remote_id";

const CATEGORY_UPSERT_SQL: &str =
    "INSERT INTO categories (remote_id, title, list_remote_id) VALUES (?1, ?2, ?3)
     ON CONFLICT(list_remote_id, title) DO UPDATE SET remote_id = excluded.remote_id";

const INTEREST_UPSERT_SQL: &str =
    "INSERT INTO interests (remote_id, name, category_remote_id) VALUES (?1, ?2, ?3)
     ON CONFLICT(category_remote_id, name) DO UPDATE SET remote_id = excluded.remote_id";

/// SQLite-backed cache of remote list, category, and interest ids
pub struct SqliteIdentifierCache {
    db: Arc<DbManager>,
}

impl SqliteIdentifierCache {
    /// Create a cache over a migrated database
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IdentifierCache for SqliteIdentifierCache {
    async fn find_list(&self, name: &str) -> DomainResult<Option<ListRef>> {
        let db = Arc::clone(&self.db);
        let name = name.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<ListRef>> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT name, remote_id FROM lists WHERE name = ?1",
                params![&name],
                map_list_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn save_list(&self, list: &ListRef) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let list = list.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql_error)?;
            tx.execute(
                "DELETE FROM lists WHERE remote_id = ?1 AND name <> ?2",
                params![&list.remote_id, &list.name],
            )
            .map_err(map_sql_error)?;
            tx.execute(LIST_UPSERT_SQL, params![&list.remote_id, &list.name])
                .map_err(map_sql_error)?;
            tx.commit().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_category(
        &self,
        list_remote_id: &str,
        title: &str,
    ) -> DomainResult<Option<CategoryRef>> {
        let db = Arc::clone(&self.db);
        let list_remote_id = list_remote_id.to_string();
        let title = title.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<CategoryRef>> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT remote_id, title, list_remote_id FROM categories
                 WHERE list_remote_id = ?1 AND title = ?2",
                params![&list_remote_id, &title],
                map_category_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn save_category(&self, category: &CategoryRef) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let category = category.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql_error)?;
            tx.execute(
                "DELETE FROM categories
                 WHERE remote_id = ?1 AND (list_remote_id <> ?2 OR title <> ?3)",
                params![&category.remote_id, &category.list_remote_id, &category.title],
            )
            .map_err(map_sql_error)?;
            tx.execute(
                CATEGORY_UPSERT_SQL,
                params![&category.remote_id, &category.title, &category.list_remote_id],
            )
            .map_err(map_sql_error)?;
            tx.commit().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_interest(
        &self,
        category_remote_id: &str,
        name: &str,
    ) -> DomainResult<Option<InterestRef>> {
        let db = Arc::clone(&self.db);
        let category_remote_id = category_remote_id.to_string();
        let name = name.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<InterestRef>> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT remote_id, name, category_remote_id FROM interests
                 WHERE category_remote_id = ?1 AND name = ?2",
                params![&category_remote_id, &name],
                map_interest_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn save_interest(&self, interest: &InterestRef) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let interest = interest.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql_error)?;
            tx.execute(
                "DELETE FROM interests
                 WHERE remote_id = ?1 AND (category_remote_id <> ?2 OR name <> ?3)",
                params![&interest.remote_id, &interest.category_remote_id, &interest.name],
            )
            .map_err(map_sql_error)?;
            tx.execute(
                INTEREST_UPSERT_SQL,
                params![&interest.remote_id, &interest.name, &interest.category_remote_id],
            )
            .map_err(map_sql_error)?;
            tx.commit().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_list_row(row: &Row<'_>) -> rusqlite::Result<ListRef> {
    Ok(ListRef { name: row.get(0)?, remote_id: row.get(1)? })
}

fn map_category_row(row: &Row<'_>) -> rusqlite::Result<CategoryRef> {
    Ok(CategoryRef { remote_id: row.get(0)?, title: row.get(1)?, list_remote_id: row.get(2)? })
}

fn map_interest_row(row: &Row<'_>) -> rusqlite::Result<InterestRef> {
    Ok(InterestRef {
        remote_id: row.get(0)?,
        name: row.get(1)?,
        category_remote_id: row.get(2)?,
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn cache() -> (TempDir, SqliteIdentifierCache) {
        let temp_dir = TempDir::new().expect("temp dir created");
        let db = DbManager::new(temp_dir.path().join("cache.db"), 2).expect("manager created");
        db.run_migrations().expect("migrations run");
        (temp_dir, SqliteIdentifierCache::new(Arc::new(db)))
    }

    fn list(name: &str, remote_id: &str) -> ListRef {
        ListRef { name: name.into(), remote_id: remote_id.into() }
    }

    #[tokio::test]
    async fn lists_round_trip_by_name() {
        let (_dir, cache) = cache();

        assert_eq!(cache.find_list("Members").await.unwrap(), None);
        cache.save_list(&list("Members", "a1")).await.unwrap();

        assert_eq!(cache.find_list("Members").await.unwrap(), Some(list("Members", "a1")));
        assert_eq!(cache.find_list("members").await.unwrap(), None);
    }

    #[tokio::test]
    async fn saving_a_known_name_replaces_the_remote_id() {
        let (_dir, cache) = cache();

        cache.save_list(&list("Members", "a1")).await.unwrap();
        cache.save_list(&list("Members", "b2")).await.unwrap();
        // remote list renamed: the id moves to the new name
        cache.save_list(&list("Alumni", "b2")).await.unwrap();

        assert_eq!(cache.find_list("Members").await.unwrap(), None);
        assert_eq!(cache.find_list("Alumni").await.unwrap(), Some(list("Alumni", "b2")));
    }

    #[tokio::test]
    async fn categories_are_scoped_to_their_list() {
        let (_dir, cache) = cache();
        let category = CategoryRef {
            remote_id: "cat1".into(),
            title: "Newsletter".into(),
            list_remote_id: "a1".into(),
        };

        cache.save_category(&category).await.unwrap();

        assert_eq!(cache.find_category("a1", "Newsletter").await.unwrap(), Some(category));
        assert_eq!(cache.find_category("b2", "Newsletter").await.unwrap(), None);
    }

    #[tokio::test]
    async fn interests_upsert_within_their_category() {
        let (_dir, cache) = cache();
        let weekly = |id: &str| InterestRef {
            remote_id: id.into(),
            name: "Weekly".into(),
            category_remote_id: "cat1".into(),
        };

        cache.save_interest(&weekly("int1")).await.unwrap();
        cache.save_interest(&weekly("int2")).await.unwrap();

        assert_eq!(cache.find_interest("cat1", "Weekly").await.unwrap(), Some(weekly("int2")));
        assert_eq!(cache.find_interest("cat2", "Weekly").await.unwrap(), None);
    }
}
