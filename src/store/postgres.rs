use super::{Document, DocumentStore};
use crate::known_errors::NewsbreakResult;
use sqlx::PgPool;

/// Durable document storage on PostgreSQL. Documents live in a single JSONB
/// table keyed by (collection, key); merge writes use the `||` operator so
/// the fold happens inside the database.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Initialize the documents table.
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                fields JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (collection, key)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl DocumentStore for PgDocumentStore {
    async fn read(&self, collection: &str, key: &str) -> NewsbreakResult<Option<Document>> {
        let value: Option<serde_json::Value> = sqlx::query_scalar(
            r#"
            SELECT fields FROM documents
            WHERE collection = $1 AND key = $2
            "#,
        )
        .bind(collection)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value.map(crate::store::fields))
    }

    async fn write(
        &self,
        collection: &str,
        key: &str,
        doc: Document,
        merge: bool,
    ) -> NewsbreakResult<()> {
        let query = if merge {
            r#"
            INSERT INTO documents (collection, key, fields)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, key)
            DO UPDATE SET fields = documents.fields || excluded.fields, updated_at = NOW()
            "#
        } else {
            r#"
            INSERT INTO documents (collection, key, fields)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, key)
            DO UPDATE SET fields = excluded.fields, updated_at = NOW()
            "#
        };

        sqlx::query(query)
            .bind(collection)
            .bind(key)
            .bind(serde_json::Value::Object(doc))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn create(&self, collection: &str, key: &str, doc: Document) -> NewsbreakResult<bool> {
        // ON CONFLICT DO NOTHING is the per-key conditional write; the row
        // count tells us whether we won
        let result = sqlx::query(
            r#"
            INSERT INTO documents (collection, key, fields)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, key) DO NOTHING
            "#,
        )
        .bind(collection)
        .bind(key)
        .bind(serde_json::Value::Object(doc))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, collection: &str, key: &str) -> NewsbreakResult<()> {
        sqlx::query(
            r#"
            DELETE FROM documents
            WHERE collection = $1 AND key = $2
            "#,
        )
        .bind(collection)
        .bind(key)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod test_pg_store {
    use super::*;
    use crate::store::fields;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    async fn test_write_read_merge(pool: PgPool) {
        let store = PgDocumentStore::new(pool);
        store.migrate().await.expect("migrate should succeed");

        store
            .write(
                "users",
                "u1",
                fields(json!({"username": "nova", "email": "a@x.com"})),
                false,
            )
            .await
            .expect("write should succeed");

        store
            .write("users", "u1", fields(json!({"username": "astra"})), true)
            .await
            .expect("merge write should succeed");

        let doc = store
            .read("users", "u1")
            .await
            .expect("read should succeed")
            .expect("document should exist");
        assert_eq!(doc.get("username"), Some(&json!("astra")));
        assert_eq!(doc.get("email"), Some(&json!("a@x.com")));
    }

    #[sqlx::test]
    async fn test_create_is_conditional(pool: PgPool) {
        let store = PgDocumentStore::new(pool);
        store.migrate().await.expect("migrate should succeed");

        let first = store
            .create("usernames", "nova", fields(json!({"uid": "a"})))
            .await
            .expect("create should succeed");
        let second = store
            .create("usernames", "nova", fields(json!({"uid": "b"})))
            .await
            .expect("create should succeed");

        assert!(first);
        assert!(!second);

        let doc = store
            .read("usernames", "nova")
            .await
            .expect("read should succeed")
            .expect("document should exist");
        assert_eq!(doc.get("uid"), Some(&json!("a")));
    }

    #[sqlx::test]
    async fn test_delete_removes_document(pool: PgPool) {
        let store = PgDocumentStore::new(pool);
        store.migrate().await.expect("migrate should succeed");

        store
            .write("usernames", "nova", fields(json!({"uid": "a"})), false)
            .await
            .expect("write should succeed");
        store
            .delete("usernames", "nova")
            .await
            .expect("delete should succeed");

        let doc = store
            .read("usernames", "nova")
            .await
            .expect("read should succeed");
        assert!(doc.is_none());
    }
}
