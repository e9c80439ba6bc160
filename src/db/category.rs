use sqlx::sqlite::SqlitePool;

/// A listing category with optional subcategories.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Category {
    #[serde(skip)]
    pub id: i64,
    pub uuid: String,
    pub name: String,
    pub sub_categories: Vec<String>,
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    uuid: String,
    name: String,
    sub_categories: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            uuid: row.uuid,
            name: row.name,
            // Stored as a JSON array; unreadable data degrades to empty.
            sub_categories: serde_json::from_str(&row.sub_categories).unwrap_or_default(),
        }
    }
}

#[derive(Clone)]
pub struct CategoryStore {
    pool: SqlitePool,
}

impl CategoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a category. Fails on a duplicate name (case-insensitive).
    pub async fn create(
        &self,
        uuid: &str,
        name: &str,
        sub_categories: &[String],
    ) -> Result<i64, sqlx::Error> {
        let subs = serde_json::to_string(sub_categories).unwrap_or_else(|_| "[]".to_string());
        let result =
            sqlx::query("INSERT INTO categories (uuid, name, sub_categories) VALUES (?, ?, ?)")
                .bind(uuid)
                .bind(name)
                .bind(subs)
                .execute(&self.pool)
                .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a category by UUID.
    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<Category>, sqlx::Error> {
        let row: Option<CategoryRow> = sqlx::query_as(
            "SELECT id, uuid, name, sub_categories FROM categories WHERE uuid = ?",
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Category::from))
    }

    /// Get a category by name (case-insensitive).
    pub async fn get_by_name(&self, name: &str) -> Result<Option<Category>, sqlx::Error> {
        let row: Option<CategoryRow> = sqlx::query_as(
            "SELECT id, uuid, name, sub_categories FROM categories WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Category::from))
    }

    /// Update a category's name and subcategories.
    pub async fn update(
        &self,
        uuid: &str,
        name: &str,
        sub_categories: &[String],
    ) -> Result<bool, sqlx::Error> {
        let subs = serde_json::to_string(sub_categories).unwrap_or_else(|_| "[]".to_string());
        let result =
            sqlx::query("UPDATE categories SET name = ?, sub_categories = ? WHERE uuid = ?")
                .bind(name)
                .bind(subs)
                .bind(uuid)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List all categories ordered by creation time.
    pub async fn list(&self) -> Result<Vec<Category>, sqlx::Error> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            "SELECT id, uuid, name, sub_categories FROM categories ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }
}
