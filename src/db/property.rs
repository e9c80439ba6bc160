use sqlx::sqlite::SqlitePool;

/// A property listing.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Property {
    #[serde(skip)]
    pub id: i64,
    pub uuid: String,
    #[serde(skip)]
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub size: String,
    pub property_type: String,
    pub address: String,
    pub postal_code: Option<String>,
    pub created_at: String,
}

/// Fields for creating a property listing.
#[derive(Debug, Clone)]
pub struct NewProperty {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub size: String,
    pub property_type: String,
    pub address: String,
    pub postal_code: Option<String>,
}

#[derive(sqlx::FromRow)]
struct PropertyRow {
    id: i64,
    uuid: String,
    user_id: i64,
    title: String,
    description: String,
    price: f64,
    size: String,
    property_type: String,
    address: String,
    postal_code: Option<String>,
    created_at: String,
}

impl From<PropertyRow> for Property {
    fn from(row: PropertyRow) -> Self {
        Self {
            id: row.id,
            uuid: row.uuid,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            price: row.price,
            size: row.size,
            property_type: row.property_type,
            address: row.address,
            postal_code: row.postal_code,
            created_at: row.created_at,
        }
    }
}

const PROPERTY_COLUMNS: &str =
    "id, uuid, user_id, title, description, price, size, property_type, address, postal_code, created_at";

#[derive(Clone)]
pub struct PropertyStore {
    pool: SqlitePool,
}

impl PropertyStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a property listing owned by the given user. Returns the row ID.
    pub async fn create(
        &self,
        uuid: &str,
        user_id: i64,
        property: &NewProperty,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO properties (uuid, user_id, title, description, price, size, property_type, address, postal_code)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid)
        .bind(user_id)
        .bind(&property.title)
        .bind(&property.description)
        .bind(property.price)
        .bind(&property.size)
        .bind(&property.property_type)
        .bind(&property.address)
        .bind(&property.postal_code)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a property by UUID.
    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<Property>, sqlx::Error> {
        let row: Option<PropertyRow> = sqlx::query_as(&format!(
            "SELECT {} FROM properties WHERE uuid = ?",
            PROPERTY_COLUMNS
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Property::from))
    }

    /// List all properties, newest first.
    pub async fn list(&self) -> Result<Vec<Property>, sqlx::Error> {
        let rows: Vec<PropertyRow> = sqlx::query_as(&format!(
            "SELECT {} FROM properties ORDER BY created_at DESC, id DESC",
            PROPERTY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Property::from).collect())
    }
}
