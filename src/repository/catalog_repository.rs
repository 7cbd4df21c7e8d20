use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{CreateAddonRequest, CreateServiceRequest, Service, ServiceAddon},
    error::{AppError, Result},
    repository::{parse_decimal, parse_uuid, CatalogRepository},
};

#[derive(FromRow)]
struct ServiceRow {
    id: String,
    provider_id: String,
    name: String,
    base_price: String,
    duration_minutes: Option<i32>,
    is_active: i32,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(FromRow)]
struct AddonRow {
    id: String,
    service_id: String,
    name: String,
    price: String,
    is_active: i32,
    created_at: NaiveDateTime,
}

pub struct SqliteCatalogRepository {
    pool: SqlitePool,
}

impl SqliteCatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_service(row: ServiceRow) -> Result<Service> {
        Ok(Service {
            id: parse_uuid(&row.id)?,
            provider_id: parse_uuid(&row.provider_id)?,
            name: row.name,
            base_price: parse_decimal(&row.base_price)?,
            duration_minutes: row.duration_minutes,
            is_active: row.is_active != 0,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn row_to_addon(row: AddonRow) -> Result<ServiceAddon> {
        Ok(ServiceAddon {
            id: parse_uuid(&row.id)?,
            service_id: parse_uuid(&row.service_id)?,
            name: row.name,
            price: parse_decimal(&row.price)?,
            is_active: row.is_active != 0,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }

    pub async fn fetch_service_in(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Service>> {
        let row = sqlx::query_as::<_, ServiceRow>(
            r#"
            SELECT id, provider_id, name, base_price, duration_minutes, is_active,
                   created_at, updated_at
            FROM services
            WHERE id = ?
            "#
        )
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

        row.map(Self::row_to_service).transpose()
    }

    /// Active addons of `service_id` whose ids appear in `addon_ids`.
    /// Ids belonging to another service, or to nothing, are left out.
    pub async fn fetch_addons_in(
        conn: &mut SqliteConnection,
        service_id: Uuid,
        addon_ids: &[Uuid],
    ) -> Result<Vec<ServiceAddon>> {
        if addon_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, AddonRow>(
            r#"
            SELECT id, service_id, name, price, is_active, created_at
            FROM service_addons
            WHERE service_id = ? AND is_active = 1
            "#
        )
        .bind(service_id.to_string())
        .fetch_all(&mut *conn)
        .await?;

        rows.into_iter()
            .map(Self::row_to_addon)
            .filter(|addon| match addon {
                Ok(addon) => addon_ids.contains(&addon.id),
                Err(_) => true,
            })
            .collect()
    }
}

#[async_trait]
impl CatalogRepository for SqliteCatalogRepository {
    async fn create_service(&self, request: CreateServiceRequest) -> Result<Service> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO services (
                id, provider_id, name, base_price, duration_minutes, is_active,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, 1, ?, ?)
            "#
        )
        .bind(id.to_string())
        .bind(request.provider_id.to_string())
        .bind(&request.name)
        .bind(request.base_price.to_string())
        .bind(request.duration_minutes)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_service(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created service".to_string())
        })
    }

    async fn find_service(&self, id: Uuid) -> Result<Option<Service>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_service_in(&mut conn, id).await
    }

    async fn set_service_active(&self, id: Uuid, is_active: bool) -> Result<()> {
        let result = sqlx::query("UPDATE services SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(is_active as i32)
            .bind(Utc::now().naive_utc())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::ServiceNotFound(id));
        }

        Ok(())
    }

    async fn create_addon(&self, request: CreateAddonRequest) -> Result<ServiceAddon> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO service_addons (id, service_id, name, price, is_active, created_at)
            VALUES (?, ?, ?, ?, 1, ?)
            "#
        )
        .bind(id.to_string())
        .bind(request.service_id.to_string())
        .bind(&request.name)
        .bind(request.price.to_string())
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, AddonRow>(
            "SELECT id, service_id, name, price, is_active, created_at FROM service_addons WHERE id = ?"
        )
        .bind(id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_addon(row)
    }

    async fn list_addons(&self, service_id: Uuid) -> Result<Vec<ServiceAddon>> {
        let rows = sqlx::query_as::<_, AddonRow>(
            r#"
            SELECT id, service_id, name, price, is_active, created_at
            FROM service_addons
            WHERE service_id = ?
            ORDER BY name ASC
            "#
        )
        .bind(service_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_addon).collect()
    }

    async fn delete_addon(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM service_addons WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Addon not found".to_string()));
        }

        Ok(())
    }
}
