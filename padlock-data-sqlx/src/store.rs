use crate::error::{SqlxErrorExt, SqlxResult};
use crate::pool::create_pool;
use chrono::{DateTime, Utc};
use padlock_core::{
    BoxFuture, PadlockConfig, PadlockError, ResourceRef, Role, RoleId, RoleStore, SubjectRef,
};
use sqlx::sqlite::SqlitePool;

const ROLE_COLUMNS: &str = "id, name, resource_type, resource_id, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct RoleRow {
    id: i64,
    name: String,
    resource_type: String,
    resource_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Role {
            id: row.id,
            name: row.name,
            resource: ResourceRef::new(row.resource_type, row.resource_id),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// [`RoleStore`] backed by SQLite through SQLx.
///
/// Tables are created by the bundled migrations (see [`migrate`](Self::migrate)):
/// `padlock_roles` with a unique index on (name, resource_type, resource_id),
/// and `padlock_role_subjects` joining roles to subject ids.
///
/// # Example
///
/// ```ignore
/// use padlock_core::{PadlockConfig, RoleRegistry};
/// use padlock_data_sqlx::SqlxRoleStore;
///
/// let config = PadlockConfig::new().with_database_url("sqlite://roles.db");
/// let store = SqlxRoleStore::connect(&config).await?;
/// let registry = RoleRegistry::with_config(store, &config);
/// ```
#[derive(Clone)]
pub struct SqlxRoleStore {
    pool: SqlitePool,
}

impl SqlxRoleStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool from `config` and apply migrations.
    pub async fn connect(config: &PadlockConfig) -> SqlxResult<Self> {
        let store = Self::new(create_pool(config).await?);
        store.migrate().await?;
        Ok(store)
    }

    /// Get the underlying pool reference.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create or upgrade the role tables.
    pub async fn migrate(&self) -> SqlxResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(PadlockError::database)?;
        tracing::debug!("role store migrations applied");
        Ok(())
    }

    async fn find(&self, name: &str, resource: &ResourceRef) -> SqlxResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            "SELECT {ROLE_COLUMNS} FROM padlock_roles \
             WHERE name = ? AND resource_type = ? AND resource_id = ?"
        ))
        .bind(name)
        .bind(&resource.resource_type)
        .bind(&resource.resource_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_padlock_error)?;
        Ok(row.map(Role::from))
    }

    async fn create(&self, name: &str, resource: &ResourceRef) -> SqlxResult<Role> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            "INSERT INTO padlock_roles (name, resource_type, resource_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING {ROLE_COLUMNS}"
        ))
        .bind(name)
        .bind(&resource.resource_type)
        .bind(&resource.resource_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_padlock_error)?;
        Ok(row.into())
    }

    async fn delete(&self, role_id: RoleId) -> SqlxResult<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(SqlxErrorExt::into_padlock_error)?;
        sqlx::query("DELETE FROM padlock_role_subjects WHERE role_id = ?")
            .bind(role_id)
            .execute(&mut *tx)
            .await
            .map_err(SqlxErrorExt::into_padlock_error)?;
        let result = sqlx::query("DELETE FROM padlock_roles WHERE id = ?")
            .bind(role_id)
            .execute(&mut *tx)
            .await
            .map_err(SqlxErrorExt::into_padlock_error)?;
        tx.commit()
            .await
            .map_err(SqlxErrorExt::into_padlock_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_if_unheld(&self, role_id: RoleId) -> SqlxResult<bool> {
        let result = sqlx::query(
            "DELETE FROM padlock_roles WHERE id = ? \
             AND NOT EXISTS (SELECT 1 FROM padlock_role_subjects WHERE role_id = ?)",
        )
        .bind(role_id)
        .bind(role_id)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_padlock_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn role_exists(&self, role_id: RoleId) -> SqlxResult<bool> {
        let found: i64 =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM padlock_roles WHERE id = ?)")
                .bind(role_id)
                .fetch_one(&self.pool)
                .await
                .map_err(SqlxErrorExt::into_padlock_error)?;
        Ok(found != 0)
    }

    async fn add(&self, role_id: RoleId, subject_id: &str) -> SqlxResult<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO padlock_role_subjects (role_id, subject_id, created_at) \
             SELECT ?, ?, ? WHERE EXISTS (SELECT 1 FROM padlock_roles WHERE id = ?)",
        )
        .bind(role_id)
        .bind(subject_id)
        .bind(Utc::now())
        .bind(role_id)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_padlock_error)?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }
        if self.role_exists(role_id).await? {
            Ok(false)
        } else {
            Err(PadlockError::NotFound(format!("role {role_id}")))
        }
    }

    async fn remove(&self, role_id: RoleId, subject_id: &str) -> SqlxResult<bool> {
        let result =
            sqlx::query("DELETE FROM padlock_role_subjects WHERE role_id = ? AND subject_id = ?")
                .bind(role_id)
                .bind(subject_id)
                .execute(&self.pool)
                .await
                .map_err(SqlxErrorExt::into_padlock_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn member(&self, role_id: RoleId, subject_id: &str) -> SqlxResult<bool> {
        let found: i64 = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM padlock_role_subjects \
             WHERE role_id = ? AND subject_id = ?)",
        )
        .bind(role_id)
        .bind(subject_id)
        .fetch_one(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_padlock_error)?;
        Ok(found != 0)
    }

    async fn for_subject(
        &self,
        subject_id: &str,
        resource: Option<&ResourceRef>,
    ) -> SqlxResult<Vec<Role>> {
        let rows = match resource {
            Some(resource) => {
                sqlx::query_as::<_, RoleRow>(
                    "SELECT r.id, r.name, r.resource_type, r.resource_id, r.created_at, r.updated_at \
                     FROM padlock_roles r \
                     JOIN padlock_role_subjects s ON s.role_id = r.id \
                     WHERE s.subject_id = ? AND r.resource_type = ? AND r.resource_id = ? \
                     ORDER BY r.id",
                )
                .bind(subject_id)
                .bind(&resource.resource_type)
                .bind(&resource.resource_id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, RoleRow>(
                    "SELECT r.id, r.name, r.resource_type, r.resource_id, r.created_at, r.updated_at \
                     FROM padlock_roles r \
                     JOIN padlock_role_subjects s ON s.role_id = r.id \
                     WHERE s.subject_id = ? \
                     ORDER BY r.id",
                )
                .bind(subject_id)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(SqlxErrorExt::into_padlock_error)?;
        Ok(rows.into_iter().map(Role::from).collect())
    }

    async fn for_resource(&self, resource: &ResourceRef) -> SqlxResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(&format!(
            "SELECT {ROLE_COLUMNS} FROM padlock_roles \
             WHERE resource_type = ? AND resource_id = ? ORDER BY id"
        ))
        .bind(&resource.resource_type)
        .bind(&resource.resource_id)
        .fetch_all(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_padlock_error)?;
        Ok(rows.into_iter().map(Role::from).collect())
    }

    async fn subjects(&self, resource: &ResourceRef) -> SqlxResult<Vec<SubjectRef>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT s.subject_id FROM padlock_role_subjects s \
             JOIN padlock_roles r ON r.id = s.role_id \
             WHERE r.resource_type = ? AND r.resource_id = ? \
             ORDER BY s.subject_id",
        )
        .bind(&resource.resource_type)
        .bind(&resource.resource_id)
        .fetch_all(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_padlock_error)?;
        Ok(ids.into_iter().map(SubjectRef).collect())
    }

    async fn delete_for_resource(&self, resource: &ResourceRef) -> SqlxResult<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(SqlxErrorExt::into_padlock_error)?;
        sqlx::query(
            "DELETE FROM padlock_role_subjects WHERE role_id IN \
             (SELECT id FROM padlock_roles WHERE resource_type = ? AND resource_id = ?)",
        )
        .bind(&resource.resource_type)
        .bind(&resource.resource_id)
        .execute(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_padlock_error)?;
        let result =
            sqlx::query("DELETE FROM padlock_roles WHERE resource_type = ? AND resource_id = ?")
                .bind(&resource.resource_type)
                .bind(&resource.resource_id)
                .execute(&mut *tx)
                .await
                .map_err(SqlxErrorExt::into_padlock_error)?;
        tx.commit()
            .await
            .map_err(SqlxErrorExt::into_padlock_error)?;
        Ok(result.rows_affected())
    }
}

impl RoleStore for SqlxRoleStore {
    fn find_role<'a>(
        &'a self,
        name: &'a str,
        resource: &'a ResourceRef,
    ) -> BoxFuture<'a, Result<Option<Role>, PadlockError>> {
        Box::pin(self.find(name, resource))
    }

    fn create_role<'a>(
        &'a self,
        name: &'a str,
        resource: &'a ResourceRef,
    ) -> BoxFuture<'a, Result<Role, PadlockError>> {
        Box::pin(self.create(name, resource))
    }

    fn delete_role(&self, role_id: RoleId) -> BoxFuture<'_, Result<bool, PadlockError>> {
        Box::pin(self.delete(role_id))
    }

    fn delete_role_if_unheld(
        &self,
        role_id: RoleId,
    ) -> BoxFuture<'_, Result<bool, PadlockError>> {
        Box::pin(self.delete_if_unheld(role_id))
    }

    fn add_member<'a>(
        &'a self,
        role_id: RoleId,
        subject_id: &'a str,
    ) -> BoxFuture<'a, Result<bool, PadlockError>> {
        Box::pin(self.add(role_id, subject_id))
    }

    fn remove_member<'a>(
        &'a self,
        role_id: RoleId,
        subject_id: &'a str,
    ) -> BoxFuture<'a, Result<bool, PadlockError>> {
        Box::pin(self.remove(role_id, subject_id))
    }

    fn is_member<'a>(
        &'a self,
        role_id: RoleId,
        subject_id: &'a str,
    ) -> BoxFuture<'a, Result<bool, PadlockError>> {
        Box::pin(self.member(role_id, subject_id))
    }

    fn roles_for_subject<'a>(
        &'a self,
        subject_id: &'a str,
        resource: Option<&'a ResourceRef>,
    ) -> BoxFuture<'a, Result<Vec<Role>, PadlockError>> {
        Box::pin(self.for_subject(subject_id, resource))
    }

    fn roles_for_resource<'a>(
        &'a self,
        resource: &'a ResourceRef,
    ) -> BoxFuture<'a, Result<Vec<Role>, PadlockError>> {
        Box::pin(self.for_resource(resource))
    }

    fn subjects_for_resource<'a>(
        &'a self,
        resource: &'a ResourceRef,
    ) -> BoxFuture<'a, Result<Vec<SubjectRef>, PadlockError>> {
        Box::pin(self.subjects(resource))
    }

    fn delete_roles_for_resource<'a>(
        &'a self,
        resource: &'a ResourceRef,
    ) -> BoxFuture<'a, Result<u64, PadlockError>> {
        Box::pin(self.delete_for_resource(resource))
    }
}
