// PostgreSQL store
// Groups are stored as documents: member ids in a UUID array, messages and
// materials as JSONB sequences

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{Executor, FromRow, PgPool};
use uuid::Uuid;

use super::{CascadeSummary, Store, StoreError, StoreResult};
use crate::domain::{Group, GroupStatus, Material, Message, User};

const USER_COLUMNS: &str = r#"
    id, name, email, contact_number, password_hash, role, is_blocked, created_at, updated_at
"#;

const GROUP_COLUMNS: &str = r#"
    id, title, subject, description, image, creator_id, members, messages, materials,
    status, max_members, created_at, updated_at
"#;

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    contact_number: String,
    password_hash: String,
    role: String,
    is_blocked: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            contact_number: row.contact_number,
            password_hash: row.password_hash,
            role: row.role.parse().map_err(StoreError::Corrupt)?,
            is_blocked: row.is_blocked,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct GroupRow {
    id: Uuid,
    title: String,
    subject: String,
    description: String,
    image: String,
    creator_id: Uuid,
    members: Vec<Uuid>,
    messages: Json<Vec<Message>>,
    materials: Json<Vec<Material>>,
    status: String,
    max_members: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<GroupRow> for Group {
    type Error = StoreError;

    fn try_from(row: GroupRow) -> Result<Self, Self::Error> {
        let max_members = u32::try_from(row.max_members)
            .map_err(|_| StoreError::Corrupt(format!("group {} max_members", row.id)))?;
        Ok(Group {
            id: row.id,
            title: row.title,
            subject: row.subject,
            description: row.description,
            image: row.image,
            creator: row.creator_id,
            members: row.members,
            messages: row.messages.0,
            materials: row.materials.0,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            max_members,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_groups(rows: Vec<GroupRow>) -> StoreResult<Vec<Group>> {
    rows.into_iter().map(Group::try_from).collect()
}

fn into_users(rows: Vec<UserRow>) -> StoreResult<Vec<User>> {
    rows.into_iter().map(User::try_from).collect()
}

fn max_members_column(group: &Group) -> i32 {
    i32::try_from(group.max_members).unwrap_or(i32::MAX)
}

pub struct PgStore {
    db: Arc<PgPool>,
}

impl PgStore {
    pub fn new(db: Arc<PgPool>) -> Self {
        Self { db }
    }

    /// Opens a pool and applies pending migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    conn.execute("SET application_name = 'study_groups';").await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        Ok(Self::new(Arc::new(pool)))
    }

    async fn upsert_group<'e, E>(executor: E, group: &Group) -> StoreResult<()>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO groups (
                id, title, subject, description, image, creator_id, members,
                messages, materials, status, max_members, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                subject = EXCLUDED.subject,
                description = EXCLUDED.description,
                image = EXCLUDED.image,
                members = EXCLUDED.members,
                messages = EXCLUDED.messages,
                materials = EXCLUDED.materials,
                status = EXCLUDED.status,
                max_members = EXCLUDED.max_members,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(group.id)
        .bind(&group.title)
        .bind(&group.subject)
        .bind(&group.description)
        .bind(&group.image)
        .bind(group.creator)
        .bind(&group.members)
        .bind(Json(&group.messages))
        .bind(Json(&group.materials))
        .bind(group.status.as_str())
        .bind(max_members_column(group))
        .bind(group.created_at)
        .bind(group.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (
                id, name, email, contact_number, password_hash, role, is_blocked,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.contact_number)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.is_blocked)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&*self.db)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::DuplicateEmail)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&*self.db)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = lower($1)", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.trim())
            .fetch_optional(&*self.db)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {} FROM users WHERE id = ANY($1)", USER_COLUMNS);
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(ids)
            .fetch_all(&*self.db)
            .await?;
        into_users(rows)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {} FROM users ORDER BY created_at ASC", USER_COLUMNS);
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&*self.db)
            .await?;
        into_users(rows)
    }

    async fn save_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET name = $2, contact_number = $3, password_hash = $4, role = $5,
                is_blocked = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.contact_number)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.is_blocked)
        .bind(user.updated_at)
        .execute(&*self.db)
        .await?;

        Ok(())
    }

    async fn delete_user_cascade(&self, id: Uuid) -> StoreResult<Option<CascadeSummary>> {
        let mut tx = self.db.begin().await?;

        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let groups_deleted = sqlx::query("DELETE FROM groups WHERE creator_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected() as usize;

        // groups still referencing the user as member, sender or uploader
        let sql = format!(
            r#"
            SELECT {} FROM groups
            WHERE $1 = ANY(members)
               OR messages @> jsonb_build_array(jsonb_build_object('sender', $1::text))
               OR materials @> jsonb_build_array(jsonb_build_object('uploadedBy', $1::text))
            FOR UPDATE
            "#,
            GROUP_COLUMNS
        );
        let rows = sqlx::query_as::<_, GroupRow>(&sql)
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

        let mut groups_updated = 0;
        for mut group in into_groups(rows)? {
            if group.purge_user(id) {
                Self::upsert_group(&mut *tx, &group).await?;
                groups_updated += 1;
            }
        }

        tx.commit().await?;

        Ok(Some(CascadeSummary {
            groups_deleted,
            groups_updated,
        }))
    }

    async fn insert_group(&self, group: &Group) -> StoreResult<()> {
        Self::upsert_group(&*self.db, group).await
    }

    async fn find_group(&self, id: Uuid) -> StoreResult<Option<Group>> {
        let sql = format!("SELECT {} FROM groups WHERE id = $1", GROUP_COLUMNS);
        let row = sqlx::query_as::<_, GroupRow>(&sql)
            .bind(id)
            .fetch_optional(&*self.db)
            .await?;
        row.map(Group::try_from).transpose()
    }

    async fn list_groups(&self, status: Option<GroupStatus>) -> StoreResult<Vec<Group>> {
        let sql = format!(
            r#"
            SELECT {} FROM groups
            WHERE $1::TEXT IS NULL OR status = $1
            ORDER BY created_at DESC
            "#,
            GROUP_COLUMNS
        );
        let rows = sqlx::query_as::<_, GroupRow>(&sql)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&*self.db)
            .await?;
        into_groups(rows)
    }

    async fn groups_with_member(&self, user_id: Uuid) -> StoreResult<Vec<Group>> {
        let sql = format!(
            "SELECT {} FROM groups WHERE $1 = ANY(members) ORDER BY created_at DESC",
            GROUP_COLUMNS
        );
        let rows = sqlx::query_as::<_, GroupRow>(&sql)
            .bind(user_id)
            .fetch_all(&*self.db)
            .await?;
        into_groups(rows)
    }

    async fn groups_created_by(&self, user_id: Uuid) -> StoreResult<Vec<Group>> {
        let sql = format!(
            "SELECT {} FROM groups WHERE creator_id = $1 ORDER BY created_at DESC",
            GROUP_COLUMNS
        );
        let rows = sqlx::query_as::<_, GroupRow>(&sql)
            .bind(user_id)
            .fetch_all(&*self.db)
            .await?;
        into_groups(rows)
    }

    async fn save_group(&self, group: &Group) -> StoreResult<()> {
        Self::upsert_group(&*self.db, group).await
    }

    async fn delete_group(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(&*self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
