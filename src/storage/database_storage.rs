use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, error, info};
use sea_orm::{
    ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Schema, Set, Statement,
};

use crate::error_handling::types::StorageError;
use crate::storage::db_entities::{traffic_samples, users};
use crate::storage::storage_trait::Storage;
use crate::storage::types::TrafficSample;

/// SQLite-backed [`Storage`] built on SeaORM.
///
/// The connection pool lends a connection to each statement and takes it back when
/// the statement completes, so no caller ever holds a handle between operations.
pub struct DatabaseStorage {
    db: DatabaseConnection,
}

impl DatabaseStorage {
    const MAX_CONNECTIONS: u32 = 5;

    /// Opens (creating if needed) the database file at `path` and its tables.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    error!("Failed to create database dir {}: {}", parent.display(), e);
                    StorageError::WriteFailed
                })?;
            }
        }

        let mut options = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
        options
            .max_connections(Self::MAX_CONNECTIONS)
            .sqlx_logging(false);
        let db = Database::connect(options).await.map_err(|e| {
            error!("Failed to open database {}: {}", path.display(), e);
            StorageError::ConnectionFailed
        })?;

        let storage = Self { db };
        storage.create_schema().await?;
        info!("DatabaseStorage initialized at {}", path.display());
        Ok(storage)
    }

    async fn create_schema(&self) -> Result<(), StorageError> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);

        let mut samples = schema.create_table_from_entity(traffic_samples::Entity);
        samples.if_not_exists();
        self.execute_ddl(backend.build(&samples)).await?;

        for mut index in schema.create_index_from_entity(traffic_samples::Entity) {
            index.if_not_exists();
            self.execute_ddl(backend.build(&index)).await?;
        }

        let mut registered = schema.create_table_from_entity(users::Entity);
        registered.if_not_exists();
        self.execute_ddl(backend.build(&registered)).await
    }

    async fn execute_ddl(&self, statement: Statement) -> Result<(), StorageError> {
        debug!("schema: {}", statement.sql);
        self.db.execute(statement).await.map_err(|e| {
            error!("Failed to create schema: {}", e);
            StorageError::WriteFailed
        })?;
        Ok(())
    }

    /// Records `name` as a registered user.
    ///
    /// Registration belongs to the provisioning side; this exists so that side and
    /// the tests can populate the table the recorder reads from.
    pub async fn register_user(&self, name: &str) -> Result<(), StorageError> {
        let row = users::ActiveModel {
            name: Set(name.to_string()),
            created_at: Set(format_timestamp(Utc::now())),
            ..Default::default()
        };
        users::Entity::insert(row).exec(&self.db).await.map_err(|e| {
            error!("Failed to register user {}: {}", name, e);
            StorageError::WriteFailed
        })?;
        Ok(())
    }
}

#[async_trait]
impl Storage for DatabaseStorage {
    async fn insert_traffic_sample(&self, sample: &TrafficSample) -> Result<(), StorageError> {
        let row = traffic_samples::ActiveModel {
            subject_name: Set(sample.subject_name.clone()),
            bytes_received: Set(to_column(sample.bytes_received)?),
            bytes_sent: Set(to_column(sample.bytes_sent)?),
            captured_at: Set(format_timestamp(sample.captured_at)),
            ..Default::default()
        };
        traffic_samples::Entity::insert(row)
            .exec(&self.db)
            .await
            .map_err(|e| {
                error!("Failed to insert sample for {}: {}", sample.subject_name, e);
                StorageError::WriteFailed
            })?;
        Ok(())
    }

    async fn query_traffic(
        &self,
        subject_name: &str,
        limit: u64,
    ) -> Result<Vec<TrafficSample>, StorageError> {
        let rows = traffic_samples::Entity::find()
            .filter(traffic_samples::Column::SubjectName.eq(subject_name))
            .order_by_desc(traffic_samples::Column::CapturedAt)
            .order_by_desc(traffic_samples::Column::Id)
            .limit(to_sql_limit(limit))
            .all(&self.db)
            .await
            .map_err(|e| {
                error!("Failed to query samples for {}: {}", subject_name, e);
                StorageError::ReadFailed
            })?;
        debug!("Loaded {} sample(s) for {}", rows.len(), subject_name);
        rows.into_iter().map(into_sample).collect()
    }

    async fn user_exists(&self, name: &str) -> Result<bool, StorageError> {
        let found = users::Entity::find()
            .filter(users::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(|e| {
                error!("Failed to look up user {}: {}", name, e);
                StorageError::ReadFailed
            })?;
        Ok(found.is_some())
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn to_column(count: u64) -> Result<i64, StorageError> {
    i64::try_from(count).map_err(|_| {
        error!("Byte counter {} does not fit the database column", count);
        StorageError::WriteFailed
    })
}

/// SQLite binds LIMIT as a signed 64-bit value; larger limits mean "all rows" anyway.
fn to_sql_limit(limit: u64) -> u64 {
    limit.min(i64::MAX as u64)
}

fn into_sample(row: traffic_samples::Model) -> Result<TrafficSample, StorageError> {
    let from_column = |value: i64| u64::try_from(value).map_err(|_| StorageError::ReadFailed);
    Ok(TrafficSample {
        bytes_received: from_column(row.bytes_received)?,
        bytes_sent: from_column(row.bytes_sent)?,
        captured_at: DateTime::parse_from_rfc3339(&row.captured_at)
            .map_err(|e| {
                error!("Invalid captured_at {:?} in row {}: {}", row.captured_at, row.id, e);
                StorageError::ReadFailed
            })?
            .with_timezone(&Utc),
        subject_name: row.subject_name,
    })
}
