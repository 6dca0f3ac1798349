//! SeaORM entity models used by the database storage backend.
//!
//! These structs map to the SQLite tables created by `database_storage`:
//! - `traffic_samples`: append-only byte counter samples per subject
//! - `users`: names registered by the provisioning side, read-only for us

/// Traffic samples table entity models.
pub mod traffic_samples {
    use sea_orm::entity::prelude::*;

    /// One persisted sample.
    ///
    /// Timestamps are stored as fixed-width RFC3339 UTC strings so that text order
    /// matches time order.
    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "traffic_samples")]
    pub struct Model {
        /// Auto-increment row id, doubles as insertion order
        #[sea_orm(primary_key)]
        pub id: i32,
        /// Name reported by the daemon
        #[sea_orm(indexed)]
        pub subject_name: String,
        /// Cumulative bytes received from the client
        pub bytes_received: i64,
        /// Cumulative bytes sent to the client
        pub bytes_sent: i64,
        /// RFC3339 capture timestamp, microsecond precision, `Z` suffix
        pub captured_at: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Registered users table entity models.
pub mod users {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        #[sea_orm(unique)]
        pub name: String,
        /// RFC3339 registration timestamp
        pub created_at: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
