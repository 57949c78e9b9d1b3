use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseConnection, QueryFilter, SqlErr, prelude::*, sea_query::Expr,
};
use tokio::sync::watch;

use crate::{EngineError, LedgerDocument, ResultEngine};

use super::{ChangeFeed, Snapshot, SnapshotStore, ledgers};

/// Store backed by the `ledgers` table.
#[derive(Debug)]
pub struct SqliteStore {
    database: DatabaseConnection,
    feed: ChangeFeed,
}

impl SqliteStore {
    #[must_use]
    pub fn new(database: DatabaseConnection) -> Self {
        Self {
            database,
            feed: ChangeFeed::default(),
        }
    }

    #[must_use]
    pub fn database(&self) -> &DatabaseConnection {
        &self.database
    }

    #[must_use]
    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    async fn insert(&self, user_id: &str, json: String) -> ResultEngine<i64> {
        let model = ledgers::ActiveModel {
            user_id: ActiveValue::Set(user_id.to_string()),
            version: ActiveValue::Set(1),
            document: ActiveValue::Set(json),
            updated_at: ActiveValue::Set(Utc::now()),
        };
        match ledgers::Entity::insert(model).exec(&self.database).await {
            Ok(_) => Ok(1),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(EngineError::Conflict(user_id.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update(&self, user_id: &str, json: String, expected: i64) -> ResultEngine<i64> {
        let version = expected + 1;
        let result = ledgers::Entity::update_many()
            .col_expr(ledgers::Column::Version, Expr::value(version))
            .col_expr(ledgers::Column::Document, Expr::value(json))
            .col_expr(ledgers::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(ledgers::Column::UserId.eq(user_id))
            .filter(ledgers::Column::Version.eq(expected))
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::Conflict(user_id.to_string()));
        }
        Ok(version)
    }
}

impl SnapshotStore for SqliteStore {
    async fn load(&self, user_id: &str) -> ResultEngine<Option<Snapshot>> {
        let Some(model) = ledgers::Entity::find_by_id(user_id.to_string())
            .one(&self.database)
            .await?
        else {
            return Ok(None);
        };
        Ok(Some(Snapshot {
            document: serde_json::from_str(&model.document)?,
            version: model.version,
        }))
    }

    async fn replace(
        &self,
        user_id: &str,
        document: &LedgerDocument,
        expected: Option<i64>,
    ) -> ResultEngine<i64> {
        let json = serde_json::to_string(document)?;
        let version = match expected {
            None => self.insert(user_id, json).await?,
            Some(expected) => self.update(user_id, json, expected).await?,
        };
        self.feed.publish(
            user_id,
            Snapshot {
                document: document.clone(),
                version,
            },
        );
        Ok(version)
    }

    fn subscribe(&self, user_id: &str) -> watch::Receiver<Option<Snapshot>> {
        self.feed.subscribe(user_id)
    }
}
