use crate::error::{DomainError, DomainResult as Result};
use crate::event::{EventId, EventPublication, EventStatus, OutboxEvent, Topic};
use crate::persist::OutboxRepository;
use crate::persist::outbox_repository::ensure_same_occurrence;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{Postgres, Row, Transaction};
use std::marker::PhantomData;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const SELECT_BY_ID_FOR_UPDATE: &str = r#"
    SELECT id, topic, payload, occurred_at, publications, status, was_quarantined
    FROM outbox
    WHERE id = $1
    FOR UPDATE
"#;

const SELECT_BY_ID: &str = r#"
    SELECT id, topic, payload, occurred_at, publications, status, was_quarantined
    FROM outbox
    WHERE id = $1
"#;

const SELECT_BY_STATUS: &str = r#"
    SELECT id, topic, payload, occurred_at, publications, status, was_quarantined
    FROM outbox
    WHERE status = ANY($1)
    ORDER BY occurred_at ASC, id ASC
"#;

const UPSERT: &str = r#"
    INSERT INTO outbox (id, topic, payload, occurred_at, publications, status, was_quarantined)
    VALUES ($1, $2, $3, $4, $5, $6, $7)
    ON CONFLICT (id) DO UPDATE SET
        publications = EXCLUDED.publications,
        status = EXCLUDED.status,
        was_quarantined = EXCLUDED.was_quarantined
"#;

/// `outbox` 表中的一行
#[derive(Debug, Clone)]
struct OutboxRow {
    id: Uuid,
    topic: String,
    payload: Value,
    occurred_at: DateTime<Utc>,
    publications: Json<Vec<EventPublication>>,
    status: String,
    was_quarantined: bool,
}

impl<'r> sqlx::FromRow<'r, PgRow> for OutboxRow {
    fn from_row(row: &'r PgRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            topic: row.try_get("topic")?,
            payload: row.try_get("payload")?,
            occurred_at: row.try_get("occurred_at")?,
            publications: row.try_get("publications")?,
            status: row.try_get("status")?,
            was_quarantined: row.try_get("was_quarantined")?,
        })
    }
}

impl OutboxRow {
    fn into_event<T: Topic>(self) -> Result<OutboxEvent<T>> {
        Ok(OutboxEvent::from_parts(
            EventId::from_uuid(self.id),
            T::parse_name(&self.topic)?,
            self.payload,
            self.occurred_at,
            self.publications.0,
            self.status.parse::<EventStatus>()?,
            self.was_quarantined,
        ))
    }
}

/// 绑定在单个事务上的 Outbox 存储
pub struct PgOutboxRepository<T> {
    tx: Mutex<Transaction<'static, Postgres>>,
    _topic: PhantomData<fn() -> T>,
}

impl<T: Topic> PgOutboxRepository<T> {
    pub(crate) fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self {
            tx: Mutex::new(tx),
            _topic: PhantomData,
        }
    }

    pub(crate) async fn transaction(&self) -> MutexGuard<'_, Transaction<'static, Postgres>> {
        self.tx.lock().await
    }

    pub(crate) fn into_transaction(self) -> Transaction<'static, Postgres> {
        self.tx.into_inner()
    }
}

#[async_trait]
impl<T: Topic> OutboxRepository<T> for PgOutboxRepository<T> {
    async fn save(&self, event: &OutboxEvent<T>) -> Result<()> {
        let mut tx = self.tx.lock().await;

        let existing = sqlx::query_as::<_, OutboxRow>(SELECT_BY_ID_FOR_UPDATE)
            .bind(*event.id().as_uuid())
            .fetch_optional(&mut **tx)
            .await?;

        if let Some(row) = existing {
            ensure_same_occurrence(&row.into_event::<T>()?, event)?;
        }

        sqlx::query(UPSERT)
            .bind(*event.id().as_uuid())
            .bind(event.topic().as_str())
            .bind(event.payload().clone())
            .bind(event.occurred_at())
            .bind(serde_json::to_value(event.publications())?)
            .bind(event.status().as_str())
            .bind(event.was_quarantined())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    async fn get_by_id(&self, id: &EventId) -> Result<Option<OutboxEvent<T>>> {
        let mut tx = self.tx.lock().await;

        sqlx::query_as::<_, OutboxRow>(SELECT_BY_ID)
            .bind(*id.as_uuid())
            .fetch_optional(&mut **tx)
            .await?
            .map(OutboxRow::into_event::<T>)
            .transpose()
    }

    async fn find_by_status(&self, statuses: &[EventStatus]) -> Result<Vec<OutboxEvent<T>>> {
        let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        let mut tx = self.tx.lock().await;

        let rows = sqlx::query_as::<_, OutboxRow>(SELECT_BY_STATUS)
            .bind(statuses)
            .fetch_all(&mut **tx)
            .await?;

        rows.into_iter()
            .map(OutboxRow::into_event::<T>)
            .collect::<Result<Vec<_>>>()
            .map_err(|err| match err {
                DomainError::UnknownTopic { name } => DomainError::outbox_repository(format!(
                    "stored event has a topic unknown to this build: {name}"
                )),
                other => other,
            })
    }
}
