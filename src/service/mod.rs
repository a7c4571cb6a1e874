//! Caller-facing event storage service.
//!
//! [`EventStorage`] runs every logical write (create, apply, delete) in one
//! backend transaction that stages the aggregate change, the events, their
//! relations and one outbox message per event. Publishing happens after
//! commit; a message is removed only once its publish is acknowledged.

mod dto;

pub use dto::{
    ApplyEventsRequest, CreateEventRequest, DeleteEventRequest, EventDto, LoadEventsResponse,
    SaveSnapshotRequest,
};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{Result, StorageError};
use crate::model::{timestamp, Aggregate, Entity, Event, Message, Relation, Snapshot};
use crate::outbox::OutboxConfig;
use crate::paging::{PagingQuery, PagingResult};
use crate::publish::{PublishRequest, Publisher};
use crate::storage::{use_transaction, Session, Stores};

/// Tunables of [`EventStorage`].
#[derive(Debug, Clone)]
pub struct StorageOptions {
    /// Events between two snapshots; 0 disables snapshot hints.
    pub snapshot_count: u64,
    /// Deadline of one operation.
    pub operation_timeout: Duration,
    pub outbox: OutboxConfig,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            snapshot_count: 100,
            operation_timeout: Duration::from_secs(5),
            outbox: OutboxConfig::default(),
        }
    }
}

impl StorageOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            snapshot_count: config.storage.snapshot_count,
            operation_timeout: config.storage.operation_timeout(),
            outbox: config.outbox.clone(),
        }
    }
}

/// Event storage over one backend session.
pub struct EventStorage<S: Session> {
    session: S,
    stores: Stores<S::Conn>,
    publisher: Arc<dyn Publisher>,
    options: StorageOptions,
}

impl<S: Session> EventStorage<S> {
    pub fn new(
        session: S,
        stores: Stores<S::Conn>,
        publisher: Arc<dyn Publisher>,
        options: StorageOptions,
    ) -> Self {
        Self {
            session,
            stores,
            publisher,
            options,
        }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn stores(&self) -> &Stores<S::Conn> {
        &self.stores
    }

    pub fn options(&self) -> &StorageOptions {
        &self.options
    }

    /// Bound a non-transactional operation by the operation deadline.
    async fn bounded<T>(&self, work: impl Future<Output = Result<T>>) -> Result<T> {
        let timeout = self.options.operation_timeout;
        tokio::time::timeout(timeout, work)
            .await
            .map_err(|_| StorageError::Timeout(timeout))?
    }

    /// Latest snapshot of an aggregate plus the events recorded after it.
    pub async fn load_events(
        &self,
        tenant_id: &str,
        aggregate_id: &str,
        aggregate_type: &str,
    ) -> Result<LoadEventsResponse> {
        self.bounded(async {
            let mut handle = self.session.acquire().await?;
            let conn = &mut *handle;

            let aggregate = self
                .stores
                .aggregates
                .find_by_id(conn, tenant_id, aggregate_id)
                .await?;
            let snapshot = self
                .stores
                .snapshots
                .find_by_max_sequence_number(conn, tenant_id, aggregate_id, aggregate_type)
                .await?;
            let after = snapshot.as_ref().map_or(0, |s| s.sequence_number);
            let events = self
                .stores
                .events
                .find_by_sequence_number(conn, tenant_id, aggregate_id, aggregate_type, after)
                .await?;

            debug!(
                tenant_id = %tenant_id,
                aggregate_id = %aggregate_id,
                snapshot_sequence = after,
                events = events.len(),
                "Events loaded"
            );
            Ok(LoadEventsResponse {
                tenant_id: tenant_id.to_string(),
                aggregate_id: aggregate_id.to_string(),
                aggregate_type: aggregate_type.to_string(),
                aggregate,
                snapshot,
                events,
            })
        })
        .await
    }

    /// Create an aggregate with its first events, numbered from 1.
    pub async fn create_event(&self, request: &CreateEventRequest) -> Result<Vec<Event>> {
        require_events(request.events.len())?;
        let count = request.events.len() as u64;
        let aggregate = Aggregate::new(
            &request.tenant_id,
            &request.aggregate_id,
            &request.aggregate_type,
            count,
        );
        aggregate.validate()?;
        self.prepare_relations(&request.aggregate_type, &request.events)
            .await?;

        let events = use_transaction(
            &self.session,
            self.options.operation_timeout,
            |mut tx| async move {
                let result = async {
                    self.stores.aggregates.create(&mut *tx, &aggregate).await?;
                    self.append(
                        &mut *tx,
                        &aggregate.tenant_id,
                        &aggregate.aggregate_id,
                        &aggregate.aggregate_type,
                        &request.events,
                        1,
                    )
                    .await
                }
                .await;
                (tx, result)
            },
        )
        .await?;

        info!(
            tenant_id = %request.tenant_id,
            aggregate_id = %request.aggregate_id,
            events = events.len(),
            "Aggregate created"
        );
        self.publish_all(&events).await?;
        Ok(events)
    }

    /// Append events to an existing, live aggregate.
    pub async fn apply_events(&self, request: &ApplyEventsRequest) -> Result<Vec<Event>> {
        require_events(request.events.len())?;
        let count = request.events.len() as u64;
        self.prepare_relations(&request.aggregate_type, &request.events)
            .await?;

        let events = use_transaction(
            &self.session,
            self.options.operation_timeout,
            |mut tx| async move {
                let result = async {
                    let reservation = self
                        .stores
                        .aggregates
                        .next_sequence_number(
                            &mut *tx,
                            &request.tenant_id,
                            &request.aggregate_id,
                            count,
                        )
                        .await?
                        .ok_or_else(|| not_found(&request.tenant_id, &request.aggregate_id))?;
                    if reservation.aggregate.deleted {
                        return Err(already_deleted(
                            &request.tenant_id,
                            &request.aggregate_id,
                        ));
                    }
                    self.append(
                        &mut *tx,
                        &request.tenant_id,
                        &request.aggregate_id,
                        &request.aggregate_type,
                        &request.events,
                        reservation.first,
                    )
                    .await
                }
                .await;
                (tx, result)
            },
        )
        .await?;

        info!(
            tenant_id = %request.tenant_id,
            aggregate_id = %request.aggregate_id,
            first = events.first().map_or(0, |e| e.sequence_number),
            events = events.len(),
            "Events applied"
        );
        self.publish_all(&events).await?;
        Ok(events)
    }

    /// Mark an aggregate deleted and append the event recording the deletion.
    pub async fn delete_event(&self, request: &DeleteEventRequest) -> Result<Event> {
        let dtos = std::slice::from_ref(&request.event);
        self.prepare_relations(&request.aggregate_type, dtos).await?;

        let mut events = use_transaction(
            &self.session,
            self.options.operation_timeout,
            |mut tx| async move {
                let result = async {
                    let prior = self
                        .stores
                        .aggregates
                        .delete_and_next_sequence_number(
                            &mut *tx,
                            &request.tenant_id,
                            &request.aggregate_id,
                        )
                        .await?
                        .ok_or_else(|| not_found(&request.tenant_id, &request.aggregate_id))?;
                    if prior.deleted {
                        return Err(already_deleted(
                            &request.tenant_id,
                            &request.aggregate_id,
                        ));
                    }
                    self.append(
                        &mut *tx,
                        &request.tenant_id,
                        &request.aggregate_id,
                        &request.aggregate_type,
                        dtos,
                        prior.sequence_number + 1,
                    )
                    .await
                }
                .await;
                (tx, result)
            },
        )
        .await?;

        info!(
            tenant_id = %request.tenant_id,
            aggregate_id = %request.aggregate_id,
            "Aggregate deleted"
        );
        self.publish_all(&events).await?;
        events
            .pop()
            .ok_or_else(|| StorageError::InvalidRequest("delete produced no event".to_string()))
    }

    pub async fn save_snapshot(&self, request: &SaveSnapshotRequest) -> Result<Snapshot> {
        let snapshot = request.to_snapshot();
        snapshot.validate()?;

        use_transaction(
            &self.session,
            self.options.operation_timeout,
            |mut tx| async move {
                let result = self.stores.snapshots.create(&mut *tx, &snapshot).await;
                (tx, result.map(|_| snapshot))
            },
        )
        .await
        .inspect(|snapshot| {
            info!(
                tenant_id = %snapshot.tenant_id,
                aggregate_id = %snapshot.aggregate_id,
                sequence_number = snapshot.sequence_number,
                "Snapshot saved"
            );
        })
    }

    pub async fn exist_aggregate(&self, tenant_id: &str, aggregate_id: &str) -> Result<bool> {
        self.bounded(async {
            let mut handle = self.session.acquire().await?;
            self.stores
                .aggregates
                .exists(&mut *handle, tenant_id, aggregate_id)
                .await
        })
        .await
    }

    pub async fn find_events(&self, query: &PagingQuery) -> Result<PagingResult<Event>> {
        self.bounded(async {
            let mut handle = self.session.acquire().await?;
            self.stores.events.find_paging(&mut *handle, query).await
        })
        .await
    }

    pub async fn find_relations(
        &self,
        aggregate_type: &str,
        query: &PagingQuery,
    ) -> Result<PagingResult<Relation>> {
        self.bounded(async {
            let mut handle = self.session.acquire().await?;
            self.stores
                .relations
                .find_paging(&mut *handle, aggregate_type, query)
                .await
        })
        .await
    }

    /// Destroy an aggregate with its events, snapshots, relations and
    /// pending messages.
    pub async fn delete_aggregate(
        &self,
        tenant_id: &str,
        aggregate_id: &str,
        aggregate_type: &str,
    ) -> Result<()> {
        self.ensure_relation_target(aggregate_type).await?;

        use_transaction(
            &self.session,
            self.options.operation_timeout,
            |mut tx| async move {
                let result = async {
                    let stores = &self.stores;
                    stores
                        .aggregates
                        .delete_by_aggregate_id(&mut *tx, tenant_id, aggregate_id)
                        .await?;
                    stores
                        .events
                        .delete_by_aggregate_id(&mut *tx, tenant_id, aggregate_id)
                        .await?;
                    stores
                        .snapshots
                        .delete_by_aggregate_id(&mut *tx, tenant_id, aggregate_id)
                        .await?;
                    stores
                        .relations
                        .delete_by_aggregate_id(&mut *tx, tenant_id, aggregate_id, aggregate_type)
                        .await?;
                    stores
                        .messages
                        .delete_by_aggregate_id(&mut *tx, tenant_id, aggregate_id)
                        .await
                }
                .await;
                (tx, result)
            },
        )
        .await?;

        info!(
            tenant_id = %tenant_id,
            aggregate_id = %aggregate_id,
            aggregate_type = %aggregate_type,
            "Aggregate destroyed"
        );
        Ok(())
    }

    /// Publish pending messages again, oldest first.
    ///
    /// Only messages older than `min_age_secs` that have failed fewer than
    /// `max_retries` times are eligible. Each message is attempted on its
    /// own; a failure bumps its retry count and the scan goes on. Returns
    /// the number of messages published.
    pub async fn republish_messages(&self, limit: Option<u64>) -> Result<u64> {
        let outbox = &self.options.outbox;
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(outbox.republish_limit);
        let older_than = timestamp::now() - chrono::Duration::seconds(outbox.min_age_secs as i64);

        let pending = self
            .bounded(async {
                let mut handle = self.session.acquire().await?;
                self.stores
                    .messages
                    .find_pending(&mut *handle, older_than, outbox.max_retries, limit)
                    .await
            })
            .await?;

        let mut published = 0;
        for message in &pending {
            match self.publish_event(&message.event).await {
                Ok(()) => published += 1,
                Err(e) => {
                    warn!(
                        event_id = %message.event_id,
                        retry_count = message.retry_count,
                        error = %e,
                        "Republish failed"
                    );
                    self.record_retry(message).await;
                }
            }
        }

        if !pending.is_empty() {
            info!(
                pending = pending.len(),
                published = published,
                "Republish pass finished"
            );
        }
        Ok(published)
    }

    /// Whether an aggregate at `sequence_number` should be snapshotted.
    pub fn snapshot_due(&self, sequence_number: u64) -> bool {
        let every = self.options.snapshot_count;
        every > 0 && sequence_number > 0 && sequence_number % every == 0
    }

    /// Write events numbered from `first`, with their relations and outbox
    /// messages.
    async fn append(
        &self,
        conn: &mut S::Conn,
        tenant_id: &str,
        aggregate_id: &str,
        aggregate_type: &str,
        dtos: &[EventDto],
        first: u64,
    ) -> Result<Vec<Event>> {
        let mut events = Vec::with_capacity(dtos.len());
        for (offset, dto) in dtos.iter().enumerate() {
            let event = dto.to_event(tenant_id, aggregate_id, aggregate_type, first + offset as u64);
            self.stores.events.create(conn, &event).await?;

            let relations = Relation::expand(
                tenant_id,
                &event.event_id,
                &event.event_type,
                aggregate_id,
                aggregate_type,
                &dto.relations,
            )?;
            self.stores
                .relations
                .create_many(conn, tenant_id, &relations)
                .await?;

            self.stores
                .messages
                .create(conn, &Message::new(event.clone()))
                .await?;
            events.push(event);
        }
        Ok(events)
    }

    /// Create the relation target ahead of a write that needs it.
    async fn prepare_relations(&self, aggregate_type: &str, dtos: &[EventDto]) -> Result<()> {
        let needed = dtos
            .iter()
            .any(|dto| dto.relations.values().any(|v| !v.is_empty()));
        if needed {
            self.ensure_relation_target(aggregate_type).await?;
        }
        Ok(())
    }

    async fn ensure_relation_target(&self, aggregate_type: &str) -> Result<String> {
        self.bounded(async {
            let mut handle = self.session.acquire().await?;
            self.stores
                .relations
                .ensure_target(&mut *handle, aggregate_type)
                .await
        })
        .await
    }

    /// Publish every event, then report the first failure if any.
    async fn publish_all(&self, events: &[Event]) -> Result<()> {
        let mut first_error = None;
        for event in events {
            if let Err(e) = self.publish_event(event).await {
                error!(
                    event_id = %event.event_id,
                    error = %e,
                    "Publish failed, message left pending"
                );
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Publish one event and drop its outbox message on success.
    async fn publish_event(&self, event: &Event) -> Result<()> {
        let request = PublishRequest::from_event(event)?;
        self.publisher
            .publish(request)
            .await
            .map_err(|e| StorageError::Publish {
                event_id: event.event_id.clone(),
                message: e.to_string(),
            })?;
        debug!(
            event_id = %event.event_id,
            topic = %event.topic,
            "Event published"
        );

        let removed = self
            .bounded(async {
                let mut handle = self.session.acquire().await?;
                self.stores
                    .messages
                    .delete(&mut *handle, &event.tenant_id, &event.event_id)
                    .await
            })
            .await;
        // The publish already happened; a leftover message only means a
        // duplicate delivery later.
        if let Err(e) = removed {
            warn!(
                event_id = %event.event_id,
                error = %e,
                "Published message could not be removed"
            );
        }
        Ok(())
    }

    async fn record_retry(&self, message: &Message) {
        let result = self
            .bounded(async {
                let mut handle = self.session.acquire().await?;
                self.stores
                    .messages
                    .increment_retry(&mut *handle, &message.tenant_id, &message.id)
                    .await
            })
            .await;
        if let Err(e) = result {
            warn!(event_id = %message.event_id, error = %e, "Retry count not updated");
        }
    }
}

fn require_events(count: usize) -> Result<()> {
    if count == 0 {
        return Err(StorageError::InvalidRequest(
            "at least one event is required".to_string(),
        ));
    }
    Ok(())
}

fn not_found(tenant_id: &str, aggregate_id: &str) -> StorageError {
    StorageError::AggregateNotFound {
        tenant_id: tenant_id.to_string(),
        aggregate_id: aggregate_id.to_string(),
    }
}

fn already_deleted(tenant_id: &str, aggregate_id: &str) -> StorageError {
    StorageError::AlreadyDeleted {
        tenant_id: tenant_id.to_string(),
        aggregate_id: aggregate_id.to_string(),
    }
}
