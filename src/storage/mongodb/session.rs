//! MongoDB client sessions and transactions.

use std::ops::{Deref, DerefMut};

use async_trait::async_trait;
use mongodb::{Client, ClientSession};

use crate::error::Result;
use crate::storage::Session;

/// [`Session`] over a MongoDB client.
///
/// Transactions need a replica set or sharded cluster. The driver aborts
/// a transaction still in progress when its session is dropped.
#[derive(Clone)]
pub struct MongoSession {
    client: Client,
}

impl MongoSession {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// An owned client session, with or without an open transaction.
pub struct OwnedSession(ClientSession);

impl Deref for OwnedSession {
    type Target = ClientSession;

    fn deref(&self) -> &ClientSession {
        &self.0
    }
}

impl DerefMut for OwnedSession {
    fn deref_mut(&mut self) -> &mut ClientSession {
        &mut self.0
    }
}

#[async_trait]
impl Session for MongoSession {
    type Conn = ClientSession;
    type Handle = OwnedSession;
    type Tx = OwnedSession;

    async fn acquire(&self) -> Result<OwnedSession> {
        Ok(OwnedSession(self.client.start_session().await?))
    }

    async fn begin(&self) -> Result<OwnedSession> {
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;
        Ok(OwnedSession(session))
    }

    async fn commit(&self, mut tx: OwnedSession) -> Result<()> {
        Ok(tx.0.commit_transaction().await?)
    }

    async fn rollback(&self, mut tx: OwnedSession) -> Result<()> {
        Ok(tx.0.abort_transaction().await?)
    }
}
