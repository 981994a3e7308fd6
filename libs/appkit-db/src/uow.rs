//! Unit of work: queued entity operations with scoped flush.
//!
//! SeaORM executes statements eagerly; this layer restores the
//! queue-then-flush shape the application helpers expose. Operations are
//! tagged with an [`EntityKey`] (table + primary key) so a flush can be
//! scoped to one entity's changes or apply everything pending.

use async_trait::async_trait;
use parking_lot::Mutex;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ActiveValue, DatabaseConnection, DbErr, EntityName,
    EntityTrait, IntoActiveModel, Iterable, PrimaryKeyToColumn,
};

use crate::{DbError, Result};

/// Identifies the entity an operation belongs to: table name plus the
/// primary key rendered as text (composite keys joined with `/`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntityKey {
    table: String,
    id: String,
}

impl EntityKey {
    #[must_use]
    pub fn new(table: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            id: id.into(),
        }
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.table, self.id)
    }
}

/// Key of an active model: its entity's table plus the current primary key
/// values. Unset key parts render as `?` (yet-to-be-generated ids).
pub fn entity_key_of<A>(entity: &A) -> EntityKey
where
    A: ActiveModelTrait,
{
    let table = <A::Entity as Default>::default().table_name().to_owned();

    let mut parts = Vec::new();
    for pk in <A::Entity as EntityTrait>::PrimaryKey::iter() {
        let col = pk.into_column();
        let part = match entity.get(col) {
            ActiveValue::Set(v) | ActiveValue::Unchanged(v) => format!("{v:?}"),
            ActiveValue::NotSet => "?".to_owned(),
        };
        parts.push(part);
    }

    EntityKey::new(table, parts.join("/"))
}

#[async_trait]
trait PendingOp: Send + Sync {
    async fn apply(&self, conn: &DatabaseConnection) -> std::result::Result<(), DbErr>;
}

struct SaveOp<A>(A);

#[async_trait]
impl<A> PendingOp for SaveOp<A>
where
    A: ActiveModelTrait + ActiveModelBehavior + Clone + Send + Sync + 'static,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
{
    async fn apply(&self, conn: &DatabaseConnection) -> std::result::Result<(), DbErr> {
        self.0.clone().save(conn).await.map(|_| ())
    }
}

struct DeleteOp<A>(A);

#[async_trait]
impl<A> PendingOp for DeleteOp<A>
where
    A: ActiveModelTrait + ActiveModelBehavior + Clone + Send + Sync + 'static,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
{
    async fn apply(&self, conn: &DatabaseConnection) -> std::result::Result<(), DbErr> {
        self.0.clone().delete(conn).await.map(|_| ())
    }
}

struct Pending {
    key: EntityKey,
    op: Box<dyn PendingOp>,
}

/// In-memory queue of pending entity operations.
pub struct UnitOfWork {
    conn: DatabaseConnection,
    queue: Mutex<Vec<Pending>>,
    seq: std::sync::atomic::AtomicU64,
}

impl UnitOfWork {
    #[must_use]
    pub fn new(conn: DatabaseConnection) -> Self {
        Self {
            conn,
            queue: Mutex::new(Vec::new()),
            seq: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Entities whose primary key is not set yet all render the same `?`
    /// key; give each queued operation a distinct one so a scoped flush
    /// only applies that operation.
    fn disambiguate(&self, key: EntityKey) -> EntityKey {
        if !key.id().contains('?') {
            return key;
        }
        let seq = self
            .seq
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        EntityKey::new(key.table().to_owned(), format!("pending-{seq}"))
    }

    #[must_use]
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Queue an insert/update for the entity; returns its key.
    pub fn persist<A>(&self, entity: A) -> EntityKey
    where
        A: ActiveModelTrait + ActiveModelBehavior + Clone + Send + Sync + 'static,
        <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    {
        let key = self.disambiguate(entity_key_of(&entity));
        self.queue.lock().push(Pending {
            key: key.clone(),
            op: Box::new(SaveOp(entity)),
        });
        key
    }

    /// Queue a removal for the entity; returns its key.
    pub fn remove<A>(&self, entity: A) -> EntityKey
    where
        A: ActiveModelTrait + ActiveModelBehavior + Clone + Send + Sync + 'static,
        <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    {
        let key = self.disambiguate(entity_key_of(&entity));
        self.queue.lock().push(Pending {
            key: key.clone(),
            op: Box::new(DeleteOp(entity)),
        });
        key
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Drop every queued operation without applying it.
    pub fn clear(&self) {
        self.queue.lock().clear();
    }

    /// Apply queued operations in insertion order and return how many ran.
    ///
    /// `flush(Some(&key))` applies only operations queued for that entity;
    /// `flush(None)` applies everything pending. A failing operation aborts
    /// the flush: it and the already-applied operations are gone, the
    /// not-yet-applied remainder stays queued.
    ///
    /// # Errors
    /// Surfaces the first failing operation.
    pub async fn flush(&self, only: Option<&EntityKey>) -> Result<usize> {
        let to_apply: Vec<Pending> = {
            let mut queue = self.queue.lock();
            match only {
                None => queue.drain(..).collect(),
                Some(key) => {
                    let mut kept = Vec::with_capacity(queue.len());
                    let mut taken = Vec::new();
                    for pending in queue.drain(..) {
                        if &pending.key == key {
                            taken.push(pending);
                        } else {
                            kept.push(pending);
                        }
                    }
                    *queue = kept;
                    taken
                }
            }
        };

        let mut iter = to_apply.into_iter();
        let mut applied = 0usize;
        while let Some(pending) = iter.next() {
            if let Err(e) = pending.op.apply(&self.conn).await {
                tracing::warn!(key = %pending.key, error = %e, "flush aborted");
                let mut queue = self.queue.lock();
                let mut requeued: Vec<Pending> = iter.collect();
                requeued.append(&mut *queue);
                *queue = requeued;
                return Err(DbError::from(e));
            }
            applied += 1;
        }
        Ok(applied)
    }
}
