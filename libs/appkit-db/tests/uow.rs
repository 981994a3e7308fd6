//! Unit-of-work flush semantics against SQLite.

use appkit_db::{ConnectOpts, DbHandle, UnitOfWork};
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, Schema, Set};

mod note {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "notes")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub body: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

use note::ActiveModel;
use sea_orm::ActiveValue::NotSet;

async fn setup() -> (DbHandle, UnitOfWork) {
    let db = DbHandle::connect("sqlite::memory:", ConnectOpts::default())
        .await
        .unwrap();

    let backend = db.conn().get_database_backend();
    let schema = Schema::new(backend);
    let stmt = schema.create_table_from_entity(note::Entity);
    db.conn().execute(backend.build(&stmt)).await.unwrap();

    let uow = UnitOfWork::new(db.conn().clone());
    (db, uow)
}

fn new_note(body: &str) -> ActiveModel {
    ActiveModel {
        id: NotSet,
        body: Set(body.to_owned()),
    }
}

async fn count(db: &DbHandle) -> u64 {
    note::Entity::find().count(db.conn()).await.unwrap()
}

#[tokio::test]
async fn scoped_flush_applies_only_the_given_entitys_operations() {
    let (db, uow) = setup().await;

    let first = uow.persist(new_note("first"));
    let _second = uow.persist(new_note("second"));
    assert_eq!(uow.pending(), 2);

    let applied = uow.flush(Some(&first)).await.unwrap();
    assert_eq!(applied, 1);
    assert_eq!(uow.pending(), 1);
    assert_eq!(count(&db).await, 1);
}

#[tokio::test]
async fn unscoped_flush_applies_everything_pending() {
    let (db, uow) = setup().await;

    uow.persist(new_note("first"));
    uow.persist(new_note("second"));
    uow.persist(new_note("third"));

    let applied = uow.flush(None).await.unwrap();
    assert_eq!(applied, 3);
    assert_eq!(uow.pending(), 0);
    assert_eq!(count(&db).await, 3);
}

#[tokio::test]
async fn remove_then_flush_deletes_the_row() {
    let (db, uow) = setup().await;

    note::Entity::insert(ActiveModel {
        id: Set(1),
        body: Set("doomed".to_owned()),
    })
    .exec(db.conn())
    .await
    .unwrap();
    assert_eq!(count(&db).await, 1);

    let key = uow.remove(ActiveModel {
        id: Set(1),
        body: Set("doomed".to_owned()),
    });
    uow.flush(Some(&key)).await.unwrap();

    assert_eq!(count(&db).await, 0);
}

#[tokio::test]
async fn failing_operation_aborts_and_keeps_the_remainder_queued() {
    let (db, uow) = setup().await;

    // Updating a row that does not exist fails the save.
    uow.persist(ActiveModel {
        id: Set(999),
        body: Set("ghost".to_owned()),
    });
    uow.persist(new_note("still queued"));

    let result = uow.flush(None).await;
    assert!(result.is_err());
    assert_eq!(uow.pending(), 1, "unapplied tail stays queued");
    assert_eq!(count(&db).await, 0);

    // A later flush applies the survivor.
    uow.flush(None).await.unwrap();
    assert_eq!(count(&db).await, 1);
}

#[tokio::test]
async fn clear_discards_queued_operations() {
    let (db, uow) = setup().await;

    uow.persist(new_note("never applied"));
    uow.clear();

    assert_eq!(uow.pending(), 0);
    assert_eq!(uow.flush(None).await.unwrap(), 0);
    assert_eq!(count(&db).await, 0);
}
