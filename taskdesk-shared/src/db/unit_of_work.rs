/// Unit of work: one database transaction shared by a set of repositories
///
/// Every service operation opens exactly one `UnitOfWork`, performs its
/// reads and writes through the repositories it hands out, and calls
/// [`UnitOfWork::commit`] once. Dropping a unit without committing rolls the
/// transaction back and returns the connection to the pool.
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::db::unit_of_work::UnitOfWork;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let mut uow = UnitOfWork::begin(&pool).await?;
/// let user = uow.users().find_by_email("ada@example.com").await?;
/// uow.commit().await?;
/// # Ok(())
/// # }
/// ```

use sqlx::{PgPool, Postgres, Transaction};
use tracing::trace;

use super::repository::{Entity, Repository};
use crate::models::{task::Task, user::User};

pub struct UnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl UnitOfWork {
    /// Acquires a pooled connection and starts a transaction on it
    pub async fn begin(pool: &PgPool) -> Result<Self, sqlx::Error> {
        let tx = pool.begin().await?;
        trace!("Unit of work started");
        Ok(Self { tx })
    }

    /// Repository for any entity type, bound to this transaction
    pub fn repository<E: Entity>(&mut self) -> Repository<'_, E> {
        Repository::new(&mut *self.tx)
    }

    pub fn users(&mut self) -> Repository<'_, User> {
        self.repository()
    }

    pub fn tasks(&mut self) -> Repository<'_, Task> {
        self.repository()
    }

    /// Commits every write made through this unit atomically
    pub async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await?;
        trace!("Unit of work committed");
        Ok(())
    }

    /// Discards every write made through this unit
    pub async fn rollback(self) -> Result<(), sqlx::Error> {
        self.tx.rollback().await?;
        trace!("Unit of work rolled back");
        Ok(())
    }
}
