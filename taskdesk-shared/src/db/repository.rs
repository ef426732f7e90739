/// Generic repository over a single table
///
/// A [`Repository`] borrows the connection of a
/// [`UnitOfWork`](crate::db::unit_of_work::UnitOfWork), so every read and
/// write it performs belongs to that unit's transaction.
///
/// Entity-specific queries are added as inherent `impl Repository<'_, E>`
/// blocks next to each model (see `models::user` and `models::task`).
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::db::unit_of_work::UnitOfWork;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, id: Uuid) -> Result<(), sqlx::Error> {
/// let mut uow = UnitOfWork::begin(&pool).await?;
///
/// // Ad-hoc filter through the queryable handle
/// let mut users = uow.users();
/// let mut query = users.query();
/// query.push(" WHERE name = ").push_bind("Ada".to_string());
/// let adas = users.fetch_all(query).await?;
///
/// let removed = uow.tasks().remove(id).await?;
/// uow.commit().await?;
/// # Ok(())
/// # }
/// ```

use std::marker::PhantomData;

use sqlx::{
    postgres::PgRow,
    query_builder::Separated,
    FromRow, PgConnection, Postgres, QueryBuilder,
};
use uuid::Uuid;

/// A row type stored in one table with a UUID primary key named `id`
pub trait Entity: for<'r> FromRow<'r, PgRow> + Send + Unpin {
    /// Table name
    const TABLE: &'static str;

    /// Every column except `id`, in the order [`Entity::push_values`] binds them
    const COLUMNS: &'static [&'static str];

    /// Primary key
    fn id(&self) -> Uuid;

    /// Binds one value per entry of [`Entity::COLUMNS`]
    fn push_values(&self, values: &mut Separated<'_, 'static, Postgres, &'static str>);

    /// `id, col1, col2, ...`
    fn select_list() -> String {
        let mut list = String::from("id");
        for column in Self::COLUMNS {
            list.push_str(", ");
            list.push_str(column);
        }
        list
    }
}

/// CRUD access to the table of `E`, scoped to one connection
pub struct Repository<'c, E> {
    conn: &'c mut PgConnection,
    _entity: PhantomData<E>,
}

impl<'c, E: Entity> Repository<'c, E> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self {
            conn,
            _entity: PhantomData,
        }
    }

    /// Queryable handle: `SELECT id, ... FROM table`, ready for `WHERE`,
    /// `ORDER BY` and friends. Run it with [`Repository::fetch_all`] or
    /// [`Repository::fetch_optional`].
    pub fn query(&self) -> QueryBuilder<'static, Postgres> {
        QueryBuilder::new(format!("SELECT {} FROM {}", E::select_list(), E::TABLE))
    }

    /// Finds an entity by primary key
    pub async fn get_by_id(&mut self, id: Uuid) -> Result<Option<E>, sqlx::Error> {
        let mut query = self.query();
        query.push(" WHERE id = ").push_bind(id);
        self.fetch_optional(query).await
    }

    /// Inserts `entity` and returns the stored row
    pub async fn add(&mut self, entity: &E) -> Result<E, sqlx::Error> {
        let mut query: QueryBuilder<'static, Postgres> =
            QueryBuilder::new(format!("INSERT INTO {} (", E::TABLE));
        query.push(E::select_list()).push(") VALUES (");

        let mut values = query.separated(", ");
        values.push_bind(entity.id());
        entity.push_values(&mut values);

        query.push(") RETURNING ").push(E::select_list());

        query.build_query_as::<E>().fetch_one(&mut *self.conn).await
    }

    /// Overwrites every non-key column of the row with `entity.id()`
    ///
    /// Returns `None` if no such row exists.
    pub async fn update(&mut self, entity: &E) -> Result<Option<E>, sqlx::Error> {
        let mut query: QueryBuilder<'static, Postgres> =
            QueryBuilder::new(format!("UPDATE {} SET (", E::TABLE));
        query.push(E::COLUMNS.join(", ")).push(") = ROW(");

        let mut values = query.separated(", ");
        entity.push_values(&mut values);

        query
            .push(") WHERE id = ")
            .push_bind(entity.id())
            .push(" RETURNING ")
            .push(E::select_list());

        query
            .build_query_as::<E>()
            .fetch_optional(&mut *self.conn)
            .await
    }

    /// Deletes the row with `id`; returns whether a row was removed
    pub async fn remove(&mut self, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut query: QueryBuilder<'static, Postgres> =
            QueryBuilder::new(format!("DELETE FROM {} WHERE id = ", E::TABLE));
        query.push_bind(id);

        let result = query.build().execute(&mut *self.conn).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Runs a query built from [`Repository::query`]
    pub async fn fetch_all(&mut self, query: QueryBuilder<'static, Postgres>) -> Result<Vec<E>, sqlx::Error> {
        self.fetch_all_as::<E>(query).await
    }

    /// Runs a query built from [`Repository::query`], expecting at most one row
    pub async fn fetch_optional(
        &mut self,
        query: QueryBuilder<'static, Postgres>,
    ) -> Result<Option<E>, sqlx::Error> {
        self.fetch_optional_as::<E>(query).await
    }

    /// Runs an arbitrary query on this repository's connection, mapping rows to `T`
    ///
    /// Used for read models such as joins that don't map onto `E` itself.
    pub async fn fetch_all_as<T>(
        &mut self,
        mut query: QueryBuilder<'static, Postgres>,
    ) -> Result<Vec<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        query.build_query_as::<T>().fetch_all(&mut *self.conn).await
    }

    /// Single-row variant of [`Repository::fetch_all_as`]
    pub async fn fetch_optional_as<T>(
        &mut self,
        mut query: QueryBuilder<'static, Postgres>,
    ) -> Result<Option<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        query
            .build_query_as::<T>()
            .fetch_optional(&mut *self.conn)
            .await
    }
}
