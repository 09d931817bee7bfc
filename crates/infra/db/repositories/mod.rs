pub mod bookings;
pub mod catalog;
pub mod payments;

use std::sync::Arc;

use anyhow::anyhow;
use diesel::{
    PgConnection,
    result::{DatabaseErrorKind, Error as DieselError},
};
use tokio::task;

use crate::{
    domain::errors::{StoreError, StoreResult},
    infra::db::postgres::postgres_connection::{PgPoolSquad, checkout},
};

/// Exclusion constraint that keeps active room intervals disjoint.
pub const BOOKING_ROOM_OVERLAP_CONSTRAINT: &str = "bookings_room_no_overlap";

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::Conflict(info.message().to_string())
            }
            DieselError::DatabaseError(_, info)
                if info.constraint_name() == Some(BOOKING_ROOM_OVERLAP_CONSTRAINT) =>
            {
                StoreError::Conflict(info.message().to_string())
            }
            other => StoreError::Internal(anyhow!(other)),
        }
    }
}

/// Diesel is synchronous; pool checkouts, row-lock waits and queries run on the
/// blocking threadpool so they never park a Tokio worker.
pub(crate) async fn run_blocking<T, F>(db_pool: &Arc<PgPoolSquad>, work: F) -> StoreResult<T>
where
    T: Send + 'static,
    F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
{
    let db_pool = Arc::clone(db_pool);

    task::spawn_blocking(move || {
        let mut conn = checkout(&db_pool)?;
        work(&mut *conn)
    })
    .await
    .map_err(|err| StoreError::Internal(anyhow!("database task failed: {err}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::bookings::BookingRepository;
    use bookings::BookingPostgres;
    use diesel::r2d2::{ConnectionManager, Pool};
    use std::time::Duration;
    use uuid::Uuid;

    /// Nothing listens on port 1, so every checkout waits out the pool timeout.
    fn unreachable_pool() -> Arc<PgPoolSquad> {
        let manager = ConnectionManager::<PgConnection>::new("postgres://hms@127.0.0.1:1/hms");
        let pool = Pool::builder()
            .max_size(1)
            .min_idle(Some(0))
            .connection_timeout(Duration::from_millis(800))
            .build_unchecked(manager);
        Arc::new(pool)
    }

    #[tokio::test]
    async fn stalled_checkout_leaves_the_runtime_thread_free() {
        let repo = BookingPostgres::new(unreachable_pool());
        let lookup = repo.find_by_id(Uuid::new_v4());
        tokio::pin!(lookup);

        tokio::select! {
            _ = &mut lookup => panic!("lookup finished before the timer"),
            _ = tokio::time::sleep(Duration::from_millis(50)) => {}
        }

        let result = lookup.await;
        assert!(matches!(result, Err(StoreError::Internal(_))));
    }
}
