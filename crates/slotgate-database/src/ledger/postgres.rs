//! PostgreSQL slot ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, info};

use slotgate_core::result::AppResult;
use slotgate_core::types::id::{EventId, ReservationId, SessionId};
use slotgate_entity::event::EventCapacity;
use slotgate_entity::reservation::{NewHold, Reservation};

use super::{ConfirmOutcome, HoldOutcome, HolderDetails, SlotLedger};
use crate::error::{db_error, is_unique_violation};

const CAPACITY_SELECT: &str = "SELECT e.id AS event_id, \
     e.total_slots::BIGINT AS total_slots, \
     COUNT(r.id) AS taken \
     FROM events e \
     LEFT JOIN reservations r ON r.event_id = e.id \
     AND (r.status = 'confirmed' OR r.expires_at >= NOW())";

/// Slot ledger backed by the `events` and `reservations` tables.
#[derive(Debug, Clone)]
pub struct PgSlotLedger {
    pool: PgPool,
}

impl PgSlotLedger {
    /// Create a new ledger over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SlotLedger for PgSlotLedger {
    async fn create_reservation_if_capacity(&self, hold: NewHold) -> AppResult<HoldOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin hold transaction"))?;

        // Serializes every capacity check for this event.
        let total_slots: Option<i32> =
            sqlx::query_scalar("SELECT total_slots FROM events WHERE id = $1 FOR UPDATE")
                .bind(hold.event_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error("Failed to lock event"))?;

        let Some(total_slots) = total_slots else {
            return Ok(HoldOutcome::UnknownEvent);
        };

        let reaped = sqlx::query(
            "DELETE FROM reservations \
             WHERE event_id = $1 AND status = 'temporary' AND expires_at < $2",
        )
        .bind(hold.event_id)
        .bind(hold.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to reap expired holds"))?
        .rows_affected();

        if reaped > 0 {
            debug!(event_id = %hold.event_id, reaped, "Reaped expired holds before capacity check");
        }

        let duplicate: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM reservations \
             WHERE event_id = $1 AND session_id = $2 AND status = 'temporary')",
        )
        .bind(hold.event_id)
        .bind(hold.session_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to check for duplicate hold"))?;

        if duplicate {
            tx.commit()
                .await
                .map_err(db_error("Failed to commit hold transaction"))?;
            return Ok(HoldOutcome::DuplicateHold);
        }

        let taken: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM reservations WHERE event_id = $1")
                .bind(hold.event_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(db_error("Failed to count reservations"))?;

        if taken >= i64::from(total_slots) {
            tx.commit()
                .await
                .map_err(db_error("Failed to commit hold transaction"))?;
            return Ok(HoldOutcome::NoCapacity);
        }

        let inserted = sqlx::query_as::<_, Reservation>(
            "INSERT INTO reservations (id, event_id, session_id, status, created_at, expires_at) \
             VALUES ($1, $2, $3, 'temporary', $4, $5) \
             RETURNING *",
        )
        .bind(ReservationId::new())
        .bind(hold.event_id)
        .bind(hold.session_id)
        .bind(hold.created_at)
        .bind(hold.expires_at)
        .fetch_one(&mut *tx)
        .await;

        let reservation = match inserted {
            Ok(reservation) => reservation,
            Err(e) if is_unique_violation(&e) => return Ok(HoldOutcome::DuplicateHold),
            Err(e) => return Err(db_error("Failed to insert hold")(e)),
        };

        tx.commit()
            .await
            .map_err(db_error("Failed to commit hold transaction"))?;

        info!(
            reservation_id = %reservation.id,
            event_id = %reservation.event_id,
            "Temporary hold persisted"
        );
        Ok(HoldOutcome::Held(reservation))
    }

    async fn get_reservation(&self, id: ReservationId) -> AppResult<Option<Reservation>> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find reservation"))
    }

    async fn confirm_reservation(
        &self,
        id: ReservationId,
        session_id: SessionId,
        holder: &HolderDetails,
        now: DateTime<Utc>,
    ) -> AppResult<ConfirmOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin confirm transaction"))?;

        let existing = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations \
             WHERE id = $1 AND session_id = $2 AND status = 'temporary' \
             FOR UPDATE",
        )
        .bind(id)
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to lock reservation"))?;

        let Some(existing) = existing else {
            return Ok(ConfirmOutcome::NotFound);
        };

        if existing.is_expired_at(now) {
            sqlx::query("DELETE FROM reservations WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to delete expired hold"))?;
            tx.commit()
                .await
                .map_err(db_error("Failed to commit confirm transaction"))?;
            return Ok(ConfirmOutcome::Expired(existing));
        }

        let confirmed = sqlx::query_as::<_, Reservation>(
            "UPDATE reservations \
             SET status = 'confirmed', expires_at = NULL, session_id = NULL, \
                 holder_name = $2, holder_contact = $3 \
             WHERE id = $1 \
             RETURNING *",
        )
        .bind(id)
        .bind(&holder.name)
        .bind(&holder.contact)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to confirm reservation"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit confirm transaction"))?;

        Ok(ConfirmOutcome::Confirmed(confirmed))
    }

    async fn delete_reservation(
        &self,
        id: ReservationId,
        session_id: SessionId,
    ) -> AppResult<Option<Reservation>> {
        sqlx::query_as::<_, Reservation>(
            "DELETE FROM reservations \
             WHERE id = $1 AND session_id = $2 AND status = 'temporary' \
             RETURNING *",
        )
        .bind(id)
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to delete reservation"))
    }

    async fn delete_temporary_for_session(
        &self,
        session_id: SessionId,
    ) -> AppResult<Vec<Reservation>> {
        sqlx::query_as::<_, Reservation>(
            "DELETE FROM reservations \
             WHERE session_id = $1 AND status = 'temporary' \
             RETURNING *",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to delete session holds"))
    }

    async fn list_expired_temporary(&self, now: DateTime<Utc>) -> AppResult<Vec<Reservation>> {
        sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations \
             WHERE status = 'temporary' AND expires_at < $1 \
             ORDER BY expires_at ASC",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list expired holds"))
    }

    async fn delete_expired_temporary(
        &self,
        id: ReservationId,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "DELETE FROM reservations \
             WHERE id = $1 AND status = 'temporary' AND expires_at < $2",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to delete expired hold"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn event_capacity(&self, event_id: EventId) -> AppResult<Option<EventCapacity>> {
        sqlx::query_as::<_, EventCapacity>(&format!(
            "{CAPACITY_SELECT} WHERE e.id = $1 GROUP BY e.id"
        ))
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to compute event capacity"))
    }

    async fn list_capacities(&self) -> AppResult<Vec<EventCapacity>> {
        sqlx::query_as::<_, EventCapacity>(&format!(
            "{CAPACITY_SELECT} GROUP BY e.id ORDER BY e.scheduled_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list event capacities"))
    }
}
