use diesel::prelude::*;
use uuid::Uuid;

use luvo_shared::clients::db::DbPool;
use luvo_shared::errors::{AppError, AppResult};

use crate::schema::stream_payments;

/// Read-side of the payment ledger. Writes happen in the billing service;
/// this service only ever asks whether access was bought.
pub trait PaymentLedger: Send + Sync {
    fn has_completed_payment(&self, stream_id: Uuid, user_id: Uuid) -> AppResult<bool>;
}

pub struct PgPaymentLedger {
    pool: DbPool,
}

impl PgPaymentLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl PaymentLedger for PgPaymentLedger {
    fn has_completed_payment(&self, stream_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| AppError::internal(format!("database connection error: {e}")))?;
        let count: i64 = stream_payments::table
            .filter(stream_payments::stream_id.eq(stream_id))
            .filter(stream_payments::user_id.eq(user_id))
            .filter(stream_payments::status.eq("completed"))
            .count()
            .get_result(&mut conn)?;
        Ok(count > 0)
    }
}

/// In-memory ledger for tests and local runs.
pub mod memory {
    use std::collections::HashSet;
    use std::sync::RwLock;

    use super::*;

    #[derive(Default)]
    pub struct MemoryPaymentLedger {
        paid: RwLock<HashSet<(Uuid, Uuid)>>,
    }

    impl MemoryPaymentLedger {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn mark_paid(&self, stream_id: Uuid, user_id: Uuid) {
            self.paid.write().unwrap().insert((stream_id, user_id));
        }
    }

    impl PaymentLedger for MemoryPaymentLedger {
        fn has_completed_payment(&self, stream_id: Uuid, user_id: Uuid) -> AppResult<bool> {
            Ok(self.paid.read().unwrap().contains(&(stream_id, user_id)))
        }
    }
}
