//! Hotel reservation service (§3.1, §4.4.1): composite-key read-through
//! against per-night booked counts and hotel capacity, write-invalidate on a
//! successful booking. Grounded on
//! `hotelReservation/services/reservation/server.go`'s `MakeReservation`/
//! `CheckAvailability`.
//!
//! Date arithmetic (RFC3339 parsing, day-stepping) is out of scope for this
//! fabric; callers pass the list of night identifiers a stay spans (e.g.
//! `"2024-01-01"`), one read-through per night, matching the source's
//! day-by-day loop.

use crate::aside::{read_through, write_invalidate_many};
use crate::client::CacheClient;
use crate::error::Result;
use crate::scope::Scope;
use crate::store::InMemoryStore;

pub struct ReservationService {
    /// Booked room count per `(hotel_id, night)`, keyed by the composite
    /// cache key itself since it's already a unique primary key.
    booked: InMemoryStore<String, u32>,
    capacity: InMemoryStore<String, u32>,
}

impl ReservationService {
    pub fn new() -> Self {
        Self {
            booked: InMemoryStore::new(),
            capacity: InMemoryStore::new(),
        }
    }

    fn count_key(hotel_id: &str, night: &str) -> String {
        format!("{hotel_id}_{night}")
    }

    fn cap_key(hotel_id: &str) -> String {
        format!("{hotel_id}_cap")
    }

    /// Seeds a hotel's room capacity in the store (test/bootstrap helper;
    /// the source loads this from Mongo at service start).
    pub fn set_capacity(&self, hotel_id: &str, capacity: u32) {
        self.capacity.insert(Self::cap_key(hotel_id), capacity);
    }

    async fn booked_count(&self, cache: &dyn CacheClient, scope: &Scope, hotel_id: &str, night: &str) -> Result<u32> {
        let key = Self::count_key(hotel_id, night);
        Ok(read_through(cache, scope, &key, || async {
            Ok(Some(self.booked.fetch(&key).unwrap_or(0)))
        })
        .await?
        .unwrap_or(0))
    }

    async fn hotel_capacity(&self, cache: &dyn CacheClient, scope: &Scope, hotel_id: &str) -> Result<u32> {
        let key = Self::cap_key(hotel_id);
        Ok(read_through(cache, scope, &key, || async {
            Ok(self.capacity.fetch(&key))
        })
        .await?
        .unwrap_or(0))
    }

    /// Returns whether `room_count` additional rooms fit every night in
    /// `nights` without exceeding the hotel's capacity (§4.4.1).
    pub async fn check_availability(
        &self,
        cache: &dyn CacheClient,
        scope: &Scope,
        hotel_id: &str,
        nights: &[String],
        room_count: u32,
    ) -> Result<bool> {
        let capacity = self.hotel_capacity(cache, scope, hotel_id).await?;
        for night in nights {
            let booked = self.booked_count(cache, scope, hotel_id, night).await?;
            if booked + room_count > capacity {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Books `room_count` rooms across every night in `nights` if capacity
    /// allows, then write-invalidates the per-night count keys it touched
    /// (the source only updates memcached after the availability check
    /// succeeds for every night in the stay).
    pub async fn make_reservation(
        &self,
        cache: &dyn CacheClient,
        scope: &Scope,
        hotel_id: &str,
        nights: &[String],
        room_count: u32,
    ) -> Result<bool> {
        if !self.check_availability(cache, scope, hotel_id, nights, room_count).await? {
            return Ok(false);
        }

        let keys: Vec<String> = nights.iter().map(|night| Self::count_key(hotel_id, night)).collect();
        write_invalidate_many(cache, scope, &keys, || async {
            for night in nights {
                let key = Self::count_key(hotel_id, night);
                let current = self.booked.fetch(&key).unwrap_or(0);
                self.booked.insert(key, current + room_count);
            }
            Ok(())
        })
        .await?;

        Ok(true)
    }
}

impl Default for ReservationService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InternalCacheClient;

    #[tokio::test]
    async fn reservation_within_capacity_succeeds_and_updates_count() {
        let cache = InternalCacheClient::new();
        let scope = Scope::unbounded();
        let service = ReservationService::new();
        service.set_capacity("h1", 10);

        let nights = vec!["2026-01-01".to_string(), "2026-01-02".to_string()];
        let ok = service.make_reservation(cache.as_ref(), &scope, "h1", &nights, 4).await.unwrap();
        assert!(ok);

        let available = service.check_availability(cache.as_ref(), &scope, "h1", &nights, 7).await.unwrap();
        assert!(!available, "4 + 7 exceeds the capacity of 10");
    }

    #[tokio::test]
    async fn reservation_exceeding_capacity_is_rejected_and_leaves_count_unchanged() {
        let cache = InternalCacheClient::new();
        let scope = Scope::unbounded();
        let service = ReservationService::new();
        service.set_capacity("h1", 5);

        let nights = vec!["2026-01-01".to_string()];
        let ok = service.make_reservation(cache.as_ref(), &scope, "h1", &nights, 6).await.unwrap();
        assert!(!ok);

        let count = service.booked_count(cache.as_ref(), &scope, "h1", "2026-01-01").await.unwrap();
        assert_eq!(count, 0);
    }
}
