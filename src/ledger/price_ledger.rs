//! In-memory per-user price ledger with weekly epochs.
//!
//! Each user owns one record for the current in-game week: the Sunday buy
//! price plus an append-only list of slot observations. Mutations are
//! serialized per user behind a write lock; snapshot reads share a read
//! lock and always see a whole week atomically. The ledger performs no
//! I/O; persistence belongs to an external collaborator.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::types::{BestPrice, LedgerConfig, LedgerError, Observation, MAX_PRICE};
use crate::types::{Slot, UserId, WeekPriceSeries, SLOTS_PER_WEEK};

/// One user's mutable state: the current week plus the archived series
/// from the week before it.
#[derive(Debug)]
struct UserWeek {
    /// Sunday date the current record belongs to.
    week_start: NaiveDate,
    buy_price: Option<u32>,
    buy_logged_at: Option<DateTime<Utc>>,
    /// Insertion-ordered slot observations; `seq` is strictly increasing.
    observations: Vec<Observation>,
    next_seq: u64,
    /// Series superseded at the most recent rollover, if it held data.
    previous: Option<WeekPriceSeries>,
}

impl UserWeek {
    fn new(week_start: NaiveDate) -> Self {
        Self {
            week_start,
            buy_price: None,
            buy_logged_at: None,
            observations: Vec::new(),
            next_seq: 0,
            previous: None,
        }
    }

    fn snapshot(&self) -> WeekPriceSeries {
        let mut slot_prices = [None; SLOTS_PER_WEEK];
        for obs in &self.observations {
            slot_prices[obs.slot.index()] = Some(obs.price);
        }
        WeekPriceSeries {
            buy_price: self.buy_price,
            slot_prices,
        }
    }
}

/// Per-user, per-week store of observed prices.
pub struct PriceLedger {
    config: LedgerConfig,
    users: RwLock<HashMap<UserId, Arc<RwLock<UserWeek>>>>,
}

impl PriceLedger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            users: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Sunday date of the in-game week containing `now`.
    fn week_start_for(&self, now: DateTime<Utc>) -> NaiveDate {
        let local = now + Duration::hours(self.config.utc_offset_hours as i64);
        let date = local.date_naive();
        date - Duration::days(date.weekday().num_days_from_sunday() as i64)
    }

    async fn user_entry(&self, user: UserId, now: DateTime<Utc>) -> Arc<RwLock<UserWeek>> {
        if let Some(entry) = self.users.read().await.get(&user) {
            return entry.clone();
        }
        let week_start = self.week_start_for(now);
        let mut users = self.users.write().await;
        users
            .entry(user)
            .or_insert_with(|| Arc::new(RwLock::new(UserWeek::new(week_start))))
            .clone()
    }

    /// Advance a user record past any weekly epoch boundary it has crossed.
    /// The superseded series is archived only when the record is exactly
    /// one week stale; after a longer gap it is no longer "last week".
    fn roll_week(&self, user: UserId, week: &mut UserWeek, now: DateTime<Utc>) {
        let current = self.week_start_for(now);
        if week.week_start == current {
            return;
        }
        let superseded = week.snapshot();
        let one_week_stale =
            current.signed_duration_since(week.week_start) == Duration::days(7);
        week.previous = (one_week_stale && !superseded.is_empty()).then_some(superseded);
        info!(
            user,
            old_week = %week.week_start,
            new_week = %current,
            "rolled ledger to a new in-game week"
        );
        week.week_start = current;
        week.buy_price = None;
        week.buy_logged_at = None;
        week.observations.clear();
    }

    /// Read-path view of the current week; never mutates, so a stale
    /// record simply reads as empty until the next mutation rolls it.
    fn effective_series(&self, week: &UserWeek, now: DateTime<Utc>) -> WeekPriceSeries {
        if week.week_start == self.week_start_for(now) {
            week.snapshot()
        } else {
            WeekPriceSeries::default()
        }
    }

    fn effective_previous(&self, week: &UserWeek, now: DateTime<Utc>) -> Option<WeekPriceSeries> {
        let current = self.week_start_for(now);
        if week.week_start == current {
            return week.previous.clone();
        }
        if current.signed_duration_since(week.week_start) == Duration::days(7) {
            let superseded = week.snapshot();
            return (!superseded.is_empty()).then_some(superseded);
        }
        None
    }

    fn validate_price(price: u32) -> Result<(), LedgerError> {
        if price == 0 || price > MAX_PRICE {
            return Err(LedgerError::InvalidPrice { price });
        }
        Ok(())
    }

    /// Log the Sunday buy price, overwriting any prior buy price for the
    /// current week.
    pub async fn set_buy_price(&self, user: UserId, price: u32) -> Result<(), LedgerError> {
        self.set_buy_price_at(user, price, Utc::now()).await
    }

    /// Clock-explicit variant of [`set_buy_price`](Self::set_buy_price).
    pub async fn set_buy_price_at(
        &self,
        user: UserId,
        price: u32,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        Self::validate_price(price)?;
        let entry = self.user_entry(user, now).await;
        let mut week = entry.write().await;
        self.roll_week(user, &mut week, now);
        week.buy_price = Some(price);
        week.buy_logged_at = Some(now);
        debug!(user, price, "logged buy price");
        Ok(())
    }

    /// Log a half-day sell price. A slot can hold at most one price per
    /// week; changing it requires an undo or a clear first.
    pub async fn set_slot_price(
        &self,
        user: UserId,
        slot_index: usize,
        price: u32,
    ) -> Result<Slot, LedgerError> {
        self.set_slot_price_at(user, slot_index, price, Utc::now())
            .await
    }

    /// Clock-explicit variant of [`set_slot_price`](Self::set_slot_price).
    pub async fn set_slot_price_at(
        &self,
        user: UserId,
        slot_index: usize,
        price: u32,
        now: DateTime<Utc>,
    ) -> Result<Slot, LedgerError> {
        let slot =
            Slot::from_index(slot_index).ok_or(LedgerError::InvalidSlot { index: slot_index })?;
        Self::validate_price(price)?;
        let entry = self.user_entry(user, now).await;
        let mut week = entry.write().await;
        self.roll_week(user, &mut week, now);
        if week.observations.iter().any(|obs| obs.slot == slot) {
            return Err(LedgerError::SlotAlreadySet { slot });
        }
        let seq = week.next_seq;
        week.next_seq += 1;
        week.observations.push(Observation {
            slot,
            price,
            seq,
            logged_at: now,
        });
        debug!(user, slot = slot.index(), price, seq, "logged sell price");
        Ok(slot)
    }

    /// Remove and return the most recently entered slot observation
    /// (highest insertion sequence, regardless of slot order).
    pub async fn undo_last(&self, user: UserId) -> Result<Observation, LedgerError> {
        self.undo_last_at(user, Utc::now()).await
    }

    /// Clock-explicit variant of [`undo_last`](Self::undo_last).
    pub async fn undo_last_at(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<Observation, LedgerError> {
        let entry = self.user_entry(user, now).await;
        let mut week = entry.write().await;
        self.roll_week(user, &mut week, now);
        let index = week
            .observations
            .iter()
            .enumerate()
            .max_by_key(|(_, obs)| obs.seq)
            .map(|(i, _)| i)
            .ok_or(LedgerError::NothingToUndo)?;
        let removed = week.observations.remove(index);
        debug!(
            user,
            slot = removed.slot.index(),
            price = removed.price,
            "undid last logged price"
        );
        Ok(removed)
    }

    /// Drop all buy and slot prices for the user's current week. The
    /// archived previous week is untouched.
    pub async fn clear(&self, user: UserId) {
        self.clear_at(user, Utc::now()).await;
    }

    /// Clock-explicit variant of [`clear`](Self::clear).
    pub async fn clear_at(&self, user: UserId, now: DateTime<Utc>) {
        let entry = self.user_entry(user, now).await;
        let mut week = entry.write().await;
        self.roll_week(user, &mut week, now);
        week.buy_price = None;
        week.buy_logged_at = None;
        week.observations.clear();
        debug!(user, "cleared current week");
    }

    /// Immutable snapshot of the user's current week.
    pub async fn get_series(&self, user: UserId) -> WeekPriceSeries {
        self.get_series_at(user, Utc::now()).await
    }

    /// Clock-explicit variant of [`get_series`](Self::get_series).
    pub async fn get_series_at(&self, user: UserId, now: DateTime<Utc>) -> WeekPriceSeries {
        let users = self.users.read().await;
        match users.get(&user) {
            Some(entry) => {
                let week = entry.read().await;
                self.effective_series(&week, now)
            }
            None => WeekPriceSeries::default(),
        }
    }

    /// The user's observations for the current week in insertion order.
    pub async fn history(&self, user: UserId) -> Vec<Observation> {
        self.history_at(user, Utc::now()).await
    }

    /// Clock-explicit variant of [`history`](Self::history).
    pub async fn history_at(&self, user: UserId, now: DateTime<Utc>) -> Vec<Observation> {
        let users = self.users.read().await;
        match users.get(&user) {
            Some(entry) => {
                let week = entry.read().await;
                if week.week_start == self.week_start_for(now) {
                    week.observations.clone()
                } else {
                    Vec::new()
                }
            }
            None => Vec::new(),
        }
    }

    /// The series archived at the most recent weekly rollover, if any.
    pub async fn previous_week(&self, user: UserId) -> Option<WeekPriceSeries> {
        self.previous_week_at(user, Utc::now()).await
    }

    /// Clock-explicit variant of [`previous_week`](Self::previous_week).
    pub async fn previous_week_at(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Option<WeekPriceSeries> {
        let users = self.users.read().await;
        let entry = users.get(&user)?;
        let week = entry.read().await;
        self.effective_previous(&week, now)
    }

    /// Every user's best sell price logged inside the recency window,
    /// highest first. Ties break on user id so output never depends on
    /// map iteration order.
    pub async fn best_sell_prices(&self) -> Vec<BestPrice> {
        self.best_sell_prices_at(Utc::now()).await
    }

    /// Clock-explicit variant of [`best_sell_prices`](Self::best_sell_prices).
    pub async fn best_sell_prices_at(&self, now: DateTime<Utc>) -> Vec<BestPrice> {
        let cutoff = now - Duration::hours(self.config.best_price_window_hours);
        let current = self.week_start_for(now);
        let users = self.users.read().await;
        let mut best = Vec::new();
        for (&user, entry) in users.iter() {
            let week = entry.read().await;
            if week.week_start != current {
                continue;
            }
            let top = week
                .observations
                .iter()
                .filter(|obs| obs.logged_at > cutoff)
                .max_by_key(|obs| (obs.price, obs.seq));
            if let Some(obs) = top {
                best.push(BestPrice {
                    user,
                    price: obs.price,
                    logged_at: obs.logged_at,
                });
            }
        }
        best.sort_by(|a, b| b.price.cmp(&a.price).then(a.user.cmp(&b.user)));
        best
    }

    /// Every user's buy price logged inside the recency window, lowest
    /// first (the cheapest island to buy on).
    pub async fn best_buy_prices(&self) -> Vec<BestPrice> {
        self.best_buy_prices_at(Utc::now()).await
    }

    /// Clock-explicit variant of [`best_buy_prices`](Self::best_buy_prices).
    pub async fn best_buy_prices_at(&self, now: DateTime<Utc>) -> Vec<BestPrice> {
        let cutoff = now - Duration::hours(self.config.best_price_window_hours);
        let current = self.week_start_for(now);
        let users = self.users.read().await;
        let mut best = Vec::new();
        for (&user, entry) in users.iter() {
            let week = entry.read().await;
            if week.week_start != current {
                continue;
            }
            if let (Some(price), Some(logged_at)) = (week.buy_price, week.buy_logged_at) {
                if logged_at > cutoff {
                    best.push(BestPrice {
                        user,
                        price,
                        logged_at,
                    });
                }
            }
        }
        best.sort_by(|a, b| a.price.cmp(&b.price).then(a.user.cmp(&b.user)));
        best
    }
}

impl Default for PriceLedger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const ALICE: UserId = 100;
    const BOB: UserId = 200;

    /// Wednesday 2020-04-08 12:00 UTC; its week starts Sunday 2020-04-05.
    fn midweek() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 4, 8, 12, 0, 0).unwrap()
    }

    fn create_test_ledger() -> PriceLedger {
        PriceLedger::new(LedgerConfig::default())
    }

    #[tokio::test]
    async fn test_set_and_get_roundtrip() {
        let ledger = create_test_ledger();
        let now = midweek();

        ledger.set_buy_price_at(ALICE, 101, now).await.unwrap();
        ledger.set_slot_price_at(ALICE, 3, 88, now).await.unwrap();

        let series = ledger.get_series_at(ALICE, now).await;
        assert_eq!(series.buy_price, Some(101));
        assert_eq!(series.slot_prices[3], Some(88));
        assert_eq!(series.observed_count(), 1);
    }

    #[tokio::test]
    async fn test_price_validation() {
        let ledger = create_test_ledger();
        let now = midweek();

        assert_eq!(
            ledger.set_buy_price_at(ALICE, 0, now).await,
            Err(LedgerError::InvalidPrice { price: 0 })
        );
        assert_eq!(
            ledger.set_slot_price_at(ALICE, 0, 5_000, now).await,
            Err(LedgerError::InvalidPrice { price: 5_000 })
        );
        assert_eq!(
            ledger.set_slot_price_at(ALICE, 12, 100, now).await,
            Err(LedgerError::InvalidSlot { index: 12 })
        );

        // Rejected mutations leave no trace.
        assert!(ledger.get_series_at(ALICE, now).await.is_empty());
    }

    #[tokio::test]
    async fn test_buy_price_overwrites() {
        let ledger = create_test_ledger();
        let now = midweek();

        ledger.set_buy_price_at(ALICE, 95, now).await.unwrap();
        ledger.set_buy_price_at(ALICE, 104, now).await.unwrap();
        assert_eq!(ledger.get_series_at(ALICE, now).await.buy_price, Some(104));
    }

    #[tokio::test]
    async fn test_slot_is_immutable_once_set() {
        let ledger = create_test_ledger();
        let now = midweek();

        let slot = ledger.set_slot_price_at(ALICE, 6, 140, now).await.unwrap();
        assert_eq!(
            ledger.set_slot_price_at(ALICE, 6, 150, now).await,
            Err(LedgerError::SlotAlreadySet { slot })
        );

        // Undo frees the slot for a corrected entry.
        ledger.undo_last_at(ALICE, now).await.unwrap();
        ledger.set_slot_price_at(ALICE, 6, 150, now).await.unwrap();
        let series = ledger.get_series_at(ALICE, now).await;
        assert_eq!(series.slot_prices[6], Some(150));
    }

    #[tokio::test]
    async fn test_undo_follows_insertion_order_not_slot_order() {
        let ledger = create_test_ledger();
        let now = midweek();

        // Logged out of chronological order: Friday AM before Monday PM.
        ledger.set_slot_price_at(ALICE, 8, 60, now).await.unwrap();
        ledger.set_slot_price_at(ALICE, 1, 92, now).await.unwrap();

        let removed = ledger.undo_last_at(ALICE, now).await.unwrap();
        assert_eq!(removed.slot.index(), 1);
        assert_eq!(removed.price, 92);

        let series = ledger.get_series_at(ALICE, now).await;
        assert_eq!(series.slot_prices[8], Some(60));
        assert_eq!(series.slot_prices[1], None);
    }

    #[tokio::test]
    async fn test_undo_drains_to_nothing_and_no_further() {
        let ledger = create_test_ledger();
        let now = midweek();

        ledger.set_buy_price_at(ALICE, 100, now).await.unwrap();
        ledger.set_slot_price_at(ALICE, 0, 80, now).await.unwrap();
        ledger.set_slot_price_at(ALICE, 2, 75, now).await.unwrap();

        assert!(ledger.undo_last_at(ALICE, now).await.is_ok());
        assert!(ledger.undo_last_at(ALICE, now).await.is_ok());
        assert_eq!(
            ledger.undo_last_at(ALICE, now).await,
            Err(LedgerError::NothingToUndo)
        );
        assert_eq!(
            ledger.undo_last_at(ALICE, now).await,
            Err(LedgerError::NothingToUndo)
        );

        // The buy price is not an undoable observation.
        assert_eq!(ledger.get_series_at(ALICE, now).await.buy_price, Some(100));
    }

    #[tokio::test]
    async fn test_clear_empties_current_week() {
        let ledger = create_test_ledger();
        let now = midweek();

        ledger.set_buy_price_at(ALICE, 108, now).await.unwrap();
        ledger.set_slot_price_at(ALICE, 0, 90, now).await.unwrap();
        ledger.clear_at(ALICE, now).await;

        assert!(ledger.get_series_at(ALICE, now).await.is_empty());
        assert!(ledger.history_at(ALICE, now).await.is_empty());
    }

    #[tokio::test]
    async fn test_history_preserves_insertion_order() {
        let ledger = create_test_ledger();
        let now = midweek();

        ledger.set_slot_price_at(ALICE, 5, 110, now).await.unwrap();
        ledger.set_slot_price_at(ALICE, 0, 85, now).await.unwrap();
        ledger.set_slot_price_at(ALICE, 9, 45, now).await.unwrap();

        let history = ledger.history_at(ALICE, now).await;
        let slots: Vec<_> = history.iter().map(|obs| obs.slot.index()).collect();
        assert_eq!(slots, vec![5, 0, 9]);
        assert!(history.windows(2).all(|w| w[0].seq < w[1].seq));
    }

    #[tokio::test]
    async fn test_weekly_rollover_archives_and_empties() {
        let ledger = create_test_ledger();
        let week1 = midweek();
        let week2 = week1 + Duration::days(7);

        ledger.set_buy_price_at(ALICE, 99, week1).await.unwrap();
        ledger.set_slot_price_at(ALICE, 0, 86, week1).await.unwrap();

        // Reads after the boundary see an empty current week without
        // waiting for a mutation to roll the record.
        assert!(ledger.get_series_at(ALICE, week2).await.is_empty());
        let previous = ledger.previous_week_at(ALICE, week2).await.unwrap();
        assert_eq!(previous.buy_price, Some(99));
        assert_eq!(previous.slot_prices[0], Some(86));

        // A mutation in the new week performs the actual rollover.
        ledger.set_buy_price_at(ALICE, 103, week2).await.unwrap();
        let series = ledger.get_series_at(ALICE, week2).await;
        assert_eq!(series.buy_price, Some(103));
        assert_eq!(series.observed_count(), 0);
        let previous = ledger.previous_week_at(ALICE, week2).await.unwrap();
        assert_eq!(previous.buy_price, Some(99));
    }

    #[tokio::test]
    async fn test_stale_series_is_not_last_week_after_a_gap() {
        let ledger = create_test_ledger();
        let week1 = midweek();
        let week3 = week1 + Duration::days(14);

        ledger.set_buy_price_at(ALICE, 99, week1).await.unwrap();

        assert!(ledger.get_series_at(ALICE, week3).await.is_empty());
        assert!(ledger.previous_week_at(ALICE, week3).await.is_none());

        ledger.set_buy_price_at(ALICE, 101, week3).await.unwrap();
        assert!(ledger.previous_week_at(ALICE, week3).await.is_none());
    }

    #[tokio::test]
    async fn test_best_prices_respect_window_and_sort() {
        let ledger = create_test_ledger();
        let now = midweek();
        let stale = now - Duration::hours(13);

        ledger.set_buy_price_at(ALICE, 104, now).await.unwrap();
        ledger.set_buy_price_at(BOB, 97, now).await.unwrap();
        ledger.set_slot_price_at(ALICE, 0, 120, now).await.unwrap();
        ledger.set_slot_price_at(ALICE, 1, 135, now).await.unwrap();
        // Bob's only sell is outside the 12-hour window.
        ledger.set_slot_price_at(BOB, 0, 160, stale).await.unwrap();

        let sells = ledger.best_sell_prices_at(now).await;
        assert_eq!(sells.len(), 1);
        assert_eq!(sells[0].user, ALICE);
        assert_eq!(sells[0].price, 135);

        let buys = ledger.best_buy_prices_at(now).await;
        assert_eq!(buys.len(), 2);
        assert_eq!(buys[0].user, BOB);
        assert_eq!(buys[0].price, 97);
        assert_eq!(buys[1].user, ALICE);
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let ledger = create_test_ledger();
        let now = midweek();

        ledger.set_slot_price_at(ALICE, 0, 85, now).await.unwrap();
        ledger.set_slot_price_at(BOB, 0, 132, now).await.unwrap();
        ledger.clear_at(BOB, now).await;

        assert_eq!(
            ledger.get_series_at(ALICE, now).await.slot_prices[0],
            Some(85)
        );
        assert!(ledger.get_series_at(BOB, now).await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_writers_single_user() {
        let ledger = Arc::new(create_test_ledger());
        let now = midweek();

        let mut handles = Vec::new();
        for slot in 0..SLOTS_PER_WEEK {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .set_slot_price_at(ALICE, slot, 100 + slot as u32, now)
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let series = ledger.get_series_at(ALICE, now).await;
        assert_eq!(series.observed_count(), SLOTS_PER_WEEK);

        // Sequences stayed unique under contention.
        let mut seqs: Vec<_> = ledger
            .history_at(ALICE, now)
            .await
            .iter()
            .map(|obs| obs.seq)
            .collect();
        seqs.sort_unstable();
        seqs.dedup();
        assert_eq!(seqs.len(), SLOTS_PER_WEEK);
    }
}
