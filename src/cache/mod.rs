//! Freshness cache in front of a [`PriceSource`].
//!
//! Every query key holds the last fetched value and the instant it was
//! fetched. A query is answered from the cache while the value is younger
//! than the TTL and refreshed from upstream otherwise. Upstream "no data"
//! results are cached like any other value.
//!
//! The state lock is held only to read a snapshot or to write a result, never
//! across an upstream call. Two concurrent stale queries for the same key may
//! therefore both fetch; the last write wins.

use crate::upstream::{EarliestPrice, FetchError, PriceSource, SpotSymbol};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_TTL: Duration = Duration::from_secs(10);

/// A cached value and when it was fetched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint<T> {
    pub value: T,
    pub fetched_at: Instant,
}

impl<T> PricePoint<T> {
    pub fn new(value: T, fetched_at: Instant) -> Self {
        Self { value, fetched_at }
    }

    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        is_fresh(self.fetched_at, now, ttl)
    }
}

fn is_fresh(fetched_at: Instant, now: Instant, ttl: Duration) -> bool {
    now.saturating_duration_since(fetched_at) <= ttl
}

/// How historical lookups decide they are stale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoricalStaleness {
    /// One timestamp shared by every period. While it is fresh, a period that
    /// was never fetched is answered as absent instead of being fetched.
    #[default]
    Shared,
    /// Each period expires on its own.
    PerPeriod,
}

/// Both spot prices, each possibly fetched at a different time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotPrices {
    pub btcusdt: f64,
    pub usdtbrl: f64,
}

#[derive(Debug, Default)]
struct CacheState {
    btcusdt: Option<PricePoint<f64>>,
    usdtbrl: Option<PricePoint<f64>>,
    earliest: Option<PricePoint<Option<EarliestPrice>>>,
    historical: HashMap<String, PricePoint<Option<f64>>>,
    historical_fetched_at: Option<Instant>,
}

impl CacheState {
    fn spot(&mut self, symbol: SpotSymbol) -> &mut Option<PricePoint<f64>> {
        match symbol {
            SpotSymbol::BtcUsdt => &mut self.btcusdt,
            SpotSymbol::UsdtBrl => &mut self.usdtbrl,
        }
    }
}

/// Read-through cache owned by the running service.
pub struct FreshnessCache {
    source: Arc<dyn PriceSource>,
    ttl: Duration,
    historical_mode: HistoricalStaleness,
    state: Mutex<CacheState>,
}

impl FreshnessCache {
    pub fn new(source: Arc<dyn PriceSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            historical_mode: HistoricalStaleness::default(),
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn with_historical_staleness(mut self, mode: HistoricalStaleness) -> Self {
        self.historical_mode = mode;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Latest price for one symbol, refreshed only if that symbol is stale.
    pub async fn spot_price(&self, symbol: SpotSymbol) -> Result<f64, FetchError> {
        let now = Instant::now();

        let cached = *self.state.lock().await.spot(symbol);
        if let Some(point) = cached.filter(|p| p.is_fresh(now, self.ttl)) {
            debug!(%symbol, "spot price served from cache");
            return Ok(point.value);
        }

        debug!(%symbol, "refreshing spot price");
        let price = self.source.spot_price(symbol).await?;
        *self.state.lock().await.spot(symbol) = Some(PricePoint::new(price, now));

        Ok(price)
    }

    /// BTC/USDT and USDT/BRL, each checked against its own timestamp.
    pub async fn current_prices(&self) -> Result<SpotPrices, FetchError> {
        let btcusdt = self.spot_price(SpotSymbol::BtcUsdt).await?;
        let usdtbrl = self.spot_price(SpotSymbol::UsdtBrl).await?;
        Ok(SpotPrices { btcusdt, usdtbrl })
    }

    /// Oldest known BTC price. Expires like everything else even though it
    /// practically never changes upstream.
    pub async fn earliest_price(&self) -> Result<Option<EarliestPrice>, FetchError> {
        let now = Instant::now();

        let cached = self.state.lock().await.earliest;
        if let Some(point) = cached.filter(|p| p.is_fresh(now, self.ttl)) {
            debug!("earliest price served from cache");
            return Ok(point.value);
        }

        debug!("refreshing earliest price");
        let earliest = self.source.earliest_price().await?;
        self.state.lock().await.earliest = Some(PricePoint::new(earliest, now));

        Ok(earliest)
    }

    /// Price for `period` as of `as_of_ms`.
    ///
    /// The cached value for a period is reused while fresh regardless of
    /// `as_of_ms`; callers derive the timestamp from the period.
    pub async fn historical_price(
        &self,
        period: &str,
        as_of_ms: i64,
    ) -> Result<Option<f64>, FetchError> {
        let now = Instant::now();

        let (stale, cached) = {
            let state = self.state.lock().await;
            let entry = state.historical.get(period);
            let stale = match self.historical_mode {
                HistoricalStaleness::Shared => state
                    .historical_fetched_at
                    .map_or(true, |at| !is_fresh(at, now, self.ttl)),
                HistoricalStaleness::PerPeriod => {
                    entry.map_or(true, |p| !p.is_fresh(now, self.ttl))
                }
            };
            (stale, entry.and_then(|p| p.value))
        };

        if !stale {
            debug!(period, "historical price served from cache");
            return Ok(cached);
        }

        debug!(period, as_of_ms, "refreshing historical price");
        let price = self.source.historical_price(period, as_of_ms).await?;

        // One entry per distinct period label, kept for the process lifetime.
        let mut state = self.state.lock().await;
        state
            .historical
            .insert(period.to_string(), PricePoint::new(price, now));
        state.historical_fetched_at = Some(now);

        Ok(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSource;
    use tokio::time::advance;

    fn cache_over(source: &Arc<FakeSource>) -> FreshnessCache {
        FreshnessCache::new(source.clone(), DEFAULT_TTL)
    }

    #[tokio::test(start_paused = true)]
    async fn spot_prices_respect_ttl() {
        let source = Arc::new(FakeSource::default());
        source.set_spot(SpotSymbol::BtcUsdt, 65000.0);
        source.set_spot(SpotSymbol::UsdtBrl, 5.4);
        let cache = cache_over(&source);

        let prices = cache.current_prices().await.unwrap();
        assert_eq!(prices.btcusdt, 65000.0);
        assert_eq!(source.spot_calls(SpotSymbol::BtcUsdt), 1);

        advance(Duration::from_secs(5)).await;
        source.set_spot(SpotSymbol::BtcUsdt, 66000.0);
        let prices = cache.current_prices().await.unwrap();
        assert_eq!(prices.btcusdt, 65000.0);
        assert_eq!(source.spot_calls(SpotSymbol::BtcUsdt), 1);

        advance(Duration::from_secs(7)).await;
        let prices = cache.current_prices().await.unwrap();
        assert_eq!(prices.btcusdt, 66000.0);
        assert_eq!(source.spot_calls(SpotSymbol::BtcUsdt), 2);
        assert_eq!(source.spot_calls(SpotSymbol::UsdtBrl), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn value_exactly_ttl_old_is_still_fresh() {
        let source = Arc::new(FakeSource::default());
        source.set_spot(SpotSymbol::BtcUsdt, 1.0);
        let cache = cache_over(&source);

        cache.spot_price(SpotSymbol::BtcUsdt).await.unwrap();
        advance(DEFAULT_TTL).await;
        cache.spot_price(SpotSymbol::BtcUsdt).await.unwrap();
        assert_eq!(source.spot_calls(SpotSymbol::BtcUsdt), 1);

        advance(Duration::from_millis(1)).await;
        cache.spot_price(SpotSymbol::BtcUsdt).await.unwrap();
        assert_eq!(source.spot_calls(SpotSymbol::BtcUsdt), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn spot_symbols_expire_independently() {
        let source = Arc::new(FakeSource::default());
        source.set_spot(SpotSymbol::BtcUsdt, 65000.0);
        source.set_spot(SpotSymbol::UsdtBrl, 5.4);
        let cache = cache_over(&source);

        cache.spot_price(SpotSymbol::BtcUsdt).await.unwrap();
        advance(Duration::from_secs(6)).await;
        cache.spot_price(SpotSymbol::UsdtBrl).await.unwrap();
        advance(Duration::from_secs(6)).await;

        cache.current_prices().await.unwrap();
        assert_eq!(source.spot_calls(SpotSymbol::BtcUsdt), 2);
        assert_eq!(source.spot_calls(SpotSymbol::UsdtBrl), 1);
    }

    #[tokio::test]
    async fn concurrent_stale_queries_both_fetch() {
        let source = Arc::new(FakeSource::default());
        source.set_spot(SpotSymbol::BtcUsdt, 65000.0);
        source.gate_spot_fetches(2);
        let cache = cache_over(&source);

        // Both fetches must be in flight at once for the gate to open.
        let (a, b) = tokio::join!(
            cache.spot_price(SpotSymbol::BtcUsdt),
            cache.spot_price(SpotSymbol::BtcUsdt)
        );
        assert_eq!(a.unwrap(), 65000.0);
        assert_eq!(b.unwrap(), 65000.0);
        assert_eq!(source.spot_calls(SpotSymbol::BtcUsdt), 2);

        source.set_spot(SpotSymbol::BtcUsdt, 70000.0);
        assert_eq!(cache.spot_price(SpotSymbol::BtcUsdt).await.unwrap(), 65000.0);
        assert_eq!(source.spot_calls(SpotSymbol::BtcUsdt), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn absent_historical_price_is_cached() {
        let source = Arc::new(FakeSource::default());
        let cache = cache_over(&source);

        assert_eq!(cache.historical_price("1Y", 1000).await.unwrap(), None);
        advance(Duration::from_secs(3)).await;
        assert_eq!(cache.historical_price("1Y", 1000).await.unwrap(), None);
        assert_eq!(source.historical_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shared_timestamp_hides_unseen_period() {
        let source = Arc::new(FakeSource::default());
        source.set_historical("1D", 60000.0);
        source.set_historical("1M", 50000.0);
        let cache = cache_over(&source);

        assert_eq!(cache.historical_price("1D", 1000).await.unwrap(), Some(60000.0));
        advance(Duration::from_secs(3)).await;
        assert_eq!(cache.historical_price("1M", 1000).await.unwrap(), None);
        assert_eq!(source.historical_calls(), 1);

        advance(Duration::from_secs(8)).await;
        assert_eq!(cache.historical_price("1M", 1000).await.unwrap(), Some(50000.0));
        assert_eq!(source.historical_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn per_period_staleness_fetches_unseen_period() {
        let source = Arc::new(FakeSource::default());
        source.set_historical("1D", 60000.0);
        source.set_historical("1M", 50000.0);
        let cache = cache_over(&source).with_historical_staleness(HistoricalStaleness::PerPeriod);

        assert_eq!(cache.historical_price("1D", 1000).await.unwrap(), Some(60000.0));
        advance(Duration::from_secs(3)).await;
        assert_eq!(cache.historical_price("1M", 1000).await.unwrap(), Some(50000.0));
        assert_eq!(cache.historical_price("1D", 1000).await.unwrap(), Some(60000.0));
        assert_eq!(source.historical_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_leaves_cache_unset() {
        let source = Arc::new(FakeSource::default());
        source.set_historical("1W", 58000.0);
        source.set_failing(true);
        let cache = cache_over(&source);

        assert!(cache.historical_price("1W", 1000000).await.is_err());

        source.set_failing(false);
        assert_eq!(
            cache.historical_price("1W", 1000000).await.unwrap(),
            Some(58000.0)
        );
        assert_eq!(source.historical_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_keeps_previous_spot_value() {
        let source = Arc::new(FakeSource::default());
        source.set_spot(SpotSymbol::BtcUsdt, 65000.0);
        let cache = cache_over(&source);

        cache.spot_price(SpotSymbol::BtcUsdt).await.unwrap();
        advance(Duration::from_secs(11)).await;
        source.set_failing(true);
        assert!(cache.spot_price(SpotSymbol::BtcUsdt).await.is_err());

        source.set_failing(false);
        source.set_spot(SpotSymbol::BtcUsdt, 67000.0);
        assert_eq!(cache.spot_price(SpotSymbol::BtcUsdt).await.unwrap(), 67000.0);
        assert_eq!(source.spot_calls(SpotSymbol::BtcUsdt), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_earliest_price_is_cached_until_expiry() {
        let source = Arc::new(FakeSource::default());
        let cache = cache_over(&source);

        assert_eq!(cache.earliest_price().await.unwrap(), None);
        assert_eq!(cache.earliest_price().await.unwrap(), None);
        assert_eq!(source.earliest_calls(), 1);

        source.set_earliest(EarliestPrice {
            price: 4285.08,
            timestamp: 1502928000000,
        });
        advance(Duration::from_secs(11)).await;
        let earliest = cache.earliest_price().await.unwrap().unwrap();
        assert_eq!(earliest.timestamp, 1502928000000);
        assert_eq!(source.earliest_calls(), 2);
    }
}
