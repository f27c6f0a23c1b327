//! In-memory [`PriceSource`] for unit tests.

use crate::upstream::{EarliestPrice, FetchError, PriceSource, SpotSymbol};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

/// Answers from preset values and counts calls per operation.
/// Unset historical periods and an unset earliest price answer "no data".
#[derive(Default)]
pub(crate) struct FakeSource {
    spot: Mutex<HashMap<SpotSymbol, f64>>,
    earliest: Mutex<Option<EarliestPrice>>,
    historical: Mutex<HashMap<String, f64>>,
    failing: AtomicBool,
    gate: Mutex<Option<Arc<Barrier>>>,
    spot_calls: Mutex<HashMap<SpotSymbol, usize>>,
    earliest_calls: AtomicUsize,
    historical_calls: AtomicUsize,
}

impl FakeSource {
    pub(crate) fn set_spot(&self, symbol: SpotSymbol, price: f64) {
        self.spot.lock().unwrap().insert(symbol, price);
    }

    pub(crate) fn set_earliest(&self, earliest: EarliestPrice) {
        *self.earliest.lock().unwrap() = Some(earliest);
    }

    pub(crate) fn set_historical(&self, period: &str, price: f64) {
        self.historical
            .lock()
            .unwrap()
            .insert(period.to_string(), price);
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make every spot fetch wait until `parties` fetches are in flight.
    pub(crate) fn gate_spot_fetches(&self, parties: usize) {
        *self.gate.lock().unwrap() = Some(Arc::new(Barrier::new(parties)));
    }

    pub(crate) fn spot_calls(&self, symbol: SpotSymbol) -> usize {
        self.spot_calls
            .lock()
            .unwrap()
            .get(&symbol)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn earliest_calls(&self) -> usize {
        self.earliest_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn historical_calls(&self) -> usize {
        self.historical_calls.load(Ordering::SeqCst)
    }

    fn check_failing(&self) -> Result<(), FetchError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FetchError::format("scripted upstream failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl PriceSource for FakeSource {
    async fn spot_price(&self, symbol: SpotSymbol) -> Result<f64, FetchError> {
        *self.spot_calls.lock().unwrap().entry(symbol).or_default() += 1;
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.wait().await;
        }
        self.check_failing()?;
        self.spot
            .lock()
            .unwrap()
            .get(&symbol)
            .copied()
            .ok_or_else(|| FetchError::format(format!("no scripted price for {symbol}")))
    }

    async fn earliest_price(&self) -> Result<Option<EarliestPrice>, FetchError> {
        self.earliest_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;
        Ok(*self.earliest.lock().unwrap())
    }

    async fn historical_price(
        &self,
        period: &str,
        _as_of_ms: i64,
    ) -> Result<Option<f64>, FetchError> {
        self.historical_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;
        Ok(self.historical.lock().unwrap().get(period).copied())
    }
}
