use async_trait::async_trait;
use chrono::NaiveDate;
use model::ForecastInterval;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Supplies day-of-week and intraday demand curves (§2: out of scope to
/// implement for real; modeled here as a trait the core consumes).
#[async_trait]
pub trait ForecastSvc: Send + Sync {
    async fn daily_forecast(&self, date: NaiveDate) -> anyhow::Result<HashMap<String, u32>>;
    async fn intraday_forecast(
        &self,
        date: NaiveDate,
    ) -> anyhow::Result<HashMap<String, Vec<ForecastInterval>>>;
}

/// Fixed-curve fixture used by tests and the headless runner.
#[derive(Default)]
pub struct StaticForecastSvc {
    daily: Mutex<HashMap<NaiveDate, HashMap<String, u32>>>,
    intraday: Mutex<HashMap<NaiveDate, HashMap<String, Vec<ForecastInterval>>>>,
}

impl StaticForecastSvc {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_daily(&self, date: NaiveDate, forecast: HashMap<String, u32>) {
        self.daily.lock().await.insert(date, forecast);
    }

    pub async fn seed_intraday(
        &self,
        date: NaiveDate,
        forecast: HashMap<String, Vec<ForecastInterval>>,
    ) {
        self.intraday.lock().await.insert(date, forecast);
    }
}

#[async_trait]
impl ForecastSvc for StaticForecastSvc {
    async fn daily_forecast(&self, date: NaiveDate) -> anyhow::Result<HashMap<String, u32>> {
        Ok(self.daily.lock().await.get(&date).cloned().unwrap_or_default())
    }

    async fn intraday_forecast(
        &self,
        date: NaiveDate,
    ) -> anyhow::Result<HashMap<String, Vec<ForecastInterval>>> {
        Ok(self.intraday.lock().await.get(&date).cloned().unwrap_or_default())
    }
}
