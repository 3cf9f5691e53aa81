//! Remote simulation client.
//!
//! The simulation runs elsewhere and is opaque to this crate. The only
//! contract is two calls that each return a [`StepSnapshot`]: one that
//! (re)starts the simulation with a given population, and one that advances
//! it by a step. [`HttpSimulationClient`] speaks the server's HTTP/JSON
//! routes via `reqwest`; tests substitute in-memory implementations.

use std::future::Future;

use city_events::StepSnapshot;

use crate::config::ServerConfig;
use crate::error::FetchError;

/// Source of simulation snapshots.
pub trait SimulationClient: Send + Sync + 'static {
    /// Starts a simulation and returns its initial state.
    fn fetch_init(
        &self,
        cars: u32,
        pedestrians: u32,
    ) -> impl Future<Output = Result<StepSnapshot, FetchError>> + Send;

    /// Advances the simulation one step and returns the new state.
    fn fetch_step(&self) -> impl Future<Output = Result<StepSnapshot, FetchError>> + Send;
}

/// Client for the simulation server's HTTP routes.
///
/// - `GET {base_url}{init_path}/{cars}/{pedestrians}`
/// - `GET {base_url}{step_path}`
#[derive(Debug, Clone)]
pub struct HttpSimulationClient {
    client: reqwest::Client,
    base_url: String,
    init_path: String,
    step_path: String,
}

impl HttpSimulationClient {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            init_path: config.init_path.clone(),
            step_path: config.step_path.clone(),
        }
    }

    pub fn init_url(&self, cars: u32, pedestrians: u32) -> String {
        format!(
            "{}{}/{}/{}",
            self.base_url,
            self.init_path.trim_end_matches('/'),
            cars,
            pedestrians
        )
    }

    pub fn step_url(&self) -> String {
        format!("{}{}", self.base_url, self.step_path)
    }

    async fn get_snapshot(&self, url: &str) -> Result<StepSnapshot, FetchError> {
        tracing::debug!("GET {}", url);

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        Ok(StepSnapshot::from_json(&body)?)
    }
}

impl SimulationClient for HttpSimulationClient {
    async fn fetch_init(&self, cars: u32, pedestrians: u32) -> Result<StepSnapshot, FetchError> {
        self.get_snapshot(&self.init_url(cars, pedestrians)).await
    }

    async fn fetch_step(&self) -> Result<StepSnapshot, FetchError> {
        self.get_snapshot(&self.step_url()).await
    }
}
