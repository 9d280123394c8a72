//! Resource setup for the booking service.
//!
//! Connects the store (running migrations), builds the gateway and notifier
//! selected by the configuration, and wires them into an
//! [`AppointmentService`].
//!
//! ```rust,ignore
//! let config = Config::from_env();
//! let resources = Resources::from_config(&config).await?;
//! let state = AppState::new(resources.appointments.clone(), resources.store.clone(), handle);
//! ```

use crate::config::Config;
use crate::workflow::AppointmentService;
use crate::{gateway, notifier};
use imaging_booking_core::environment::SystemClock;
use imaging_booking_core::providers::{AppointmentStore, GatewayError, NotifyError, StoreError};
use imaging_booking_postgres::PostgresAppointmentStore;
use imaging_booking_runtime::EffectRunner;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors raised while setting up resources.
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// Database connection or migration failed
    #[error("store setup failed: {0}")]
    Store(#[from] StoreError),

    /// Gateway client could not be built
    #[error("payment gateway setup failed: {0}")]
    Gateway(#[from] GatewayError),

    /// Email transport could not be built
    #[error("notifier setup failed: {0}")]
    Notifier(#[from] NotifyError),
}

/// Everything the HTTP server needs.
#[derive(Clone)]
pub struct Resources {
    /// Appointment store
    pub store: Arc<dyn AppointmentStore>,
    /// Booking workflows
    pub appointments: Arc<AppointmentService>,
    /// Notification effect runner, drained on shutdown
    pub runner: EffectRunner,
}

impl Resources {
    /// Initialize all resources from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError`] if the database is unreachable, migrations
    /// fail, or a client cannot be built.
    pub async fn from_config(config: &Config) -> Result<Self, BootstrapError> {
        info!("Connecting to appointment database...");
        let postgres = PostgresAppointmentStore::connect(&config.database.url, &config.pool_settings()).await?;

        info!("Running migrations...");
        postgres.migrate().await?;
        let store: Arc<dyn AppointmentStore> = Arc::new(postgres);

        let gateway = gateway::from_config(&config.gateway)?;
        let notifier = notifier::from_config(&config.email)?;
        let runner = EffectRunner::new(config.notification_timeout());

        let appointments = AppointmentService::new(
            Arc::clone(&store),
            gateway,
            notifier,
            Arc::new(SystemClock),
            runner.clone(),
        )
        .with_templates(config.email_templates())
        .with_retry_policy(config.gateway_retry_policy())
        .with_currency(config.gateway.currency.clone());

        info!("Resources initialized");
        Ok(Self {
            store,
            appointments: Arc::new(appointments),
            runner,
        })
    }
}
