//! Shared application state handed to every axum handler, mirroring the
//! teacher's `ob-poc-web::state::AppState` — cheap to `Clone` (an `Arc`
//! bundle), reentrant across concurrently scheduled requests.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::payroll::PayrollAggregator;
use crate::service::ConceptService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ConceptService>,
    pub payroll: Arc<dyn PayrollAggregator>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        service: Arc<ConceptService>,
        payroll: Arc<dyn PayrollAggregator>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            service,
            payroll,
            config,
        }
    }
}
