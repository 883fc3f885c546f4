// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::{
    config::Config,
    services::{ExamService, statistics::StatisticsSink},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub exams: ExamService,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config, statistics: Arc<dyn StatisticsSink>) -> Self {
        let exams = ExamService::new(pool.clone(), statistics, config.submit_grace_seconds);
        Self { pool, config, exams }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for ExamService {
    fn from_ref(state: &AppState) -> Self {
        state.exams.clone()
    }
}
