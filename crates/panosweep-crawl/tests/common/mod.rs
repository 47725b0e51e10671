//! Test doubles shared by the crawl integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use panosweep_core::models::PanoramaRecord;
use panosweep_crawl::{LookupError, PanoramaLookup};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One scripted answer from the fake imagery service
#[derive(Debug, Clone)]
pub enum Reply {
    Found(PanoramaRecord),
    NotFound,
    Fail,
    /// Answers "nothing here" after a delay
    Slow(Duration),
    /// Never answers within any sane timeout
    Hang,
}

type Key = (u64, u64);

fn key(lat: f64, lon: f64) -> Key {
    (lat.to_bits(), lon.to_bits())
}

/// Lookup fake answering from per-coordinate scripts, falling back to a
/// default reply, and counting every call
pub struct ScriptedLookup {
    scripts: Mutex<HashMap<Key, VecDeque<Reply>>>,
    default: Reply,
    calls: Mutex<HashMap<Key, usize>>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl ScriptedLookup {
    pub fn new(default: Reply) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            default,
            calls: Mutex::new(HashMap::new()),
            cancel_after: None,
        }
    }

    pub fn script(self, lat: f64, lon: f64, replies: Vec<Reply>) -> Self {
        self.scripts.lock().unwrap().insert(key(lat, lon), replies.into());
        self
    }

    /// Cancel `token` as the `calls`-th lookup is answered
    pub fn cancel_after(mut self, calls: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((calls, token));
        self
    }

    pub fn calls_for(&self, lat: f64, lon: f64) -> usize {
        self.calls.lock().unwrap().get(&key(lat, lon)).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn max_calls_per_point(&self) -> usize {
        self.calls.lock().unwrap().values().copied().max().unwrap_or(0)
    }
}

#[async_trait]
impl PanoramaLookup for ScriptedLookup {
    async fn lookup(&self, lat: f64, lon: f64) -> Result<Option<PanoramaRecord>, LookupError> {
        let reply = {
            let mut calls = self.calls.lock().unwrap();
            *calls.entry(key(lat, lon)).or_default() += 1;
            let total: usize = calls.values().sum();
            if let Some((limit, token)) = &self.cancel_after {
                if total >= *limit {
                    token.cancel();
                }
            }

            let mut scripts = self.scripts.lock().unwrap();
            scripts
                .get_mut(&key(lat, lon))
                .and_then(|replies| replies.pop_front())
                .unwrap_or_else(|| self.default.clone())
        };

        match reply {
            Reply::Found(record) => Ok(Some(record)),
            Reply::NotFound => Ok(None),
            Reply::Fail => Err(LookupError::Service("scripted failure".to_string())),
            Reply::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(None)
            }
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(None)
            }
        }
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
