//! Fake collaborators for pipeline tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;

use bulk_studio::error::ENTITY_NOT_FOUND;
use bulk_studio::transform::{GenerationRequest, GenerationService, InlineData};
use bulk_studio::{
    BatchConfig, CredentialSelector, ResultImage, SourceImage, Transform, TransformError,
};

/// How a scripted call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Status(u16),
    Authorization,
    NoResult,
    Decode,
}

impl Failure {
    pub fn to_error(self) -> TransformError {
        match self {
            Failure::Status(status) => TransformError::Status {
                status,
                message: format!("scripted HTTP {}", status),
            },
            Failure::Authorization => TransformError::Authorization(ENTITY_NOT_FOUND.to_string()),
            Failure::NoResult => TransformError::NoResult,
            Failure::Decode => TransformError::Decode("scripted decode failure".to_string()),
        }
    }
}

/// Transform that succeeds with `studio:<name>` unless scripted to fail, and
/// tracks how many calls are in flight at once.
#[derive(Default)]
pub struct FakeTransform {
    delay: Duration,
    /// File name -> (failure, remaining failing calls).
    failures: Mutex<HashMap<String, (Failure, usize)>>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeTransform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    /// Fails every call for `name`.
    pub fn failing(self, name: &str, failure: Failure) -> Self {
        self.failing_times(name, failure, usize::MAX)
    }

    /// Fails the first `times` calls for `name`, then succeeds.
    pub fn failing_times(self, name: &str, failure: Failure, times: usize) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(name.to_string(), (failure, times));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn expected_result(name: &str) -> Vec<u8> {
        format!("studio:{}", name).into_bytes()
    }

    fn scripted_failure(&self, name: &str) -> Option<Failure> {
        let mut failures = self.failures.lock().unwrap();
        let (failure, remaining) = failures.get_mut(name)?;
        if *remaining == 0 {
            return None;
        }
        *remaining = remaining.saturating_sub(1);
        Some(*failure)
    }
}

#[async_trait]
impl Transform for FakeTransform {
    async fn apply(
        &self,
        source: &SourceImage,
        _config: &BatchConfig,
    ) -> Result<ResultImage, TransformError> {
        self.calls.lock().unwrap().push(source.name.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        } else {
            tokio::task::yield_now().await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match self.scripted_failure(&source.name) {
            Some(failure) => Err(failure.to_error()),
            None => Ok(ResultImage::png(Self::expected_result(&source.name))),
        }
    }
}

/// Generation service replaying one fixed outcome per call.
pub struct ScriptedService {
    outcomes: Mutex<Vec<Result<Vec<u8>, Failure>>>,
    calls: AtomicUsize,
}

impl ScriptedService {
    /// Outcomes are consumed front to back; once exhausted every call
    /// succeeds with `b"fallback"`.
    pub fn new(mut outcomes: Vec<Result<Vec<u8>, Failure>>) -> Self {
        outcomes.reverse();
        Self {
            outcomes: Mutex::new(outcomes),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(failure: Failure) -> Self {
        Self::new(vec![Err(failure); 16])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    async fn generate(&self, _request: &GenerationRequest) -> Result<InlineData, TransformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Ok(b"fallback".to_vec()));
        match outcome {
            Ok(bytes) => Ok(InlineData {
                mime_type: "image/png".to_string(),
                data: base64::engine::general_purpose::STANDARD.encode(bytes),
            }),
            Err(failure) => Err(failure.to_error()),
        }
    }
}

/// Host key picker that records whether it was opened.
pub struct FakeSelector {
    selected: AtomicBool,
    accept: bool,
    opened: AtomicUsize,
}

impl FakeSelector {
    pub fn new(already_selected: bool, accept: bool) -> Self {
        Self {
            selected: AtomicBool::new(already_selected),
            accept,
            opened: AtomicUsize::new(0),
        }
    }

    pub fn times_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialSelector for FakeSelector {
    async fn has_selected_key(&self) -> bool {
        self.selected.load(Ordering::SeqCst)
    }

    async fn select_key(&self) -> Result<(), String> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        if self.accept {
            self.selected.store(true, Ordering::SeqCst);
            Ok(())
        } else {
            Err("selection dismissed".to_string())
        }
    }
}
