// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use quickhire_payments::config::Config;
use quickhire_payments::db::MemoryStore;
use quickhire_payments::i18n::{Language, Translator};
use quickhire_payments::services::{
    CallableError, CallableInvoker, Navigator, Notifier, PaymentSession, Toast,
};
use quickhire_payments::AppState;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// A callable invocation seen by [`FakeCallables`].
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct RecordedCall {
    pub name: String,
    pub data: Value,
    pub id_token: Option<String>,
}

/// Scripted [`CallableInvoker`].
///
/// Responses queue per function; the last one repeats once the queue is
/// down to a single entry. A held function blocks after recording the call
/// until [`FakeCallables::release`].
#[derive(Default)]
pub struct FakeCallables {
    responses: Mutex<HashMap<String, VecDeque<Result<Value, CallableError>>>>,
    calls: Mutex<Vec<RecordedCall>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
}

#[allow(dead_code)]
impl FakeCallables {
    pub fn respond(&self, name: &str, response: Result<Value, CallableError>) {
        self.responses
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, name: &str) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.name == name).collect()
    }

    /// Block future calls to `name` until released.
    pub fn hold(&self, name: &str) {
        self.gates
            .lock()
            .unwrap()
            .insert(name.to_string(), Arc::new(Semaphore::new(0)));
    }

    /// Let one held call to `name` proceed.
    pub fn release(&self, name: &str) {
        if let Some(gate) = self.gates.lock().unwrap().get(name) {
            gate.add_permits(1);
        }
    }

    /// Wait until `name` has been called `count` times.
    pub async fn wait_for_calls(&self, name: &str, count: usize) {
        while self.calls_to(name).len() < count {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl CallableInvoker for FakeCallables {
    async fn call(
        &self,
        name: &str,
        data: Value,
        id_token: Option<&str>,
    ) -> Result<Value, CallableError> {
        self.calls.lock().unwrap().push(RecordedCall {
            name: name.to_string(),
            data,
            id_token: id_token.map(str::to_string),
        });

        let gate = self.gates.lock().unwrap().get(name).cloned();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        let mut responses = self.responses.lock().unwrap();
        match responses.get_mut(name) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Err(CallableError::new(
                "unimplemented",
                format!("no scripted response for {}", name),
            )),
        }
    }
}

/// Navigator that records every URL.
#[derive(Default)]
pub struct RecordingNavigator {
    urls: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl RecordingNavigator {
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn assign(&self, url: &str) {
        self.urls.lock().unwrap().push(url.to_string());
    }
}

/// Notifier that records every toast.
#[derive(Default)]
pub struct RecordingNotifier {
    toasts: Mutex<Vec<Toast>>,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().unwrap().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.toasts().into_iter().map(|t| t.title).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, toast: Toast) {
        self.toasts.lock().unwrap().push(toast);
    }
}

/// Offline app wiring with inspectable fakes.
#[allow(dead_code)]
pub struct TestApp {
    pub store: MemoryStore,
    pub callables: Arc<FakeCallables>,
    pub navigator: Arc<RecordingNavigator>,
    pub notifier: Arc<RecordingNotifier>,
    pub state: AppState,
}

#[allow(dead_code)]
impl TestApp {
    pub fn session(&self) -> PaymentSession {
        self.state
            .session(self.notifier.clone(), Translator::new(Language::English))
    }
}

/// Test configuration with a short recovery delay.
#[allow(dead_code)]
pub fn test_config() -> Config {
    Config {
        app_origin: "https://app.quickhire.test".to_string(),
        recovery_retry_delay: Duration::from_millis(10),
        ..Config::default()
    }
}

/// Create a test app backed by the in-memory store.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    let store = MemoryStore::new();
    let callables = Arc::new(FakeCallables::default());
    let navigator = Arc::new(RecordingNavigator::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState::new(
        test_config(),
        Arc::new(store.clone()),
        callables.clone(),
        navigator.clone(),
    );
    TestApp {
        store,
        callables,
        navigator,
        notifier,
        state,
    }
}

/// Seed `users/{uid}` with a complete profile.
#[allow(dead_code)]
pub fn seed_user(store: &MemoryStore, uid: &str, email: &str) {
    store
        .seed(
            &format!("users/{}", uid),
            json!({ "email": email, "fullName": "Pat Builder", "role": "contractor" }),
        )
        .unwrap();
}

/// A successful `createCustomer` response.
#[allow(dead_code)]
pub fn customer_created(customer_id: &str) -> Result<Value, CallableError> {
    Ok(json!({ "customerId": customer_id }))
}

/// A successful portal/checkout response.
#[allow(dead_code)]
pub fn url_response(url: &str) -> Result<Value, CallableError> {
    Ok(json!({ "url": url }))
}
