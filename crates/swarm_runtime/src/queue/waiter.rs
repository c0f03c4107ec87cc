//! Job-completion notification.
//!
//! One process-wide subscriber thread, started lazily by the first waiter,
//! pattern-subscribes to `<prefix>job_status_channel_*`. On each message it
//! strips the prefix to recover the job id, looks the id up in its waiter
//! registry, and on a terminal status (`SUCCESS` or `FAILURE`) marks the
//! waiter finished and drops the registry entry. The thread observes
//! [`crate::THREAD_EXIT`] between consumes and exits cleanly.
//!
//! A [`Waiter`] is the per-job handle. Its `{started, terminated}` pair sits
//! behind a mutex; the subscriber thread is the only writer of `terminated`.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use swarm_base::Config;

use crate::THREAD_EXIT;

#[derive(Debug, Default)]
struct WaiterState {
    started: bool,
    terminated: bool,
}

/// Observes the terminal transition of one queued job.
#[derive(Debug)]
pub struct Waiter {
    id: String,
    state: Mutex<WaiterState>,
    subscriber: Weak<Subscriber>,
}

impl Waiter {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Transitions to `started` and registers with the subscriber. Safe to
    /// call more than once; only the first call registers.
    pub fn wait(self: &Arc<Self>) {
        {
            let mut state = self.state.lock().expect("waiter mutex poisoned");
            if state.started {
                return;
            }
            state.started = true;
        }
        if let Some(subscriber) = self.subscriber.upgrade() {
            subscriber.register(Arc::clone(self));
        }
    }

    pub fn started(&self) -> bool {
        self.state.lock().expect("waiter mutex poisoned").started
    }

    pub fn finished(&self) -> bool {
        self.state.lock().expect("waiter mutex poisoned").terminated
    }

    fn finish(&self) {
        self.state.lock().expect("waiter mutex poisoned").terminated = true;
    }
}

/// The singleton subscriber: registry plus the thread that feeds it.
pub struct Subscriber {
    url: String,
    channel_prefix: String,
    sleep_us: u64,
    waiters: Mutex<HashMap<String, Arc<Waiter>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

static SUBSCRIBER: OnceLock<Arc<Subscriber>> = OnceLock::new();

impl Subscriber {
    /// The process-wide instance, created from the first configuration that
    /// asks for it.
    pub fn global(config: &Config) -> Arc<Subscriber> {
        Arc::clone(SUBSCRIBER.get_or_init(|| {
            Arc::new(Subscriber {
                url: config.redis_url(),
                channel_prefix: config.key("job_status_channel_"),
                sleep_us: config.waiter_sleep_us,
                waiters: Mutex::new(HashMap::new()),
                thread: Mutex::new(None),
            })
        }))
    }

    /// Creates a waiter for a job id. The waiter registers itself on
    /// [`Waiter::wait`].
    pub fn waiter(self: &Arc<Self>, job_id: &str) -> Arc<Waiter> {
        Arc::new(Waiter {
            id: job_id.to_string(),
            state: Mutex::new(WaiterState::default()),
            subscriber: Arc::downgrade(self),
        })
    }

    fn register(self: &Arc<Self>, waiter: Arc<Waiter>) {
        self.ensure_thread();
        self.waiters
            .lock()
            .expect("waiter registry poisoned")
            .insert(waiter.id.clone(), waiter);
    }

    fn ensure_thread(self: &Arc<Self>) {
        let mut slot = self.thread.lock().expect("subscriber handle poisoned");
        if slot.is_some() {
            return;
        }
        let subscriber = Arc::clone(self);
        *slot = Some(thread::spawn(move || subscriber.run()));
    }

    /// Blocks until the subscriber thread exits (after `THREAD_EXIT`).
    pub fn join(&self) {
        let handle = self.thread.lock().expect("subscriber handle poisoned").take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    fn run(self: Arc<Self>) {
        debug!("subscriber thread starting");
        let client = match redis::Client::open(self.url.as_str()) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "subscriber could not create a client");
                return;
            }
        };
        let mut conn = match client.get_connection() {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "subscriber could not connect");
                return;
            }
        };
        let mut pubsub = conn.as_pubsub();
        if let Err(e) = pubsub.psubscribe(format!("{}*", self.channel_prefix)) {
            warn!(error = %e, "subscriber could not subscribe");
            return;
        }
        // A finite read timeout is what lets the loop observe THREAD_EXIT.
        let _ = pubsub.set_read_timeout(Some(Duration::from_millis(100)));

        while !THREAD_EXIT.load(Ordering::SeqCst) {
            match pubsub.get_message() {
                Ok(message) => self.handle(&message),
                Err(e) if e.is_timeout() => {}
                Err(e) => {
                    // A KV error during shutdown is expected; otherwise back
                    // off and keep consuming.
                    if THREAD_EXIT.load(Ordering::SeqCst) {
                        break;
                    }
                    warn!(error = %e, "subscriber consume failed");
                }
            }
            thread::sleep(Duration::from_micros(self.sleep_us));
        }
        debug!("subscriber thread exiting");
    }

    fn handle(&self, message: &redis::Msg) {
        let channel = message.get_channel_name();
        let Some(job_id) = channel.strip_prefix(self.channel_prefix.as_str()) else {
            return;
        };
        let payload: String = match message.get_payload() {
            Ok(payload) => payload,
            Err(_) => return,
        };
        debug!(job = %job_id, status = %payload, "status message");

        if payload == "SUCCESS" || payload == "FAILURE" {
            let waiter = self
                .waiters
                .lock()
                .expect("waiter registry poisoned")
                .remove(job_id);
            match waiter {
                Some(waiter) => waiter.finish(),
                None => debug!(job = %job_id, "no waiter for job"),
            }
        }
    }
}
