//! The distributed execution queue.
//!
//! A job is a serialized expression subtree, its captured local environment
//! and a filter map, identified by UUID. Jobs wait in the shared list
//! `<prefix>job_queue`; any worker whose capability filters satisfy the
//! job's filter map may pop and run it. Keys per job:
//!
//! ```text
//! <prefix>job_status_<id>        one of p r s f
//! <prefix>job_payload_<id>       serialized expression
//! <prefix>job_locals_<id>        locals envelope
//! <prefix>job_filters_<id>       filter map as JSON
//! <prefix>job_result_<id>        serialized result value
//! <prefix>job_fail_reason_<id>   failure description
//! <prefix>job_status_channel_<id>  pub/sub channel, uppercase status names
//! ```
//!
//! Status transitions are monotone: PENDING → RUNNING → SUCCESS | FAILURE.
//! A popped job is executed at most once — it is re-pushed (to the tail)
//! only when the filter check says this worker is not eligible, and a job
//! that fails during evaluation is recorded FAILURE, never re-queued.

pub mod waiter;

pub use waiter::{Subscriber, Waiter};

use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use redis::Commands;
use tracing::{debug, warn};

use swarm_base::{uuid4, Config, SwarmError};
use swarm_lang::ast::{Ast, NodeId};
use swarm_lang::serialize::{Serializer, SymbolWalk};

use crate::interpreter::Interpreter;
use crate::store::LocalSymbolValueStore;
use crate::value::Value;
use crate::THREAD_EXIT;

/// Maps a KV transport failure onto the error taxonomy.
pub(crate) fn kv_error(e: redis::RedisError) -> SwarmError {
    SwarmError::QueueExecution {
        reason: format!("kv store error: {e}"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    Failure,
    Unknown,
}

impl JobStatus {
    pub fn as_char(self) -> char {
        match self {
            JobStatus::Pending => 'p',
            JobStatus::Running => 'r',
            JobStatus::Success => 's',
            JobStatus::Failure => 'f',
            JobStatus::Unknown => 'u',
        }
    }

    pub fn from_char(c: char) -> Option<JobStatus> {
        match c {
            'p' => Some(JobStatus::Pending),
            'r' => Some(JobStatus::Running),
            's' => Some(JobStatus::Success),
            'f' => Some(JobStatus::Failure),
            'u' => Some(JobStatus::Unknown),
            _ => None,
        }
    }

    /// The uppercase name, which is also the pub/sub message body.
    pub fn name(self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failure => "FAILURE",
            JobStatus::Unknown => "UNKNOWN",
        }
    }
}

/// Whether a job with `job` filters may run on a worker advertising
/// `worker` filters: literal equality on every job key, keys missing on the
/// worker mismatch, and an empty job filter map matches every worker.
pub fn filters_match(
    job: &BTreeMap<String, String>,
    worker: &BTreeMap<String, String>,
) -> bool {
    job.iter().all(|(k, v)| worker.get(k) == Some(v))
}

pub struct ExecutionQueue {
    config: Config,
    conn: redis::Connection,
    subscriber: Arc<Subscriber>,
}

impl ExecutionQueue {
    pub fn connect(config: &Config) -> Result<Self, SwarmError> {
        let client = redis::Client::open(config.redis_url()).map_err(kv_error)?;
        let conn = client.get_connection().map_err(kv_error)?;
        Ok(Self {
            config: config.clone(),
            conn,
            subscriber: Subscriber::global(config),
        })
    }

    fn queue_key(&self) -> String {
        self.config.key("job_queue")
    }

    fn status_key(&self, job_id: &str) -> String {
        self.config.key(&format!("job_status_{job_id}"))
    }

    fn payload_key(&self, job_id: &str) -> String {
        self.config.key(&format!("job_payload_{job_id}"))
    }

    fn locals_key(&self, job_id: &str) -> String {
        self.config.key(&format!("job_locals_{job_id}"))
    }

    fn filters_key(&self, job_id: &str) -> String {
        self.config.key(&format!("job_filters_{job_id}"))
    }

    fn result_key(&self, job_id: &str) -> String {
        self.config.key(&format!("job_result_{job_id}"))
    }

    fn fail_reason_key(&self, job_id: &str) -> String {
        self.config.key(&format!("job_fail_reason_{job_id}"))
    }

    fn status_channel(&self, job_id: &str) -> String {
        self.config.key(&format!("job_status_channel_{job_id}"))
    }

    pub fn get_status(&mut self, job_id: &str) -> JobStatus {
        let stored: Option<String> = self.conn.get(self.status_key(job_id)).unwrap_or(None);
        stored
            .and_then(|s| s.chars().next())
            .and_then(JobStatus::from_char)
            .unwrap_or_else(|| {
                debug!(job = %job_id, "no readable status for job");
                JobStatus::Unknown
            })
    }

    pub fn update_status(&mut self, job_id: &str, status: JobStatus) -> Result<(), SwarmError> {
        debug!(job = %job_id, status = status.name(), "status transition");
        let _: () = self
            .conn
            .set(self.status_key(job_id), status.as_char().to_string())
            .map_err(kv_error)?;
        let _: () = self
            .conn
            .publish(self.status_channel(job_id), status.name())
            .map_err(kv_error)?;
        Ok(())
    }

    /// Serializes the subtree and its captured locals, writes the job
    /// record, pushes the id onto the queue and returns a started waiter.
    pub fn queue(
        &mut self,
        ast: &Ast,
        node: NodeId,
        locals: &mut LocalSymbolValueStore,
        filters: &BTreeMap<String, String>,
    ) -> Result<Arc<Waiter>, SwarmError> {
        let job_id = uuid4();
        debug!(job = %job_id, "queueing subtree");

        let payload = Serializer::to_json(ast, node)?;
        let symbols = SymbolWalk::collect(ast, node);
        let envelope = locals.serialize_locals(ast, &symbols)?;
        let filters_json = serde_json::to_string(filters)
            .map_err(|e| SwarmError::serialization(e.to_string()))?;

        let _: () = self
            .conn
            .set(self.payload_key(&job_id), payload)
            .map_err(kv_error)?;
        let _: () = self
            .conn
            .set(self.locals_key(&job_id), envelope)
            .map_err(kv_error)?;
        let _: () = self
            .conn
            .set(self.filters_key(&job_id), filters_json)
            .map_err(kv_error)?;
        self.update_status(&job_id, JobStatus::Pending)?;
        let _: () = self
            .conn
            .rpush(self.queue_key(), &job_id)
            .map_err(kv_error)?;

        let waiter = self.subscriber.waiter(&job_id);
        waiter.wait();
        Ok(waiter)
    }

    /// Pops and runs one job. Returns `false` when the queue is empty or the
    /// popped job is not eligible on this worker (in which case it goes back
    /// to the tail). Evaluation errors are recorded on the job, not
    /// propagated.
    pub fn work_once(&mut self) -> Result<bool, SwarmError> {
        let popped: Option<String> = self.conn.lpop(self.queue_key(), None).map_err(kv_error)?;
        let Some(job_id) = popped else {
            return Ok(false);
        };
        debug!(job = %job_id, "popped job");

        let filters_json: Option<String> =
            self.conn.get(self.filters_key(&job_id)).map_err(kv_error)?;
        let job_filters: BTreeMap<String, String> = match filters_json {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| SwarmError::serialization(e.to_string()))?,
            None => BTreeMap::new(),
        };

        if !filters_match(&job_filters, &self.config.queue_filters) {
            debug!(job = %job_id, "filter mismatch, re-queueing at the tail");
            let _: () = self
                .conn
                .rpush(self.queue_key(), &job_id)
                .map_err(kv_error)?;
            return Ok(false);
        }

        self.update_status(&job_id, JobStatus::Running)?;

        match self.execute(&job_id) {
            Ok(result) => {
                let _: () = self
                    .conn
                    .set(self.result_key(&job_id), result.encode_string()?)
                    .map_err(kv_error)?;
                self.update_status(&job_id, JobStatus::Success)?;
            }
            Err(e) => {
                warn!(job = %job_id, error = %e, "job failed");
                let _: () = self
                    .conn
                    .set(self.fail_reason_key(&job_id), e.to_string())
                    .map_err(kv_error)?;
                self.update_status(&job_id, JobStatus::Failure)?;
            }
        }
        Ok(true)
    }

    /// Deserializes and evaluates one job's payload against its shipped
    /// locals.
    fn execute(&mut self, job_id: &str) -> Result<Value, SwarmError> {
        let payload: Option<String> =
            self.conn.get(self.payload_key(job_id)).map_err(kv_error)?;
        let payload = payload.ok_or_else(|| SwarmError::QueueExecution {
            reason: format!("unable to load payload for job {job_id}"),
        })?;
        let (mut ast, node) = swarm_lang::serialize::deserialize(&payload)?;

        let envelope: Option<String> =
            self.conn.get(self.locals_key(job_id)).map_err(kv_error)?;
        let envelope = envelope.ok_or_else(|| SwarmError::QueueExecution {
            reason: format!("unable to load local environment for job {job_id}"),
        })?;
        let mut locals = LocalSymbolValueStore::new();
        locals.deserialize_locals(&mut ast, &envelope)?;

        let mut interpreter = Interpreter::with_locals(&self.config, locals);
        interpreter.evaluate(&ast, node)
    }

    /// Works jobs until the waiter reports finished, sleeping between empty
    /// polls. `THREAD_EXIT` is a checkpoint between polls.
    pub fn work_until(&mut self, waiter: &Arc<Waiter>) -> Result<(), SwarmError> {
        debug!(job = %waiter.id(), "working until job completes");
        while !waiter.finished() {
            if THREAD_EXIT.load(Ordering::SeqCst) {
                break;
            }
            if !self.work_once()? {
                thread::sleep(Duration::from_micros(self.config.queue_sleep_us));
            }
        }
        Ok(())
    }

    /// Works jobs until `THREAD_EXIT`: the daemon loop of `--work-queue`.
    pub fn work_forever(&mut self) -> Result<(), SwarmError> {
        while !THREAD_EXIT.load(Ordering::SeqCst) {
            if !self.work_once()? {
                thread::sleep(Duration::from_micros(self.config.queue_sleep_us));
            }
        }
        Ok(())
    }

    pub fn get_result(&mut self, job_id: &str) -> Result<Option<Value>, SwarmError> {
        let payload: Option<String> =
            self.conn.get(self.result_key(job_id)).map_err(kv_error)?;
        match payload {
            Some(payload) => Ok(Some(Value::decode_string(&payload)?)),
            None => Ok(None),
        }
    }

    pub fn get_failure_reason(&mut self, job_id: &str) -> String {
        let reason: Option<String> = self
            .conn
            .get(self.fail_reason_key(job_id))
            .unwrap_or(None);
        reason.unwrap_or_else(|| "unknown error".to_string())
    }

    /// Queue + work until finished + fetch the result.
    pub fn evaluate(
        &mut self,
        ast: &Ast,
        node: NodeId,
        locals: &mut LocalSymbolValueStore,
        filters: &BTreeMap<String, String>,
    ) -> Result<Value, SwarmError> {
        let waiter = self.queue(ast, node, locals, filters)?;
        self.work_until(&waiter)?;

        match self.get_status(waiter.id()) {
            JobStatus::Failure => Err(SwarmError::QueueExecution {
                reason: self.get_failure_reason(waiter.id()),
            }),
            JobStatus::Unknown => Err(SwarmError::QueueExecution {
                reason: "job status transitioned to UNKNOWN".into(),
            }),
            _ => self
                .get_result(waiter.id())?
                .ok_or_else(|| SwarmError::QueueExecution {
                    reason: format!("no result recorded for job {}", waiter.id()),
                }),
        }
    }

    /// Drops every pending job id. Job records themselves are left to expire
    /// with the deployment's KV retention.
    pub fn clear(&mut self) -> Result<(), SwarmError> {
        let _: () = self.conn.del(self.queue_key()).map_err(kv_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_job_filters_match_any_worker() {
        assert!(filters_match(&map(&[]), &map(&[])));
        assert!(filters_match(&map(&[]), &map(&[("continent", "Europe")])));
    }

    #[test]
    fn matching_is_literal_equality_per_key() {
        let job = map(&[("continent", "Australia"), ("rank", "69")]);
        let same = map(&[("continent", "Australia"), ("rank", "69")]);
        let superset = map(&[
            ("continent", "Australia"),
            ("rank", "69"),
            ("extra", "yes"),
        ]);
        assert!(filters_match(&job, &same));
        assert!(filters_match(&job, &superset));
    }

    #[test]
    fn missing_or_unequal_worker_keys_mismatch() {
        let job = map(&[("continent", "Australia")]);
        assert!(!filters_match(&job, &map(&[])));
        assert!(!filters_match(&job, &map(&[("continent", "Europe")])));
    }

    #[test]
    fn status_chars_round_trip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Success,
            JobStatus::Failure,
            JobStatus::Unknown,
        ] {
            assert_eq!(JobStatus::from_char(status.as_char()), Some(status));
        }
        assert_eq!(JobStatus::from_char('x'), None);
        assert_eq!(JobStatus::Success.name(), "SUCCESS");
    }
}
