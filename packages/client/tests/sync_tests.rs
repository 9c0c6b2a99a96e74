//! Reconnect and reconciliation flow over scripted in-memory transports.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use client::{
    PushConnection, PushTransport, RetryPolicy, SnapshotApi, SyncClient, TransportError,
};
use tracker_core::{
    EpochMetrics, Envelope, ExperimentId, Job, JobId, JobParameters, JobSnapshot, JobStatus,
    MetricHistory, Optimizer, ProgressEvent, SharedParams, SubscribeRequest, Topic,
};

struct ScriptedConnection {
    deltas: VecDeque<Envelope>,
    sent: Arc<Mutex<Vec<SubscribeRequest>>>,
}

impl PushConnection for ScriptedConnection {
    async fn send(&mut self, request: &SubscribeRequest) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn next_envelope(&mut self) -> Result<Option<Envelope>, TransportError> {
        Ok(self.deltas.pop_front())
    }
}

struct ScriptedTransport {
    connections: VecDeque<Result<ScriptedConnection, TransportError>>,
}

impl ScriptedTransport {
    fn new(connections: Vec<Result<ScriptedConnection, TransportError>>) -> Self {
        Self {
            connections: connections.into(),
        }
    }
}

impl PushTransport for ScriptedTransport {
    type Connection = ScriptedConnection;

    async fn connect(&mut self) -> Result<Self::Connection, TransportError> {
        self.connections
            .pop_front()
            .unwrap_or(Err(TransportError::Connect("script exhausted".into())))
    }
}

struct ScriptedSnapshots {
    per_job: HashMap<JobId, VecDeque<JobSnapshot>>,
    lists: VecDeque<Vec<Job>>,
}

impl ScriptedSnapshots {
    fn new() -> Self {
        Self {
            per_job: HashMap::new(),
            lists: VecDeque::new(),
        }
    }

    fn push_snapshot(&mut self, snapshot: JobSnapshot) {
        self.per_job
            .entry(snapshot.job.id)
            .or_default()
            .push_back(snapshot);
    }
}

impl SnapshotApi for ScriptedSnapshots {
    async fn job_snapshot(&mut self, job_id: JobId) -> Result<JobSnapshot, TransportError> {
        let queue = self
            .per_job
            .get_mut(&job_id)
            .ok_or_else(|| TransportError::Request(format!("unknown job {}", job_id)))?;
        // Later pulls see later authoritative states; the last one sticks.
        if queue.len() > 1 {
            Ok(queue.pop_front().expect("non-empty queue"))
        } else {
            queue
                .front()
                .cloned()
                .ok_or_else(|| TransportError::Request(format!("unknown job {}", job_id)))
        }
    }

    async fn list_jobs(
        &mut self,
        _experiment_id: Option<ExperimentId>,
    ) -> Result<Vec<Job>, TransportError> {
        Ok(self.lists.pop_front().unwrap_or_default())
    }
}

fn cnn_job(epochs: u32) -> Job {
    let params = JobParameters::Cnn {
        kernel_size: 3,
        shared: SharedParams {
            optimizer: Optimizer::Adam,
            learning_rate: 0.001,
            batch_size: 64,
            epochs,
            dropout_rate: None,
            hidden_size: None,
            use_scheduler: false,
        },
    };
    Job::new("cnn-k3", ExperimentId::new(), params)
}

fn row(epoch: u32) -> EpochMetrics {
    EpochMetrics {
        train_loss: 1.0 / epoch as f64,
        val_loss: 1.1 / epoch as f64,
        train_accuracy: 60.0 + epoch as f64,
        val_accuracy: 62.0 + epoch as f64,
        epoch_time: 7.5,
    }
}

fn snapshot_at(job: &Job, epochs: u32) -> JobSnapshot {
    let mut snapshot_job = job.clone();
    let mut history = MetricHistory::new();
    if epochs > 0 {
        snapshot_job.status = JobStatus::Running;
        for epoch in 1..=epochs {
            history.push(row(epoch));
        }
    }
    snapshot_job.epochs_completed = epochs;
    JobSnapshot::new(snapshot_job, history)
}

fn epoch_envelope(job: &Job, epoch: u32) -> Envelope {
    Envelope::new(ProgressEvent::epoch(
        job.id,
        epoch,
        job.epochs_total(),
        row(epoch),
        Some(62.0 + epoch as f64),
    ))
}

#[tokio::test]
async fn reconnect_repulls_snapshot_before_trusting_deltas() {
    let job = cnn_job(6);
    let sent = Arc::new(Mutex::new(Vec::new()));

    // First connection delivers epochs 1 and 2, then drops. The second
    // delivers epoch 5; epochs 3 and 4 were missed during the gap.
    let transport = ScriptedTransport::new(vec![
        Ok(ScriptedConnection {
            deltas: vec![epoch_envelope(&job, 1), epoch_envelope(&job, 2)].into(),
            sent: sent.clone(),
        }),
        Ok(ScriptedConnection {
            deltas: vec![epoch_envelope(&job, 5)].into(),
            sent: sent.clone(),
        }),
    ]);

    let mut snapshots = ScriptedSnapshots::new();
    snapshots.push_snapshot(snapshot_at(&job, 0));
    snapshots.push_snapshot(snapshot_at(&job, 4));

    let mut sync =
        SyncClient::new(transport, snapshots, RetryPolicy::new(Duration::from_millis(10)));
    sync.track(Topic::Job(job.id));

    let applied = sync.sync_once().await.unwrap();
    assert_eq!(applied, 2);
    assert_eq!(sync.store().get(job.id).unwrap().history.len(), 2);

    let applied = sync.sync_once().await.unwrap();
    assert_eq!(applied, 1);

    let view = sync.store().get(job.id).unwrap();
    assert_eq!(view.history.len(), 5);
    assert_eq!(view.job.epochs_completed, 5);
    assert_eq!(
        view.history.val_accuracy,
        vec![63.0, 64.0, 65.0, 66.0, 67.0]
    );

    // Both connections re-subscribed before any delta flowed.
    let requests = sent.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.topic == Topic::Job(job.id)));
}

#[tokio::test]
async fn connect_failures_retry_at_the_fixed_delay() {
    let job = cnn_job(3);
    let sent = Arc::new(Mutex::new(Vec::new()));
    let delay = Duration::from_millis(50);

    let transport = ScriptedTransport::new(vec![
        Err(TransportError::Connect("refused".into())),
        Ok(ScriptedConnection {
            deltas: vec![epoch_envelope(&job, 1)].into(),
            sent,
        }),
    ]);

    let mut snapshots = ScriptedSnapshots::new();
    snapshots.push_snapshot(snapshot_at(&job, 0));

    let mut sync = SyncClient::new(transport, snapshots, RetryPolicy::new(delay));
    sync.track(Topic::Job(job.id));

    let started = Instant::now();
    let applied = sync.sync_once().await.unwrap();
    assert_eq!(applied, 1);
    // The retry never fires tighter than the configured delay.
    assert!(started.elapsed() >= delay);
    assert_eq!(sync.store().get(job.id).unwrap().history.len(), 1);
}

#[tokio::test]
async fn wildcard_subscription_pulls_the_job_list() {
    let job = cnn_job(4);
    let sent = Arc::new(Mutex::new(Vec::new()));

    let transport = ScriptedTransport::new(vec![Ok(ScriptedConnection {
        deltas: vec![Envelope::new(ProgressEvent::status_only(
            job.id,
            JobStatus::Running,
            0,
            4,
        ))]
        .into(),
        sent: sent.clone(),
    })]);

    let mut snapshots = ScriptedSnapshots::new();
    snapshots.lists.push_back(vec![job.clone()]);

    let mut sync =
        SyncClient::new(transport, snapshots, RetryPolicy::new(Duration::from_millis(10)));
    sync.track(Topic::All);

    let applied = sync.sync_once().await.unwrap();
    assert_eq!(applied, 1);

    let view = sync.store().get(job.id).unwrap();
    assert_eq!(view.job.status, JobStatus::Running);
    assert!(view.history.is_empty());
    assert_eq!(
        sent.lock().unwrap().first().map(|r| r.topic),
        Some(Topic::All)
    );
}
