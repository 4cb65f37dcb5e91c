//! Scripted engines for driving the facades in tests
//!
//! Both mocks are cheap handles around shared state: move one clone into the
//! facade and keep another in the test to script completions and inspect
//! the calls the facade made.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tributary::client::{
    ConsumerEngine, Engine, EngineEvent, ErrorCode, EventSender, Message, Outcome,
    ProducerEngine, ProducerRecord, RecordMetadata, Timestamp, Token, TopicPartition,
};

/// A call the facade made into an engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Subscribe(Vec<String>),
    Unsubscribe,
    PollMessage,
    Commit {
        offsets: Vec<TopicPartition>,
        confirmed: bool,
    },
    Send {
        topic: String,
        partition: Option<i32>,
    },
    Shutdown,
}

/// How an engine answers `shutdown`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Report `Closed` right away
    Immediate,
    /// Never answer
    Silent,
}

#[derive(Default)]
struct Shared {
    events: Mutex<Option<EventSender>>,
    calls: Mutex<Vec<EngineCall>>,
    polls: AtomicU64,
}

impl Shared {
    fn record(&self, call: EngineCall) {
        self.calls.lock().push(call);
    }

    fn complete(&self, token: Token, result: Result<Outcome, ErrorCode>) {
        if let Some(events) = self.events.lock().as_ref() {
            events.complete(token, result);
        }
    }

    fn emit(&self, event: EngineEvent) {
        if let Some(events) = self.events.lock().as_ref() {
            events.send(event);
        }
    }
}

// ============================================================================
// Consumer
// ============================================================================

struct ConsumerScript {
    assignment: Vec<TopicPartition>,
    auto_assign: bool,
    subscribe_error: Option<ErrorCode>,
    commit_error: Option<ErrorCode>,
    confirm_commits: bool,
    shutdown_mode: ShutdownMode,
    queued: VecDeque<Result<Message, ErrorCode>>,
    waiting_polls: VecDeque<Token>,
    waiting_commits: Vec<(Token, Vec<TopicPartition>)>,
}

/// Consumer engine answering from a script
#[derive(Clone)]
pub struct ScriptedConsumerEngine {
    shared: Arc<Shared>,
    script: Arc<Mutex<ConsumerScript>>,
}

impl Default for ScriptedConsumerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedConsumerEngine {
    /// Assigns partition 0 of every subscribed topic, confirms commits and
    /// shuts down immediately.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            script: Arc::new(Mutex::new(ConsumerScript {
                assignment: Vec::new(),
                auto_assign: true,
                subscribe_error: None,
                commit_error: None,
                confirm_commits: true,
                shutdown_mode: ShutdownMode::Immediate,
                queued: VecDeque::new(),
                waiting_polls: VecDeque::new(),
                waiting_commits: Vec::new(),
            })),
        }
    }

    /// An engine that never answers anything on its own
    pub fn silent() -> Self {
        let engine = Self::new();
        {
            let mut script = engine.script.lock();
            script.confirm_commits = false;
            script.shutdown_mode = ShutdownMode::Silent;
        }
        engine
    }

    pub fn with_assignment(self, assignment: Vec<TopicPartition>) -> Self {
        {
            let mut script = self.script.lock();
            script.auto_assign = false;
            script.assignment = assignment;
        }
        self
    }

    pub fn fail_subscribe(&self, code: ErrorCode) {
        self.script.lock().subscribe_error = Some(code);
    }

    pub fn fail_commits(&self, code: ErrorCode) {
        self.script.lock().commit_error = Some(code);
    }

    /// Deliver a message to the waiting poll, or queue it for the next one
    pub fn deliver(&self, message: Message) {
        self.answer_poll(Ok(message));
    }

    /// Fail the waiting poll, or the next one
    pub fn fail_poll(&self, code: ErrorCode) {
        self.answer_poll(Err(code));
    }

    fn answer_poll(&self, answer: Result<Message, ErrorCode>) {
        let waiting = {
            let mut script = self.script.lock();
            match script.waiting_polls.pop_front() {
                Some(token) => Some(token),
                None => {
                    script.queued.push_back(answer.clone());
                    None
                }
            }
        };
        if let Some(token) = waiting {
            self.shared.complete(token, answer.map(Outcome::Message));
        }
    }

    /// Confirm the oldest unanswered commit with the given per-partition result
    pub fn confirm_commit(&self, reported: Vec<TopicPartition>) -> bool {
        let waiting = {
            let mut script = self.script.lock();
            if script.waiting_commits.is_empty() {
                None
            } else {
                Some(script.waiting_commits.remove(0))
            }
        };
        match waiting {
            Some((token, _)) => {
                self.shared.complete(token, Ok(Outcome::Committed(reported)));
                true
            }
            None => false,
        }
    }

    pub fn rebalance(&self, assignment: Vec<TopicPartition>) {
        self.script.lock().assignment = assignment.clone();
        self.shared.emit(EngineEvent::Rebalance(assignment));
    }

    pub fn emit_fatal(&self, code: ErrorCode) {
        self.shared.emit(EngineEvent::Fatal(code));
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.shared.calls.lock().clone()
    }

    pub fn waiting_polls(&self) -> usize {
        self.script.lock().waiting_polls.len()
    }

    pub fn waiting_commits(&self) -> usize {
        self.script.lock().waiting_commits.len()
    }

    pub fn polls(&self) -> u64 {
        self.shared.polls.load(Ordering::SeqCst)
    }

    /// Whether the facade's background task is still receiving events
    pub fn is_attached(&self) -> bool {
        self.shared
            .events
            .lock()
            .as_ref()
            .map(|events| !events.is_closed())
            .unwrap_or(false)
    }

    /// Drop the event channel, as a crashed engine would
    pub fn detach(&self) {
        self.shared.events.lock().take();
    }
}

impl Engine for ScriptedConsumerEngine {
    fn attach(&self, events: EventSender) {
        *self.shared.events.lock() = Some(events);
    }

    fn poll(&self) {
        self.shared.polls.fetch_add(1, Ordering::SeqCst);
    }

    fn shutdown(&self, token: Token, _budget: Duration) {
        self.shared.record(EngineCall::Shutdown);
        let mode = {
            let mut script = self.script.lock();
            script.assignment.clear();
            script.shutdown_mode
        };
        if mode == ShutdownMode::Immediate {
            self.shared.complete(token, Ok(Outcome::Closed));
        }
    }
}

impl ConsumerEngine for ScriptedConsumerEngine {
    fn subscribe(&self, topics: &[String]) -> Result<(), ErrorCode> {
        self.shared.record(EngineCall::Subscribe(topics.to_vec()));
        let assignment = {
            let mut script = self.script.lock();
            if let Some(code) = script.subscribe_error {
                return Err(code);
            }
            if !script.auto_assign {
                return Ok(());
            }
            script.assignment = topics
                .iter()
                .filter_map(|topic| TopicPartition::new(topic.clone(), 0).ok())
                .collect();
            script.assignment.clone()
        };
        self.shared.emit(EngineEvent::Rebalance(assignment));
        Ok(())
    }

    fn unsubscribe(&self) -> Result<(), ErrorCode> {
        self.shared.record(EngineCall::Unsubscribe);
        let mut script = self.script.lock();
        if script.auto_assign {
            script.assignment.clear();
        }
        Ok(())
    }

    fn poll_message(&self, token: Token) {
        self.shared.record(EngineCall::PollMessage);
        let queued = {
            let mut script = self.script.lock();
            match script.queued.pop_front() {
                Some(answer) => Some(answer),
                None => {
                    script.waiting_polls.push_back(token);
                    None
                }
            }
        };
        if let Some(answer) = queued {
            self.shared.complete(token, answer.map(Outcome::Message));
        }
    }

    fn commit(&self, offsets: &[TopicPartition], token: Option<Token>) -> Result<(), ErrorCode> {
        self.shared.record(EngineCall::Commit {
            offsets: offsets.to_vec(),
            confirmed: token.is_some(),
        });

        let mut script = self.script.lock();
        if let Some(code) = script.commit_error {
            return Err(code);
        }
        if let Some(token) = token {
            if script.confirm_commits {
                drop(script);
                let reported = offsets
                    .iter()
                    .cloned()
                    .map(|tp| tp.with_error(ErrorCode::NO_ERROR))
                    .collect();
                self.shared.complete(token, Ok(Outcome::Committed(reported)));
            } else {
                script.waiting_commits.push((token, offsets.to_vec()));
            }
        }
        Ok(())
    }

    fn assignment(&self) -> Vec<TopicPartition> {
        self.script.lock().assignment.clone()
    }
}

// ============================================================================
// Producer
// ============================================================================

/// How a producer engine answers `send`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Report delivery right away
    Immediate,
    /// Report queued deliveries on the next `poll()`
    OnPoll,
    /// Report every delivery with this error
    Fail(ErrorCode),
    /// Keep records until `release()` or shutdown
    Hold,
}

struct ProducerScript {
    mode: DeliveryMode,
    refuse: Option<ErrorCode>,
    shutdown_mode: ShutdownMode,
    next_offset: i64,
    held: Vec<(Token, ProducerRecord)>,
}

/// Producer engine answering from a script
#[derive(Clone)]
pub struct ScriptedProducerEngine {
    shared: Arc<Shared>,
    script: Arc<Mutex<ProducerScript>>,
}

impl Default for ScriptedProducerEngine {
    fn default() -> Self {
        Self::new(DeliveryMode::Immediate)
    }
}

impl ScriptedProducerEngine {
    /// Offsets start at 0; shutdown flushes held records and reports `Closed`.
    pub fn new(mode: DeliveryMode) -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            script: Arc::new(Mutex::new(ProducerScript {
                mode,
                refuse: None,
                shutdown_mode: ShutdownMode::Immediate,
                next_offset: 0,
                held: Vec::new(),
            })),
        }
    }

    pub fn with_next_offset(self, offset: i64) -> Self {
        self.script.lock().next_offset = offset;
        self
    }

    pub fn with_shutdown(self, mode: ShutdownMode) -> Self {
        self.script.lock().shutdown_mode = mode;
        self
    }

    /// Refuse subsequent records at enqueue time
    pub fn refuse(&self, code: Option<ErrorCode>) {
        self.script.lock().refuse = code;
    }

    pub fn set_mode(&self, mode: DeliveryMode) {
        self.script.lock().mode = mode;
    }

    /// Deliver every held record
    pub fn release(&self) -> usize {
        let reports = self.take_held();
        let count = reports.len();
        for (token, metadata) in reports {
            self.shared.complete(token, Ok(Outcome::Delivered(metadata)));
        }
        count
    }

    pub fn emit_fatal(&self, code: ErrorCode) {
        self.shared.emit(EngineEvent::Fatal(code));
    }

    pub fn held(&self) -> usize {
        self.script.lock().held.len()
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.shared.calls.lock().clone()
    }

    pub fn polls(&self) -> u64 {
        self.shared.polls.load(Ordering::SeqCst)
    }

    pub fn is_attached(&self) -> bool {
        self.shared
            .events
            .lock()
            .as_ref()
            .map(|events| !events.is_closed())
            .unwrap_or(false)
    }

    fn take_held(&self) -> Vec<(Token, RecordMetadata)> {
        let mut script = self.script.lock();
        let held = std::mem::take(&mut script.held);
        held.into_iter()
            .map(|(token, record)| {
                let metadata = assign_offset(&mut script, record);
                (token, metadata)
            })
            .collect()
    }
}

fn assign_offset(script: &mut ProducerScript, record: ProducerRecord) -> RecordMetadata {
    let offset = script.next_offset;
    script.next_offset += 1;
    RecordMetadata {
        topic: record.topic,
        partition: record.partition.unwrap_or(0),
        offset,
        timestamp: Some(Timestamp::LogAppendTime(1_700_000_000_000 + offset)),
    }
}

impl Engine for ScriptedProducerEngine {
    fn attach(&self, events: EventSender) {
        *self.shared.events.lock() = Some(events);
    }

    fn poll(&self) {
        self.shared.polls.fetch_add(1, Ordering::SeqCst);
        if self.script.lock().mode == DeliveryMode::OnPoll {
            self.release();
        }
    }

    fn shutdown(&self, token: Token, _budget: Duration) {
        self.shared.record(EngineCall::Shutdown);
        if self.script.lock().shutdown_mode == ShutdownMode::Immediate {
            self.release();
            self.shared.complete(token, Ok(Outcome::Closed));
        }
    }
}

impl ProducerEngine for ScriptedProducerEngine {
    fn send(&self, token: Token, record: ProducerRecord) -> Result<(), ErrorCode> {
        self.shared.record(EngineCall::Send {
            topic: record.topic.clone(),
            partition: record.partition,
        });

        let answer = {
            let mut script = self.script.lock();
            if let Some(code) = script.refuse {
                return Err(code);
            }
            match script.mode {
                DeliveryMode::Immediate => Some(Ok(Outcome::Delivered(assign_offset(
                    &mut script,
                    record,
                )))),
                DeliveryMode::Fail(code) => Some(Err(code)),
                DeliveryMode::OnPoll | DeliveryMode::Hold => {
                    script.held.push((token, record));
                    None
                }
            }
        };

        if let Some(answer) = answer {
            self.shared.complete(token, answer);
        }
        Ok(())
    }
}
