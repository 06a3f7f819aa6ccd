//! Probes - event sources called from instrumentation points

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

/// A measured duration of one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationEvent {
    pub duration: Duration,
    pub message_type: String,
}

/// An occurrence of something for one message type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalEvent {
    pub message_type: String,
}

/// A queue length sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueLengthEvent {
    pub queue: String,
    pub length: i64,
}

/// Any probe event, tagged with the probe name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeEvent {
    Duration { probe: Arc<str>, event: DurationEvent },
    Signal { probe: Arc<str>, event: SignalEvent },
    QueueLength { probe: Arc<str>, event: QueueLengthEvent },
}

impl ProbeEvent {
    /// Name of the probe that emitted the event
    pub fn probe(&self) -> &str {
        match self {
            ProbeEvent::Duration { probe, .. }
            | ProbeEvent::Signal { probe, .. }
            | ProbeEvent::QueueLength { probe, .. } => probe,
        }
    }
}

type Observer<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Observer list shared by all probe kinds
struct Observers<E> {
    list: RwLock<Vec<Observer<E>>>,
}

impl<E> Observers<E> {
    fn new() -> Self {
        Self {
            list: RwLock::new(Vec::new()),
        }
    }

    fn register(&self, observer: Observer<E>) {
        self.list.write().push(observer);
    }

    fn notify(&self, event: &E) {
        for observer in self.list.read().iter() {
            observer(event);
        }
    }

    fn len(&self) -> usize {
        self.list.read().len()
    }
}

macro_rules! probe_common {
    ($probe:ident, $event:ty) => {
        impl $probe {
            /// Create a probe without observers
            pub fn new(name: impl Into<Arc<str>>) -> Self {
                Self {
                    name: name.into(),
                    observers: Observers::new(),
                }
            }

            /// Probe name
            pub fn name(&self) -> &str {
                &self.name
            }

            /// Register an observer called for every event
            pub fn register<F>(&self, observer: F)
            where
                F: Fn(&$event) + Send + Sync + 'static,
            {
                self.observers.register(Arc::new(observer));
            }

            /// Number of registered observers
            pub fn observer_count(&self) -> usize {
                self.observers.len()
            }
        }

        impl std::fmt::Debug for $probe {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($probe))
                    .field("name", &self.name)
                    .field("observers", &self.observers.len())
                    .finish()
            }
        }
    };
}

/// Probe reporting durations (processing time, critical time)
pub struct DurationProbe {
    name: Arc<str>,
    observers: Observers<DurationEvent>,
}

probe_common!(DurationProbe, DurationEvent);

impl DurationProbe {
    /// Report the duration spent on a message of `message_type`
    pub fn record(&self, duration: Duration, message_type: &str) {
        self.observers.notify(&DurationEvent {
            duration,
            message_type: message_type.to_string(),
        });
    }
}

/// Probe reporting occurrences (retries)
pub struct SignalProbe {
    name: Arc<str>,
    observers: Observers<SignalEvent>,
}

probe_common!(SignalProbe, SignalEvent);

impl SignalProbe {
    /// Report one occurrence for `message_type`
    pub fn signal(&self, message_type: &str) {
        self.observers.notify(&SignalEvent {
            message_type: message_type.to_string(),
        });
    }
}

/// Probe reporting queue lengths
pub struct QueueLengthProbe {
    name: Arc<str>,
    observers: Observers<QueueLengthEvent>,
}

probe_common!(QueueLengthProbe, QueueLengthEvent);

impl QueueLengthProbe {
    /// Report the current length of `queue`
    pub fn signal(&self, queue: &str, length: i64) {
        self.observers.notify(&QueueLengthEvent {
            queue: queue.to_string(),
            length,
        });
    }
}
