use std::sync::{Arc, RwLock};

use futures::future::BoxFuture;

use crate::{
    CardflowError, Result, ShareLock,
    common::BroadcastQueue,
    dispatcher::RunId,
    events::{Event, GraphEvent, Message},
    utils,
    workflow::node::NodeId,
};

macro_rules! dispatch_event {
    ($handles:expr, $(&$item:ident), +) => {
        let handlers = $handles.read().unwrap().clone();
        for handle in handlers.iter() {
            (handle)($(&$item),+);
        }
    };
}

macro_rules! dispatch_event_async {
    ($handles:expr, $(&$item:ident), +) => {
        let handlers = $handles.read().unwrap().clone();
        if !handlers.is_empty() {
            if let Ok(rt) = tokio::runtime::Handle::try_current() {
                rt.spawn(async move {
                    for handle in handlers.iter() {
                        (handle)($(&$item),+).await;
                    }
                });
            }
        }
    };
}

const EVENT_QUEUE_SIZE: usize = 2048;

pub type WorkflowEventHandle = Arc<dyn Fn(&Event<Message>) + Send + Sync>;
pub type WorkflowEventHandleAsync = Arc<dyn Fn(&Event<Message>) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ChannelOptions {
    /// use the glob pattern to match the run id
    /// eg. run1*
    pub rid: String,

    /// use the glob pattern to match the node id
    /// eg. node_*
    pub nid: String,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            rid: "*".to_string(),
            nid: "*".to_string(),
        }
    }
}

impl ChannelOptions {
    pub fn new(
        rid: String,
        nid: String,
    ) -> Self {
        Self {
            rid,
            nid,
        }
    }

    pub fn with_rid(rid: String) -> Self {
        Self {
            rid,
            nid: "*".to_string(),
        }
    }

    pub fn with_nid(nid: String) -> Self {
        Self {
            rid: "*".to_string(),
            nid,
        }
    }
}

/// Event channel of an editor session.
///
/// Synchronous handlers run inline on publish, in publish order; async
/// handlers are spawned on the current tokio runtime. Raw subscribers read
/// the broadcast queue.
#[derive(Clone)]
pub struct Channel {
    event_queue: Arc<BroadcastQueue<Event<Message>>>,

    events: ShareLock<Vec<WorkflowEventHandle>>,
    events_async: ShareLock<Vec<WorkflowEventHandleAsync>>,
}

impl Default for Channel {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel {
    pub fn new() -> Self {
        Self {
            event_queue: BroadcastQueue::new(EVENT_QUEUE_SIZE),
            events: Arc::new(RwLock::new(Vec::new())),
            events_async: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// subscribe to the raw event stream
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event<Message>> {
        self.event_queue.subscribe()
    }

    pub(crate) fn publish(
        &self,
        rid: &RunId,
        nid: &NodeId,
        event: GraphEvent,
    ) {
        let e = Event::new(&Message {
            rid: rid.clone(),
            nid: nid.clone(),
            event,
            timestamp: utils::time::time_millis(),
        });

        let evt = e.clone();
        dispatch_event!(self.events, &evt);
        let async_evt = e.clone();
        dispatch_event_async!(self.events_async, &async_evt);

        // no raw subscribers is not an error
        let _ = self.event_queue.send(e);
    }
}

/// Glob-filtered handler registration on a [`Channel`].
#[derive(Clone)]
pub struct ChannelEvent {
    channel: Arc<Channel>,

    glob: (globset::GlobMatcher, globset::GlobMatcher),
}

impl ChannelEvent {
    pub fn channel(
        channel: Arc<Channel>,
        options: ChannelOptions,
    ) -> Result<Self> {
        let compile = |pattern: &str| {
            globset::Glob::new(pattern).map(|g| g.compile_matcher()).map_err(|e| CardflowError::Config(format!("invalid glob '{}': {}", pattern, e)))
        };

        Ok(Self {
            glob: (compile(&options.rid)?, compile(&options.nid)?),
            channel,
        })
    }

    /// Called with the run id when a run completes without errors.
    pub fn on_complete(
        &self,
        f: impl Fn(RunId) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.events.write().unwrap().push(Arc::new(move |e| {
            if e.event.is_complete() && is_match(&glob, e) {
                f(e.rid.clone());
            }
        }));
    }

    /// Called when a run finishes with at least one failed step.
    pub fn on_error(
        &self,
        f: impl Fn(&Event<Message>) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.events.write().unwrap().push(Arc::new(move |e| {
            if e.event.is_error() && is_match(&glob, e) {
                f(e);
            }
        }));
    }

    pub fn on_event(
        &self,
        f: impl Fn(&Event<Message>) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.events.write().unwrap().push(Arc::new(move |e| {
            if is_match(&glob, e) {
                f(e);
            }
        }));
    }

    pub fn on_event_async<F>(
        &self,
        f: F,
    ) where
        F: Fn(&Event<Message>) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let glob = self.glob.clone();

        self.channel.events_async.write().unwrap().push(Arc::new(move |e| {
            if is_match(&glob, e) {
                f(e)
            } else {
                Box::pin(async {})
            }
        }));
    }
}

fn is_match(
    glob: &(globset::GlobMatcher, globset::GlobMatcher),
    e: &Event<Message>,
) -> bool {
    let (pat_rid, pat_nid) = glob;
    pat_rid.is_match(&e.rid) && pat_nid.is_match(&e.nid)
}
