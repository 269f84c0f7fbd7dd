//! Correlation context.
//!
//! A [`Context`] is an immutable chain of frames. Deriving a child pushes a
//! frame in front of the parent's chain; the parent is never touched. The
//! correlation id has its own typed slot, so looking it up never collides
//! with caller-provided string keys.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

/// Immutable, cheaply clonable call-chain context.
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Frame>>,
}

struct Frame {
    parent: Option<Arc<Frame>>,
    slot: Slot,
}

enum Slot {
    CorrelationId(Arc<str>),
    Value { key: Arc<str>, value: Arc<str> },
}

/// Generate a fresh correlation id (UUID v4).
pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Return a child of `parent` carrying a freshly generated correlation id.
pub fn attach_new_correlation_id(parent: &Context) -> Context {
    parent.with_new_correlation_id()
}

/// The correlation id visible from `ctx`, or `""` when none was attached.
pub fn read_correlation_id(ctx: &Context) -> &str {
    ctx.correlation_id()
}

impl Context {
    /// The empty root context.
    pub fn background() -> Self {
        Self::default()
    }

    fn push(&self, slot: Slot) -> Self {
        Self {
            head: Some(Arc::new(Frame {
                parent: self.head.clone(),
                slot,
            })),
        }
    }

    fn frames(&self) -> impl Iterator<Item = &Frame> {
        std::iter::successors(self.head.as_deref(), |frame| frame.parent.as_deref())
    }

    /// Child context holding a new unique correlation id.
    pub fn with_new_correlation_id(&self) -> Self {
        self.with_correlation_id(new_correlation_id())
    }

    /// Child context holding the given correlation id.
    ///
    /// Used to continue a chain started elsewhere, e.g. an inbound request id.
    pub fn with_correlation_id(&self, id: impl Into<String>) -> Self {
        self.push(Slot::CorrelationId(Arc::from(id.into())))
    }

    /// Child context holding a string value under `key`.
    ///
    /// Does not affect the correlation id.
    pub fn with_value(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(Slot::Value {
            key: Arc::from(key.into()),
            value: Arc::from(value.into()),
        })
    }

    /// Nearest correlation id in the ancestry, or `""`.
    pub fn correlation_id(&self) -> &str {
        self.frames()
            .find_map(|frame| match &frame.slot {
                Slot::CorrelationId(id) => Some(&**id),
                Slot::Value { .. } => None,
            })
            .unwrap_or("")
    }

    /// Whether a correlation id is attached anywhere in the ancestry.
    pub fn has_correlation_id(&self) -> bool {
        self.frames()
            .any(|frame| matches!(frame.slot, Slot::CorrelationId(_)))
    }

    /// Nearest value stored under `key`.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.frames().find_map(|frame| match &frame.slot {
            Slot::Value { key: k, value } if &**k == key => Some(&**value),
            _ => None,
        })
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("correlation_id", &self.correlation_id())
            .field("depth", &self.frames().count())
            .finish()
    }
}
