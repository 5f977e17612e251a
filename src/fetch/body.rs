//! One-shot message bodies
//!
//! A body can be read exactly once. Anything that needs the bytes twice has
//! to call [`Body::duplicate`] before the first read.

use std::fmt;
use std::sync::Arc;

/// Single-consumption byte payload shared by requests and responses
#[derive(Default)]
pub struct Body {
    bytes: Option<Arc<[u8]>>,
}

impl Body {
    /// Create an unread body
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: Some(bytes.into()),
        }
    }

    /// Create an unread, zero-length body
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Whether the body has already been read
    pub fn is_used(&self) -> bool {
        self.bytes.is_none()
    }

    /// Length of the unread body, `None` once consumed
    pub fn len(&self) -> Option<usize> {
        self.bytes.as_ref().map(|b| b.len())
    }

    /// Take the bytes, leaving the body consumed
    pub fn take(&mut self) -> Option<Arc<[u8]>> {
        self.bytes.take()
    }

    /// Copy an unread body. Returns `None` when it was already consumed.
    pub fn duplicate(&self) -> Option<Self> {
        self.bytes.as_ref().map(|b| Self {
            bytes: Some(Arc::clone(b)),
        })
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.bytes {
            Some(b) => write!(f, "Body({} bytes)", b.len()),
            None => write!(f, "Body(used)"),
        }
    }
}
