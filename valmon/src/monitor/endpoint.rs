//! Round-robin endpoint selection.

use parking_lot::Mutex;

use crate::{Error, Result};

/// Round-robin selector over a fixed pool of upstream base URLs.
///
/// The pool is immutable after construction; only the cursor moves. Calls
/// from concurrent probes sharing one selector never skip or repeat an
/// endpoint before every other one was handed out.
#[derive(Debug)]
pub struct EndpointSelector {
    endpoints: Vec<String>,
    cursor: Mutex<usize>,
}

impl EndpointSelector {
    /// Create a selector. An empty pool is a configuration error.
    pub fn new(endpoints: Vec<String>) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(Error::config("endpoint pool must not be empty"));
        }
        Ok(Self {
            endpoints,
            cursor: Mutex::new(0),
        })
    }

    /// Next endpoint in rotation.
    pub fn next(&self) -> String {
        let mut cursor = self.cursor.lock();
        let endpoint = self.endpoints[*cursor].clone();
        *cursor = (*cursor + 1) % self.endpoints.len();
        endpoint
    }
}
