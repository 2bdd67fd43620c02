//! Rejects message bodies over a size limit

use super::{Action, Interceptor, PushRequest};
use crate::types::PushError;

/// Default maximum message size (64 KiB)
pub const DEFAULT_MAX_BODY: usize = 64 * 1024;

pub struct BodyLimit {
    max_bytes: usize,
}

impl BodyLimit {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

impl Default for BodyLimit {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BODY)
    }
}

impl Interceptor for BodyLimit {
    fn name(&self) -> &'static str {
        "body-limit"
    }

    fn inspect(&self, request: &mut PushRequest) -> Action {
        match &request.body {
            Some(body) if body.len() > self.max_bytes => Action::Reject(PushError::BodyTooLarge {
                size: body.len(),
                limit: self.max_bytes,
            }),
            _ => Action::Continue,
        }
    }
}
