//! Handler results

use crate::response::ResponseBody;
use crate::Result;
use serde::Serialize;

/// Value produced by running the handlers of one phase
///
/// Only the `onHandle` phase interprets it; every other phase ignores it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum HandlerResult {
    /// A concrete value that becomes the response body
    Value(ResponseBody),
    /// The handler acted through the context; leave the response alone
    PassThrough,
    /// No handler produced anything
    #[default]
    Absent,
}

impl HandlerResult {
    /// Wrap anything convertible into a response body
    pub fn value(body: impl Into<ResponseBody>) -> Self {
        HandlerResult::Value(body.into())
    }

    /// Serialize a value into a JSON body
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(HandlerResult::Value(ResponseBody::Json(serde_json::to_value(
            value,
        )?)))
    }

    /// Check if result is a concrete value
    pub fn is_value(&self) -> bool {
        matches!(self, HandlerResult::Value(_))
    }

    /// Check if result is the pass-through sentinel
    pub fn is_pass_through(&self) -> bool {
        matches!(self, HandlerResult::PassThrough)
    }

    /// Check if no handler produced a result
    pub fn is_absent(&self) -> bool {
        matches!(self, HandlerResult::Absent)
    }
}

impl From<ResponseBody> for HandlerResult {
    fn from(body: ResponseBody) -> Self {
        HandlerResult::Value(body)
    }
}
