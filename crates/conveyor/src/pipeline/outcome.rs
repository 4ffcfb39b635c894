//! Result shapes a kernel can return to steer the operator runtime
//!
//! | Kernel result                         | Runtime action              |
//! |---------------------------------------|-----------------------------|
//! | `None`                                | drop                        |
//! | `FilterOutcome { predicate: false }`  | drop                        |
//! | `FilterOutcome { predicate: true }`   | forward the item            |
//! | `StreamResult` with `SkipItem`        | drop, log the error if any  |
//! | `StreamResult` with `ForwardItem`     | forward, log the error      |
//! | `StreamResult` with `RerouteItem`     | forward (reserved)          |
//! | `Err(e)`                              | drop, log `e`               |
//! | bare value (via `Map`)                | forward                     |

use crate::error::BoxError;
use crate::item::Item;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// What a general-purpose kernel asks the runtime to do with its result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamAction {
    ForwardItem,
    SkipItem,
    /// No side outputs exist yet; treated as `ForwardItem`
    RerouteItem,
}

/// Result of a filter kernel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome<T> {
    pub predicate: bool,
    pub item: T,
}

impl<T> FilterOutcome<T> {
    pub fn new(predicate: bool, item: T) -> Self {
        Self { predicate, item }
    }
}

/// Result of a general-purpose kernel
///
/// The error is advisory: it is reported on the log bus, and `action`
/// alone decides whether the value flows on.
pub struct StreamResult<T> {
    pub value: Option<T>,
    pub action: StreamAction,
    pub error: Option<BoxError>,
}

impl<T> StreamResult<T> {
    pub fn forward(value: T) -> Self {
        Self {
            value: Some(value),
            action: StreamAction::ForwardItem,
            error: None,
        }
    }

    pub fn skip() -> Self {
        Self {
            value: None,
            action: StreamAction::SkipItem,
            error: None,
        }
    }

    pub fn reroute(value: T) -> Self {
        Self {
            value: Some(value),
            action: StreamAction::RerouteItem,
            error: None,
        }
    }

    /// Attach an error to report alongside the action
    pub fn with_error(mut self, error: impl Into<BoxError>) -> Self {
        self.error = Some(error.into());
        self
    }
}

impl<T> fmt::Debug for StreamResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamResult")
            .field("has_value", &self.value.is_some())
            .field("action", &self.action)
            .field("error", &self.error.as_ref().map(|e| e.to_string()))
            .finish()
    }
}

#[derive(Debug)]
pub(crate) enum Directive {
    Forward(Item),
    Reroute(Item),
    Expand(Vec<Item>),
    Drop,
}

/// Normalised kernel result consumed by the operator runtime
#[derive(Debug)]
pub struct Outcome {
    directive: Directive,
    error: Option<BoxError>,
}

impl Outcome {
    /// Forward a value downstream
    pub fn forward<T: Any + Send>(value: T) -> Self {
        Self::forward_item(Item::new(value))
    }

    /// Forward an already wrapped item unchanged
    pub fn forward_item(item: Item) -> Self {
        Self {
            directive: Directive::Forward(item),
            error: None,
        }
    }

    /// Publish each item individually, in order
    pub fn expand(items: Vec<Item>) -> Self {
        Self {
            directive: Directive::Expand(items),
            error: None,
        }
    }

    /// Drop the input
    pub fn skip() -> Self {
        Self {
            directive: Directive::Drop,
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<BoxError>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Whether the runtime will publish anything
    pub fn is_skip(&self) -> bool {
        matches!(self.directive, Directive::Drop)
    }

    pub fn error(&self) -> Option<&BoxError> {
        self.error.as_ref()
    }

    /// Items the runtime will publish, in order
    pub fn into_items(self) -> Vec<Item> {
        match self.directive {
            Directive::Forward(item) | Directive::Reroute(item) => vec![item],
            Directive::Expand(items) => items,
            Directive::Drop => Vec::new(),
        }
    }

    pub(crate) fn into_parts(self) -> (Directive, Option<BoxError>) {
        (self.directive, self.error)
    }
}

/// Conversion from a kernel's return value into an [`Outcome`]
pub trait IntoOutcome {
    fn into_outcome(self) -> Outcome;
}

impl IntoOutcome for Outcome {
    fn into_outcome(self) -> Outcome {
        self
    }
}

impl<T: Any + Send> IntoOutcome for Option<T> {
    fn into_outcome(self) -> Outcome {
        match self {
            Some(value) => Outcome::forward(value),
            None => Outcome::skip(),
        }
    }
}

impl<T: Any + Send> IntoOutcome for FilterOutcome<T> {
    fn into_outcome(self) -> Outcome {
        if self.predicate {
            Outcome::forward(self.item)
        } else {
            Outcome::skip()
        }
    }
}

impl<T: Any + Send> IntoOutcome for StreamResult<T> {
    fn into_outcome(self) -> Outcome {
        let directive = match (self.action, self.value) {
            (StreamAction::SkipItem, _) | (_, None) => Directive::Drop,
            (StreamAction::ForwardItem, Some(value)) => Directive::Forward(Item::new(value)),
            (StreamAction::RerouteItem, Some(value)) => Directive::Reroute(Item::new(value)),
        };
        Outcome {
            directive,
            error: self.error,
        }
    }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: Any + Send,
    E: Into<BoxError>,
{
    fn into_outcome(self) -> Outcome {
        match self {
            Ok(value) => Outcome::forward(value),
            Err(err) => Outcome::skip().with_error(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forwarded<T: Any>(outcome: Outcome) -> Vec<T> {
        outcome
            .into_items()
            .into_iter()
            .map(|item| item.downcast::<T>().unwrap())
            .collect()
    }

    #[test]
    fn test_option_outcome() {
        assert!(None::<i32>.into_outcome().is_skip());
        assert_eq!(forwarded::<i32>(Some(3).into_outcome()), vec![3]);
    }

    #[test]
    fn test_filter_outcome() {
        assert!(FilterOutcome::new(false, "x").into_outcome().is_skip());
        assert_eq!(
            forwarded::<&str>(FilterOutcome::new(true, "x").into_outcome()),
            vec!["x"]
        );
    }

    #[test]
    fn test_stream_result_actions() {
        let outcome = StreamResult::forward(1u8).with_error("late").into_outcome();
        assert!(outcome.error().is_some());
        assert_eq!(forwarded::<u8>(outcome), vec![1]);

        let outcome = StreamResult::<u8>::skip().with_error("bad row").into_outcome();
        assert!(outcome.is_skip());
        assert_eq!(outcome.error().unwrap().to_string(), "bad row");

        // reroute has no destination yet and behaves as forward
        assert_eq!(forwarded::<u8>(StreamResult::reroute(9u8).into_outcome()), vec![9]);
    }

    #[test]
    fn test_forward_without_value_drops() {
        let result = StreamResult::<u8> {
            value: None,
            action: StreamAction::ForwardItem,
            error: None,
        };
        assert!(result.into_outcome().is_skip());
    }

    #[test]
    fn test_result_error_is_skip() {
        let ok: Result<i32, String> = Ok(5);
        assert_eq!(forwarded::<i32>(ok.into_outcome()), vec![5]);

        let err: Result<i32, String> = Err("parse failure".to_string());
        let outcome = err.into_outcome();
        assert!(outcome.is_skip());
        assert!(outcome.error().is_some());
    }

    #[test]
    fn test_expand_keeps_order() {
        let outcome = Outcome::expand(vec![Item::new(1), Item::new(2), Item::new(3)]);
        assert_eq!(forwarded::<i32>(outcome), vec![1, 2, 3]);
    }
}
