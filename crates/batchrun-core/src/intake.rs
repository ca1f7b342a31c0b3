//! Batch intake: validation and normalization of raw batch requests.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::{Batch, Method, Target, ValidationError};

pub const DEFAULT_CONCURRENCY_LIMIT: usize = 10;
pub const MAX_CONCURRENCY_LIMIT: usize = 64;
pub const MAX_BATCH_ITEMS: usize = 1_000;

/// Raw description of one request, as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    /// Method name. Defaults to GET.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Target identifier. Must be non-empty.
    #[serde(default)]
    pub endpoint: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl RequestDescriptor {
    /// Create a descriptor for an endpoint with the default method.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Builder method to set the method name.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Builder method to set the payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Raw batch submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Ordered request descriptors. Required; may be empty.
    #[serde(default)]
    pub items: Option<Vec<RequestDescriptor>>,

    /// Per-batch concurrency override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency_limit: Option<usize>,

    /// Batch deadline in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,
}

impl BatchRequest {
    /// Create a request from descriptors with no overrides.
    pub fn new(items: Vec<RequestDescriptor>) -> Self {
        Self {
            items: Some(items),
            concurrency_limit: None,
            deadline_ms: None,
        }
    }

    /// Builder method to set the concurrency override.
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = Some(limit);
        self
    }

    /// Builder method to set the deadline.
    pub fn with_deadline_ms(mut self, deadline_ms: u64) -> Self {
        self.deadline_ms = Some(deadline_ms);
        self
    }
}

/// Bounds enforced by intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeLimits {
    /// Hard maximum number of items per batch.
    pub max_items: usize,

    /// Concurrency used when the request does not set one.
    pub default_concurrency: usize,

    /// Hard ceiling for any requested concurrency.
    pub max_concurrency: usize,
}

impl Default for IntakeLimits {
    fn default() -> Self {
        Self {
            max_items: MAX_BATCH_ITEMS,
            default_concurrency: DEFAULT_CONCURRENCY_LIMIT,
            max_concurrency: MAX_CONCURRENCY_LIMIT,
        }
    }
}

/// Validate a raw request and turn it into a Batch with items indexed in input order.
///
/// The whole request is rejected on the first problem found; nothing is
/// partially accepted.
pub fn normalize(request: BatchRequest, limits: &IntakeLimits) -> Result<Batch, ValidationError> {
    let descriptors = request.items.ok_or(ValidationError::MissingItems)?;

    if descriptors.len() > limits.max_items {
        return Err(ValidationError::TooManyItems {
            count: descriptors.len(),
            max: limits.max_items,
        });
    }

    let concurrency_limit = match request.concurrency_limit {
        None => limits.default_concurrency.clamp(1, limits.max_concurrency.max(1)),
        Some(0) => return Err(ValidationError::ZeroConcurrency),
        Some(requested) if requested > limits.max_concurrency => {
            return Err(ValidationError::ConcurrencyAboveCeiling {
                requested,
                ceiling: limits.max_concurrency,
            });
        }
        Some(requested) => requested,
    };

    let deadline = match request.deadline_ms {
        Some(0) => return Err(ValidationError::ZeroDeadline),
        Some(ms) => Some(Duration::from_millis(ms)),
        None => None,
    };

    let mut targets = Vec::with_capacity(descriptors.len());
    for (index, descriptor) in descriptors.into_iter().enumerate() {
        targets.push(normalize_descriptor(index, descriptor)?);
    }

    let batch = Batch::new(targets, concurrency_limit);
    Ok(match deadline {
        Some(deadline) => batch.with_deadline(deadline),
        None => batch,
    })
}

fn normalize_descriptor(
    index: usize,
    descriptor: RequestDescriptor,
) -> Result<Target, ValidationError> {
    let endpoint = descriptor.endpoint.trim();
    if endpoint.is_empty() {
        return Err(ValidationError::EmptyTarget { index });
    }

    let method = match descriptor.method.as_deref() {
        None => Method::default(),
        Some(name) => Method::from_name(name).ok_or_else(|| ValidationError::UnsupportedMethod {
            index,
            method: name.to_string(),
        })?,
    };

    Ok(Target {
        method,
        endpoint: endpoint.to_string(),
        headers: descriptor.headers,
        payload: descriptor.payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptors(n: usize) -> Vec<RequestDescriptor> {
        (0..n)
            .map(|i| RequestDescriptor::new(format!("http://svc/{i}")))
            .collect()
    }

    #[test]
    fn test_normalize_indexes_items() {
        let request = BatchRequest::new(vec![
            RequestDescriptor::new(" http://svc/a ").with_method("post"),
            RequestDescriptor::new("http://svc/b").with_payload(json!({"k": 1})),
        ]);

        let batch = normalize(request, &IntakeLimits::default()).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.concurrency_limit, DEFAULT_CONCURRENCY_LIMIT);
        assert_eq!(batch.deadline, None);
        assert_eq!(batch.items[0].index, 0);
        assert_eq!(batch.items[0].target.method, Method::Post);
        assert_eq!(batch.items[0].target.endpoint, "http://svc/a");
        assert_eq!(batch.items[1].target.method, Method::Get);
        assert_eq!(batch.items[1].target.payload, Some(json!({"k": 1})));
    }

    #[test]
    fn test_empty_items_is_legal() {
        let batch = normalize(BatchRequest::new(Vec::new()), &IntakeLimits::default()).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_missing_items_is_rejected() {
        let request: BatchRequest = serde_json::from_value(json!({})).unwrap();
        let err = normalize(request, &IntakeLimits::default()).unwrap_err();
        assert_eq!(err, ValidationError::MissingItems);

        let request: BatchRequest = serde_json::from_value(json!({"items": null})).unwrap();
        assert!(normalize(request, &IntakeLimits::default()).is_err());
    }

    #[test]
    fn test_empty_target_names_index() {
        let mut items = descriptors(3);
        items[2].endpoint = "   ".to_string();

        let err = normalize(BatchRequest::new(items), &IntakeLimits::default()).unwrap_err();
        assert_eq!(err, ValidationError::EmptyTarget { index: 2 });
    }

    #[test]
    fn test_oversized_batch_is_rejected_before_item_checks() {
        let limits = IntakeLimits {
            max_items: 4,
            ..IntakeLimits::default()
        };
        let mut items = descriptors(5);
        items[0].endpoint.clear();

        let err = normalize(BatchRequest::new(items), &limits).unwrap_err();
        assert_eq!(err, ValidationError::TooManyItems { count: 5, max: 4 });
    }

    #[test]
    fn test_unsupported_method() {
        let items = vec![RequestDescriptor::new("http://svc").with_method("TRACE")];
        let err = normalize(BatchRequest::new(items), &IntakeLimits::default()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnsupportedMethod {
                index: 0,
                method: "TRACE".to_string()
            }
        );
    }

    #[test]
    fn test_concurrency_bounds() {
        let limits = IntakeLimits::default();

        let err = normalize(
            BatchRequest::new(descriptors(1)).with_concurrency_limit(0),
            &limits,
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::ZeroConcurrency);

        let err = normalize(
            BatchRequest::new(descriptors(1)).with_concurrency_limit(MAX_CONCURRENCY_LIMIT + 1),
            &limits,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::ConcurrencyAboveCeiling { .. }
        ));

        let batch = normalize(
            BatchRequest::new(descriptors(1)).with_concurrency_limit(3),
            &limits,
        )
        .unwrap();
        assert_eq!(batch.concurrency_limit, 3);
    }

    #[test]
    fn test_deadline() {
        let limits = IntakeLimits::default();
        let err = normalize(BatchRequest::new(descriptors(1)).with_deadline_ms(0), &limits)
            .unwrap_err();
        assert_eq!(err, ValidationError::ZeroDeadline);

        let batch =
            normalize(BatchRequest::new(descriptors(1)).with_deadline_ms(250), &limits).unwrap();
        assert_eq!(batch.deadline, Some(Duration::from_millis(250)));
    }
}
