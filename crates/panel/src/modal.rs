//! Modal forms launched from inside a control handler.
//!
//! A [`ModalFlow`] describes the form and owns one typed setter per field.
//! The [`ModalRouter`] tracks flows waiting for a submission so the host can
//! hand a submission back to the handler that opened the form.

use std::sync::Arc;

use dashmap::DashMap;
use panel_protocol::{ModalPayload, SubmittedField, TextInputSpec};
use tokio::sync::oneshot;
use tracing::debug;
use ulid::Ulid;

/// Prefix for modal flow ids.
pub const FLOW_ID_PREFIX: &str = "mdl_";

/// Setter that writes a submitted value into the target.
pub type FieldSetter<T> = fn(&mut T, String);

// ============================================================================
// Modal Flow
// ============================================================================

/// One input of a modal form.
pub struct ModalField<T> {
    key: &'static str,
    label: String,
    value: Option<String>,
    multiline: bool,
    setter: FieldSetter<T>,
}

/// A modal form whose fields write back into a `T`.
pub struct ModalFlow<T> {
    title: String,
    fields: Vec<ModalField<T>>,
}

impl<T> ModalFlow<T> {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
        }
    }

    /// Add a single-line input pre-filled with `value`.
    pub fn field(
        self,
        key: &'static str,
        label: impl Into<String>,
        value: Option<&str>,
        setter: FieldSetter<T>,
    ) -> Self {
        self.push(key, label.into(), value, false, setter)
    }

    /// Add a paragraph input pre-filled with `value`.
    pub fn paragraph(
        self,
        key: &'static str,
        label: impl Into<String>,
        value: Option<&str>,
        setter: FieldSetter<T>,
    ) -> Self {
        self.push(key, label.into(), value, true, setter)
    }

    fn push(
        mut self,
        key: &'static str,
        label: String,
        value: Option<&str>,
        multiline: bool,
        setter: FieldSetter<T>,
    ) -> Self {
        // Later definitions of a key replace earlier ones
        self.fields.retain(|f| f.key != key);
        self.fields.push(ModalField {
            key,
            label,
            value: value.map(str::to_string),
            multiline,
            setter,
        });
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Render the form under the given flow id.
    pub fn payload(&self, flow_id: &str) -> ModalPayload {
        ModalPayload {
            custom_id: flow_id.to_string(),
            title: self.title.clone(),
            inputs: self
                .fields
                .iter()
                .map(|f| TextInputSpec {
                    custom_id: f.key.to_string(),
                    label: f.label.clone(),
                    value: f.value.clone(),
                    multiline: f.multiline,
                })
                .collect(),
        }
    }

    /// Write submitted values into `target` through each field's setter.
    ///
    /// Submitted keys with no matching field are ignored. Returns the number
    /// of fields written.
    pub fn apply(&self, target: &mut T, values: &ModalValues) -> usize {
        let mut applied = 0;
        for submitted in values.iter() {
            match self.fields.iter().find(|f| f.key == submitted.key) {
                Some(field) => {
                    (field.setter)(target, submitted.value.clone());
                    applied += 1;
                }
                None => {
                    debug!(key = %submitted.key, "Ignoring unknown modal field");
                }
            }
        }
        applied
    }
}

// ============================================================================
// Values and Outcome
// ============================================================================

/// Values submitted through a modal, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModalValues {
    fields: Vec<SubmittedField>,
}

impl ModalValues {
    pub fn new(fields: Vec<SubmittedField>) -> Self {
        Self { fields }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubmittedField> {
        self.fields.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ModalValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| SubmittedField::new(k, v))
                .collect(),
        )
    }
}

/// How a launched modal resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalOutcome {
    /// The user submitted the form.
    Submitted(ModalValues),
    /// The modal or its session timed out first.
    Abandoned,
}

// ============================================================================
// Modal Router
// ============================================================================

/// Outstanding modal flows by id.
///
/// Each flow resolves at most once: `resolve` removes the entry before
/// delivering, and a dropped [`PendingModal`] removes its own entry.
#[derive(Clone, Default)]
pub struct ModalRouter {
    pending: Arc<DashMap<String, oneshot::Sender<ModalValues>>>,
}

impl ModalRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new flow and return its waiter.
    pub fn register(&self) -> PendingModal {
        let id = format!("{}{}", FLOW_ID_PREFIX, Ulid::new());
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id.clone(), tx);
        PendingModal {
            id,
            rx: Some(rx),
            router: self.clone(),
        }
    }

    /// Deliver a submission to the flow with `flow_id`.
    ///
    /// Returns false if the flow is unknown, already resolved, or abandoned.
    pub fn resolve(&self, flow_id: &str, values: ModalValues) -> bool {
        match self.pending.remove(flow_id) {
            Some((_, tx)) => tx.send(values).is_ok(),
            None => false,
        }
    }

    /// Whether a flow is still waiting.
    pub fn contains(&self, flow_id: &str) -> bool {
        self.pending.contains_key(flow_id)
    }

    /// Number of flows waiting for a submission.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Waiter for one registered flow.
pub struct PendingModal {
    id: String,
    rx: Option<oneshot::Receiver<ModalValues>>,
    router: ModalRouter,
}

impl PendingModal {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the submission. Resolves to `None` if the flow was dropped
    /// from the router without a submission.
    pub async fn submission(&mut self) -> Option<ModalValues> {
        let rx = self.rx.take()?;
        rx.await.ok()
    }
}

impl Drop for PendingModal {
    fn drop(&mut self) {
        self.router.pending.remove(&self.id);
    }
}
