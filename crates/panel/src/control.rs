//! Control definitions and the per-session control registry.
//!
//! A control is a button with a unique key and a typed action. The registry
//! is fixed when a session is built: keys are validated once, rendered into
//! platform buttons with routable custom ids, and looked up on activation.

use panel_protocol::{ButtonSpec, ButtonStyle};

use crate::session::SessionError;

/// Separator between the session id and control key in a rendered custom id.
pub const CUSTOM_ID_SEPARATOR: char = ':';

/// A clickable control bound to an action.
#[derive(Debug, Clone)]
pub struct Control<A> {
    key: String,
    label: Option<String>,
    emoji: Option<String>,
    style: ButtonStyle,
    action: A,
}

impl<A> Control<A> {
    /// Create a control with the given key and action.
    pub fn new(key: impl Into<String>, action: A) -> Self {
        Self {
            key: key.into(),
            label: None,
            emoji: None,
            style: ButtonStyle::default(),
            action,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = style;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Lookup table from control key to action for one session.
#[derive(Debug, Clone)]
pub struct ControlRegistry<A> {
    controls: Vec<Control<A>>,
}

impl<A: Copy> ControlRegistry<A> {
    /// Build a registry, rejecting duplicate keys.
    pub fn new(controls: Vec<Control<A>>) -> Result<Self, SessionError> {
        for (i, control) in controls.iter().enumerate() {
            if controls[..i].iter().any(|c| c.key == control.key) {
                return Err(SessionError::DuplicateControl(control.key.clone()));
            }
        }
        Ok(Self { controls })
    }

    /// Action bound to `key`, if any.
    pub fn action(&self, key: &str) -> Option<A> {
        self.controls
            .iter()
            .find(|c| c.key == key)
            .map(|c| c.action)
    }

    /// Render the controls as buttons routed back to `session_id`.
    pub fn render(&self, session_id: &str) -> Vec<ButtonSpec> {
        self.controls
            .iter()
            .map(|c| ButtonSpec {
                custom_id: custom_id(session_id, &c.key),
                label: c.label.clone(),
                emoji: c.emoji.clone(),
                style: c.style,
            })
            .collect()
    }
}

/// Encode a routable custom id.
pub fn custom_id(session_id: &str, key: &str) -> String {
    format!("{session_id}{CUSTOM_ID_SEPARATOR}{key}")
}

/// Split a custom id into `(session_id, control_key)`.
///
/// Returns `None` for ids Panel did not render.
pub fn parse_custom_id(custom_id: &str) -> Option<(&str, &str)> {
    let (session_id, key) = custom_id.split_once(CUSTOM_ID_SEPARATOR)?;
    if session_id.is_empty() || key.is_empty() {
        return None;
    }
    Some((session_id, key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Action {
        Edit,
        Stop,
    }

    fn registry() -> ControlRegistry<Action> {
        ControlRegistry::new(vec![
            Control::new("edit", Action::Edit).label("Edit"),
            Control::new("stop", Action::Stop)
                .emoji("✖️")
                .style(ButtonStyle::Danger),
        ])
        .unwrap()
    }

    #[test]
    fn action_looks_up_by_key() {
        let registry = registry();
        assert_eq!(registry.action("edit"), Some(Action::Edit));
        assert_eq!(registry.action("stop"), Some(Action::Stop));
        assert_eq!(registry.action("missing"), None);
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let result = ControlRegistry::new(vec![
            Control::new("edit", Action::Edit),
            Control::new("edit", Action::Stop),
        ]);
        match result {
            Err(SessionError::DuplicateControl(key)) => assert_eq!(key, "edit"),
            other => panic!("expected duplicate control error, got {other:?}"),
        }
    }

    #[test]
    fn render_prefixes_session_id() {
        let buttons = registry().render("ses_1");
        assert_eq!(buttons.len(), 2);
        assert_eq!(buttons[0].custom_id, "ses_1:edit");
        assert_eq!(buttons[0].label.as_deref(), Some("Edit"));
        assert_eq!(buttons[1].style, ButtonStyle::Danger);
        assert_eq!(buttons[1].emoji.as_deref(), Some("✖️"));
    }

    #[test]
    fn parse_custom_id_round_trips_and_rejects_foreign_ids() {
        let id = custom_id("ses_01ABC", "post_webhook");
        assert_eq!(parse_custom_id(&id), Some(("ses_01ABC", "post_webhook")));
        assert_eq!(parse_custom_id("no-separator"), None);
        assert_eq!(parse_custom_id(":key"), None);
        assert_eq!(parse_custom_id("ses_1:"), None);
    }
}
