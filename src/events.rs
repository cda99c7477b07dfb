use std::collections::HashMap;
use std::fmt;

use crate::descriptor::NavAction;
use crate::dom::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Click,
    Input,
    Change,
    Keydown,
    Focus,
    Blur,
    MouseOver,
    MouseLeave,
    Submit,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Input => "input",
            Self::Change => "change",
            Self::Keydown => "keydown",
            Self::Focus => "focus",
            Self::Blur => "blur",
            Self::MouseOver => "mouseover",
            Self::MouseLeave => "mouseleave",
            Self::Submit => "submit",
        }
    }

    pub(crate) fn bubbles(self) -> bool {
        !matches!(self, Self::Focus | Self::Blur | Self::MouseLeave)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A keyboard key press with its modifier state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub code: String,
    pub ctrl: bool,
    pub shift: bool,
}

impl Key {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ctrl: false,
            shift: false,
        }
    }

    pub fn enter() -> Self {
        Self::new("Enter")
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn is_enter(&self) -> bool {
        self.code == "Enter"
    }
}

#[derive(Debug, Clone)]
pub struct EventState {
    pub(crate) event_type: EventType,
    pub(crate) target: NodeId,
    pub(crate) current_target: NodeId,
    pub(crate) time_stamp_ms: i64,
    pub(crate) bubbles: bool,
    pub(crate) default_prevented: bool,
    pub(crate) propagation_stopped: bool,
    pub(crate) key: Option<Key>,
    // Set once the page shortcut handler has consumed this keyboard event;
    // field, page and window listeners all observe the same keydown.
    pub(crate) shortcut_handled: bool,
}

impl EventState {
    pub(crate) fn new(event_type: EventType, target: NodeId, time_stamp_ms: i64) -> Self {
        Self {
            event_type,
            target,
            current_target: target,
            time_stamp_ms,
            bubbles: event_type.bubbles(),
            default_prevented: false,
            propagation_stopped: false,
            key: None,
            shortcut_handled: false,
        }
    }

    pub(crate) fn keyboard(target: NodeId, key: Key, time_stamp_ms: i64) -> Self {
        let mut event = Self::new(EventType::Keydown, target, time_stamp_ms);
        event.key = Some(key);
        event
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn current_target(&self) -> NodeId {
        self.current_target
    }

    pub fn time_stamp_ms(&self) -> i64 {
        self.time_stamp_ms
    }

    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }
}

/// Which piece of a field's behavior a listener drives. The `usize` is the
/// option slot for grouped controls (0 for single controls).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldHook {
    Keydown(usize),
    Input(usize),
    FocusGained,
    FocusLost,
    Search,
}

/// Listener bindings resolved by the owning form. Page and field references
/// are indices into the form's collections, never owning links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    PageKeydown { page: usize },
    PagePointer { page: usize, over: bool },
    WindowKeydown { page: usize },
    Navigate { page: usize, action: NavAction },
    Field { page: usize, field: usize, hook: FieldHook },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone)]
struct WindowSubscription {
    id: SubscriptionId,
    event: EventType,
    handler: Handler,
}

#[derive(Debug, Default)]
pub(crate) struct ListenerStore {
    map: HashMap<NodeId, Vec<(EventType, Handler)>>,
    window: Vec<WindowSubscription>,
    next_subscription: u64,
}

impl ListenerStore {
    pub(crate) fn add(&mut self, node_id: NodeId, event: EventType, handler: Handler) {
        self.map.entry(node_id).or_default().push((event, handler));
    }

    pub(crate) fn get(&self, node_id: NodeId, event: EventType) -> Vec<Handler> {
        self.map
            .get(&node_id)
            .map(|listeners| {
                listeners
                    .iter()
                    .filter(|(kind, _)| *kind == event)
                    .map(|(_, handler)| *handler)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn remove_where(&mut self, mut predicate: impl FnMut(NodeId) -> bool) -> usize {
        let before = self.map.len();
        self.map.retain(|node, _| !predicate(*node));
        before - self.map.len()
    }

    pub(crate) fn subscribe_window(&mut self, event: EventType, handler: Handler) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.window.push(WindowSubscription { id, event, handler });
        id
    }

    pub(crate) fn unsubscribe_window(&mut self, id: SubscriptionId) -> bool {
        let before = self.window.len();
        self.window.retain(|subscription| subscription.id != id);
        before != self.window.len()
    }

    pub(crate) fn window_handlers(&self, event: EventType) -> Vec<Handler> {
        self.window
            .iter()
            .filter(|subscription| subscription.event == event)
            .map(|subscription| subscription.handler)
            .collect()
    }

    pub(crate) fn window_subscription_count(&self) -> usize {
        self.window.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listeners_are_filtered_by_event_type_in_registration_order() {
        let mut store = ListenerStore::default();
        let node = NodeId(3);
        store.add(node, EventType::Keydown, Handler::PageKeydown { page: 0 });
        store.add(node, EventType::MouseOver, Handler::PagePointer { page: 0, over: true });
        store.add(node, EventType::Keydown, Handler::PageKeydown { page: 1 });

        assert_eq!(
            store.get(node, EventType::Keydown),
            vec![
                Handler::PageKeydown { page: 0 },
                Handler::PageKeydown { page: 1 }
            ]
        );
        assert!(store.get(NodeId(9), EventType::Keydown).is_empty());
    }

    #[test]
    fn window_subscriptions_release_individually() {
        let mut store = ListenerStore::default();
        let first = store.subscribe_window(EventType::Keydown, Handler::WindowKeydown { page: 0 });
        let second = store.subscribe_window(EventType::Keydown, Handler::WindowKeydown { page: 1 });
        assert_ne!(first, second);

        assert!(store.unsubscribe_window(first));
        assert!(!store.unsubscribe_window(first));
        assert_eq!(
            store.window_handlers(EventType::Keydown),
            vec![Handler::WindowKeydown { page: 1 }]
        );
        assert_eq!(store.window_subscription_count(), 1);
    }

    #[test]
    fn focus_blur_and_mouseleave_do_not_bubble() {
        assert!(!EventType::Focus.bubbles());
        assert!(!EventType::Blur.bubbles());
        assert!(!EventType::MouseLeave.bubbles());
        assert!(EventType::Keydown.bubbles());
        assert!(EventType::MouseOver.bubbles());
    }
}
