use std::collections::HashMap;

use crate::dom::form_controls::{is_checkbox_input, is_link_or_button, is_radio_input, is_submit_control};
use crate::dom::{Dom, NodeId};
use crate::events::{EventState, EventType, Handler, Key, ListenerStore, SubscriptionId};
use crate::scheduler::{PendingTimer, SchedulerState, TimerTask};
use crate::trace::{TraceCategory, TraceState};
use crate::{Error, Result};

/// Resolves listener bindings and timer tasks into behavior. The document
/// only knows *that* a binding fired; the router knows what it means.
pub(crate) trait Router {
    fn route(&mut self, doc: &mut Document, handler: Handler, event: &mut EventState) -> Result<()>;
    fn fire_timer(&mut self, doc: &mut Document, task: TimerTask) -> Result<()>;
}

/// A native form submission captured instead of a network request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub form: NodeId,
    pub entries: Vec<(String, String)>,
    pub at_ms: i64,
}

#[derive(Debug)]
pub struct Document {
    pub(crate) dom: Dom,
    pub(crate) listeners: ListenerStore,
    pub(crate) scheduler: SchedulerState,
    pub(crate) trace: TraceState,
    pub(crate) active_element: Option<NodeId>,
    pub(crate) submissions: Vec<Submission>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            dom: Dom::new(),
            listeners: ListenerStore::default(),
            scheduler: SchedulerState::default(),
            trace: TraceState::default(),
            active_element: None,
            submissions: Vec::new(),
        }
    }

    pub fn from_html(html: &str) -> Result<Self> {
        let mut doc = Self::new();
        let body = doc
            .dom
            .create_element(doc.dom.root, "body".into(), HashMap::new());
        doc.dom.set_inner_html(body, html)?;
        Ok(doc)
    }

    pub fn root(&self) -> NodeId {
        self.dom.root
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        self.dom.query_selector(selector)
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        self.dom.query_selector_all(selector)
    }

    pub fn text_content(&self, node: NodeId) -> String {
        self.dom.text_content(node)
    }

    pub fn value(&self, node: NodeId) -> Result<String> {
        self.dom.value(node)
    }

    pub fn set_value(&mut self, node: NodeId, value: &str) -> Result<()> {
        self.dom.set_value(node, value)
    }

    pub fn checked(&self, node: NodeId) -> Result<bool> {
        self.dom.checked(node)
    }

    pub fn set_checked(&mut self, node: NodeId, checked: bool) -> Result<()> {
        self.dom.set_checked(node, checked)
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.dom.attr(node, name)
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
        self.dom.set_attr(node, name, value)
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) -> Result<()> {
        self.dom.remove_attr(node, name)
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> Result<bool> {
        self.dom.class_contains(node, class)
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) -> Result<()> {
        self.dom.class_add(node, class)
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) -> Result<()> {
        self.dom.class_remove(node, class)
    }

    pub fn set_class(&mut self, node: NodeId, class: &str, on: bool) -> Result<()> {
        self.dom.class_set(node, class, on)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.dom.append_child(parent, child)
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.dom.tag_name(node)
    }

    pub fn active_element(&self) -> Option<NodeId> {
        self.active_element
    }

    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    pub fn now_ms(&self) -> i64 {
        self.scheduler.now_ms
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        self.scheduler.pending()
    }

    /// Handlers currently subscribed to window-level events.
    pub fn window_subscription_count(&self) -> usize {
        self.listeners.window_subscription_count()
    }

    pub fn dump_node(&self, node: NodeId) -> String {
        self.dom.dump_node(node)
    }

    pub(crate) fn listen(&mut self, node: NodeId, event: EventType, handler: Handler) {
        self.listeners.add(node, event, handler);
    }

    pub(crate) fn subscribe_window(&mut self, event: EventType, handler: Handler) -> SubscriptionId {
        self.listeners.subscribe_window(event, handler)
    }

    pub(crate) fn unsubscribe_window(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe_window(id)
    }

    /// Drops every node listener attached inside `root` (inclusive).
    pub(crate) fn release_listeners_under(&mut self, root: NodeId) -> usize {
        let dom = &self.dom;
        self.listeners
            .remove_where(|node| node == root || dom.is_descendant_of(node, root))
    }

    pub(crate) fn set_timeout(&mut self, delay_ms: i64, task: TimerTask) -> i64 {
        let id = self.scheduler.schedule(delay_ms, task);
        let due_at = self.scheduler.now_ms.saturating_add(delay_ms.max(0));
        self.trace_line(
            TraceCategory::Timer,
            format!("[timer] schedule id={id} delay_ms={delay_ms} due_at={due_at} task={task:?}"),
        );
        id
    }

    pub(crate) fn clear_timer(&mut self, timer_id: i64) -> bool {
        let existed = self.scheduler.clear(timer_id);
        self.trace_line(
            TraceCategory::Timer,
            format!("[timer] clear id={timer_id} existed={existed}"),
        );
        existed
    }

    pub(crate) fn clear_timers_where(&mut self, predicate: impl FnMut(&TimerTask) -> bool) -> usize {
        let cleared = self.scheduler.clear_where(predicate);
        self.trace_line(TraceCategory::Timer, format!("[timer] clear cleared={cleared}"));
        cleared
    }

    pub(crate) fn trace_line(&mut self, category: TraceCategory, line: String) {
        self.trace.line(category, line);
    }

    pub(crate) fn node_label(&self, node: NodeId) -> String {
        let Some(tag) = self.dom.tag_name(node) else {
            return if node == self.dom.root {
                "#document".into()
            } else {
                format!("#node{}", node.0)
            };
        };
        let mut label = tag.to_string();
        if let Some(id) = self.dom.attr(node, "id").filter(|id| !id.is_empty()) {
            label.push('#');
            label.push_str(&id);
        }
        label
    }

    pub(crate) fn dispatch_event(
        &mut self,
        target: NodeId,
        event_type: EventType,
        router: &mut dyn Router,
    ) -> Result<EventState> {
        let event = EventState::new(event_type, target, self.scheduler.now_ms);
        self.dispatch_prepared_event(event, router)
    }

    pub(crate) fn dispatch_prepared_event(
        &mut self,
        mut event: EventState,
        router: &mut dyn Router,
    ) -> Result<EventState> {
        let target = event.target;
        let mut path = Vec::new();
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            path.push(node);
            cursor = self.dom.parent(node);
        }

        // Target phase, then bubble phase towards the document.
        for (depth, node) in path.iter().enumerate() {
            if depth > 0 && !event.bubbles {
                break;
            }
            event.current_target = *node;
            self.invoke_listeners(*node, &mut event, router)?;
            if event.propagation_stopped {
                self.trace_event_done(&event, "propagation_stopped");
                return Ok(event);
            }
        }

        // The window sits above the document in the bubble path.
        if event.bubbles && self.dom.is_connected(target) {
            event.current_target = self.dom.root;
            for handler in self.listeners.window_handlers(event.event_type) {
                router.route(self, handler, &mut event)?;
                if event.propagation_stopped {
                    break;
                }
            }
        }

        self.trace_event_done(&event, "completed");
        Ok(event)
    }

    fn invoke_listeners(
        &mut self,
        node: NodeId,
        event: &mut EventState,
        router: &mut dyn Router,
    ) -> Result<()> {
        for handler in self.listeners.get(node, event.event_type) {
            router.route(self, handler, event)?;
        }
        Ok(())
    }

    fn trace_event_done(&mut self, event: &EventState, outcome: &str) {
        let line = format!(
            "[event] done {} target={} current={} outcome={} default_prevented={} propagation_stopped={}",
            event.event_type,
            self.node_label(event.target),
            self.node_label(event.current_target),
            outcome,
            event.default_prevented,
            event.propagation_stopped
        );
        self.trace_line(TraceCategory::Event, line);
    }

    pub(crate) fn focus_node(&mut self, node: NodeId, router: &mut dyn Router) -> Result<()> {
        if self.dom.has_attr(node, "disabled") {
            return Ok(());
        }
        if self.active_element == Some(node) {
            return Ok(());
        }
        if let Some(current) = self.active_element {
            self.blur_node(current, router)?;
        }
        self.active_element = Some(node);
        self.dispatch_event(node, EventType::Focus, router)?;
        Ok(())
    }

    pub(crate) fn blur_node(&mut self, node: NodeId, router: &mut dyn Router) -> Result<()> {
        if self.active_element != Some(node) {
            return Ok(());
        }
        self.dispatch_event(node, EventType::Blur, router)?;
        self.active_element = None;
        Ok(())
    }

    pub(crate) fn click_node(&mut self, target: NodeId, router: &mut dyn Router) -> Result<()> {
        if self.dom.has_attr(target, "disabled") {
            return Ok(());
        }
        let click_outcome = self.dispatch_event(target, EventType::Click, router)?;
        if click_outcome.default_prevented {
            return Ok(());
        }

        if let Some(control) = self.dom.label_control(target) {
            if control != target {
                return self.click_node(control, router);
            }
        }

        if is_checkbox_input(&self.dom, target) {
            let current = self.dom.checked(target)?;
            self.dom.set_checked(target, !current)?;
            self.dispatch_event(target, EventType::Input, router)?;
            self.dispatch_event(target, EventType::Change, router)?;
        }

        if is_radio_input(&self.dom, target) && !self.dom.checked(target)? {
            self.dom.set_checked(target, true)?;
            self.dispatch_event(target, EventType::Input, router)?;
            self.dispatch_event(target, EventType::Change, router)?;
        }

        if is_submit_control(&self.dom, target) {
            self.request_form_submit(target, router)?;
        }
        Ok(())
    }

    pub(crate) fn press_key(&mut self, target: NodeId, key: Key, router: &mut dyn Router) -> Result<()> {
        if target != self.dom.root {
            self.focus_node(target, router)?;
        }
        let is_enter = key.is_enter();
        let event = EventState::keyboard(target, key, self.scheduler.now_ms);
        let keydown = self.dispatch_prepared_event(event, router)?;
        if is_enter && !keydown.default_prevented && is_link_or_button(&self.dom, target) {
            self.click_node(target, router)?;
        }
        Ok(())
    }

    fn resolve_form(&self, node: NodeId) -> Option<NodeId> {
        if self.dom.has_tag(node, "form") {
            Some(node)
        } else {
            self.dom.find_ancestor_by_tag(node, "form")
        }
    }

    /// Interactive submission: fires `submit` and records the entries
    /// unless a listener prevents it.
    pub(crate) fn request_form_submit(&mut self, target: NodeId, router: &mut dyn Router) -> Result<()> {
        let Some(form) = self.resolve_form(target) else {
            return Ok(());
        };
        let outcome = self.dispatch_event(form, EventType::Submit, router)?;
        if !outcome.default_prevented {
            self.record_submission(form)?;
        }
        Ok(())
    }

    /// `form.submit()`: records the entries without dispatching `submit`.
    pub(crate) fn submit_form(&mut self, target: NodeId) -> Result<()> {
        let form = self.resolve_form(target).ok_or_else(|| {
            Error::Dom(format!(
                "submit target {} is not inside a form",
                self.node_label(target)
            ))
        })?;
        self.record_submission(form)
    }

    fn record_submission(&mut self, form: NodeId) -> Result<()> {
        let entries = self.dom.form_entries(form)?;
        self.trace_line(
            TraceCategory::Navigation,
            format!(
                "[submit] form={} entries={}",
                self.node_label(form),
                entries.len()
            ),
        );
        self.submissions.push(Submission {
            form,
            entries,
            at_ms: self.scheduler.now_ms,
        });
        Ok(())
    }

    pub(crate) fn advance_time(&mut self, delta_ms: i64, router: &mut dyn Router) -> Result<usize> {
        let from = self.scheduler.advance_clock(delta_ms)?;
        let ran = self.run_timer_queue(Some(self.scheduler.now_ms), false, router)?;
        self.trace_line(
            TraceCategory::Timer,
            format!(
                "[timer] advance delta_ms={} from={} to={} ran_due={}",
                delta_ms, from, self.scheduler.now_ms, ran
            ),
        );
        Ok(ran)
    }

    pub(crate) fn advance_time_to(&mut self, target_ms: i64, router: &mut dyn Router) -> Result<usize> {
        let from = self.scheduler.set_clock(target_ms)?;
        let ran = self.run_timer_queue(Some(self.scheduler.now_ms), false, router)?;
        self.trace_line(
            TraceCategory::Timer,
            format!(
                "[timer] advance_to from={} to={} ran_due={}",
                from, self.scheduler.now_ms, ran
            ),
        );
        Ok(ran)
    }

    pub(crate) fn run_due_timers(&mut self, router: &mut dyn Router) -> Result<usize> {
        let ran = self.run_timer_queue(Some(self.scheduler.now_ms), false, router)?;
        self.trace_line(
            TraceCategory::Timer,
            format!("[timer] run_due now_ms={} ran={}", self.scheduler.now_ms, ran),
        );
        Ok(ran)
    }

    pub(crate) fn flush(&mut self, router: &mut dyn Router) -> Result<usize> {
        let from = self.scheduler.now_ms;
        let ran = self.run_timer_queue(None, true, router)?;
        self.trace_line(
            TraceCategory::Timer,
            format!(
                "[timer] flush from={} to={} ran={}",
                from, self.scheduler.now_ms, ran
            ),
        );
        Ok(ran)
    }

    fn run_timer_queue(
        &mut self,
        due_limit: Option<i64>,
        advance_clock: bool,
        router: &mut dyn Router,
    ) -> Result<usize> {
        let mut steps = 0usize;
        while let Some(task) = self.scheduler.take_next(due_limit, advance_clock) {
            steps += 1;
            if steps > self.scheduler.timer_step_limit {
                return Err(self.scheduler.step_limit_error(steps, due_limit));
            }
            self.trace_line(
                TraceCategory::Timer,
                format!("[timer] run id={} due_at={} task={:?}", task.id, task.due_at, task.task),
            );
            router.fire_timer(self, task.task)?;
        }
        Ok(steps)
    }
}
