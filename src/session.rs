use crate::descriptor::FormSpec;
use crate::document::{Document, Submission};
use crate::dom::NodeId;
use crate::dom::form_controls::{is_checkable_input, is_text_control};
use crate::events::{EventType, Key};
use crate::field::FieldValue;
use crate::form::{Form, FormOptions};
use crate::scheduler::PendingTimer;
use crate::{Error, Result};

const ACTION_STACK_SIZE: usize = 32 * 1024 * 1024;

/// A mounted form and the document it lives in. User actions dispatch
/// through the document and reach the form's pages and fields.
#[derive(Debug)]
pub struct Session {
    doc: Document,
    form: Form,
}

impl Session {
    /// Parses `host_html`, locates `root_selector` in it and builds the form
    /// there.
    pub fn mount(host_html: &str, root_selector: &str, spec: &FormSpec, options: FormOptions) -> Result<Self> {
        let options = FormOptions {
            config: options.config.validated()?,
            ..options
        };
        let mut doc = Document::from_html(host_html)?;
        doc.trace.enabled = options.config.trace;
        doc.trace.set_log_limit(options.config.trace_log_limit)?;
        let host = doc
            .query_selector(root_selector)?
            .ok_or_else(|| Error::SelectorNotFound(root_selector.to_string()))?;
        let form = Form::new(&mut doc, spec, host, options)?;
        Ok(Self { doc, form })
    }

    pub fn mount_json(host_html: &str, root_selector: &str, spec_json: &str, options: FormOptions) -> Result<Self> {
        let spec = FormSpec::from_json(spec_json)?;
        Self::mount(host_html, root_selector, &spec, options)
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    /// Releases the form's window subscriptions, listeners and pending
    /// timers, handing back the document.
    pub fn unmount(mut self) -> Document {
        self.form.release(&mut self.doc);
        self.doc
    }

    pub(crate) fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.doc
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    fn node_snippet(&self, node: NodeId) -> String {
        crate::dom::truncate_chars(&self.doc.dump_node(node), 200)
    }

    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let Self { doc, form } = self;
        stacker::grow(ACTION_STACK_SIZE, || doc.click_node(target, form))
    }

    /// Clicks a node already in hand, e.g. a page's navigation button.
    pub fn click_node(&mut self, target: NodeId) -> Result<()> {
        let Self { doc, form } = self;
        stacker::grow(ACTION_STACK_SIZE, || doc.click_node(target, form))
    }

    pub fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.doc.dom.has_attr(target, "disabled") {
            return Ok(());
        }
        let tag = self
            .doc
            .tag_name(target)
            .ok_or_else(|| Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input or textarea".into(),
                actual: "non-element".into(),
            })?
            .to_ascii_lowercase();
        if !is_text_control(&self.doc.dom, target) {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input or textarea".into(),
                actual: tag,
            });
        }

        let Self { doc, form } = self;
        stacker::grow(ACTION_STACK_SIZE, || {
            doc.set_value(target, text)?;
            doc.dispatch_event(target, EventType::Input, form)?;
            Ok(())
        })
    }

    pub fn set_checked(&mut self, selector: &str, checked: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.doc.dom.has_attr(target, "disabled") {
            return Ok(());
        }
        if !is_checkable_input(&self.doc.dom, target) {
            let actual = match self.doc.tag_name(target) {
                Some("input") => format!(
                    "input[type={}]",
                    self.doc
                        .attr(target, "type")
                        .unwrap_or_else(|| "text".into())
                        .to_ascii_lowercase()
                ),
                Some(tag) => tag.to_string(),
                None => "non-element".into(),
            };
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input[type=checkbox|radio]".into(),
                actual,
            });
        }

        let Self { doc, form } = self;
        stacker::grow(ACTION_STACK_SIZE, || {
            if doc.checked(target)? != checked {
                doc.set_checked(target, checked)?;
                doc.dispatch_event(target, EventType::Input, form)?;
                doc.dispatch_event(target, EventType::Change, form)?;
            }
            Ok(())
        })
    }

    pub fn focus(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let Self { doc, form } = self;
        stacker::grow(ACTION_STACK_SIZE, || doc.focus_node(target, form))
    }

    pub fn blur(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let Self { doc, form } = self;
        stacker::grow(ACTION_STACK_SIZE, || doc.blur_node(target, form))
    }

    /// Focuses `selector` and presses `key` on it. Enter on a link or button
    /// that nothing prevented also clicks it.
    pub fn press_key(&mut self, selector: &str, key: Key) -> Result<()> {
        let target = self.select_one(selector)?;
        let Self { doc, form } = self;
        stacker::grow(ACTION_STACK_SIZE, || doc.press_key(target, key, form))
    }

    /// Presses `key` on whatever holds focus, or on the document itself.
    pub fn press_key_on_document(&mut self, key: Key) -> Result<()> {
        let target = self.doc.active_element().unwrap_or(self.doc.root());
        let Self { doc, form } = self;
        stacker::grow(ACTION_STACK_SIZE, || doc.press_key(target, key, form))
    }

    pub fn hover(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.hover_node(target)
    }

    pub fn hover_node(&mut self, target: NodeId) -> Result<()> {
        let Self { doc, form } = self;
        doc.dispatch_event(target, EventType::MouseOver, form)?;
        Ok(())
    }

    /// Moves the pointer off `selector`. Only that element sees `mouseleave`.
    pub fn leave(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.leave_node(target)
    }

    pub fn leave_node(&mut self, target: NodeId) -> Result<()> {
        let Self { doc, form } = self;
        doc.dispatch_event(target, EventType::MouseLeave, form)?;
        Ok(())
    }

    pub fn now_ms(&self) -> i64 {
        self.doc.now_ms()
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        self.doc.pending_timers()
    }

    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        let Self { doc, form } = self;
        doc.advance_time(delta_ms, form)?;
        Ok(())
    }

    pub fn advance_time_to(&mut self, target_ms: i64) -> Result<()> {
        let Self { doc, form } = self;
        doc.advance_time_to(target_ms, form)?;
        Ok(())
    }

    /// Cancels one pending timer. Returns whether it was still queued.
    pub fn clear_timer(&mut self, timer_id: i64) -> bool {
        self.doc.clear_timer(timer_id)
    }

    pub fn run_due_timers(&mut self) -> Result<usize> {
        let Self { doc, form } = self;
        doc.run_due_timers(form)
    }

    /// Runs every queued timer, moving the clock to each due time.
    pub fn flush(&mut self) -> Result<()> {
        let Self { doc, form } = self;
        doc.flush(form)?;
        Ok(())
    }

    pub fn goto_next_page(&mut self) -> Result<()> {
        self.form.goto_next_page(&mut self.doc)
    }

    pub fn goto_previous_page(&mut self) -> Result<()> {
        self.form.goto_previous_page(&mut self.doc)
    }

    /// Submits through the form's gate. Returns whether the gate allowed it.
    pub fn handle_submit(&mut self) -> Result<bool> {
        self.form.submit(&mut self.doc, None)
    }

    pub fn current_page_index(&self) -> usize {
        self.form.current_page_index()
    }

    pub fn submissions(&self) -> &[Submission] {
        self.doc.submissions()
    }

    pub fn values(&self) -> Result<Vec<(usize, usize, FieldValue)>> {
        self.form.values(&self.doc)
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.doc.trace.enabled = enabled;
    }

    pub fn set_trace_events(&mut self, enabled: bool) {
        self.doc.trace.events = enabled;
    }

    pub fn set_trace_timers(&mut self, enabled: bool) {
        self.doc.trace.timers = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        self.doc.trace.set_log_limit(max_entries)
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.doc.trace.take()
    }

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.doc.text_content(target);
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_value(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.doc.value(target)?;
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_checked(&self, selector: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.doc.checked(target)?;
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_class(&self, selector: &str, class: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.doc.has_class(target, class)?;
        if actual != expected {
            let describe = |present: bool| {
                if present {
                    format!("class {class:?} present")
                } else {
                    format!("class {class:?} absent")
                }
            };
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: describe(expected),
                actual: describe(actual),
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        let _ = self.select_one(selector)?;
        Ok(())
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.doc.dump_node(target))
    }
}
