use std::fmt;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::builder::clamp;
use crate::config::FormConfig;
use crate::descriptor::{FormSpec, NavAction};
use crate::document::{Document, Router};
use crate::dom::NodeId;
use crate::events::{EventState, Handler};
use crate::field::{FieldContext, FieldRegistry, FieldValue};
use crate::page::{Page, PageEnv, handle_ctrl_enter};
use crate::scheduler::TimerTask;
use crate::trace::TraceCategory;
use crate::validate::{AlwaysSubmit, SubmitCheck, SubmitGate, Validators};
use crate::Result;

/// Collaborators supplied at mount time.
pub struct FormOptions {
    pub config: FormConfig,
    pub registry: FieldRegistry,
    pub validators: Validators,
    pub gate: Box<dyn SubmitGate>,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            config: FormConfig::default(),
            registry: FieldRegistry::default(),
            validators: Validators::new(),
            gate: Box::new(AlwaysSubmit),
        }
    }
}

impl fmt::Debug for FormOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormOptions")
            .field("config", &self.config)
            .field("validators", &self.validators)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl FormOptions {
    pub fn with_config(mut self, config: FormConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_registry(mut self, registry: FieldRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_validators(mut self, validators: Validators) -> Self {
        self.validators = validators;
        self
    }

    pub fn with_gate(mut self, gate: impl SubmitGate + 'static) -> Self {
        self.gate = Box::new(gate);
        self
    }
}

/// Ordered pages plus the current page index. The index stays within
/// `[0, pages - 1]` between operations; going past the last page submits.
#[derive(Debug)]
pub struct Form {
    root: NodeId,
    pages: Vec<Page>,
    current_page_index: usize,
    config: FormConfig,
    validators: Validators,
    gate: Box<dyn SubmitGate>,
    submit_attempts: usize,
}

impl Form {
    /// Builds every page under `host`, reusing it when it already is a
    /// `<form>`.
    pub(crate) fn new(doc: &mut Document, spec: &FormSpec, host: NodeId, options: FormOptions) -> Result<Self> {
        let FormOptions {
            config,
            registry,
            validators,
            gate,
        } = options;

        let root = if doc.dom.has_tag(host, "form") {
            host
        } else {
            let form = doc.dom.create_detached_element("form");
            doc.append_child(host, form)?;
            form
        };

        let mut rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut env = PageEnv {
            doc: &mut *doc,
            config: &config,
            registry: &registry,
            rng: &mut rng,
        };
        let mut pages = Vec::with_capacity(spec.pages.len());
        for (index, descriptor) in spec.pages.iter().enumerate() {
            pages.push(Page::new(&mut env, index, descriptor, root, None)?);
        }

        let mut form = Self {
            root,
            pages,
            current_page_index: 0,
            config,
            validators,
            gate,
            submit_attempts: 0,
        };
        form.update(doc)?;
        Ok(form)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn current_page_index(&self) -> usize {
        self.current_page_index
    }

    pub fn submit_attempts(&self) -> usize {
        self.submit_attempts
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    /// Shows the current page and hides all the others.
    pub(crate) fn update(&mut self, doc: &mut Document) -> Result<()> {
        for (index, page) in self.pages.iter_mut().enumerate() {
            if index == self.current_page_index {
                page.show(doc, &self.config)?;
            } else {
                page.hide(doc, &self.config)?;
            }
        }
        Ok(())
    }

    pub(crate) fn goto_next_page(&mut self, doc: &mut Document) -> Result<()> {
        self.advance(doc, None)
    }

    fn advance(&mut self, doc: &mut Document, event: Option<&mut EventState>) -> Result<()> {
        let from = self.current_page_index;
        self.current_page_index += 1;
        if self.current_page_index >= self.pages.len() {
            self.submit(doc, event)?;
        } else {
            self.update(doc)?;
        }
        self.current_page_index = self.clamped(self.current_page_index as i64);
        doc.trace_line(
            TraceCategory::Navigation,
            format!("[nav] next from={from} to={}", self.current_page_index),
        );
        Ok(())
    }

    pub(crate) fn goto_previous_page(&mut self, doc: &mut Document) -> Result<()> {
        let from = self.current_page_index;
        self.current_page_index = self.clamped(self.current_page_index as i64 - 1);
        self.update(doc)?;
        doc.trace_line(
            TraceCategory::Navigation,
            format!("[nav] prev from={from} to={}", self.current_page_index),
        );
        Ok(())
    }

    fn clamped(&self, index: i64) -> usize {
        clamp(index, 0, self.pages.len() as i64 - 1) as usize
    }

    /// Suppresses the default action of `event`, consults the submit gate and
    /// submits the root natively when it allows. Returns whether it did.
    pub(crate) fn submit(&mut self, doc: &mut Document, event: Option<&mut EventState>) -> Result<bool> {
        if let Some(event) = event {
            event.prevent_default();
        }
        self.submit_attempts += 1;

        let values = self.values(doc)?;
        let invalid = self.invalid_fields(doc)?;
        let allowed = self.gate.allow(&SubmitCheck {
            values: &values,
            invalid: &invalid,
        });
        doc.trace_line(
            TraceCategory::Navigation,
            format!(
                "[nav] submit attempt={} allowed={allowed} invalid={}",
                self.submit_attempts,
                invalid.len()
            ),
        );
        if allowed {
            doc.submit_form(self.root)?;
        }
        Ok(allowed)
    }

    /// `(page, field, value)` for every field in declaration order.
    pub fn values(&self, doc: &Document) -> Result<Vec<(usize, usize, FieldValue)>> {
        let mut out = Vec::new();
        for (page_index, page) in self.pages.iter().enumerate() {
            for (field_index, field) in page.fields.iter().enumerate() {
                out.push((page_index, field_index, field.value(doc)?));
            }
        }
        Ok(out)
    }

    pub fn invalid_fields(&self, doc: &Document) -> Result<Vec<(usize, usize)>> {
        let mut out = Vec::new();
        for (page_index, page) in self.pages.iter().enumerate() {
            for (field_index, field) in page.fields.iter().enumerate() {
                if !field.is_valid(doc, &self.validators)? {
                    out.push((page_index, field_index));
                }
            }
        }
        Ok(out)
    }

    fn perform(&mut self, doc: &mut Document, action: NavAction, event: &mut EventState) -> Result<()> {
        match action {
            NavAction::Next => self.advance(doc, Some(event)),
            NavAction::Prev => self.goto_previous_page(doc),
            NavAction::Submit => self.submit(doc, Some(event)).map(|_| ()),
        }
    }

    /// Drops window subscriptions, listeners and pending menu checks.
    pub(crate) fn release(&mut self, doc: &mut Document) {
        for page in &mut self.pages {
            page.release(doc);
        }
        doc.clear_timers_where(|task| matches!(task, TimerTask::MenuCloseCheck { .. }));
        doc.release_listeners_under(self.root);
    }
}

impl Router for Form {
    fn route(&mut self, doc: &mut Document, handler: Handler, event: &mut EventState) -> Result<()> {
        let action = match handler {
            Handler::PageKeydown { .. } => handle_ctrl_enter(doc, &self.config, event, None)?,
            Handler::WindowKeydown { page } => {
                if self.pages.get(page).is_some_and(|page| page.over) {
                    handle_ctrl_enter(doc, &self.config, event, None)?
                } else {
                    None
                }
            }
            Handler::PagePointer { page, over } => {
                if let Some(page) = self.pages.get_mut(page) {
                    page.over = over;
                }
                None
            }
            Handler::Navigate { action, .. } => Some(action),
            Handler::Field { page, field, hook } => {
                let Some(target) = self
                    .pages
                    .get_mut(page)
                    .and_then(|page| page.fields.get_mut(field))
                else {
                    return Ok(());
                };
                let mut cx = FieldContext {
                    doc: &mut *doc,
                    config: &self.config,
                    validators: &self.validators,
                    page,
                    field,
                };
                target.handle(&mut cx, hook, event)?
            }
        };
        match action {
            Some(action) => self.perform(doc, action, event),
            None => Ok(()),
        }
    }

    fn fire_timer(&mut self, doc: &mut Document, task: TimerTask) -> Result<()> {
        let TimerTask::MenuCloseCheck { page, field } = task;
        let Some(target) = self
            .pages
            .get_mut(page)
            .and_then(|page| page.fields.get_mut(field))
        else {
            return Ok(());
        };
        let mut cx = FieldContext {
            doc,
            config: &self.config,
            validators: &self.validators,
            page,
            field,
        };
        target.on_timer(&mut cx, task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldDescriptor, PageDescriptor};
    use crate::validate::RequireValid;
    use crate::Error;

    fn spec(pages: usize) -> FormSpec {
        FormSpec::new(
            (0..pages)
                .map(|index| PageDescriptor::new(format!("Step {index}")))
                .collect(),
        )
    }

    fn mounted(pages: usize) -> Result<(Document, Form)> {
        let mut doc = Document::from_html("<main id='app'></main>")?;
        let host = doc
            .query_selector("#app")?
            .ok_or_else(|| Error::SelectorNotFound("#app".into()))?;
        let form = Form::new(&mut doc, &spec(pages), host, FormOptions::default())?;
        Ok((doc, form))
    }

    fn visible(form: &Form) -> Vec<usize> {
        form.pages()
            .iter()
            .filter(|page| page.is_visible())
            .map(Page::index)
            .collect()
    }

    #[test]
    fn construction_shows_only_the_first_page_inside_a_new_form() -> Result<()> {
        let (doc, form) = mounted(3)?;
        assert_eq!(visible(&form), vec![0]);
        assert_eq!(doc.tag_name(form.root()), Some("form"));
        assert_eq!(doc.query_selector_all("form > fieldset.hide")?.len(), 2);
        Ok(())
    }

    #[test]
    fn existing_form_host_is_reused() -> Result<()> {
        let mut doc = Document::from_html("<form id='wizard'></form>")?;
        let host = doc
            .query_selector("#wizard")?
            .ok_or_else(|| Error::SelectorNotFound("#wizard".into()))?;
        let form = Form::new(&mut doc, &spec(1), host, FormOptions::default())?;
        assert_eq!(form.root(), host);
        Ok(())
    }

    #[test]
    fn advancing_past_the_end_submits_once_and_clamps() -> Result<()> {
        let (mut doc, mut form) = mounted(2)?;
        form.goto_next_page(&mut doc)?;
        assert_eq!(form.current_page_index(), 1);
        assert!(doc.submissions().is_empty());

        form.goto_next_page(&mut doc)?;
        assert_eq!(form.current_page_index(), 1);
        assert_eq!(form.submit_attempts(), 1);
        assert_eq!(doc.submissions().len(), 1);
        assert_eq!(visible(&form), vec![1]);
        Ok(())
    }

    #[test]
    fn previous_on_first_page_keeps_index_and_visibility() -> Result<()> {
        let (mut doc, mut form) = mounted(3)?;
        form.goto_previous_page(&mut doc)?;
        assert_eq!(form.current_page_index(), 0);
        assert_eq!(visible(&form), vec![0]);
        Ok(())
    }

    #[test]
    fn zero_pages_keep_index_at_zero() -> Result<()> {
        let (mut doc, mut form) = mounted(0)?;
        form.goto_next_page(&mut doc)?;
        form.goto_previous_page(&mut doc)?;
        assert_eq!(form.current_page_index(), 0);
        assert_eq!(form.submit_attempts(), 1);
        Ok(())
    }

    #[test]
    fn require_valid_gate_blocks_submission() -> Result<()> {
        let mut doc = Document::from_html("<main id='app'></main>")?;
        let host = doc
            .query_selector("#app")?
            .ok_or_else(|| Error::SelectorNotFound("#app".into()))?;
        let spec = FormSpec::new(vec![PageDescriptor::new("Only").with_field(
            FieldDescriptor::new("input").with_name("nick").required(),
        )]);
        let options = FormOptions::default()
            .with_validators(Validators::standard())
            .with_gate(RequireValid);
        let mut form = Form::new(&mut doc, &spec, host, options)?;

        assert!(!form.submit(&mut doc, None)?);
        assert!(doc.submissions().is_empty());
        assert_eq!(form.invalid_fields(&doc)?, vec![(0, 0)]);

        let nick = doc
            .query_selector("#nick")?
            .ok_or_else(|| Error::SelectorNotFound("#nick".into()))?;
        doc.set_value(nick, "kit")?;
        assert!(form.submit(&mut doc, None)?);
        assert_eq!(
            doc.submissions()[0].entries,
            vec![("nick".to_string(), "kit".to_string())]
        );
        Ok(())
    }
}
