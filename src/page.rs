use rand::rngs::StdRng;

use crate::builder::{Mount, build, set_attributes};
use crate::config::{CheckToggle, FormConfig};
use crate::descriptor::{NavAction, PageDescriptor};
use crate::document::Document;
use crate::dom::NodeId;
use crate::dom::form_controls::{is_checkable_input, is_link_or_button};
use crate::events::{EventState, EventType, Handler, SubscriptionId};
use crate::field::{Field, FieldBuilder, FieldRegistry};
use crate::Result;

/// Replaces the default `preventDefault()` for a handled Enter.
pub type EnterCallback<'c> = &'c mut dyn FnMut(&mut Document, &mut EventState) -> Result<()>;

/// Page keyboard shortcuts for a keydown event.
///
/// Enter on anything but a link or button is consumed: with ctrl it asks
/// for the next page, with ctrl+shift the previous one, and on a bare
/// checkbox or radio it changes `checked` per [`CheckToggle`]. Each keyboard
/// event is processed at most once however many listeners see it.
pub(crate) fn handle_ctrl_enter(
    doc: &mut Document,
    config: &FormConfig,
    event: &mut EventState,
    custom: Option<EnterCallback<'_>>,
) -> Result<Option<NavAction>> {
    if event.shortcut_handled {
        return Ok(None);
    }
    let Some(key) = event.key.clone() else {
        return Ok(None);
    };
    let target = event.target;
    if !key.is_enter() || is_link_or_button(&doc.dom, target) {
        return Ok(None);
    }
    event.shortcut_handled = true;

    let action = match (key.ctrl, key.shift) {
        (true, false) => Some(NavAction::Next),
        (true, true) => Some(NavAction::Prev),
        _ => {
            if is_checkable_input(&doc.dom, target) {
                let checked = match config.check_toggle {
                    CheckToggle::Legacy => true,
                    CheckToggle::Boolean => !doc.checked(target)?,
                };
                doc.set_checked(target, checked)?;
            }
            None
        }
    };

    match custom {
        Some(callback) => callback(doc, event)?,
        None => event.prevent_default(),
    }
    Ok(action)
}

/// Borrowed collaborators a page needs while it is being built.
pub(crate) struct PageEnv<'a> {
    pub(crate) doc: &'a mut Document,
    pub(crate) config: &'a FormConfig,
    pub(crate) registry: &'a FieldRegistry,
    pub(crate) rng: &'a mut StdRng,
}

#[derive(Debug)]
pub struct Page {
    name: String,
    index: usize,
    root: NodeId,
    pub(crate) fields: Vec<Box<dyn Field>>,
    nav_buttons: Vec<(NavAction, NodeId)>,
    visible: bool,
    pub(crate) over: bool,
    subscription: Option<SubscriptionId>,
}

impl Page {
    /// Builds the page inside `form_root`, or into `existing_root` as-is.
    pub(crate) fn new(
        env: &mut PageEnv<'_>,
        index: usize,
        descriptor: &PageDescriptor,
        form_root: NodeId,
        existing_root: Option<NodeId>,
    ) -> Result<Self> {
        let root = match existing_root {
            Some(root) => root,
            None => {
                let built = build(
                    env.doc,
                    &format!("<legend>{}</legend>", descriptor.name),
                    Mount::Tag("fieldset"),
                )?;
                env.doc.append_child(form_root, built.root)?;
                built.root
            }
        };

        let mut fields = Vec::with_capacity(descriptor.fields.len());
        for (field_index, field) in descriptor.fields.iter().enumerate() {
            let mut cx = FieldBuilder {
                doc: &mut *env.doc,
                config: env.config,
                rng: &mut *env.rng,
                page: index,
                field: field_index,
                page_root: root,
            };
            fields.push(env.registry.create(&mut cx, field)?);
        }

        env.doc
            .listen(root, EventType::Keydown, Handler::PageKeydown { page: index });
        env.doc.listen(
            root,
            EventType::MouseOver,
            Handler::PagePointer {
                page: index,
                over: true,
            },
        );
        env.doc.listen(
            root,
            EventType::MouseLeave,
            Handler::PagePointer {
                page: index,
                over: false,
            },
        );
        let subscription = env
            .doc
            .subscribe_window(EventType::Keydown, Handler::WindowKeydown { page: index });

        let mut nav_buttons = Vec::new();
        if let Some(navigation) = &descriptor.navigation {
            let list = build(env.doc, "", Mount::Tag("div"))?.root;
            set_attributes(env.doc, list, &[("class", "btn-list")])?;
            for (action, label) in navigation.buttons() {
                let button = match action {
                    NavAction::Next | NavAction::Prev => {
                        let link = build(env.doc, label, Mount::Tag("a"))?.root;
                        set_attributes(env.doc, link, &[("href", "#"), ("class", "btn")])?;
                        link
                    }
                    NavAction::Submit => {
                        let button = build(env.doc, label, Mount::Tag("button"))?.root;
                        set_attributes(env.doc, button, &[("type", "submit"), ("class", "btn")])?;
                        button
                    }
                };
                env.doc.listen(
                    button,
                    EventType::Click,
                    Handler::Navigate {
                        page: index,
                        action,
                    },
                );
                env.doc.append_child(list, button)?;
                nav_buttons.push((action, button));
            }
            env.doc.append_child(root, list)?;
        }

        Ok(Self {
            name: descriptor.name.clone(),
            index,
            root,
            fields,
            nav_buttons,
            visible: true,
            over: false,
            subscription: Some(subscription),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn fields(&self) -> &[Box<dyn Field>] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&dyn Field> {
        self.fields.get(index).map(|field| field.as_ref())
    }

    pub fn nav_button(&self, action: NavAction) -> Option<NodeId> {
        self.nav_buttons
            .iter()
            .find(|(candidate, _)| *candidate == action)
            .map(|(_, node)| *node)
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_pointer_over(&self) -> bool {
        self.over
    }

    pub(crate) fn show(&mut self, doc: &mut Document, config: &FormConfig) -> Result<()> {
        self.visible = true;
        doc.remove_class(self.root, &config.hidden_class)
    }

    pub(crate) fn hide(&mut self, doc: &mut Document, config: &FormConfig) -> Result<()> {
        self.visible = false;
        doc.add_class(self.root, &config.hidden_class)
    }

    /// Releases the window keydown subscription. Idempotent.
    pub(crate) fn release(&mut self, doc: &mut Document) {
        if let Some(id) = self.subscription.take() {
            doc.unsubscribe_window(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::descriptor::{FieldDescriptor, NavigationSpec};
    use crate::events::Key;
    use crate::{Error, FormSpec};

    fn node(doc: &Document, selector: &str) -> Result<NodeId> {
        doc.query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.into()))
    }

    fn keydown(doc: &Document, target: NodeId, key: Key) -> EventState {
        EventState::keyboard(target, key, doc.now_ms())
    }

    #[test]
    fn ctrl_enter_and_ctrl_shift_enter_request_navigation() -> Result<()> {
        let mut doc = Document::from_html("<input id='name'><a id='next' href='#'>n</a>")?;
        let (input, link) = (node(&doc, "#name")?, node(&doc, "#next")?);
        let config = FormConfig::default();

        let mut event = keydown(&doc, input, Key::enter().with_ctrl());
        assert_eq!(handle_ctrl_enter(&mut doc, &config, &mut event, None)?, Some(NavAction::Next));
        assert!(event.default_prevented());
        assert_eq!(handle_ctrl_enter(&mut doc, &config, &mut event, None)?, None);

        let mut event = keydown(&doc, input, Key::enter().with_ctrl().with_shift());
        assert_eq!(handle_ctrl_enter(&mut doc, &config, &mut event, None)?, Some(NavAction::Prev));

        let mut event = keydown(&doc, link, Key::enter().with_ctrl());
        assert_eq!(handle_ctrl_enter(&mut doc, &config, &mut event, None)?, None);
        assert!(!event.default_prevented());

        let mut event = keydown(&doc, input, Key::new("Tab").with_ctrl());
        assert_eq!(handle_ctrl_enter(&mut doc, &config, &mut event, None)?, None);
        Ok(())
    }

    #[test]
    fn legacy_toggle_always_checks_and_boolean_toggle_flips() -> Result<()> {
        let mut doc = Document::from_html("<input id='box' type='checkbox' checked>")?;
        let checkbox = node(&doc, "#box")?;
        let legacy = FormConfig::default();
        let boolean = FormConfig {
            check_toggle: CheckToggle::Boolean,
            ..FormConfig::default()
        };

        let mut event = keydown(&doc, checkbox, Key::enter());
        handle_ctrl_enter(&mut doc, &legacy, &mut event, None)?;
        assert!(doc.checked(checkbox)?);

        let mut event = keydown(&doc, checkbox, Key::enter());
        handle_ctrl_enter(&mut doc, &boolean, &mut event, None)?;
        assert!(!doc.checked(checkbox)?);
        let mut event = keydown(&doc, checkbox, Key::enter());
        handle_ctrl_enter(&mut doc, &boolean, &mut event, None)?;
        assert!(doc.checked(checkbox)?);
        Ok(())
    }

    #[test]
    fn custom_callback_replaces_prevent_default() -> Result<()> {
        let mut doc = Document::from_html("<input id='opt' type='radio' name='g'>")?;
        let radio = node(&doc, "#opt")?;
        let config = FormConfig::default();
        let mut calls = 0;
        let mut callback = |doc: &mut Document, event: &mut EventState| -> Result<()> {
            calls += 1;
            assert!(doc.checked(event.target())?);
            Ok(())
        };
        let mut event = keydown(&doc, radio, Key::enter());
        handle_ctrl_enter(&mut doc, &config, &mut event, Some(&mut callback))?;
        assert!(!event.default_prevented());
        assert_eq!(calls, 1);
        Ok(())
    }

    #[test]
    fn existing_root_is_used_verbatim() -> Result<()> {
        let mut doc = Document::from_html("<form id='f'><section id='step'></section></form>")?;
        let (form, step) = (node(&doc, "#f")?, node(&doc, "#step")?);
        let config = FormConfig::default();
        let registry = FieldRegistry::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut env = PageEnv {
            doc: &mut doc,
            config: &config,
            registry: &registry,
            rng: &mut rng,
        };
        let spec = FormSpec::new(vec![
            PageDescriptor::new("Ignored title")
                .with_field(FieldDescriptor::text("Hello"))
                .with_navigation(NavigationSpec::new().with("next", "Next").with("jump", "?")),
        ]);
        let mut page = Page::new(&mut env, 0, &spec.pages[0], form, Some(step))?;

        assert_eq!(page.root(), step);
        assert!(doc.query_selector("legend")?.is_none());
        assert_eq!(doc.query_selector_all("#step a.btn")?.len(), 1);
        assert!(page.nav_button(NavAction::Prev).is_none());
        assert_eq!(doc.listeners.window_subscription_count(), 1);
        page.release(&mut doc);
        page.release(&mut doc);
        assert_eq!(doc.listeners.window_subscription_count(), 0);
        Ok(())
    }
}
