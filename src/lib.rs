//! Declarative multi-step forms rendered into a deterministic in-memory
//! document.
//!
//! A [`FormSpec`] lists pages, each with fields and navigation buttons.
//! [`Session::mount`] builds it into a host document and then drives it the
//! way a user would: clicks, typing, focus changes, key presses and the
//! passage of time.

pub mod builder;
pub mod config;
pub mod descriptor;
pub mod document;
pub mod events;
pub mod field;
pub mod form;
pub mod page;
pub mod scheduler;
pub mod session;
pub mod validate;

mod dom;
mod html;
mod selector;
mod trace;

pub use builder::{Built, Mount, build, clamp, set_attributes};
pub use config::{CheckToggle, FormConfig};
pub use descriptor::{FieldDescriptor, FormSpec, NavAction, NavigationSpec, PageDescriptor};
pub use document::{Document, Submission};
pub use dom::NodeId;
pub use events::{EventState, EventType, Key};
pub use field::{Field, FieldKind, FieldRegistry, FieldValue};
pub use form::{Form, FormOptions};
pub use page::Page;
pub use scheduler::{PendingTimer, TimerTask};
pub use session::Session;
pub use validate::{
    AlwaysSubmit, AnySelected, EmailShape, RequireValid, Required, SubmitGate, ValidationTarget,
    Validator, Validators,
};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("html parse error: {0}")]
    HtmlParse(String),
    #[error("descriptor error: {0}")]
    Descriptor(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("dom error: {0}")]
    Dom(String),
    #[error("pattern error: {0}")]
    Pattern(String),
    #[error("timer error: {0}")]
    Timer(String),
    #[error("selector not found: {0}")]
    SelectorNotFound(String),
    #[error("unsupported selector: {0}")]
    UnsupportedSelector(String),
    #[error("type mismatch for {selector}: expected {expected}, actual {actual}")]
    TypeMismatch {
        selector: String,
        expected: String,
        actual: String,
    },
    #[error(
        "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
    )]
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
}
