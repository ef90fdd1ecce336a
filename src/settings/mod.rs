//! Settings form model: persisted user settings, the update payload, the form
//! controller, and the visibility policy

mod form;
mod update;
mod usage;
mod user;
mod visibility;

pub use form::{build_update, FieldName, FormController, FormEntries, FormError, FormField};
pub use update::{non_empty, SettingsUpdate};
pub use usage::{format_cents, UsageDisplay};
pub use user::{DefaultPresets, ThemeChoice, UiSettings, UserSettings};
pub use visibility::{
    default_adapter_field, guest_clear_visible, horde_model_options, render_plan, visible_fields,
    visible_groups, FieldGroup, FieldKind, FieldView, GroupAction, GroupView, SelectOption,
    NOVEL_MODELS,
};
