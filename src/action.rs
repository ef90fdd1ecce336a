use std::path::PathBuf;

use crate::adapter::AIAdapter;
use crate::settings::UiSettings;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Noop,
    Quit,
    Tick,

    // Form navigation
    FormNextTab,
    FormPrevTab,
    FormNextRow,
    FormPrevRow,
    FormScrollUp(u16),
    FormScrollDown(u16),
    FormStartEdit,
    FormCancelEdit,
    FormPaste,

    // Settings operations
    FormSubmit,
    RefreshHorde,
    DeleteKey(AIAdapter),
    ApplyUiSettings(UiSettings),

    // Usage modal
    UsageShow,
    UsageClose,

    // Worker modal
    WorkersShow,
    WorkersSave(Vec<String>),
    WorkersClose,

    // Guest state
    GuestClearRequest,
    GuestClearConfirm,
    GuestClearCancel,

    ConfigChanged(PathBuf),
}
