//! Visibility policy: which field groups the AI tab renders
//!
//! `visible_groups` is the pure mapping from enabled adapters to groups.
//! `render_plan` layers the per-provider presentation on top of it (labels,
//! helper text, placeholders, select options, actions) from a snapshot.

use crate::adapter::{AIAdapter, AdapterConfig};
use crate::store::StoreSnapshot;

use super::form::FormField;
use super::user::UserSettings;

const URL_PLACEHOLDER: &str = "E.g. https://local-tunnel-url-10-20-30-40.loca.lt";
const URL_HELP: &str = "Fully qualified URL. This URL must be publicly accessible.";
const SK_PLACEHOLDER: &str = "E.g. sk-XXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX";

/// Novel models offered by the model select
pub const NOVEL_MODELS: &[(&str, &str)] = &[("euterpe-v2", "Euterpe"), ("krake-v2", "Krake")];

/// A provider's block of fields on the AI tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldGroup {
    Horde,
    Kobold,
    OpenAI,
    Claude,
    Scale,
    Novel,
    Luminai,
}

impl FieldGroup {
    /// Render order
    pub const ORDER: &'static [FieldGroup] = &[
        FieldGroup::Horde,
        FieldGroup::Kobold,
        FieldGroup::OpenAI,
        FieldGroup::Claude,
        FieldGroup::Scale,
        FieldGroup::Novel,
        FieldGroup::Luminai,
    ];

    pub fn adapter(&self) -> AIAdapter {
        match self {
            FieldGroup::Horde => AIAdapter::Horde,
            FieldGroup::Kobold => AIAdapter::Kobold,
            FieldGroup::OpenAI => AIAdapter::OpenAI,
            FieldGroup::Claude => AIAdapter::Claude,
            FieldGroup::Scale => AIAdapter::Scale,
            FieldGroup::Novel => AIAdapter::Novel,
            FieldGroup::Luminai => AIAdapter::Luminai,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            FieldGroup::Horde => "AI Horde settings",
            FieldGroup::Kobold => "Kobold",
            FieldGroup::OpenAI => "OpenAI",
            FieldGroup::Claude => "Claude",
            FieldGroup::Scale => "Scale",
            FieldGroup::Novel => "NovelAI settings",
            FieldGroup::Luminai => "LuminAI",
        }
    }

    /// Fields the group renders, top to bottom
    pub fn fields(&self) -> &'static [FormField] {
        match self {
            FieldGroup::Horde => &[FormField::HordeKey, FormField::HordeModel],
            FieldGroup::Kobold => &[FormField::KoboldUrl],
            FieldGroup::OpenAI => &[FormField::OaiKey],
            FieldGroup::Claude => &[FormField::ClaudeApiKey],
            FieldGroup::Scale => &[FormField::ScaleUrl, FormField::ScaleApiKey],
            FieldGroup::Novel => &[FormField::NovelModel, FormField::NovelApiKey],
            FieldGroup::Luminai => &[FormField::LuminaiUrl],
        }
    }
}

/// One group per enabled adapter, in render order
pub fn visible_groups(adapters: &AdapterConfig) -> Vec<FieldGroup> {
    FieldGroup::ORDER
        .iter()
        .copied()
        .filter(|group| adapters.includes(group.adapter()))
        .collect()
}

/// Every field the AI tab renders; only these can end up in a submission
pub fn visible_fields(adapters: &AdapterConfig) -> Vec<FormField> {
    std::iter::once(FormField::DefaultAdapter)
        .chain(
            visible_groups(adapters)
                .into_iter()
                .flat_map(|group| group.fields().iter().copied()),
        )
        .collect()
}

/// The irreversible guest wipe is only offered without an authenticated identity
pub fn guest_clear_visible(logged_in: bool) -> bool {
    !logged_in
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Masked input; the stored secret is never echoed back
    Secret,
    Select(Vec<SelectOption>),
}

/// Presentation of one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldView {
    pub field: FormField,
    pub label: &'static str,
    pub kind: FieldKind,
    /// Initial value of the input
    pub value: String,
    pub placeholder: String,
    pub helper: Vec<String>,
}

impl FieldView {
    fn text(field: FormField, label: &'static str, value: &str, placeholder: &str) -> Self {
        Self {
            field,
            label,
            kind: FieldKind::Text,
            value: value.to_string(),
            placeholder: placeholder.to_string(),
            helper: Vec::new(),
        }
    }

    fn secret(field: FormField, label: &'static str, placeholder: &str) -> Self {
        Self {
            field,
            label,
            kind: FieldKind::Secret,
            value: String::new(),
            placeholder: placeholder.to_string(),
            helper: Vec::new(),
        }
    }

    /// A value outside the options resolves to the first option
    fn select(field: FormField, label: &'static str, value: &str, options: Vec<SelectOption>) -> Self {
        let value = match options.first() {
            Some(first) if !options.iter().any(|o| o.value == value) => first.value.clone(),
            _ => value.to_string(),
        };
        Self {
            field,
            label,
            kind: FieldKind::Select(options),
            value,
            placeholder: String::new(),
            helper: Vec::new(),
        }
    }

    fn help(mut self, line: impl Into<String>) -> Self {
        self.helper.push(line.into());
        self
    }
}

/// Buttons a group can show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupAction {
    DeleteKey(AIAdapter),
    ViewUsage,
    SelectWorkers,
    RefreshHorde,
}

impl GroupAction {
    pub fn label(&self) -> &'static str {
        match self {
            GroupAction::DeleteKey(AIAdapter::Horde) => "Delete Horde API Key",
            GroupAction::DeleteKey(AIAdapter::OpenAI) => "Delete OpenAI Key",
            GroupAction::DeleteKey(AIAdapter::Claude) => "Delete Claude Key",
            GroupAction::DeleteKey(AIAdapter::Scale) => "Delete Scale API Key",
            GroupAction::DeleteKey(AIAdapter::Novel) => "Delete Novel API Key",
            GroupAction::DeleteKey(_) => "Delete Key",
            GroupAction::ViewUsage => "View Usage",
            GroupAction::SelectWorkers => "Select Specific Workers",
            GroupAction::RefreshHorde => "Refresh",
        }
    }
}

/// Presentation of one visible group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupView {
    pub group: FieldGroup,
    pub fields: Vec<FieldView>,
    pub actions: Vec<GroupAction>,
    /// Read-only status lines shown under the fields
    pub status: Vec<String>,
}

impl GroupView {
    fn new(group: FieldGroup) -> Self {
        Self {
            group,
            fields: Vec::new(),
            actions: Vec::new(),
            status: Vec::new(),
        }
    }

    pub fn has_action(&self, action: GroupAction) -> bool {
        self.actions.contains(&action)
    }
}

/// The default-adapter select, listing only enabled adapters
pub fn default_adapter_field(adapters: &AdapterConfig, user: &UserSettings) -> FieldView {
    let options = adapters
        .to_options()
        .into_iter()
        .map(|(adapter, label)| SelectOption::new(adapter.as_str(), label))
        .collect();
    FieldView::select(
        FormField::DefaultAdapter,
        "Default AI Service",
        user.default_adapter.as_str(),
        options,
    )
    .help("The default service conversations will use unless otherwise configured")
}

/// Horde model options: `Any` first, then one per fetched model
pub fn horde_model_options(snapshot: &StoreSnapshot) -> Vec<SelectOption> {
    std::iter::once(SelectOption::new("any", "Any"))
        .chain(
            snapshot
                .horde_models
                .iter()
                .map(|model| SelectOption::new(model.name.clone(), model.label())),
        )
        .collect()
}

/// Build the views for every visible group
///
/// `worker_count` is the number of horde workers the form would submit.
pub fn render_plan(
    adapters: &AdapterConfig,
    snapshot: &StoreSnapshot,
    worker_count: usize,
) -> Vec<GroupView> {
    visible_groups(adapters)
        .into_iter()
        .map(|group| group_view(group, snapshot, worker_count))
        .collect()
}

fn group_view(group: FieldGroup, snapshot: &StoreSnapshot, worker_count: usize) -> GroupView {
    let user = &snapshot.user;
    let mut view = GroupView::new(group);

    match group {
        FieldGroup::Horde => {
            let status = match &user.horde_name {
                Some(name) => format!("Logged in as {}.", name),
                None => "Currently using anonymous access.".to_string(),
            };
            let placeholder = if user.horde_name.is_some() || user.horde_key_set {
                "API key has been verified"
            } else {
                ""
            };
            view.fields.push(
                FieldView::secret(FormField::HordeKey, "AI Horde API Key", placeholder)
                    .help(status)
                    .help("Leave blank to use guest account. Visit https://aihorde.net to register."),
            );
            if user.horde_name.is_some() {
                view.actions.push(GroupAction::DeleteKey(AIAdapter::Horde));
            }

            let current = if user.horde_model.is_empty() {
                "None"
            } else {
                user.horde_model.as_str()
            };
            view.fields.push(
                FieldView::select(
                    FormField::HordeModel,
                    "Horde Model",
                    &user.horde_model,
                    horde_model_options(snapshot),
                )
                .help(format!("Currently set to: {}", current)),
            );
            view.actions.push(GroupAction::RefreshHorde);
            view.actions.push(GroupAction::SelectWorkers);
            view.status.push(format!("Workers selected: {}", worker_count));
        }
        FieldGroup::Kobold => {
            view.fields.push(
                FieldView::text(
                    FormField::KoboldUrl,
                    "Kobold Compatible URL",
                    &user.kobold_url,
                    URL_PLACEHOLDER,
                )
                .help(URL_HELP),
            );
        }
        FieldGroup::OpenAI => {
            let placeholder = if user.oai_key_set {
                "OpenAI key is set"
            } else {
                SK_PLACEHOLDER
            };
            view.fields
                .push(FieldView::secret(FormField::OaiKey, "OpenAI Key", placeholder).help("Valid OpenAI Key."));
            view.actions.push(GroupAction::ViewUsage);
            view.actions.push(GroupAction::DeleteKey(AIAdapter::OpenAI));
        }
        FieldGroup::Claude => {
            let placeholder = if user.claude_api_key_set {
                "Claude key is set"
            } else {
                SK_PLACEHOLDER
            };
            view.fields.push(
                FieldView::secret(FormField::ClaudeApiKey, "Claude Key", placeholder).help("Valid Claude Key."),
            );
            view.actions.push(GroupAction::DeleteKey(AIAdapter::Claude));
        }
        FieldGroup::Scale => {
            view.fields.push(
                FieldView::text(
                    FormField::ScaleUrl,
                    "Scale URL",
                    &user.scale_url,
                    "E.g. https://dashboard.scale.com/spellbook/api/v2/deploy/a1b2c3",
                )
                .help("Fully qualified Scale URL."),
            );
            let placeholder = if user.scale_api_key_set {
                "Scale API key is set"
            } else {
                "E.g. 9rv440nv7ogj6s7j312flqijd"
            };
            view.fields
                .push(FieldView::secret(FormField::ScaleApiKey, "Scale API Key", placeholder));
            view.actions.push(GroupAction::DeleteKey(AIAdapter::Scale));
        }
        FieldGroup::Novel => {
            let options = NOVEL_MODELS
                .iter()
                .map(|(value, label)| SelectOption::new(*value, *label))
                .collect();
            view.fields.push(FieldView::select(
                FormField::NovelModel,
                "NovelAI Model",
                &user.novel_model,
                options,
            ));
            let placeholder = if user.novel_verified {
                "API Key has been verified"
            } else {
                ""
            };
            view.fields.push(
                FieldView::secret(FormField::NovelApiKey, "Novel API Key", placeholder)
                    .help("NEVER SHARE THIS WITH ANYBODY! The token from the NovelAI request authorization.")
                    .help("This token expires periodically and will occasionally need to be re-entered."),
            );
            if user.novel_verified {
                view.actions.push(GroupAction::DeleteKey(AIAdapter::Novel));
            }
        }
        FieldGroup::Luminai => {
            view.fields.push(
                FieldView::text(FormField::LuminaiUrl, "LuminAI URL", &user.luminai_url, URL_PLACEHOLDER)
                    .help(URL_HELP),
            );
        }
    }

    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::HordeModel;
    use pretty_assertions::assert_eq;

    fn config(adapters: &[AIAdapter]) -> AdapterConfig {
        AdapterConfig::new(adapters.iter().copied())
    }

    fn view_for(plan: &[GroupView], group: FieldGroup) -> &GroupView {
        plan.iter().find(|v| v.group == group).unwrap()
    }

    #[test]
    fn test_groups_follow_render_order() {
        let adapters = config(&[AIAdapter::Luminai, AIAdapter::OpenAI, AIAdapter::Horde]);
        assert_eq!(
            visible_groups(&adapters),
            vec![FieldGroup::Horde, FieldGroup::OpenAI, FieldGroup::Luminai]
        );
    }

    #[test]
    fn test_groups_match_enabled_adapters_exactly() {
        for adapter in AIAdapter::ALL {
            let groups = visible_groups(&config(&[*adapter]));
            assert_eq!(groups.len(), 1);
            assert_eq!(groups[0].adapter(), *adapter);
        }
        assert!(visible_groups(&config(&[])).is_empty());
        assert_eq!(visible_groups(&AdapterConfig::all()).len(), AIAdapter::ALL.len());
    }

    #[test]
    fn test_disabled_adapter_fields_are_not_rendered() {
        let fields = visible_fields(&config(&[AIAdapter::OpenAI, AIAdapter::Novel]));
        assert_eq!(
            fields,
            vec![
                FormField::DefaultAdapter,
                FormField::OaiKey,
                FormField::NovelModel,
                FormField::NovelApiKey,
            ]
        );
        assert!(!fields.contains(&FormField::HordeKey));
    }

    #[test]
    fn test_group_fields_belong_to_group_adapter() {
        for group in FieldGroup::ORDER {
            for field in group.fields() {
                assert_eq!(field.adapter(), Some(group.adapter()));
            }
        }
    }

    #[test]
    fn test_horde_guest_mode() {
        let snapshot = StoreSnapshot::default();
        let plan = render_plan(&config(&[AIAdapter::Horde]), &snapshot, 0);
        let horde = view_for(&plan, FieldGroup::Horde);

        assert!(horde.fields[0]
            .helper
            .contains(&"Currently using anonymous access.".to_string()));
        assert!(!horde.has_action(GroupAction::DeleteKey(AIAdapter::Horde)));
        assert_eq!(horde.fields[0].placeholder, "");
    }

    #[test]
    fn test_horde_with_identity() {
        let mut snapshot = StoreSnapshot::default();
        snapshot.user.horde_name = Some("alice#123".to_string());
        snapshot.user.horde_key_set = true;

        let plan = render_plan(&config(&[AIAdapter::Horde]), &snapshot, 0);
        let horde = view_for(&plan, FieldGroup::Horde);

        assert_eq!(horde.fields[0].helper[0], "Logged in as alice#123.");
        assert!(horde.has_action(GroupAction::DeleteKey(AIAdapter::Horde)));
        assert_eq!(horde.fields[0].placeholder, "API key has been verified");
    }

    #[test]
    fn test_horde_model_options_start_with_any() {
        let mut snapshot = StoreSnapshot::default();
        snapshot.user.horde_model = String::new();
        snapshot.horde_models = vec![HordeModel {
            name: "Pygmalion-6b".to_string(),
            queued: 10.0,
            eta: 2.0,
            count: 4,
        }];

        let plan = render_plan(&config(&[AIAdapter::Horde]), &snapshot, 3);
        let horde = view_for(&plan, FieldGroup::Horde);
        let model = &horde.fields[1];

        match &model.kind {
            FieldKind::Select(options) => assert_eq!(
                options,
                &vec![
                    SelectOption::new("any", "Any"),
                    SelectOption::new("Pygmalion-6b", "Pygmalion-6b - (queue: 10, eta: 2, count: 4)"),
                ]
            ),
            other => panic!("expected select, got {:?}", other),
        }
        assert_eq!(model.helper, vec!["Currently set to: None".to_string()]);
        assert_eq!(horde.status, vec!["Workers selected: 3".to_string()]);
    }

    #[test]
    fn test_openai_offers_usage_and_delete() {
        let plan = render_plan(&config(&[AIAdapter::OpenAI]), &StoreSnapshot::default(), 0);
        let openai = view_for(&plan, FieldGroup::OpenAI);
        assert_eq!(
            openai.actions,
            vec![GroupAction::ViewUsage, GroupAction::DeleteKey(AIAdapter::OpenAI)]
        );
        assert_eq!(openai.fields[0].placeholder, SK_PLACEHOLDER);
    }

    #[test]
    fn test_novel_delete_requires_verification() {
        let mut snapshot = StoreSnapshot::default();
        let plan = render_plan(&config(&[AIAdapter::Novel]), &snapshot, 0);
        assert!(view_for(&plan, FieldGroup::Novel).actions.is_empty());

        snapshot.user.novel_verified = true;
        let plan = render_plan(&config(&[AIAdapter::Novel]), &snapshot, 0);
        let novel = view_for(&plan, FieldGroup::Novel);
        assert!(novel.has_action(GroupAction::DeleteKey(AIAdapter::Novel)));
        assert_eq!(novel.fields[1].placeholder, "API Key has been verified");
    }

    #[test]
    fn test_url_only_groups() {
        let mut snapshot = StoreSnapshot::default();
        snapshot.user.kobold_url = "http://localhost:5001".to_string();
        let plan = render_plan(&config(&[AIAdapter::Kobold, AIAdapter::Luminai]), &snapshot, 0);

        let kobold = view_for(&plan, FieldGroup::Kobold);
        assert_eq!(kobold.fields.len(), 1);
        assert_eq!(kobold.fields[0].kind, FieldKind::Text);
        assert_eq!(kobold.fields[0].value, "http://localhost:5001");
        assert!(kobold.actions.is_empty());
        assert!(view_for(&plan, FieldGroup::Luminai).actions.is_empty());
    }

    #[test]
    fn test_secret_values_are_never_echoed() {
        let mut snapshot = StoreSnapshot::default();
        snapshot.user.oai_key_set = true;
        snapshot.user.scale_api_key_set = true;
        let plan = render_plan(&AdapterConfig::all(), &snapshot, 0);
        for view in &plan {
            for field in view.fields.iter().filter(|f| f.kind == FieldKind::Secret) {
                assert_eq!(field.value, "");
                assert!(field.field.is_secret());
            }
        }
    }

    #[test]
    fn test_default_adapter_options_follow_config() {
        let user = UserSettings::default();
        let field = default_adapter_field(&config(&[AIAdapter::Claude, AIAdapter::Novel]), &user);
        assert_eq!(
            field.kind,
            FieldKind::Select(vec![
                SelectOption::new("claude", "Claude"),
                SelectOption::new("novel", "NovelAI"),
            ])
        );
        assert_eq!(field.value, "claude");
    }

    #[test]
    fn test_unknown_horde_model_resolves_to_any() {
        let snapshot = StoreSnapshot {
            user: UserSettings {
                horde_model: "Mythomax".to_string(),
                ..Default::default()
            },
            adapters: config(&[AIAdapter::Horde]),
            ..Default::default()
        };
        let plan = render_plan(&snapshot.adapters, &snapshot, 0);
        let model = plan[0]
            .fields
            .iter()
            .find(|f| f.field == FormField::HordeModel)
            .unwrap();
        assert_eq!(model.value, "any");
        assert!(model.helper.contains(&"Currently set to: Mythomax".to_string()));
    }

    #[test]
    fn test_guest_clear_only_for_guests() {
        assert!(guest_clear_visible(false));
        assert!(!guest_clear_visible(true));
    }
}
