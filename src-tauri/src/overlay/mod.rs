//! Resolution picker overlay
//!
//! The overlay injected into the remote page is described here as data:
//! style rules, an element tree and the event bindings between them.
//! `render` turns the description into the single script submitted to the
//! page. Keeping the description structured lets the behaviour be checked
//! without matching on generated JavaScript.

mod render;

pub use render::render;

use crate::preferences::WindowSize;
use crate::resolution::{options_for, CustomBounds, ResolutionOption};

pub const STYLE_ID: &str = "mammouth-res-style";
pub const BUTTON_ID: &str = "mammouth-res-button";
pub const DROPDOWN_ID: &str = "mammouth-res-dropdown";
pub const MODAL_ID: &str = "mammouth-res-modal";
pub const CURRENT_LABEL_ID: &str = "mammouth-res-current";
pub const CUSTOM_OPTION_ID: &str = "mammouth-res-opt-custom";
pub const WIDTH_INPUT_ID: &str = "mammouth-res-width";
pub const HEIGHT_INPUT_ID: &str = "mammouth-res-height";
pub const APPLY_ID: &str = "mammouth-res-apply";
pub const CANCEL_ID: &str = "mammouth-res-cancel";

/// Top-level nodes owned by the overlay. Removed before every injection.
pub const OVERLAY_NODE_IDS: [&str; 4] = [STYLE_ID, BUTTON_ID, DROPDOWN_ID, MODAL_ID];

const OPTION_CLASS: &str = "mammouth-res-option";
const CURRENT_PREFIX: &str = "Current";
const ACTIVE_CLASS: &str = "active";

/// Id of the dropdown row for a preset
pub fn preset_option_id(size: WindowSize) -> String {
    format!("mammouth-res-opt-{}x{}", size.width, size.height)
}

// ============================================================================
// Description types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    pub selector: &'static str,
    pub declarations: Vec<(&'static str, &'static str)>,
}

impl StyleRule {
    fn new(selector: &'static str, declarations: &[(&'static str, &'static str)]) -> Self {
        Self {
            selector,
            declarations: declarations.to_vec(),
        }
    }

    pub fn get(&self, property: &str) -> Option<&'static str> {
        self.declarations
            .iter()
            .find(|(p, _)| *p == property)
            .map(|(_, v)| *v)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: &'static str,
    pub id: Option<String>,
    pub classes: Vec<&'static str>,
    pub attributes: Vec<(&'static str, String)>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    fn new(tag: &'static str) -> Self {
        Self {
            tag,
            id: None,
            classes: Vec::new(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    fn class(mut self, class: &'static str) -> Self {
        self.classes.push(class);
        self
    }

    fn attr(mut self, name: &'static str, value: impl ToString) -> Self {
        self.attributes.push((name, value.to_string()));
        self
    }

    fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| *c == class)
    }

    /// Depth-first search by id, including `self`
    pub fn find(&self, id: &str) -> Option<&Element> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }
}

/// What starts an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Click,
    /// Enter pressed while the target has focus
    EnterKey,
    /// A click landing outside the target and outside `also_inside`, while
    /// the target is open
    ClickOutside { also_inside: &'static str },
    /// A click on the target itself that is not the end of a drag (text
    /// selection that started inside the dialog and ended on the backdrop)
    BackdropClick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ToggleDropdown,
    CloseDropdown,
    /// Send the size through the bridge, move the active marker, update the
    /// current label and close the dropdown
    SelectPreset(WindowSize),
    OpenCustomModal,
    /// Validate the custom inputs; alert and stay open when out of bounds,
    /// otherwise send through the bridge and close
    ApplyCustom,
    CloseModal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub target: String,
    pub trigger: Trigger,
    pub action: Action,
}

impl Binding {
    fn new(target: impl Into<String>, trigger: Trigger, action: Action) -> Self {
        Self {
            target: target.into(),
            trigger,
            action,
        }
    }
}

/// Complete overlay description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    pub current: WindowSize,
    pub bounds: CustomBounds,
    pub styles: Vec<StyleRule>,
    /// Nodes appended to the page body at injection time
    pub elements: Vec<Element>,
    pub bindings: Vec<Binding>,
    /// The custom-size dialog, created when opened and removed when closed
    pub modal: Element,
    /// Wired every time the modal is created
    pub modal_bindings: Vec<Binding>,
}

impl Overlay {
    pub fn resolution_picker(current: WindowSize) -> Self {
        let bounds = CustomBounds::default();
        let options = options_for(current);

        let mut dropdown = Element::new("div").id(DROPDOWN_ID).child(
            Element::new("div")
                .id(CURRENT_LABEL_ID)
                .class("mammouth-res-current")
                .text(current_label(current)),
        );
        let mut bindings = vec![
            Binding::new(BUTTON_ID, Trigger::Click, Action::ToggleDropdown),
            Binding::new(
                DROPDOWN_ID,
                Trigger::ClickOutside {
                    also_inside: BUTTON_ID,
                },
                Action::CloseDropdown,
            ),
        ];

        for option in options {
            match option {
                ResolutionOption::Preset { size, active } => {
                    let mut row = Element::new("div")
                        .id(preset_option_id(size))
                        .class(OPTION_CLASS)
                        .attr("data-width", size.width)
                        .attr("data-height", size.height)
                        .text(size.to_string());
                    if active {
                        row = row.class(ACTIVE_CLASS);
                    }
                    dropdown = dropdown.child(row);
                    bindings.push(Binding::new(
                        preset_option_id(size),
                        Trigger::Click,
                        Action::SelectPreset(size),
                    ));
                }
                ResolutionOption::Custom => {
                    dropdown = dropdown.child(
                        Element::new("div")
                            .id(CUSTOM_OPTION_ID)
                            .class(OPTION_CLASS)
                            .text("Custom…"),
                    );
                    bindings.push(Binding::new(
                        CUSTOM_OPTION_ID,
                        Trigger::Click,
                        Action::OpenCustomModal,
                    ));
                }
            }
        }

        let button = Element::new("button")
            .id(BUTTON_ID)
            .attr("type", "button")
            .text("Resolution");

        Self {
            current,
            bounds,
            styles: style_rules(),
            elements: vec![button, dropdown],
            bindings,
            modal: custom_modal(current, bounds),
            modal_bindings: vec![
                Binding::new(APPLY_ID, Trigger::Click, Action::ApplyCustom),
                Binding::new(CANCEL_ID, Trigger::Click, Action::CloseModal),
                Binding::new(WIDTH_INPUT_ID, Trigger::EnterKey, Action::ApplyCustom),
                Binding::new(HEIGHT_INPUT_ID, Trigger::EnterKey, Action::ApplyCustom),
                Binding::new(MODAL_ID, Trigger::BackdropClick, Action::CloseModal),
            ],
        }
    }

    /// Element by id, searching the injected nodes and the modal
    pub fn find(&self, id: &str) -> Option<&Element> {
        self.elements
            .iter()
            .chain(std::iter::once(&self.modal))
            .find_map(|e| e.find(id))
    }

    pub fn style(&self, selector: &str) -> Option<&StyleRule> {
        self.styles.iter().find(|r| r.selector == selector)
    }
}

pub(crate) fn current_label(size: WindowSize) -> String {
    format!("{}: {}", CURRENT_PREFIX, size)
}

fn custom_modal(current: WindowSize, bounds: CustomBounds) -> Element {
    let number_input = |id: &'static str, value: u32, min: u32, max: u32| {
        Element::new("input")
            .id(id)
            .attr("type", "number")
            .attr("min", min)
            .attr("max", max)
            .attr("step", 1)
            .attr("value", value)
    };

    let dialog = Element::new("div")
        .class("mammouth-res-dialog")
        .child(Element::new("h3").text("Custom resolution"))
        .child(
            Element::new("label")
                .attr("for", WIDTH_INPUT_ID)
                .text(format!("Width ({}–{})", bounds.min.width, bounds.max.width)),
        )
        .child(number_input(
            WIDTH_INPUT_ID,
            current.width,
            bounds.min.width,
            bounds.max.width,
        ))
        .child(
            Element::new("label")
                .attr("for", HEIGHT_INPUT_ID)
                .text(format!("Height ({}–{})", bounds.min.height, bounds.max.height)),
        )
        .child(number_input(
            HEIGHT_INPUT_ID,
            current.height,
            bounds.min.height,
            bounds.max.height,
        ))
        .child(
            Element::new("div")
                .class("mammouth-res-actions")
                .child(
                    Element::new("button")
                        .id(CANCEL_ID)
                        .attr("type", "button")
                        .text("Cancel"),
                )
                .child(
                    Element::new("button")
                        .id(APPLY_ID)
                        .attr("type", "button")
                        .text("Apply"),
                ),
        );

    Element::new("div").id(MODAL_ID).child(dialog)
}

fn style_rules() -> Vec<StyleRule> {
    const FONT: (&str, &str) = ("font", "13px/1.4 system-ui, -apple-system, sans-serif");
    vec![
        StyleRule::new(
            "#mammouth-res-button",
            &[
                ("position", "fixed"),
                ("left", "12px"),
                ("bottom", "60px"),
                ("z-index", "2147483000"),
                ("padding", "6px 12px"),
                ("border", "1px solid rgba(255, 255, 255, 0.2)"),
                ("border-radius", "6px"),
                ("background", "#2b2340"),
                ("color", "#fff"),
                ("cursor", "pointer"),
                ("opacity", "0.85"),
                FONT,
            ],
        ),
        StyleRule::new("#mammouth-res-button:hover", &[("opacity", "1")]),
        StyleRule::new(
            "#mammouth-res-dropdown",
            &[
                ("position", "fixed"),
                ("left", "12px"),
                ("bottom", "105px"),
                ("z-index", "2147483000"),
                ("display", "none"),
                ("min-width", "180px"),
                ("padding", "4px 0"),
                ("border-radius", "8px"),
                ("background", "#1f1a2e"),
                ("color", "#eee"),
                ("box-shadow", "0 6px 24px rgba(0, 0, 0, 0.35)"),
                FONT,
            ],
        ),
        StyleRule::new("#mammouth-res-dropdown.open", &[("display", "block")]),
        StyleRule::new(
            "#mammouth-res-dropdown .mammouth-res-current",
            &[
                ("padding", "6px 12px"),
                ("opacity", "0.7"),
                ("border-bottom", "1px solid rgba(255, 255, 255, 0.1)"),
            ],
        ),
        StyleRule::new(
            "#mammouth-res-dropdown .mammouth-res-option",
            &[("padding", "6px 12px"), ("cursor", "pointer")],
        ),
        StyleRule::new(
            "#mammouth-res-dropdown .mammouth-res-option:hover",
            &[("background", "rgba(255, 255, 255, 0.08)")],
        ),
        StyleRule::new(
            "#mammouth-res-dropdown .mammouth-res-option.active",
            &[("color", "#b69cff"), ("font-weight", "600")],
        ),
        StyleRule::new(
            "#mammouth-res-modal",
            &[
                ("position", "fixed"),
                ("inset", "0"),
                ("z-index", "2147483001"),
                ("display", "flex"),
                ("align-items", "center"),
                ("justify-content", "center"),
                ("background", "rgba(0, 0, 0, 0.5)"),
            ],
        ),
        StyleRule::new(
            "#mammouth-res-modal .mammouth-res-dialog",
            &[
                ("min-width", "260px"),
                ("padding", "20px"),
                ("border-radius", "10px"),
                ("background", "#1f1a2e"),
                ("color", "#eee"),
                FONT,
            ],
        ),
        StyleRule::new("#mammouth-res-modal h3", &[("margin", "0 0 12px")]),
        StyleRule::new(
            "#mammouth-res-modal label",
            &[("display", "block"), ("margin", "8px 0 4px")],
        ),
        StyleRule::new(
            "#mammouth-res-modal input",
            &[
                ("width", "100%"),
                ("box-sizing", "border-box"),
                ("padding", "6px"),
                ("user-select", "text"),
            ],
        ),
        StyleRule::new(
            "#mammouth-res-modal .mammouth-res-actions",
            &[
                ("display", "flex"),
                ("justify-content", "flex-end"),
                ("gap", "8px"),
                ("margin-top", "16px"),
            ],
        ),
        StyleRule::new(
            "#mammouth-res-modal button",
            &[
                ("padding", "6px 14px"),
                ("border-radius", "6px"),
                ("cursor", "pointer"),
            ],
        ),
    ]
}
