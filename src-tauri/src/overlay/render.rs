//! Overlay → page script

use std::fmt::Write;

use super::{
    Action, Binding, Element, Overlay, Trigger, ACTIVE_CLASS, CURRENT_LABEL_ID, CURRENT_PREFIX,
    DROPDOWN_ID, HEIGHT_INPUT_ID, MODAL_ID, OPTION_CLASS, OVERLAY_NODE_IDS, STYLE_ID,
    WIDTH_INPUT_ID,
};
use crate::bridge::{BRIDGE_GLOBAL, BRIDGE_METHOD};

/// Property holding the teardown of document-level listeners from the
/// previous injection
const TEARDOWN_GLOBAL: &str = "__mammouthResTeardown";

/// Movement (px) after which a backdrop press counts as a drag
const DRAG_THRESHOLD_PX: u32 = 3;

/// JS string literal (JSON strings are valid JS strings)
fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Render the overlay as one self-contained script. Running it twice leaves
/// a single copy of every node: all overlay ids are removed first.
pub fn render(overlay: &Overlay) -> String {
    let mut js = String::with_capacity(8 * 1024);
    let mut counter = 0usize;

    js.push_str("(function () {\n'use strict';\nvar doc = document;\n");

    // Stale nodes and listeners from an earlier injection
    let ids: Vec<String> = OVERLAY_NODE_IDS.iter().map(|id| js_str(id)).collect();
    let _ = writeln!(
        js,
        "[{}].forEach(function (id) {{ var n = doc.getElementById(id); if (n) n.remove(); }});",
        ids.join(", ")
    );
    let _ = writeln!(
        js,
        "if (typeof window.{t} === 'function') {{ try {{ window.{t}(); }} catch (e) {{}} }}",
        t = TEARDOWN_GLOBAL
    );
    let _ = writeln!(
        js,
        "var listeners = [];\n\
         function listen(target, type, fn, capture) {{ target.addEventListener(type, fn, capture); listeners.push([target, type, fn, capture]); }}\n\
         window.{} = function () {{ listeners.forEach(function (l) {{ l[0].removeEventListener(l[1], l[2], l[3]); }}); listeners = []; }};",
        TEARDOWN_GLOBAL
    );
    js.push_str("function byId(id) { return doc.getElementById(id); }\n");
    let _ = writeln!(
        js,
        "var bounds = {{ minWidth: {}, maxWidth: {}, minHeight: {}, maxHeight: {} }};",
        overlay.bounds.min.width,
        overlay.bounds.max.width,
        overlay.bounds.min.height,
        overlay.bounds.max.height
    );

    // Styles
    let _ = writeln!(
        js,
        "var style = doc.createElement('style');\nstyle.id = {};\nstyle.textContent = {};\n(doc.head || doc.documentElement).appendChild(style);",
        js_str(STYLE_ID),
        js_str(&render_css(overlay))
    );

    // Nodes
    js.push_str("var root = doc.body || doc.documentElement;\n");
    for element in &overlay.elements {
        let var = emit_element(&mut js, element, &mut counter);
        let _ = writeln!(js, "root.appendChild({});", var);
    }

    js.push_str(&helpers(overlay));

    // Modal is built on demand
    js.push_str("function openCustomModal() {\ncloseDropdown();\ncloseModal();\n");
    let modal_var = emit_element(&mut js, &overlay.modal, &mut counter);
    let _ = writeln!(js, "root.appendChild({});", modal_var);
    for binding in &overlay.modal_bindings {
        emit_binding(&mut js, binding);
    }
    let _ = writeln!(
        js,
        "var first = byId({}); if (first) {{ first.focus(); first.select(); }}\n}}",
        js_str(WIDTH_INPUT_ID)
    );

    for binding in &overlay.bindings {
        emit_binding(&mut js, binding);
    }

    js.push_str("})();\n");
    js
}

fn render_css(overlay: &Overlay) -> String {
    let mut css = String::new();
    for rule in &overlay.styles {
        let _ = write!(css, "{} {{", rule.selector);
        for (property, value) in &rule.declarations {
            let _ = write!(css, " {}: {};", property, value);
        }
        css.push_str(" }\n");
    }
    css
}

/// Emit DOM construction for `element` and its subtree; returns the variable
/// holding the root node.
fn emit_element(js: &mut String, element: &Element, counter: &mut usize) -> String {
    let var = format!("e{}", counter);
    *counter += 1;

    let _ = writeln!(js, "var {} = doc.createElement({});", var, js_str(element.tag));
    if let Some(id) = &element.id {
        let _ = writeln!(js, "{}.id = {};", var, js_str(id));
    }
    if !element.classes.is_empty() {
        let _ = writeln!(js, "{}.className = {};", var, js_str(&element.classes.join(" ")));
    }
    for (name, value) in &element.attributes {
        let _ = writeln!(js, "{}.setAttribute({}, {});", var, js_str(name), js_str(value));
    }
    if let Some(text) = &element.text {
        let _ = writeln!(js, "{}.textContent = {};", var, js_str(text));
    }
    for child in &element.children {
        let child_var = emit_element(js, child, counter);
        let _ = writeln!(js, "{}.appendChild({});", var, child_var);
    }
    var
}

/// Functions the bindings call into
fn helpers(overlay: &Overlay) -> String {
    let mut js = String::new();
    let _ = writeln!(
        js,
        "function setCurrent(w, h) {{\n\
         var label = byId({label}); if (label) label.textContent = {prefix} + ': ' + w + '×' + h;\n\
         var rows = doc.querySelectorAll('#{dropdown} .{option}[data-width]');\n\
         Array.prototype.forEach.call(rows, function (row) {{ row.classList.toggle({active}, Number(row.getAttribute('data-width')) === w && Number(row.getAttribute('data-height')) === h); }});\n\
         }}",
        label = js_str(CURRENT_LABEL_ID),
        prefix = js_str(CURRENT_PREFIX),
        dropdown = DROPDOWN_ID,
        option = OPTION_CLASS,
        active = js_str(ACTIVE_CLASS),
    );
    let _ = writeln!(
        js,
        "function requestResolution(w, h) {{\n\
         var bridge = window.{bridge};\n\
         if (bridge && typeof bridge.{method} === 'function') {{ bridge.{method}(w, h); }}\n\
         setCurrent(w, h);\n\
         }}",
        bridge = BRIDGE_GLOBAL,
        method = BRIDGE_METHOD,
    );
    let _ = writeln!(
        js,
        "function toggleDropdown() {{ var d = byId({d}); if (d) d.classList.toggle('open'); }}\n\
         function closeDropdown() {{ var d = byId({d}); if (d) d.classList.remove('open'); }}\n\
         function closeModal() {{ var m = byId({m}); if (m) m.remove(); }}",
        d = js_str(DROPDOWN_ID),
        m = js_str(MODAL_ID),
    );
    let _ = writeln!(
        js,
        "function applyCustom() {{\n\
         var wi = byId({w}), hi = byId({h});\n\
         if (!wi || !hi) return;\n\
         var w = parseInt(wi.value, 10), h = parseInt(hi.value, 10);\n\
         if (!(w >= bounds.minWidth && w <= bounds.maxWidth && h >= bounds.minHeight && h <= bounds.maxHeight)) {{\n\
         window.alert({msg});\n\
         return;\n\
         }}\n\
         requestResolution(w, h);\n\
         closeModal();\n\
         }}",
        w = js_str(WIDTH_INPUT_ID),
        h = js_str(HEIGHT_INPUT_ID),
        msg = js_str(&overlay.bounds.rejection_message()),
    );
    js
}

fn action_js(action: Action) -> String {
    match action {
        Action::ToggleDropdown => "toggleDropdown();".to_string(),
        Action::CloseDropdown => "closeDropdown();".to_string(),
        Action::SelectPreset(size) => format!(
            "requestResolution({}, {}); closeDropdown();",
            size.width, size.height
        ),
        Action::OpenCustomModal => "openCustomModal();".to_string(),
        Action::ApplyCustom => "applyCustom();".to_string(),
        Action::CloseModal => "closeModal();".to_string(),
    }
}

fn emit_binding(js: &mut String, binding: &Binding) {
    let target = js_str(&binding.target);
    let action = action_js(binding.action);

    match binding.trigger {
        Trigger::Click => {
            let _ = writeln!(
                js,
                "(function (t) {{ if (t) t.addEventListener('click', function () {{ {} }}); }})(byId({}));",
                action, target
            );
        }
        Trigger::EnterKey => {
            let _ = writeln!(
                js,
                "(function (t) {{ if (t) t.addEventListener('keydown', function (e) {{ if (e.key === 'Enter') {{ e.preventDefault(); {} }} }}); }})(byId({}));",
                action, target
            );
        }
        Trigger::ClickOutside { also_inside } => {
            let _ = writeln!(
                js,
                "listen(doc, 'click', function (e) {{\n\
                 var t = byId({t}), o = byId({o});\n\
                 if (!t || !t.classList.contains('open')) return;\n\
                 if (t.contains(e.target) || (o && o.contains(e.target))) return;\n\
                 {a}\n\
                 }}, true);",
                t = target,
                o = js_str(also_inside),
                a = action,
            );
        }
        Trigger::BackdropClick => {
            // Only a press that starts and ends on the backdrop without moving
            // closes; selecting text in an input and releasing outside must not.
            let _ = writeln!(
                js,
                "(function (t) {{\n\
                 if (!t) return;\n\
                 var pressed = false, moved = false, sx = 0, sy = 0;\n\
                 t.addEventListener('mousedown', function (e) {{ pressed = e.target === t; moved = false; sx = e.clientX; sy = e.clientY; }});\n\
                 t.addEventListener('mousemove', function (e) {{ if (e.buttons && (Math.abs(e.clientX - sx) > {th} || Math.abs(e.clientY - sy) > {th})) moved = true; }});\n\
                 t.addEventListener('mouseup', function (e) {{ if (e.target !== t) pressed = false; }});\n\
                 t.addEventListener('click', function (e) {{\n\
                 var close = e.target === t && pressed && !moved;\n\
                 pressed = false; moved = false;\n\
                 if (close) {{ {a} }}\n\
                 }});\n\
                 }})(byId({target}));",
                th = DRAG_THRESHOLD_PX,
                a = action,
                target = target,
            );
        }
    }
}
