//! Element visibility oracle.
//!
//! The page side collects an [`ElementSnapshot`] with [`probe_script`]; the
//! decision itself is a pure function over that snapshot so it can be tested
//! without a browser.

use serde::{Deserialize, Serialize};

/// Layout and computed-style facts about one element, as seen in-page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSnapshot {
    /// The selector that matched.
    #[serde(default)]
    pub selector: String,
    /// `element.offsetParent !== null`.
    pub has_offset_parent: bool,
    pub position: String,
    pub display: String,
    pub visibility: String,
    pub opacity: String,
    /// Raw computed `z-index` (`"auto"` or an integer).
    pub z_index: String,
    pub width: f64,
    pub height: f64,
}

impl ElementSnapshot {
    /// A plain, laid-out, fully visible element. Handy as a base in tests.
    pub fn shown(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            has_offset_parent: true,
            position: "static".to_string(),
            display: "block".to_string(),
            visibility: "visible".to_string(),
            opacity: "1".to_string(),
            z_index: "auto".to_string(),
            width: 120.0,
            height: 40.0,
        }
    }
}

fn hidden_by_style(s: &ElementSnapshot) -> bool {
    s.display == "none" || s.visibility == "hidden" || opacity_is_zero(&s.opacity)
}

fn opacity_is_zero(raw: &str) -> bool {
    raw.trim().parse::<f64>().map(|v| v == 0.0).unwrap_or(false)
}

/// `parseInt(zIndex) >= 0`; `auto` parses to NaN and fails the comparison.
fn z_index_non_negative(raw: &str) -> bool {
    raw.trim().parse::<i64>().map(|z| z >= 0).unwrap_or(false)
}

/// Would a viewer see this element?
///
/// Elements outside the viewport still count as visible.
pub fn is_visible(s: &ElementSnapshot) -> bool {
    if !s.has_offset_parent {
        // Fixed-position elements have no offset parent but can still be on screen.
        if s.position == "fixed" {
            return !hidden_by_style(s) && z_index_non_negative(&s.z_index);
        }
        return false;
    }

    if hidden_by_style(s) {
        return false;
    }

    s.width != 0.0 && s.height != 0.0
}

/// JS expression that returns the snapshot of the first element matching any
/// of `selectors`, or `null`.
pub fn probe_script(selectors: &[&str]) -> String {
    let list = serde_json::to_string(selectors).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"(() => {{
    const selectors = {list};
    for (const sel of selectors) {{
        const el = document.querySelector(sel);
        if (!el) continue;
        const style = window.getComputedStyle(el);
        const rect = el.getBoundingClientRect();
        return {{
            selector: sel,
            hasOffsetParent: el.offsetParent !== null,
            position: style.position,
            display: style.display,
            visibility: style.visibility,
            opacity: style.opacity,
            zIndex: style.zIndex,
            width: rect.width,
            height: rect.height
        }};
    }}
    return null;
}})()"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn laid_out_element_is_visible() {
        assert!(is_visible(&ElementSnapshot::shown(".x")));
    }

    #[test]
    fn style_hiding_wins() {
        for (field, value) in [("display", "none"), ("visibility", "hidden"), ("opacity", "0")] {
            let mut s = ElementSnapshot::shown(".x");
            match field {
                "display" => s.display = value.to_string(),
                "visibility" => s.visibility = value.to_string(),
                _ => s.opacity = value.to_string(),
            }
            assert!(!is_visible(&s), "{} = {} should hide", field, value);
        }
    }

    #[test]
    fn partial_opacity_is_visible() {
        let mut s = ElementSnapshot::shown(".x");
        s.opacity = "0.4".to_string();
        assert!(is_visible(&s));
    }

    #[test]
    fn zero_area_is_invisible() {
        let mut s = ElementSnapshot::shown(".x");
        s.height = 0.0;
        assert!(!is_visible(&s));
    }

    #[test]
    fn detached_non_fixed_is_invisible() {
        let mut s = ElementSnapshot::shown(".x");
        s.has_offset_parent = false;
        assert!(!is_visible(&s));
    }

    #[test]
    fn fixed_overlay_needs_non_negative_z_index() {
        let mut s = ElementSnapshot::shown(".overlay");
        s.has_offset_parent = false;
        s.position = "fixed".to_string();

        s.z_index = "1000001".to_string();
        assert!(is_visible(&s));

        s.z_index = "-1".to_string();
        assert!(!is_visible(&s));

        s.z_index = "auto".to_string();
        assert!(!is_visible(&s));

        s.z_index = "5".to_string();
        s.visibility = "hidden".to_string();
        assert!(!is_visible(&s));
    }

    #[test]
    fn fixed_overlay_ignores_zero_size() {
        // No offset parent: dimensions are never consulted.
        let mut s = ElementSnapshot::shown(".overlay");
        s.has_offset_parent = false;
        s.position = "fixed".to_string();
        s.z_index = "0".to_string();
        s.width = 0.0;
        assert!(is_visible(&s));
    }

    #[test]
    fn probe_script_embeds_escaped_selectors() {
        let js = probe_script(&[r#"div[title="a"]"#, ".b"]);
        assert!(js.contains(r#"["div[title=\"a\"]",".b"]"#));
        assert!(js.contains("offsetParent"));
    }

    #[test]
    fn snapshot_parses_probe_shape() {
        let s: ElementSnapshot = serde_json::from_str(
            r#"{"selector":".a","hasOffsetParent":true,"position":"absolute","display":"block",
                "visibility":"visible","opacity":"1","zIndex":"auto","width":10,"height":5}"#,
        )
        .expect("snapshot json");
        assert!(is_visible(&s));
    }
}
