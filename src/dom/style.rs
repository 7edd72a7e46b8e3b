use crate::dom::dom_model::{Document, NodeId};

/// Split an inline `style` attribute into `(property, value)` pairs.
///
/// Property names are lowercased; values are kept verbatim. Malformed
/// declarations without a colon are dropped, as a browser would.
pub fn parse_inline_style(style: &str) -> Vec<(String, String)> {
    split_declarations(style)
        .into_iter()
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim().to_ascii_lowercase();
            let value = value.trim();
            if prop.is_empty() || value.is_empty() {
                return None;
            }
            Some((prop, value.to_string()))
        })
        .collect()
}

/// Split on `;` outside quoted strings and parentheses, so values such as
/// `url("a;b")` stay whole.
fn split_declarations(style: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in style.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                out.push(&style[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&style[start..]);
    out
}

pub fn serialize_inline_style(decls: &[(String, String)]) -> String {
    decls
        .iter()
        .map(|(p, v)| format!("{}: {};", p, v))
        .collect::<Vec<_>>()
        .join(" ")
}

impl Document {
    pub fn style_property(&self, id: NodeId, prop: &str) -> Option<String> {
        let style = self.attr(id, "style")?;
        parse_inline_style(style)
            .into_iter()
            .rev()
            .find(|(p, _)| p.eq_ignore_ascii_case(prop))
            .map(|(_, v)| v)
    }

    pub fn set_style_property(&mut self, id: NodeId, prop: &str, value: &str) {
        let mut decls = self
            .attr(id, "style")
            .map(parse_inline_style)
            .unwrap_or_default();
        decls.retain(|(p, _)| !p.eq_ignore_ascii_case(prop));
        decls.push((prop.to_ascii_lowercase(), value.to_string()));
        self.set_attr(id, "style", &serialize_inline_style(&decls));
    }

    pub fn remove_style_property(&mut self, id: NodeId, prop: &str) {
        let Some(style) = self.attr(id, "style") else {
            return;
        };
        let mut decls = parse_inline_style(style);
        decls.retain(|(p, _)| !p.eq_ignore_ascii_case(prop));
        if decls.is_empty() {
            self.remove_attr(id, "style");
        } else {
            self.set_attr(id, "style", &serialize_inline_style(&decls));
        }
    }

    /// Inline `position`, defaulting to `static` like the initial value.
    pub fn position(&self, id: NodeId) -> String {
        self.style_property(id, "position")
            .map(|p| p.to_ascii_lowercase())
            .unwrap_or_else(|| "static".to_string())
    }
}
