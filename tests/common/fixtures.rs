use std::collections::BTreeMap;

use image::{Rgba, RgbaImage};
use ux_overlay::capture::raster::to_png_data_url;
use ux_overlay::dom::dom_model::{Document, NodeId};
use ux_overlay::dom::hit_test::OVERLAY_ATTR;
use ux_overlay::dom::parser::{LayoutNode, from_layout};
use ux_overlay::geometry::geometry_model::Region;
use ux_overlay::locator::selector::query_all;

pub const SAMPLE_HTML: &str = r#"<!DOCTYPE html>
<html>
  <head><title>Checkout</title></head>
  <body>
    <div id="a"><span>x</span><span>y</span></div>
    <main>
      <img src="hero.png">
      <p style="color: red">Welcome back</p>
      <button class="cta">Buy</button>
    </main>
  </body>
</html>"#;

pub fn layout(tag: &str, rect: (f64, f64, f64, f64), children: Vec<LayoutNode>) -> LayoutNode {
    LayoutNode {
        tag: tag.to_string(),
        attrs: BTreeMap::new(),
        rect: Some(Region::new(rect.0, rect.1, rect.2, rect.3)),
        text: None,
        children,
    }
}

pub fn with_attr(mut node: LayoutNode, name: &str, value: &str) -> LayoutNode {
    node.attrs.insert(name.to_string(), value.to_string());
    node
}

pub fn with_text(mut node: LayoutNode, text: &str) -> LayoutNode {
    node.text = Some(text.to_string());
    node
}

/// Measured page, boxes given as (top, left, width, height):
///
/// ```text
/// html, body      0,0     1200x800
/// div#a           0,0     1200x200
///   span "x"      10,10   100x50
///   span "y"      10,120  100x50
/// main            200,0   1200x600
///   img           220,20  300x200
///   button.cta    450,20  120x40
/// ```
pub fn sample_layout() -> LayoutNode {
    layout(
        "html",
        (0.0, 0.0, 1200.0, 800.0),
        vec![layout(
            "body",
            (0.0, 0.0, 1200.0, 800.0),
            vec![
                with_attr(
                    layout(
                        "div",
                        (0.0, 0.0, 1200.0, 200.0),
                        vec![
                            with_text(layout("span", (10.0, 10.0, 100.0, 50.0), vec![]), "x"),
                            with_text(layout("span", (10.0, 120.0, 100.0, 50.0), vec![]), "y"),
                        ],
                    ),
                    "id",
                    "a",
                ),
                layout(
                    "main",
                    (200.0, 0.0, 1200.0, 600.0),
                    vec![
                        with_attr(layout("img", (220.0, 20.0, 300.0, 200.0), vec![]), "src", "hero.png"),
                        with_text(
                            with_attr(layout("button", (450.0, 20.0, 120.0, 40.0), vec![]), "class", "cta"),
                            "Buy",
                        ),
                    ],
                ),
            ],
        )],
    )
}

pub fn sample_document() -> Document {
    from_layout(&sample_layout())
}

/// Image whose pixel at (x, y) is `(x, y, 0, 255)`, so crops can be checked
/// by their corner colours.
pub fn gradient_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 0, 255]))
}

pub fn gradient_png_data_url(width: u32, height: u32) -> String {
    to_png_data_url(&gradient_image(width, height)).expect("encode fixture png")
}

pub fn first(doc: &Document, selector: &str) -> NodeId {
    query_all(doc, selector).expect("valid selector")[0]
}

pub fn nth(doc: &Document, selector: &str, index: usize) -> NodeId {
    query_all(doc, selector).expect("valid selector")[index]
}

/// Nodes the overlay inserted with the given role ("label", "drag").
/// Selector queries never see these, so walk the elements directly.
pub fn overlay_nodes(doc: &Document, role: &str) -> Vec<NodeId> {
    doc.elements()
        .into_iter()
        .filter(|&el| doc.attr(el, OVERLAY_ATTR) == Some(role))
        .collect()
}
