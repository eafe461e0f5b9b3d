use timeline::{ControlsModel, Frame};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlButtonElement, HtmlElement};

const ACTIVE_CLASS: &str = "active";

/// DOM elements of the timeline control strip.
pub struct ControlStrip {
    pub play: HtmlButtonElement,
    pub markers: Vec<(Frame, HtmlElement)>,
    pub speeds: Vec<(u32, HtmlButtonElement)>,
}

fn element(doc: &Document, tag: &str) -> Result<HtmlElement, JsValue> {
    Ok(doc.create_element(tag)?.unchecked_into())
}

fn button(doc: &Document, class: &str, label: &str) -> Result<HtmlButtonElement, JsValue> {
    let b: HtmlButtonElement = doc.create_element("button")?.unchecked_into();
    b.set_type("button");
    b.set_class_name(class);
    b.set_text_content(Some(label));
    Ok(b)
}

impl ControlStrip {
    /// Builds play toggle, frame markers and speed buttons under `host`.
    pub fn build(doc: &Document, host: &HtmlElement, model: &ControlsModel) -> Result<Self, JsValue> {
        let strip = element(doc, "div")?;
        strip.set_class_name("timeline-controls");

        let play = button(doc, "timeline-play", model.play_label)?;
        strip.append_child(&play)?;

        let track = element(doc, "div")?;
        track.set_class_name("timeline-track");
        let mut markers = Vec::with_capacity(model.frames.len());
        for marker in &model.frames {
            let el = element(doc, "span")?;
            el.set_class_name("timeline-marker");
            el.set_text_content(Some(marker.label));
            el.set_attribute("data-frame", marker.label)?;
            track.append_child(&el)?;
            markers.push((marker.frame, el));
        }
        strip.append_child(&track)?;

        let speed_group = element(doc, "div")?;
        speed_group.set_class_name("timeline-speeds");
        let mut speeds = Vec::with_capacity(model.speeds.len());
        for speed in &model.speeds {
            let b = button(doc, "timeline-speed", &speed.label)?;
            speed_group.append_child(&b)?;
            speeds.push((speed.period_ms, b));
        }
        strip.append_child(&speed_group)?;

        host.append_child(&strip)?;

        let controls = Self {
            play,
            markers,
            speeds,
        };
        controls.apply(model)?;
        Ok(controls)
    }

    /// Brings labels and active markers in line with `model`.
    pub fn apply(&self, model: &ControlsModel) -> Result<(), JsValue> {
        self.play.set_text_content(Some(model.play_label));
        for (frame, el) in &self.markers {
            let active = model.active_frame() == Some(*frame);
            el.class_list().toggle_with_force(ACTIVE_CLASS, active)?;
        }
        for ((_, el), speed) in self.speeds.iter().zip(&model.speeds) {
            el.class_list()
                .toggle_with_force(ACTIVE_CLASS, speed.active)?;
        }
        Ok(())
    }
}
