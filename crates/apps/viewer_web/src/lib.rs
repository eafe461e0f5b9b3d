use console_error_panic_hook::set_once;
use gloo_net::http::Request;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Event, HtmlCanvasElement, HtmlElement, MouseEvent, WheelEvent};

use formats::{ViewerConfig, parse_points, validate_points};
use foundation::CameraPose;
use layers::symbology::HeatmapStyle;
use session::{RenderSession, SessionHandle, ViewSync};
use timeline::{Frame, TimelinePlayer};

mod canvas;
mod controls;
mod interval;

use canvas::{CanvasBaseMap, OverlayCanvas};
use controls::ControlStrip;
use interval::IntervalTimer;

const DEFAULT_WIDTH_PX: u32 = 1280;
const DEFAULT_HEIGHT_PX: u32 = 720;
const WHEEL_ZOOM_PER_PIXEL: f64 = 0.002;

type Player = TimelinePlayer<IntervalTimer, SessionHandle>;

/// Everything one mounted viewer owns. Callbacks hold `Weak` references.
struct Viewer {
    player: RefCell<Player>,
    session: SessionHandle,
    sync: RefCell<ViewSync<CanvasBaseMap>>,
    overlay: OverlayCanvas,
    controls: ControlStrip,
    drag_from: Cell<Option<(f64, f64)>>,
}

thread_local! {
    static VIEWER: RefCell<Option<Rc<Viewer>>> = const { RefCell::new(None) };
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    Ok(())
}

/// Mounts the viewer into the element with id `container_id`.
///
/// Loads the optional JSON config, then the dataset, then builds the map,
/// overlay and timeline controls. Failures are logged and shown in the
/// container.
#[wasm_bindgen]
pub fn mount_viewer(container_id: String, config_url: Option<String>) {
    spawn_local(async move {
        if let Err(err) = mount_viewer_inner(&container_id, config_url.as_deref()).await {
            web_sys::console::error_2(&JsValue::from_str("viewer failed to load:"), &err);
            show_status(&container_id, &format!("Failed to load: {}", js_error_text(&err)));
        }
    });
}

/// Current frame label, for host pages and smoke tests.
#[wasm_bindgen]
pub fn current_frame() -> Option<String> {
    VIEWER.with(|v| {
        v.borrow()
            .as_ref()
            .map(|viewer| viewer.player.borrow().state().current_frame.label().to_string())
    })
}

async fn mount_viewer_inner(container_id: &str, config_url: Option<&str>) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let doc = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let container: HtmlElement = doc
        .get_element_by_id(container_id)
        .ok_or_else(|| JsValue::from_str(&format!("missing container #{container_id}")))?
        .unchecked_into();

    let config = match config_url {
        Some(url) => ViewerConfig::from_json_str(&fetch_text(url).await?)
            .map_err(|e| JsValue::from_str(&e.to_string()))?,
        None => ViewerConfig::default(),
    };

    show_status(container_id, "Loading data…");
    let records = parse_points(&fetch_text(&config.data_url).await?)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    let report = validate_points(records);
    if !report.rejected.is_empty() {
        let msg = format!("dropped {} invalid records", report.rejected.len());
        web_sys::console::warn_1(&JsValue::from_str(&msg));
    }
    container.set_text_content(None);

    let (width, height) = container_size(&container);
    let stage = create_stage(&doc, &container, width, height)?;
    let base_canvas = create_canvas(&doc, &stage, "heatmap-base", width, height)?;
    let overlay_canvas = create_canvas(&doc, &stage, "heatmap-overlay", width, height)?;

    let pose = config.initial_pose();
    let session = SessionHandle::new(RenderSession::new(
        pose,
        f64::from(width),
        f64::from(height),
    ));
    let base_map = CanvasBaseMap::new(base_canvas, config.tile_url_template.clone(), pose)?;

    let player = TimelinePlayer::new(
        report.valid,
        &config.playback,
        HeatmapStyle::from(config.heatmap),
        IntervalTimer::new(window),
        session.clone(),
    )
    .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let controls = ControlStrip::build(&doc, &container, &player.controls())?;

    let viewer = Rc::new(Viewer {
        player: RefCell::new(player),
        session,
        sync: RefCell::new(ViewSync::new(base_map)),
        overlay: OverlayCanvas::new(overlay_canvas)?,
        controls,
        drag_from: Cell::new(None),
    });

    wire_timer(&viewer);
    wire_tile_loads(&viewer);
    wire_controls(&viewer)?;
    wire_camera(&viewer)?;

    viewer.sync.borrow_mut().on_view_state_change(pose);
    viewer.refresh();

    VIEWER.with(|v| *v.borrow_mut() = Some(viewer));
    Ok(())
}

impl Viewer {
    /// Re-renders controls and, if anything changed, the overlay.
    fn refresh(&self) {
        let model = self.player.borrow().controls();
        if let Err(err) = self.controls.apply(&model) {
            web_sys::console::error_2(&JsValue::from_str("controls update failed:"), &err);
        }
        let raster = self
            .session
            .with_mut(|s| if s.is_dirty() { s.render() } else { None });
        if let Some(raster) = raster
            && let Err(err) = self.overlay.draw(&raster)
        {
            web_sys::console::error_2(&JsValue::from_str("overlay draw failed:"), &err);
        }
    }

    /// Overlay camera change: store it, mirror it, redraw.
    fn apply_pose(&self, pose: CameraPose) {
        let applied = self.session.with_mut(|s| s.set_view_state(pose));
        self.sync.borrow_mut().on_view_state_change(applied);
        self.refresh();
    }
}

fn wire_timer(viewer: &Rc<Viewer>) {
    let weak = Rc::downgrade(viewer);
    viewer
        .player
        .borrow_mut()
        .timer_mut()
        .set_on_tick(move |id| {
            if let Some(viewer) = weak.upgrade() {
                viewer.player.borrow_mut().on_tick(id);
                viewer.refresh();
            }
        });
}

fn wire_tile_loads(viewer: &Rc<Viewer>) {
    let weak = Rc::downgrade(viewer);
    let on_load = Closure::wrap(Box::new(move || {
        if let Some(viewer) = weak.upgrade()
            && let Ok(mut sync) = viewer.sync.try_borrow_mut()
            && let Err(err) = sync.base_map_mut().draw()
        {
            web_sys::console::error_2(&JsValue::from_str("base map draw failed:"), &err);
        }
    }) as Box<dyn FnMut()>);
    viewer.sync.borrow_mut().base_map_mut().set_on_tile_load(on_load);
}

fn on_click(
    target: &web_sys::EventTarget,
    viewer: &Rc<Viewer>,
    action: impl Fn(&mut Player) + 'static,
) -> Result<(), JsValue> {
    let weak: Weak<Viewer> = Rc::downgrade(viewer);
    let cb = Closure::wrap(Box::new(move |_event: Event| {
        if let Some(viewer) = weak.upgrade() {
            action(&mut viewer.player.borrow_mut());
            viewer.refresh();
        }
    }) as Box<dyn FnMut(_)>);
    target.add_event_listener_with_callback("click", cb.as_ref().unchecked_ref())?;
    cb.forget();
    Ok(())
}

fn wire_controls(viewer: &Rc<Viewer>) -> Result<(), JsValue> {
    on_click(&viewer.controls.play, viewer, |p| p.toggle_play())?;

    for (frame, el) in &viewer.controls.markers {
        let frame: Frame = *frame;
        on_click(el, viewer, move |p| p.select_frame(frame))?;
    }

    for (period_ms, el) in &viewer.controls.speeds {
        let period_ms = *period_ms;
        on_click(el, viewer, move |p| {
            if let Err(err) = p.select_speed(period_ms) {
                web_sys::console::warn_1(&JsValue::from_str(&err.to_string()));
            }
        })?;
    }
    Ok(())
}

fn wire_camera(viewer: &Rc<Viewer>) -> Result<(), JsValue> {
    let canvas = viewer.overlay.canvas().clone();

    let weak = Rc::downgrade(viewer);
    let down = Closure::wrap(Box::new(move |e: MouseEvent| {
        if let Some(viewer) = weak.upgrade() {
            viewer
                .drag_from
                .set(Some((f64::from(e.offset_x()), f64::from(e.offset_y()))));
        }
    }) as Box<dyn FnMut(_)>);
    canvas.add_event_listener_with_callback("mousedown", down.as_ref().unchecked_ref())?;
    down.forget();

    let weak = Rc::downgrade(viewer);
    let drag = Closure::wrap(Box::new(move |e: MouseEvent| {
        let Some(viewer) = weak.upgrade() else {
            return;
        };
        let Some((x0, y0)) = viewer.drag_from.get() else {
            return;
        };
        let (x1, y1) = (f64::from(e.offset_x()), f64::from(e.offset_y()));
        viewer.drag_from.set(Some((x1, y1)));
        let (projector, pose) = viewer.session.with(|s| (s.projector(), s.pose()));
        viewer.apply_pose(projector.pan(pose, x1 - x0, y1 - y0));
    }) as Box<dyn FnMut(_)>);
    canvas.add_event_listener_with_callback("mousemove", drag.as_ref().unchecked_ref())?;
    drag.forget();

    for event in ["mouseup", "mouseleave"] {
        let weak = Rc::downgrade(viewer);
        let end = Closure::wrap(Box::new(move |_e: MouseEvent| {
            if let Some(viewer) = weak.upgrade() {
                viewer.drag_from.set(None);
            }
        }) as Box<dyn FnMut(_)>);
        canvas.add_event_listener_with_callback(event, end.as_ref().unchecked_ref())?;
        end.forget();
    }

    let weak = Rc::downgrade(viewer);
    let wheel = Closure::wrap(Box::new(move |e: WheelEvent| {
        e.prevent_default();
        if let Some(viewer) = weak.upgrade() {
            let pose = viewer.session.with(|s| s.pose());
            viewer.apply_pose(pose.with_zoom_delta(-e.delta_y() * WHEEL_ZOOM_PER_PIXEL));
        }
    }) as Box<dyn FnMut(_)>);
    canvas.add_event_listener_with_callback("wheel", wheel.as_ref().unchecked_ref())?;
    wheel.forget();

    Ok(())
}

fn container_size(container: &HtmlElement) -> (u32, u32) {
    let w = container.client_width();
    let h = container.client_height();
    let w = if w > 0 { w as u32 } else { DEFAULT_WIDTH_PX };
    let h = if h > 0 { h as u32 } else { DEFAULT_HEIGHT_PX };
    (w, h)
}

fn create_stage(
    doc: &Document,
    container: &HtmlElement,
    width: u32,
    height: u32,
) -> Result<HtmlElement, JsValue> {
    let stage: HtmlElement = doc.create_element("div")?.unchecked_into();
    stage.set_class_name("heatmap-stage");
    stage.set_attribute(
        "style",
        &format!("position: relative; width: {width}px; height: {height}px;"),
    )?;
    container.append_child(&stage)?;
    Ok(stage)
}

fn create_canvas(
    doc: &Document,
    stage: &HtmlElement,
    id: &str,
    width: u32,
    height: u32,
) -> Result<HtmlCanvasElement, JsValue> {
    let canvas: HtmlCanvasElement = doc.create_element("canvas")?.unchecked_into();
    canvas.set_id(id);
    canvas.set_width(width);
    canvas.set_height(height);
    canvas.set_attribute("style", "position: absolute; left: 0; top: 0;")?;
    stage.append_child(&canvas)?;
    Ok(canvas)
}

fn show_status(container_id: &str, message: &str) {
    let Some(el) = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id(container_id))
    else {
        return;
    };
    el.set_text_content(Some(message));
}

fn js_error_text(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

async fn fetch_text(url: &str) -> Result<String, JsValue> {
    let resp = Request::get(url)
        .send()
        .await
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    if !resp.ok() {
        return Err(JsValue::from_str(&format!(
            "GET {url} returned {}",
            resp.status()
        )));
    }
    resp.text()
        .await
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
