use std::collections::HashMap;

use foundation::CameraPose;
use foundation::math::{MercatorProjector, lon_lat_to_tile, tile_nw_lon_lat, wrap_lon_deg};
use layers::raster::HeatmapRaster;
use session::BaseMap;
use wasm_bindgen::prelude::*;
use wasm_bindgen::{Clamped, JsCast};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement, ImageData};

const BASE_MAP_BACKGROUND: &str = "#fafaf8";
const MAX_TILE_ZOOM: u32 = 19;
const MAX_TILES_PER_DRAW: usize = 96;
const MAX_CACHED_TILES: usize = 512;

pub fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, JsValue> {
    canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(JsValue::from)
}

fn ctx_set_fill_style(ctx: &CanvasRenderingContext2d, value: &str) {
    let _ = js_sys::Reflect::set(
        ctx.as_ref(),
        &JsValue::from_str("fillStyle"),
        &JsValue::from_str(value),
    );
}

type TileKey = (u32, i64, i64);

/// Raster-tile base map drawn on its own canvas.
///
/// It has no controller; it only moves when [`BaseMap::jump_to`] is called.
pub struct CanvasBaseMap {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    tile_url_template: String,
    pose: CameraPose,
    tiles: HashMap<TileKey, HtmlImageElement>,
    on_tile_load: Option<Closure<dyn FnMut()>>,
}

impl CanvasBaseMap {
    pub fn new(
        canvas: HtmlCanvasElement,
        tile_url_template: impl Into<String>,
        pose: CameraPose,
    ) -> Result<Self, JsValue> {
        let ctx = context_2d(&canvas)?;
        Ok(Self {
            canvas,
            ctx,
            tile_url_template: tile_url_template.into(),
            pose,
            tiles: HashMap::new(),
            on_tile_load: None,
        })
    }

    /// Called whenever a tile image finishes loading; typically triggers `draw`.
    pub fn set_on_tile_load(&mut self, callback: Closure<dyn FnMut()>) {
        self.on_tile_load = Some(callback);
    }

    pub fn pose(&self) -> CameraPose {
        self.pose
    }

    fn tile_url(&self, z: u32, x: i64, y: i64) -> String {
        let wrapped_x = x.rem_euclid(1i64 << z);
        self.tile_url_template
            .replace("{z}", &z.to_string())
            .replace("{x}", &wrapped_x.to_string())
            .replace("{y}", &y.to_string())
    }

    fn tile_image(&mut self, key: TileKey) -> Result<HtmlImageElement, JsValue> {
        if let Some(img) = self.tiles.get(&key) {
            return Ok(img.clone());
        }
        if self.tiles.len() >= MAX_CACHED_TILES {
            self.tiles.clear();
        }
        let img = HtmlImageElement::new()?;
        img.set_cross_origin(Some("anonymous"));
        if let Some(cb) = &self.on_tile_load {
            img.set_onload(Some(cb.as_ref().unchecked_ref()));
        }
        let (z, x, y) = key;
        img.set_src(&self.tile_url(z, x, y));
        self.tiles.insert(key, img.clone());
        Ok(img)
    }

    pub fn draw(&mut self) -> Result<(), JsValue> {
        let w = f64::from(self.canvas.width()).max(1.0);
        let h = f64::from(self.canvas.height()).max(1.0);

        ctx_set_fill_style(&self.ctx, BASE_MAP_BACKGROUND);
        self.ctx.fill_rect(0.0, 0.0, w, h);

        // 256 px tiles: the pose's 512 px world at zoom `z` is tile zoom `z + 1`.
        let z = (self.pose.zoom + 1.0).round().clamp(0.0, f64::from(MAX_TILE_ZOOM)) as u32;

        // Visible extent from the rotated view, drawing happens unrotated.
        let rotated = MercatorProjector::new(self.pose, w, h);
        let upright = MercatorProjector::new(
            CameraPose {
                bearing: 0.0,
                ..self.pose
            },
            w,
            h,
        );

        let corners = [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)];
        let mut x_range = (i64::MAX, i64::MIN);
        let mut y_range = (i64::MAX, i64::MIN);
        for (cx, cy) in corners {
            let (lon, lat) = rotated.screen_to_lon_lat(cx, cy);
            // Keep corners on the same side of the antimeridian as the center.
            let lon = self.pose.longitude + wrap_lon_deg(lon - self.pose.longitude);
            let (tx, ty) = lon_lat_to_tile(lon, lat, z);
            x_range = (x_range.0.min(tx), x_range.1.max(tx));
            y_range = (y_range.0.min(ty), y_range.1.max(ty));
        }

        let bearing = self.pose.bearing.to_radians();
        self.ctx.save();
        self.ctx.translate(w * 0.5, h * 0.5)?;
        self.ctx.rotate(-bearing)?;
        self.ctx.translate(-w * 0.5, -h * 0.5)?;

        let mut drawn = 0usize;
        'tiles: for y in y_range.0..=y_range.1 {
            for x in x_range.0..=x_range.1 {
                if drawn >= MAX_TILES_PER_DRAW {
                    break 'tiles;
                }
                drawn += 1;
                let img = self.tile_image((z, x, y))?;
                if !img.complete() || img.natural_width() == 0 {
                    continue;
                }
                let (west, north) = tile_nw_lon_lat(z, x, y);
                let (east, south) = tile_nw_lon_lat(z, x + 1, y + 1);
                let (x0, y0) = upright.project_lon_lat(west, north);
                let (x1, y1) = upright.project_lon_lat(east, south);
                // Overdraw by half a pixel to hide seams.
                self.ctx.draw_image_with_html_image_element_and_dw_and_dh(
                    &img,
                    x0.floor(),
                    y0.floor(),
                    (x1 - x0).abs().ceil() + 0.5,
                    (y1 - y0).abs().ceil() + 0.5,
                )?;
            }
        }

        self.ctx.restore();
        Ok(())
    }
}

impl BaseMap for CanvasBaseMap {
    fn jump_to(&mut self, pose: CameraPose) {
        self.pose = pose;
        if let Err(err) = self.draw() {
            web_sys::console::error_2(&JsValue::from_str("base map draw failed:"), &err);
        }
    }
}

/// Canvas the heatmap raster is blitted onto.
pub struct OverlayCanvas {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl OverlayCanvas {
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = context_2d(&canvas)?;
        Ok(Self { canvas, ctx })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    pub fn size(&self) -> (f64, f64) {
        (
            f64::from(self.canvas.width()),
            f64::from(self.canvas.height()),
        )
    }

    pub fn draw(&self, raster: &HeatmapRaster) -> Result<(), JsValue> {
        let (w, h) = self.size();
        self.ctx.clear_rect(0.0, 0.0, w, h);
        if raster.width == 0 || raster.height == 0 {
            return Ok(());
        }
        let image = ImageData::new_with_u8_clamped_array_and_sh(
            Clamped(&raster.rgba),
            raster.width,
            raster.height,
        )?;
        self.ctx.put_image_data(&image, 0.0, 0.0)
    }
}
