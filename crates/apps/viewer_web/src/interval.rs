use std::rc::Rc;

use foundation::time::Millis;
use runtime::{Timer, TimerId};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::Window;

type TickCallback = Rc<dyn Fn(TimerId)>;

struct LiveInterval {
    id: TimerId,
    handle: i32,
    // Dropped only after `clearInterval`, so the browser never calls a freed closure.
    _callback: Closure<dyn FnMut()>,
}

/// `setInterval`-backed [`Timer`].
///
/// Each armed interval reports its own id to the tick callback, so a late tick
/// from a cancelled interval can be recognised and ignored.
pub struct IntervalTimer {
    window: Window,
    origin_ms: f64,
    next_id: u64,
    live: Vec<LiveInterval>,
    on_tick: Option<TickCallback>,
}

impl IntervalTimer {
    pub fn new(window: Window) -> Self {
        let origin_ms = now_ms(&window);
        Self {
            window,
            origin_ms,
            next_id: 0,
            live: Vec::new(),
            on_tick: None,
        }
    }

    /// Installs the tick callback. Only intervals armed afterwards use it.
    pub fn set_on_tick(&mut self, on_tick: impl Fn(TimerId) + 'static) {
        self.on_tick = Some(Rc::new(on_tick));
    }
}

impl Timer for IntervalTimer {
    fn arm(&mut self, period_ms: u32) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);

        let on_tick = self.on_tick.clone();
        let callback = Closure::wrap(Box::new(move || {
            if let Some(on_tick) = &on_tick {
                on_tick(id);
            }
        }) as Box<dyn FnMut()>);

        let timeout = i32::try_from(period_ms.max(1)).unwrap_or(i32::MAX);
        match self
            .window
            .set_interval_with_callback_and_timeout_and_arguments_0(
                callback.as_ref().unchecked_ref(),
                timeout,
            ) {
            Ok(handle) => self.live.push(LiveInterval {
                id,
                handle,
                _callback: callback,
            }),
            Err(err) => {
                web_sys::console::error_2(&JsValue::from_str("setInterval failed:"), &err);
            }
        }
        id
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(pos) = self.live.iter().position(|l| l.id == id) {
            let live = self.live.remove(pos);
            self.window.clear_interval_with_handle(live.handle);
        }
    }

    fn live_count(&self) -> usize {
        self.live.len()
    }

    fn now(&self) -> Millis {
        Millis((now_ms(&self.window) - self.origin_ms).max(0.0) as u64)
    }
}

impl Drop for IntervalTimer {
    fn drop(&mut self) {
        for live in self.live.drain(..) {
            self.window.clear_interval_with_handle(live.handle);
        }
    }
}

fn now_ms(window: &Window) -> f64 {
    window
        .performance()
        .map(|p| p.now())
        .unwrap_or_else(js_sys::Date::now)
}
