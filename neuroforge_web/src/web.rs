use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use neuroforge::camera::Viewport;
use neuroforge::config::Config;
use neuroforge::deps::Dependencies;
use neuroforge::interaction::Key;
use neuroforge::scene::Orchestrator;
use neuroforge::scheduler::Clock;
use neuroforge::surface::{DrawSurface, Paint, Rgba};

use crate::{key_modifiers, pointer_button, wheel_delta};

/// `performance.now()` as a [`Clock`].
struct PerformanceClock {
    performance: Option<web_sys::Performance>,
}

impl PerformanceClock {
    fn new() -> Self {
        Self {
            performance: web_sys::window().and_then(|w| w.performance()),
        }
    }
}

impl Clock for PerformanceClock {
    fn now(&self) -> Duration {
        let ms = self.performance.as_ref().map(|p| p.now()).unwrap_or(0.0);
        Duration::from_secs_f64(ms.max(0.0) / 1000.0)
    }
}

/// [`DrawSurface`] over a 2D canvas context.
struct CanvasSurface {
    ctx: web_sys::CanvasRenderingContext2d,
    canvas: web_sys::HtmlCanvasElement,
}

impl CanvasSurface {
    fn new(canvas: web_sys::HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("canvas: missing 2d context"))?
            .dyn_into::<web_sys::CanvasRenderingContext2d>()
            .map_err(|_| JsValue::from_str("canvas: context is not 2d"))?;
        Ok(Self { ctx, canvas })
    }
}

#[allow(deprecated)]
impl DrawSurface for CanvasSurface {
    fn size(&self) -> (f32, f32) {
        (self.canvas.width() as f32, self.canvas.height() as f32)
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba) {
        self.ctx.set_fill_style(&JsValue::from_str(&color.to_css()));
        self.ctx.fill_rect(x as f64, y as f64, w as f64, h as f64);
    }

    fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba, width: f32) {
        self.ctx.set_stroke_style(&JsValue::from_str(&color.to_css()));
        self.ctx.set_line_width(width as f64);
        self.ctx.stroke_rect(x as f64, y as f64, w as f64, h as f64);
    }

    fn begin_path(&mut self) {
        self.ctx.begin_path();
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.ctx.move_to(x as f64, y as f64);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.ctx.line_to(x as f64, y as f64);
    }

    fn arc(&mut self, x: f32, y: f32, radius: f32, start: f32, end: f32) {
        let _ = self
            .ctx
            .arc(x as f64, y as f64, radius.max(0.0) as f64, start as f64, end as f64);
    }

    fn close_path(&mut self) {
        self.ctx.close_path();
    }

    fn fill(&mut self, paint: &Paint) {
        match paint {
            Paint::Solid(c) => self.ctx.set_fill_style(&JsValue::from_str(&c.to_css())),
            Paint::Radial(g) => {
                let (x, y, r) = (g.x as f64, g.y as f64, g.radius.max(0.0) as f64);
                match self.ctx.create_radial_gradient(x, y, 0.0, x, y, r) {
                    Ok(gradient) => {
                        for (offset, color) in &g.stops {
                            let _ = gradient.add_color_stop(offset.clamp(0.0, 1.0), &color.to_css());
                        }
                        self.ctx.set_fill_style(&gradient);
                    }
                    // Non-finite geometry; fall back to the inner stop.
                    Err(_) => {
                        let c = g.stops.first().map(|s| s.1).unwrap_or(Rgba::rgba(0, 0, 0, 0.0));
                        self.ctx.set_fill_style(&JsValue::from_str(&c.to_css()));
                    }
                }
            }
        }
        self.ctx.fill();
    }

    fn stroke(&mut self, color: Rgba, width: f32) {
        self.ctx.set_stroke_style(&JsValue::from_str(&color.to_css()));
        self.ctx.set_line_width(width as f64);
        self.ctx.stroke();
    }

    fn set_clip(&mut self, rect: Option<Viewport>) {
        match rect {
            Some(r) => {
                self.ctx.save();
                self.ctx.begin_path();
                self.ctx.rect(r.x as f64, r.y as f64, r.width as f64, r.height as f64);
                self.ctx.clip();
            }
            None => self.ctx.restore(),
        }
    }
}

struct App {
    scene: Orchestrator<PerformanceClock>,
    surface: CanvasSurface,
    // Outstanding requestAnimationFrame handle.
    raf_id: Option<i32>,
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// Handle returned to JavaScript.
#[wasm_bindgen]
pub struct NeuroforgeApp {
    app: Rc<RefCell<App>>,
    on_frame: FrameCallback,
}

fn request_frame(cb: &FrameCallback) -> Option<i32> {
    let window = web_sys::window()?;
    let cb = cb.borrow();
    let f = cb.as_ref()?;
    window.request_animation_frame(f.as_ref().unchecked_ref()).ok()
}

#[wasm_bindgen]
impl NeuroforgeApp {
    pub fn start(&self) {
        let mut app = self.app.borrow_mut();
        if app.scene.start() {
            app.raf_id = request_frame(&self.on_frame);
        }
    }

    pub fn stop(&self) {
        let mut app = self.app.borrow_mut();
        if app.scene.stop() {
            if let (Some(id), Some(w)) = (app.raf_id.take(), web_sys::window()) {
                let _ = w.cancel_animation_frame(id);
            }
        }
    }

    pub fn set_modifier(&self, id: u16, active: bool) -> bool {
        self.app.borrow_mut().scene.set_modifier(id, active)
    }

    pub fn reset_camera(&self) {
        self.app.borrow_mut().scene.reset_camera();
    }

    pub fn generation(&self) -> u64 {
        self.app.borrow().scene.engine().generation()
    }

    pub fn best_fitness(&self) -> f32 {
        self.app.borrow().scene.engine().best().fitness
    }
}

fn listen<E, F>(target: &web_sys::EventTarget, name: &str, mut f: F) -> Result<(), JsValue>
where
    E: JsCast + 'static,
    F: FnMut(E) + 'static,
{
    let cb = Closure::wrap(Box::new(move |ev: web_sys::Event| {
        if let Ok(ev) = ev.dyn_into::<E>() {
            f(ev);
        }
    }) as Box<dyn FnMut(web_sys::Event)>);
    target.add_event_listener_with_callback(name, cb.as_ref().unchecked_ref())?;
    cb.forget();
    Ok(())
}

/// Attach to the canvas with id `canvas_id` and start the render loop.
#[wasm_bindgen]
pub fn start(canvas_id: &str) -> Result<NeuroforgeApp, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window.document().ok_or_else(|| JsValue::from_str("no document"))?;
    let canvas = document
        .get_element_by_id(canvas_id)
        .ok_or_else(|| JsValue::from_str("canvas not found"))?
        .dyn_into::<web_sys::HtmlCanvasElement>()
        .map_err(|_| JsValue::from_str("element is not a canvas"))?;

    let scene = Orchestrator::new(Config::default(), Dependencies::new(), PerformanceClock::new())
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    let app = Rc::new(RefCell::new(App {
        scene,
        surface: CanvasSurface::new(canvas.clone())?,
        raf_id: None,
    }));

    let on_frame: FrameCallback = Rc::new(RefCell::new(None));
    {
        let app = Rc::clone(&app);
        let next = Rc::clone(&on_frame);
        *on_frame.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            let mut a = app.borrow_mut();
            let App { scene, surface, raf_id } = &mut *a;
            *raf_id = None;
            // `None` means the loop was stopped; do not re-arm.
            if scene.frame(surface).is_some() {
                *raf_id = request_frame(&next);
            }
        }) as Box<dyn FnMut()>));
    }

    let target: &web_sys::EventTarget = canvas.as_ref();
    {
        let app = Rc::clone(&app);
        listen(target, "mousedown", move |ev: web_sys::MouseEvent| {
            let mods = key_modifiers(ev.shift_key(), ev.ctrl_key(), ev.alt_key());
            app.borrow_mut().scene.pointer_down(
                pointer_button(ev.button()),
                mods,
                ev.offset_x() as f32,
                ev.offset_y() as f32,
            );
        })?;
    }
    {
        let app = Rc::clone(&app);
        listen(target, "mousemove", move |ev: web_sys::MouseEvent| {
            app.borrow_mut()
                .scene
                .pointer_move(ev.offset_x() as f32, ev.offset_y() as f32);
        })?;
    }
    for name in ["mouseup", "mouseleave"] {
        let app = Rc::clone(&app);
        listen(target, name, move |_: web_sys::MouseEvent| {
            app.borrow_mut().scene.pointer_up();
        })?;
    }
    {
        let app = Rc::clone(&app);
        listen(target, "wheel", move |ev: web_sys::WheelEvent| {
            ev.prevent_default();
            app.borrow_mut().scene.wheel(wheel_delta(ev.delta_y(), ev.delta_mode()));
        })?;
    }
    listen(target, "contextmenu", |ev: web_sys::MouseEvent| ev.prevent_default())?;
    {
        let app = Rc::clone(&app);
        let doc_target: &web_sys::EventTarget = document.as_ref();
        listen(doc_target, "keydown", move |ev: web_sys::KeyboardEvent| {
            if let Some(key) = Key::from_dom(&ev.key()) {
                let mods = key_modifiers(ev.shift_key(), ev.ctrl_key(), ev.alt_key());
                app.borrow_mut().scene.key(key, mods);
            }
        })?;
    }

    let handle = NeuroforgeApp { app, on_frame };
    handle.start();
    tracing::info!("neuroforge attached to #{}", canvas_id);
    Ok(handle)
}
