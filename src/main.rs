//! Soul Maze entry point
//!
//! Handles platform-specific initialization and runs the battle loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{
        CanvasRenderingContext2d, Document, HtmlCanvasElement, KeyboardEvent, MouseEvent,
    };

    use soul_maze::consts::{ARENA_HEIGHT, ARENA_WIDTH, PLAYER_SIZE};
    use soul_maze::session::{Session, SessionPhase};
    use soul_maze::sim::{Action, BattleState, BattleView, HeldKeys, MARKER_WIDTH, TRACK_WIDTH};
    use soul_maze::Tuning;

    /// Longest frame the simulation catches up on after a stall (ms)
    const MAX_FRAME_MS: f64 = 100.0;

    /// Menu buttons and the command each one sends
    const BUTTONS: [(&str, Action); 9] = [
        ("btn-fight", Action::Attack),
        ("btn-act", Action::Act),
        ("btn-mercy", Action::Mercy),
        ("btn-check", Action::Check),
        ("btn-talk", Action::Talk),
        ("btn-spare", Action::Spare),
        ("btn-flee", Action::Flee),
        ("btn-back", Action::Back),
        ("btn-mercy-back", Action::Back),
    ];

    /// Game instance holding all state
    struct Game {
        session: Session,
        keys: HeldKeys,
        ctx: CanvasRenderingContext2d,
        scale: f64,
        last_time: f64,
        /// Sub-millisecond remainder carried between frames
        carry: f64,
    }

    impl Game {
        fn new(session: Session, ctx: CanvasRenderingContext2d, scale: f64) -> Self {
            Self {
                session,
                keys: HeldKeys::default(),
                ctx,
                scale,
                last_time: 0.0,
                carry: 0.0,
            }
        }

        /// Advance the session by the real time since the last frame
        fn update(&mut self, time: f64) {
            let dt = if self.last_time > 0.0 {
                (time - self.last_time).min(MAX_FRAME_MS)
            } else {
                0.0
            };
            self.last_time = time;

            self.carry += dt;
            let whole = self.carry.floor();
            self.carry -= whole;
            self.session.update(whole as u64, self.keys.movement());
        }

        /// Space/Enter: stop the gauge, or move the session along outside battle
        fn confirm(&mut self) {
            match self.session.phase() {
                SessionPhase::Battle => {
                    if let Err(e) = self.session.perform(Action::Confirm) {
                        log::debug!("confirm ignored: {}", e);
                    }
                }
                SessionPhase::Exploring => {
                    self.session.encounter_next();
                }
                SessionPhase::GameOver => self.session.restart(),
                SessionPhase::Cleared => {}
            }
        }

        fn render(&self) {
            let ctx = &self.ctx;
            let s = self.scale;
            ctx.set_fill_style_str("#000");
            ctx.fill_rect(0.0, 0.0, ARENA_WIDTH as f64 * s, ARENA_HEIGHT as f64 * s);

            let Some(view) = self.session.snapshot() else {
                return;
            };
            match view.state {
                BattleState::EnemyTurn => self.draw_arena(&view),
                BattleState::PlayerAttack => self.draw_gauge(&view),
                _ => {}
            }

            ctx.set_stroke_style_str("#fff");
            ctx.set_line_width(2.0);
            ctx.stroke_rect(1.0, 1.0, ARENA_WIDTH as f64 * s - 2.0, ARENA_HEIGHT as f64 * s - 2.0);
        }

        fn draw_arena(&self, view: &BattleView) {
            let ctx = &self.ctx;
            let s = self.scale;

            ctx.set_fill_style_str("#fff");
            for p in &view.projectiles {
                let size = p.size as f64 * s;
                match p.rotation {
                    Some(angle) => {
                        let half = size / 2.0;
                        ctx.save();
                        let _ = ctx.translate(p.x as f64 * s + half, p.y as f64 * s + half);
                        let _ = ctx.rotate(angle as f64);
                        ctx.fill_rect(-half, -half, size, size);
                        ctx.restore();
                    }
                    None => ctx.fill_rect(p.x as f64 * s, p.y as f64 * s, size, size),
                }
            }

            if let Some(soul) = &view.soul {
                // Blink while invincible
                let visible = !soul.invincible || (self.last_time / 100.0) as u64 % 2 == 0;
                if visible {
                    ctx.set_fill_style_str("#e11");
                    let size = PLAYER_SIZE as f64 * s;
                    ctx.fill_rect(soul.x as f64 * s, soul.y as f64 * s, size, size);
                }
            }
        }

        fn draw_gauge(&self, view: &BattleView) {
            let ctx = &self.ctx;
            let width = ARENA_WIDTH as f64 * self.scale;
            let k = width / TRACK_WIDTH as f64;
            let top = ARENA_HEIGHT as f64 * self.scale / 2.0 - 10.0;

            ctx.set_fill_style_str("#333");
            ctx.fill_rect(0.0, top, width, 20.0);
            // Critical zone
            ctx.set_fill_style_str("#f90");
            ctx.fill_rect(width * 0.45, top, width * 0.1, 20.0);

            if let Some(marker) = view.marker {
                ctx.set_fill_style_str("#fe0");
                ctx.fill_rect(marker as f64 * k, top, MARKER_WIDTH as f64 * k, 20.0);
            }
        }

        /// Sync the DOM text, meters and menus
        fn update_hud(&self, document: &Document) {
            let set_text = |id: &str, text: &str| {
                if let Some(el) = document.get_element_by_id(id) {
                    el.set_text_content(Some(text));
                }
            };
            let show = |id: &str, visible: bool| {
                if let Some(el) = document.get_element_by_id(id) {
                    el.set_class_name(if visible { "" } else { "hidden" });
                }
            };

            let player = self.session.player();
            set_text("player-hp", &format!("HP {} / {}", player.hp, player.max_hp));

            let view = self.session.snapshot();
            let state = view.as_ref().map(|v| v.state);
            show("menu-main", state == Some(BattleState::Choosing));
            show("menu-act", state == Some(BattleState::ChoosingAct));
            show("menu-mercy", state == Some(BattleState::Mercy));

            match view {
                Some(view) => {
                    set_text("enemy-name", &view.enemy_name);
                    set_text("enemy-hp", &format!("{} / {}", view.enemy_hp, view.enemy_max_hp));
                    set_text("dialogue", &view.dialogue);
                    if let Some(btn) = document.get_element_by_id("btn-spare") {
                        btn.set_class_name(if view.can_spare { "spareable" } else { "" });
                    }
                    if let Some(el) = document.get_element_by_id("enemy") {
                        el.set_class_name(if view.enemy_hit { "hit" } else { "" });
                    }
                }
                None => {
                    set_text("enemy-name", "");
                    set_text("enemy-hp", "");
                    let line = match self.session.phase() {
                        SessionPhase::Exploring => match self.session.next_enemy() {
                            Some(enemy) => {
                                format!("* Something stirs ahead: {}. Press Enter.", enemy.name)
                            }
                            None => String::new(),
                        },
                        SessionPhase::Cleared => "* The maze is quiet. Happy birthday.".to_string(),
                        SessionPhase::GameOver => {
                            "* Your soul shatters. Press Enter to try again.".to_string()
                        }
                        SessionPhase::Battle => String::new(),
                    };
                    set_text("dialogue", &line);
                }
            }
        }
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::error_1(&format!("logger init failed: {e}").into());
        }

        log::info!("Soul Maze starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("arena")
            .ok_or("no arena canvas")?
            .dyn_into()?;

        // Square canvas at device resolution
        let dpr = window.device_pixel_ratio();
        let side = (canvas.client_width().max(1) as f64 * dpr) as u32;
        canvas.set_width(side);
        canvas.set_height(side);
        let scale = side as f64 / ARENA_WIDTH as f64;

        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or("no 2d context")?
            .dyn_into()?;

        let seed = js_sys::Date::now() as u64;
        let session = Session::with_builtin_roster(Tuning::load(), seed);
        let game = Rc::new(RefCell::new(Game::new(session, ctx, scale)));
        log::info!("Session initialized with seed: {}", seed);

        setup_input_handlers(&window, game.clone())?;
        setup_menu_buttons(&document, game.clone())?;

        if let Some(loading) = document.get_element_by_id("loading") {
            loading.set_class_name("hidden");
        }

        request_animation_frame(game);
        log::info!("Soul Maze running!");
        Ok(())
    }

    fn setup_input_handlers(
        window: &web_sys::Window,
        game: Rc<RefCell<Game>>,
    ) -> Result<(), JsValue> {
        // Key down: movement keys are held, confirm keys fire once
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let key = event.key();
                let mut g = game.borrow_mut();
                match key.as_str() {
                    " " | "Enter" => {
                        event.prevent_default();
                        if !event.repeat() {
                            g.confirm();
                        }
                    }
                    _ => {
                        if soul_maze::sim::Direction::from_key(&key).is_some() {
                            event.prevent_default();
                        }
                        g.keys.press(&key);
                    }
                }
            });
            window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        // Key up
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                game.borrow_mut().keys.release(&event.key());
            });
            window.add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        // Window blur drops held keys so the soul does not drift
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                game.borrow_mut().keys.clear();
            });
            window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        Ok(())
    }

    fn setup_menu_buttons(document: &Document, game: Rc<RefCell<Game>>) -> Result<(), JsValue> {
        for (id, action) in BUTTONS {
            let Some(btn) = document.get_element_by_id(id) else {
                log::warn!("menu button #{} missing", id);
                continue;
            };
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                if let Err(e) = game.borrow_mut().session.perform(action) {
                    log::warn!("{}", e);
                }
            });
            btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        if let Some(btn) = document.get_element_by_id("btn-strike") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                game.borrow_mut().confirm();
            });
            btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }
        Ok(())
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();
            g.update(time);
            g.render();
            if let Some(document) = web_sys::window().and_then(|w| w.document()) {
                g.update_hud(&document);
            }
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_game::run()
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Soul Maze (native) starting...");
    log::info!("The playable version is the wasm build; running a scripted session instead");

    let report = scripted::run(soul_maze::Tuning::load(), 42);
    println!("\n{report}");
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Headless playthrough over the built-in roster
#[cfg(not(target_arch = "wasm32"))]
mod scripted {
    use soul_maze::session::{Session, SessionPhase};
    use soul_maze::sim::{Action, MovementInput};
    use soul_maze::Tuning;

    /// One frame at 60 fps, rounded
    const FRAME_MS: u64 = 16;

    fn wait(session: &mut Session, ms: u64) {
        let mut left = ms;
        while left > 0 && session.phase() == SessionPhase::Battle {
            let step = left.min(FRAME_MS);
            session.update(step, MovementInput::default());
            left -= step;
        }
    }

    fn act(session: &mut Session, action: Action) {
        if let Err(e) = session.perform(action) {
            log::warn!("{:?}: {}", action, e);
        }
    }

    pub fn run(tuning: Tuning, seed: u64) -> String {
        let mut session = Session::with_builtin_roster(tuning, seed);
        let mut lines = Vec::new();

        while session.encounter_next() {
            let Some(battle) = session.battle() else {
                break;
            };
            let name = battle.enemy().name.clone();
            // Fight the first enemy, befriend the rest
            let fight = lines.is_empty();

            if fight {
                // Timed perfectly: the marker crosses the center 500 ms in
                act(&mut session, Action::Attack);
                wait(&mut session, 500);
                act(&mut session, Action::Confirm);
                wait(&mut session, 3000);
            } else {
                act(&mut session, Action::Act);
                act(&mut session, Action::Talk);
                wait(&mut session, 4000);
                wait(&mut session, 8000);
                act(&mut session, Action::Mercy);
                act(&mut session, Action::Spare);
                wait(&mut session, 2000);
            }

            let hp = session.player().hp;
            match session.phase() {
                SessionPhase::GameOver => {
                    lines.push(format!("{name}: the soul shattered"));
                    break;
                }
                _ if fight => lines.push(format!("{name}: defeated (hp restored to {hp})")),
                _ => lines.push(format!("{name}: spared (hp restored to {hp})")),
            }
        }

        if session.phase() == SessionPhase::Cleared {
            lines.push("every memory is at peace".to_string());
        }
        lines.join("\n")
    }
}
