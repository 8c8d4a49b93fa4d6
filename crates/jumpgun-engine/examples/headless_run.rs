//! Headless session -- clicks through the menus, plays a few seconds of
//! level 1 with scripted input, and prints what happened.
//!
//! Run with:
//!   cargo run --example headless_run -p jumpgun-engine [-- config.json]
//!
//! Set `RUST_LOG=jumpgun_engine=debug` to watch the lifecycle.

use anyhow::Context;

use jumpgun_engine::logging;
use jumpgun_engine::prelude::*;

const DT: f32 = 1.0 / 60.0;

struct Driver {
    game: Game,
    input: ScriptedInput,
    audio: RecordingAudio,
    surface: RecordingSurface,
}

impl Driver {
    fn run(&mut self, frames: usize) -> anyhow::Result<()> {
        for _ in 0..frames {
            self.surface.clear();
            let report = self.game.frame(DT, &mut self.surface)?;
            if let Some(level) = report.level_ready {
                println!("level {level} ready");
            }
            if let Some(err) = report.level_error {
                println!("level generation failed: {err}");
            }
        }
        Ok(())
    }

    /// Press and release the mouse over a button's slot.
    fn click(&mut self, kind: ButtonKind) -> anyhow::Result<()> {
        let centre = kind.slot() + Vec2::new(20.0, 20.0);
        self.input.move_mouse(centre);
        self.input.set_mouse_button(MouseButtonState::Pressed);
        self.run(1)?;
        self.input.set_mouse_button(MouseButtonState::Released);
        self.run(2)
    }

    fn hold(&mut self, key: Key, frames: usize) -> anyhow::Result<()> {
        self.input.press(key);
        self.run(frames)?;
        self.input.release(key);
        self.run(1)
    }
}

fn main() -> Result<(), anyhow::Error> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            GameConfig::from_json(&text).with_context(|| format!("parsing {path}"))?
        }
        None => GameConfig::default(),
    };
    logging::init(&config.debug.log_filter);

    let input = ScriptedInput::new();
    let audio = RecordingAudio::new();
    let services = Services::headless(input.clone(), audio.clone());
    let mut driver = Driver {
        game: Game::new(config, services)?,
        input,
        audio,
        surface: RecordingSurface::new(),
    };

    driver.run(2)?;
    driver.click(ButtonKind::Start)?;
    driver.click(ButtonKind::Character1)?;
    println!("mode after menus: {:?}", driver.game.mode());

    // Let the level arrive and the player land.
    driver.run(120)?;
    driver.hold(Key::D, 90)?;
    driver.hold(Key::Space, 1)?;
    driver.hold(Key::E, 1)?;
    driver.run(120)?;

    let core = driver.game.core();
    println!("frames run:      {}", driver.game.frames());
    println!("level:           {}", core.level.level());
    println!("live entities:   {}", core.scene.live_count());
    println!("enemies alive:   {}", core.scene.count_tag("enemy"));
    if let Some(layout) = core.level.layout() {
        println!("layout:          {}", layout.fingerprint());
    }
    if let Some(player) = core.player().and_then(|id| core.scene.component::<Player>(id)) {
        println!("player health:   {}", player.health());
    }
    println!("draw calls:      {}", driver.surface.calls.len());
    println!("sounds played:   {}", driver.audio.played().len());
    Ok(())
}
