use anyhow::Result;
use log::info;
use rusted_input::engine::input::event::{EventPayload, PointerEvent};
use rusted_input::engine::input::layout::pointer;
use rusted_input::engine::input::profile::generic_hid_gamepad;
use rusted_input::engine::input::{
    default_gameplay_map, DeviceType, InputEvent, InputSettings, InputSystem, PlayerId, Timeline,
};
use rusted_input::engine::update_loop::UpdateClock;
use winit::keyboard::KeyCode;

/// Settings the demo runs with; anything missing keeps its default
const SETTINGS: &str = r#"
fixed_timestep = 0.016666666666666666
max_fixed_steps = 4
min_reinitialize_delay = 0.4
double_click_convention = "on_press"
"#;

/// Seconds of scripted input to simulate
const SESSION_LENGTH: f64 = 3.0;

/// Actions reported after every frame
const REPORTED: [&str; 5] = ["Move", "Jump", "Fire", "QuickSave", "Pause"];

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Starting Rusted Input demo...");

    let settings = InputSettings::from_toml_str(SETTINGS)?;
    let mut clock = UpdateClock::from_settings(&settings);
    let mut input = InputSystem::new(settings);
    input.register_profile(
        generic_hid_gamepad(),
        &["(?i)usb.*(joystick|gamepad)"],
        None,
        None,
    )?;

    let keyboard = input.add_device(DeviceType::Keyboard, "Keyboard");
    let mouse = input.add_device(DeviceType::Pointer, "Mouse");
    let pad = input.add_device(DeviceType::Gamepad, "USB Gamepad 0079:0006");

    let player = input.add_player();
    input.add_action_map(player, default_gameplay_map()?)?;

    let pointer_at = |x: f32, y: f32| PointerEvent {
        position: glam::Vec3::new(x, y, 0.0),
        pressure: 1.0,
        ..PointerEvent::default()
    };
    let script = vec![
        InputEvent::key(keyboard, 0.10, KeyCode::KeyD, true),
        InputEvent::key(keyboard, 0.20, KeyCode::Space, true),
        InputEvent::key(keyboard, 0.30, KeyCode::Space, false),
        InputEvent::key(keyboard, 0.35, KeyCode::KeyD, false),
        InputEvent::key(keyboard, 0.50, KeyCode::ControlLeft, true),
        InputEvent::key(keyboard, 0.55, KeyCode::KeyS, true),
        InputEvent::key(keyboard, 0.70, KeyCode::KeyS, false),
        InputEvent::key(keyboard, 0.72, KeyCode::ControlLeft, false),
        InputEvent::new(mouse, 0.80, EventPayload::PointerDown(pointer_at(40.0, 30.0))),
        InputEvent::click(mouse, 0.80, pointer::PRIMARY, true, 1),
        InputEvent::click(mouse, 0.85, pointer::PRIMARY, false, 1),
        InputEvent::click(mouse, 0.90, pointer::PRIMARY, true, 2),
        InputEvent::click(mouse, 0.95, pointer::PRIMARY, false, 2),
        // Raw HID reports: left stick hard left, south button, hat right
        InputEvent::control(pad, 1.50, 0, 0.0),
        InputEvent::control(pad, 1.60, 10, 1.0),
        InputEvent::control(pad, 1.70, 10, 0.0),
        InputEvent::control(pad, 1.80, 5, 2.0),
        InputEvent::control(pad, 1.90, 0, 32767.5),
    ];
    for event in script {
        input.queue_event(event);
    }

    let frame_time = 1.0 / 50.0;
    let mut capture_started = false;
    while clock.variable_time() < SESSION_LENGTH {
        input.run_frame(&mut clock, frame_time);
        report(&input, player, clock.variable_time())?;

        // At two seconds, add a Jump binding from whatever the next free device sends
        if !capture_started && clock.variable_time() >= 2.0 {
            capture_started = true;
            input.start_capture(clock.variable_time());
            input.queue_event(InputEvent::key(keyboard, 2.10, KeyCode::KeyE, true));
            input.queue_event(InputEvent::key(keyboard, 2.20, KeyCode::KeyE, false));
        }
        if input.capture().is_some_and(|capture| capture.is_complete()) {
            let reference = input.apply_capture(player, "Gameplay", "Jump", 1)?;
            info!(
                "Jump now also answers to {}",
                input.control_name(reference.hash).unwrap_or("an unnamed control")
            );
        }
    }

    info!(
        "Simulated {} frames and {} fixed updates",
        clock.frame_count(),
        clock.update_count()
    );
    if let Some(gameplay) = input.player(player)?.map("Gameplay") {
        if let Some(scheme) = gameplay.active_scheme() {
            info!("Final scheme '{}', bindings:\n{}", scheme.name, scheme.bindings_to_json()?);
        }
    }
    Ok(())
}

/// Log edges and analog values of the reported actions
fn report(input: &InputSystem, player: PlayerId, time: f64) -> Result<()> {
    let Some(gameplay) = input.player(player)?.map("Gameplay") else {
        return Ok(());
    };
    for action in REPORTED {
        let value = gameplay.action_value(action, Timeline::Variable)?;
        if action == "Move" {
            let movement = value.vector2();
            let previous = gameplay
                .previous_action_value(action, Timeline::Variable)?
                .vector2();
            if movement != previous {
                info!("t={:.2} Move -> ({:.2}, {:.2})", time, movement.x, movement.y);
            }
        } else if gameplay.was_just_pressed(action, Timeline::Variable)? {
            info!("t={:.2} {} pressed", time, action);
        } else if gameplay.was_just_released(action, Timeline::Variable)? {
            info!("t={:.2} {} released", time, action);
        }
    }
    Ok(())
}
