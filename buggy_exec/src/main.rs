//! Main vehicle-side executable entry point.
//!
//! # Architecture
//!
//! The exec runs a single event pump:
//!
//!     - Initialise the session, logger and parameters
//!     - Build the hardware registry (simulated or real per features)
//!     - Main loop:
//!         - Drain pending operator events from the channel or script
//!         - Handle fail-safe latency reports ahead of everything else
//!         - Dispatch ordinary events in arrival order to the coordinator
//!         - Flush pending telemetry to the channel
//!         - Sleep the cycle remainder
//!
//! Frame streaming runs on its own thread inside the stream worker, the
//! pump and the worker only share the pause/run flags and the telemetry
//! queue.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use buggy_lib::{
    actuator::{HardwareHandles, HardwareRegistry},
    input_map,
    params::ExecParams,
    session_mgr::SessionCoordinator
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::{eyre, WrapErr}, Report};
use log::{debug, info, trace, warn};
use std::env;
use std::sync::mpsc::channel;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use comms_if::{
    channel::{ChannelError, ClientEvent, MessageChannel},
    msg::{OperatorMsg, TelemetryMsg},
    net::JsonLinesChannel
};
use util::{
    logger::{logger_init, LevelFilter},
    raise_error,
    script_interpreter::{PendingMsgs, ScriptInterpreter},
    session::Session
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one event pump cycle.
///
/// Units: seconds. Short enough that command-to-actuation latency stays well
/// below the operator's sync interval.
const CYCLE_PERIOD_S: f64 = 0.02;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "buggy_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Buggy Control Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: ExecParams = util::params::load(
        "buggy_exec.toml"
    ).wrap_err("Could not load exec params")?;

    let map_params: input_map::Params = util::params::load(
        "input_map.toml"
    ).wrap_err("Could not load input mapping params")?;

    info!("Parameters loaded");

    // ---- INITIALISE EVENT SOURCE ----

    // The event source determines whether operator messages come from a
    // timed script (bench runs) or from a connected operator station.
    let mut event_source = EventSource::None;

    // Collect all arguments
    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    // If we have a single argument use it as the script path
    if args.len() == 2 {
        info!("Loading script from \"{}\"", &args[1]);

        let si = ScriptInterpreter::new(
            &args[1]).wrap_err("Failed to load script")?;

        info!(
            "Loaded script lasts {:.02} s and contains {} messages\n",
            si.get_duration(),
            si.get_num_msgs()
        );

        event_source = EventSource::Script(si);
    }
    // If no arguments bind the operator channel
    else if args.len() == 1 {
        let channel = JsonLinesChannel::bind(&exec_params.channel_endpoint)
            .wrap_err("Failed to bind the operator channel")?;

        info!("Waiting for an operator on {}\n", exec_params.channel_endpoint);

        event_source = EventSource::Channel(Box::new(channel));
    }
    else {
        return Err(eyre!(
            "Expected either zero or one argument, found {}", args.len() - 1)
        );
    }

    // ---- INITIALISE HARDWARE ----

    let mut registry = build_hardware_registry(&exec_params)
        .wrap_err("Failed to initialise the hardware")?;

    info!("Hardware registry initialised");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let (telem_tx, telem_rx) = channel::<TelemetryMsg>();

    let mut coordinator: Option<SessionCoordinator> = None;

    // Script runs have no transport handshake, synthesise the connect
    let mut pending_connect = matches!(event_source, EventSource::Script(_));

    loop {

        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // ---- GATHER EVENTS ----

        let mut events: Vec<ClientEvent> = Vec::new();
        let mut end_of_script = false;

        if pending_connect {
            events.push(ClientEvent::Connected);
            pending_connect = false;
        }

        match event_source {
            EventSource::None => raise_error!("No event source present"),

            EventSource::Channel(ref mut channel) => {
                while let Some(event) = channel.poll_event() {
                    events.push(event);
                }
            },

            EventSource::Script(ref mut si) => match si.get_pending_msgs() {
                PendingMsgs::None => (),
                PendingMsgs::Some(msgs) => events.extend(
                    msgs.into_iter().map(ClientEvent::Message)
                ),
                PendingMsgs::EndOfScript => {
                    events.push(ClientEvent::Disconnected);
                    end_of_script = true;
                }
            }
        }

        // ---- FAIL-SAFE PRIORITY ----

        // Latency reports jump the command queue. Their whole purpose is
        // bounding worst-case stop latency, they must not wait behind a
        // backlog of drive commands.
        let latency_problem = events.iter().any(|e| matches!(
            e,
            ClientEvent::Message(OperatorMsg::LatencyProblem)
        ));

        if latency_problem {
            if let Some(ref mut c) = coordinator {
                c.on_latency_problem();
            }
        }

        // ---- ORDINARY EVENTS ----

        // Commands are processed strictly in arrival order
        for event in events {
            match event {
                ClientEvent::Connected => {
                    if coordinator.is_some() {
                        warn!("Connect event during an active session, ignored");
                        continue
                    }

                    match SessionCoordinator::on_connect(
                        &mut registry,
                        telem_tx.clone(),
                        map_params.clone(),
                        exec_params.stream_period()
                    ) {
                        Ok(c) => coordinator = Some(c),
                        // No partial session exists on a refusal
                        Err(e) => warn!("Session refused: {}", e)
                    }
                },

                ClientEvent::Disconnected => match coordinator.take() {
                    Some(c) => c.on_disconnect(&mut registry),
                    None => ()
                },

                ClientEvent::Message(msg) => {
                    let c = match coordinator {
                        Some(ref mut c) => c,
                        None => {
                            warn!("Message without an active session, ignored");
                            continue
                        }
                    };

                    match msg {
                        OperatorMsg::Command(cmd) => c.on_command(&cmd),
                        // Already handled ahead of the queue
                        OperatorMsg::LatencyProblem => (),
                        OperatorMsg::Idle { active } => c.on_idle(!active),
                        OperatorMsg::Light { on } => c.on_light(on)
                    }
                }
            }
        }

        // ---- TELEMETRY ----

        while let Ok(tm) = telem_rx.try_recv() {
            match event_source {
                EventSource::Channel(ref mut channel) => {
                    match channel.send(&tm) {
                        Ok(_) => (),
                        // Frames with nobody listening are just dropped
                        Err(ChannelError::NotConnected) => (),
                        Err(e) => warn!("Could not send telemetry: {}", e)
                    }
                },
                // Bench runs have no operator to stream to
                _ => trace!("Telemetry dropped in script mode")
            }
        }

        if end_of_script {
            info!("End of command script reached, stopping");
            break
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
            )
        }
    }

    // ---- SHUTDOWN ----

    // The disconnect path has already stopped the stream worker and forced
    // the fail-safe stop for any session that was still up
    if let Some(c) = coordinator.take() {
        c.on_disconnect(&mut registry);
    }

    info!("End of execution");

    Ok(())
}

/// Build the hardware registry for this target.
///
/// The default build drives simulated actuators and a synthetic frame
/// source. The `cam` feature swaps in the V4L2 camera, the `pca9685`
/// feature (Raspberry Pi targets) swaps in the PWM board actuators.
fn build_hardware_registry(params: &ExecParams) -> Result<HardwareRegistry, Report> {

    use buggy_lib::actuator::{ActuatorPort, CameraMountPort};
    use buggy_lib::frame_producer::FrameProducer;

    #[cfg(not(all(feature = "pca9685", target_arch = "arm")))]
    let (actuators, mount): (
        Box<dyn ActuatorPort + Send>,
        Box<dyn CameraMountPort + Send>
    ) = {
        use buggy_lib::actuator::sim::{SimActuators, SimMount};

        info!("Using simulated actuators");

        (
            Box::new(SimActuators::new()),
            Box::new(SimMount::new())
        )
    };

    #[cfg(all(feature = "pca9685", target_arch = "arm"))]
    let (actuators, mount): (
        Box<dyn ActuatorPort + Send>,
        Box<dyn CameraMountPort + Send>
    ) = {
        use buggy_lib::actuator::pca9685::{
            Pca9685Actuators, Pca9685Config, Pca9685Mount
        };
        use pwm_pca9685::{Address, Pca9685};

        info!("Using PCA9685 actuators");

        let i2c = rppal::i2c::I2c::new()
            .wrap_err("Failed to open the I2C bus")?;
        let dev = Pca9685::new(i2c, Address::default())
            .map_err(|_| eyre!("Failed to open the actuator PCA9685"))?;
        let actuators = Pca9685Actuators::from_device(
            dev,
            Pca9685Config::default()
        ).wrap_err("Failed to initialise the actuator board")?;

        // The mount board sits at the alternative address
        let i2c = rppal::i2c::I2c::new()
            .wrap_err("Failed to open the I2C bus")?;
        let dev = Pca9685::new(i2c, Address::from(0x41))
            .map_err(|_| eyre!("Failed to open the mount PCA9685"))?;
        let mount = Pca9685Mount::from_device(dev, 0, 1)
            .wrap_err("Failed to initialise the mount board")?;

        (
            Box::new(actuators),
            Box::new(mount)
        )
    };

    #[cfg(not(feature = "cam"))]
    let frames: Box<dyn FrameProducer + Send> = {
        use buggy_lib::frame_producer::TestPatternProducer;

        info!("Using the synthetic frame source");

        Box::new(TestPatternProducer::new(
            params.stream_width,
            params.stream_height,
            params.jpeg_quality
        ))
    };

    #[cfg(feature = "cam")]
    let frames: Box<dyn FrameProducer + Send> = {
        use buggy_lib::frame_producer::CameraProducer;

        // A missing camera is fatal at startup, there is no partial
        // hardware set
        Box::new(CameraProducer::new(
            &params.camera_device,
            (params.stream_width, params.stream_height),
            params.frame_rate_hz as u32,
            params.jpeg_quality
        ).wrap_err("Failed to open the camera")?)
    };

    Ok(HardwareRegistry::new(HardwareHandles {
        actuators,
        mount,
        frames
    }))
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Various sources for the operator events incoming to the exec.
enum EventSource {
    None,
    Channel(Box<dyn MessageChannel>),
    Script(ScriptInterpreter)
}
