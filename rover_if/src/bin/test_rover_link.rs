//! Manual rover link test
//!
//! Connects to a rover on a serial port, optionally sends one motor demand, then polls telemetry
//! a number of times and logs each reply.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Result};
use log::{info, warn};
use std::path::PathBuf;
use structopt::StructOpt;

// Internal
use rover_if::{ConnectionManager, LinkParams, RoverState};
use util::{
    logger::{logger_init, LevelFilter},
    session,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "test_rover_link", about = "Poll telemetry from a rover over a serial link")]
struct Opt {
    /// Serial device, overrides the parameter file
    #[structopt(short, long)]
    port: Option<String>,

    /// Parameter file, relative to $ROVER_SW_ROOT/params
    #[structopt(long)]
    params: Option<String>,

    /// Directory to create the session in, defaults to $ROVER_SW_ROOT/sessions
    #[structopt(long, parse(from_os_str))]
    sessions_dir: Option<PathBuf>,

    /// Number of telemetry polls
    #[structopt(short, long, default_value = "10")]
    cycles: usize,

    /// Power for motor 1 (-100 to 100)
    #[structopt(long, allow_hyphen_values = true)]
    m1: Option<i32>,

    /// Power for motor 2 (-100 to 100)
    #[structopt(long, allow_hyphen_values = true)]
    m2: Option<i32>,

    /// Log at trace level
    #[structopt(short, long)]
    verbose: bool,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    let session = match &opt.sessions_dir {
        Some(dir) => session::Session::new_in("test_rover_link", dir),
        None => session::Session::new("test_rover_link", "sessions"),
    }
    .wrap_err("Failed to create the session")?;

    let level = if opt.verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    logger_init(level, &session).wrap_err("Failed to initialise logging")?;

    info!("Rover Link Test\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let mut params: LinkParams = match &opt.params {
        Some(p) => util::params::load(p).wrap_err("Failed to load link parameters")?,
        None => LinkParams::default(),
    };
    if let Some(port) = &opt.port {
        params.address = port.clone();
    }

    info!("Parameters loaded: {:?}", params);

    // ---- CONNECT ----

    let mut state = RoverState::default();
    let mut rover = ConnectionManager::new(&params)
        .open(&mut state)
        .wrap_err_with(|| format!("Failed to connect to the rover on {}", params.address))?;

    if opt.m1.is_some() || opt.m2.is_some() {
        let (m1, m2) = (opt.m1.unwrap_or(0), opt.m2.unwrap_or(0));
        rover
            .write_motors(m1, m2)
            .wrap_err("Failed to send motor demands")?;
        info!("Sent motor demands ({}, {})", m1, m2);
    }

    // ---- POLL ----

    for cycle in 0..opt.cycles {
        match rover.read_telemetry(&mut state) {
            Ok(()) => info!("Cycle {}:\n{}", cycle, state),
            Err(e) if e.is_fatal() => {
                return Err(e).wrap_err("Lost the rover link");
            }
            Err(e) => warn!("Cycle {}: {}", cycle, e),
        }
    }

    if opt.m1.is_some() || opt.m2.is_some() {
        rover.write_motors(0, 0).wrap_err("Failed to stop the motors")?;
    }

    rover.close(&mut state);

    Ok(())
}
