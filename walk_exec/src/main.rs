//! # Walk executable
//!
//! Runs a complete dog walk against the in-process simulation: plans the
//! dog's path, starts the walk clock, and runs the follower loop until the
//! walk ends, scoring the dog against its plan as it goes.
//!
//! The planned dog and escort paths are saved into the session directory as
//! JSON for later inspection.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use color_eyre::eyre::WrapErr;
use color_eyre::Report;
use log::{info, warn, LevelFilter};
use std::fs::File;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use structopt::StructOpt;

use util::logger::logger_init;
use util::module::State;
use util::session::Session;
use util::time::seconds_to_duration;

use walk_if::geom::{TimedPose, VelocityCmd};
use walk_if::services::{
    GetEntirePathRequest, GetEntireRobotPathRequest, GetPathRequest, StartPathRequest,
};

use walk_lib::clients::{Clock, ModelStateSource};
use walk_lib::coord_action::AdjustDogAction;
use walk_lib::leash_ctrl::LeashCtrl;
use walk_lib::params::WalkExecParams;
use walk_lib::path_provider::{make_provider, PathType};
use walk_lib::path_scorer::{PathScorer, ScoreSample};
use walk_lib::path_server::PathServer;
use walk_lib::sim::{SharedSim, SimWorld};
use walk_lib::walk_driver::{WalkCtx, WalkDriver};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Command line arguments.
#[derive(Debug, StructOpt)]
#[structopt(name = "walk_exec", about = "Dog walking robot executable")]
struct Args {
    /// Drive the base directly instead of issuing coordination goals
    #[structopt(long)]
    solo: bool,

    /// Override the parameter file's path type
    #[structopt(long)]
    path_type: Option<PathType>,

    /// Parameter file, relative to the params directory
    #[structopt(long, default_value = "walk_exec.toml")]
    params: String,

    /// Run the cycles back to back instead of pacing them in real time
    #[structopt(long)]
    fast: bool,

    /// Stop after this much simulated time even if the walk has not ended
    #[structopt(long)]
    max_sim_time_s: Option<f64>,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<(), Report> {
    let session = Session::new("walk_exec", "sessions").wrap_err("Failed to create the session")?;
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise the logger")?;

    let args = Args::from_args();

    let mut params: WalkExecParams =
        util::params::load(&args.params).wrap_err("Failed to load the parameter file")?;
    if args.solo {
        params.walk_driver.solo_mode = true;
    }
    if let Some(path_type) = args.path_type {
        params.path.path_type = path_type;
    }

    info!("Path type: {}", params.path.path_type);
    info!("Solo mode: {}", params.walk_driver.solo_mode);

    run(params, &session, &args)
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Run the walk to completion.
fn run(params: WalkExecParams, session: &Session, args: &Args) -> Result<(), Report> {
    let mut server = PathServer::new(make_provider(&params.path), params.path_server.clone());
    info!("Walk duration: {:.1} s", server.maximum_time().maximum_time_s);

    save_planned_paths(&server, &params, session)?;

    // The dog starts on its path
    let dog_start_m = server
        .get_path(GetPathRequest { time_s: 0.0 })
        .position_m;
    let sim = SharedSim::new(SimWorld::new(params.sim.clone(), dog_start_m));

    let mut leash_ctrl =
        LeashCtrl::init(params.leash_ctrl.clone()).wrap_err("Leash configuration is infeasible")?;
    leash_ctrl.set_marker_sink(Box::new(sim.clone()));

    let coord = Arc::new(AdjustDogAction::new(
        params.coord_action.clone(),
        leash_ctrl,
        Box::new(sim.clone()),
        Box::new(sim.clone()),
        Box::new(sim.clone()),
    ));

    let mut driver =
        WalkDriver::init(params.walk_driver.clone()).wrap_err("Invalid walk driver parameters")?;

    let mut scorer = PathScorer::default();
    scorer
        .init(params.path_scorer.clone(), session)
        .wrap_err("Failed to initialise the path scorer")?;
    scorer.start_measuring();

    server
        .start(StartPathRequest {
            time_s: sim.now_s(),
        })
        .wrap_err("Failed to start the walk")?;

    let cycle_period_s = params.walk_driver.cycle_period_s;
    let cycle_duration = seconds_to_duration(cycle_period_s);

    loop {
        let cycle_start = Instant::now();

        let (cmd, report) = {
            let ctx = WalkCtx {
                clock: &sim,
                frames: &sim,
                paths: &server,
                dog: &sim,
                coord: if params.walk_driver.solo_mode {
                    None
                } else {
                    Some(&coord)
                },
            };
            driver.proc(&ctx)
        };

        if report.ended {
            break;
        }

        let now_s = sim.now_s();
        let planned = server.get_path(GetPathRequest { time_s: now_s });

        if report.started {
            if let Ok(dog) = sim.dog_state() {
                if let Err(e) = scorer.proc(&ScoreSample {
                    time_s: now_s,
                    planned_position_m: planned.position_m,
                    actual_position_m: dog.position_m,
                }) {
                    warn!("Path scorer error: {}", e);
                }
            }
        }

        sim.step(
            cycle_period_s,
            &planned.position_m,
            &cmd.unwrap_or_else(VelocityCmd::zero),
        );

        if let Some(limit_s) = args.max_sim_time_s {
            if sim.now_s() >= limit_s {
                warn!("Simulated time limit reached, stopping early");
                break;
            }
        }

        if !args.fast {
            let elapsed = cycle_start.elapsed();
            if elapsed < cycle_duration {
                thread::sleep(cycle_duration - elapsed);
            } else {
                warn!("Cycle overran: {:.3} s", elapsed.as_secs_f64());
            }
        }
    }

    // Release anything still moving before reporting
    coord.preempt();
    scorer.stop_measuring();

    let score = scorer.report();
    info!(
        "Walk complete: total path deviation = {:.3} m^2 s over {} samples",
        score.total_deviation_m2s, score.samples
    );

    Ok(())
}

/// Save the planned dog and escort paths into the session directory.
fn save_planned_paths(
    server: &PathServer,
    params: &WalkExecParams,
    session: &Session,
) -> Result<(), Report> {
    let increment_s = params.planned_path_increment_s.0;

    let dog: Vec<TimedPose> = server
        .entire_path(GetEntirePathRequest { increment_s })?
        .collect();
    let escort: Vec<TimedPose> = server
        .entire_robot_path(GetEntireRobotPathRequest { increment_s })?
        .collect();

    let dog_path = session.session_root.join("planned_dog_path.json");
    serde_json::to_writer_pretty(
        File::create(&dog_path).wrap_err("Cannot create the dog path file")?,
        &dog,
    )
    .wrap_err("Cannot write the dog path file")?;

    let escort_path = session.session_root.join("planned_escort_path.json");
    serde_json::to_writer_pretty(
        File::create(&escort_path).wrap_err("Cannot create the escort path file")?,
        &escort,
    )
    .wrap_err("Cannot write the escort path file")?;

    info!("Planned paths saved to {:?}", session.session_root);
    Ok(())
}
