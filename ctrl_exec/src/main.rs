//! Control synthesis executable entry point.
//!
//! Usage:
//!
//! ```text
//! ctrl_exec <constant|linear|quadratic> [--problem FILE] [--search FILE]
//! ```
//!
//! The problem and search parameters default to `problem.toml` and
//! `search.toml` in `$CTRL_SW_ROOT/params`. Results are archived as CSV files
//! in the session's `arch` directory.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use ctrl_lib::{
    basis::ControlBasis,
    movement::simulate,
    params::SearchParams,
    problem::ProblemParams,
    search::{prepare_problem, ControlSearch},
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::Utc;
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info};
use serde::Serialize;
use std::path::PathBuf;
use structopt::StructOpt;

// Internal
use util::{
    archive::{ArchiveError, Archiver},
    logger::{logger_init, LevelFilter},
    session::Session,
    time::duration_to_seconds,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line arguments.
#[derive(Debug, StructOpt)]
#[structopt(name = "ctrl_exec", about = "Optimal piecewise polynomial control synthesis")]
struct Args {
    /// The control basis, one of constant, linear or quadratic
    basis: ControlBasis,

    /// Problem parameter file, instead of `problem.toml` in the params directory
    #[structopt(long, parse(from_os_str))]
    problem: Option<PathBuf>,

    /// Search parameter file, instead of `search.toml` in the params directory
    #[structopt(long, parse(from_os_str))]
    search: Option<PathBuf>,

    /// Directory of the software root in which sessions are created
    #[structopt(long, default_value = "sessions")]
    sessions_dir: String,

    /// Log at debug level rather than info
    #[structopt(short, long)]
    verbose: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let args = Args::from_args();
    let start = Utc::now();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session =
        Session::new("ctrl_exec", &args.sessions_dir).wrap_err("Failed to create the session")?;

    // Initialise logger
    let level = match args.verbose {
        true => LevelFilter::Debug,
        false => LevelFilter::Info,
    };
    logger_init(level, &session).wrap_err("Failed to initialise logging")?;

    info!("Control Synthesis Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI arguments: {:?}", args);

    // ---- LOAD PARAMETERS ----

    let problem_params: ProblemParams = match &args.problem {
        Some(p) => util::params::load_from_path(p),
        None => util::params::load("problem.toml"),
    }
    .wrap_err("Could not load the problem parameters")?;

    let search_params: SearchParams = match &args.search {
        Some(p) => util::params::load_from_path(p),
        None => util::params::load("search.toml"),
    }
    .wrap_err("Could not load the search parameters")?;

    let problem = prepare_problem(problem_params).wrap_err("Invalid problem")?;

    info!(
        "Problem loaded: {} states, {} controls, {} terminal constraints, T = {} s, N = {}",
        problem.num_states(),
        problem.num_controls(),
        problem.num_terminal(),
        problem.horizon_s(),
        problem.num_segments()
    );

    // ---- SEARCH ----

    let mut search = ControlSearch::new(&problem, args.basis, &search_params)
        .wrap_err("Failed to build the reachability map")?;

    archive(&session, "reach.csv", search.reach().records())
        .wrap_err("Failed to archive the reachability map")?;

    let solution = search
        .run()
        .wrap_err_with(|| format!("Search for {} control failed", args.basis))?;

    info!("Optimal cost: {}", solution.cost());

    archive(&session, "coefficients.csv", solution.records())
        .wrap_err("Failed to archive the coefficients")?;

    // ---- SIMULATE ----

    let traj = simulate(
        &problem,
        &solution.signal(),
        search_params.sim_steps_per_segment,
        search_params.ode_substeps,
    )
    .wrap_err("Failed to simulate the solved control")?;

    if let Some(x_t) = traj.terminal_state() {
        let residual = problem.h() * x_t - problem.g();
        info!(
            "Simulated terminal state {:?}, terminal residual norm {:.3e}",
            x_t.as_slice(),
            residual.norm()
        );
    }

    archive(&session, "trajectory.csv", traj.records())
        .wrap_err("Failed to archive the trajectory")?;

    info!(
        "Completed in {:.3} s",
        duration_to_seconds(Utc::now() - start).unwrap_or(std::f64::NAN)
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Write `records` to a CSV file in the session archive.
fn archive<T: Serialize>(session: &Session, name: &str, records: Vec<T>) -> Result<(), ArchiveError> {
    let count = records.len();
    let mut archiver = Archiver::from_path(session, name)?;
    archiver.serialise_all(records)?;

    info!("Archived {} records to {:?}", count, archiver.path());
    Ok(())
}
