//! A command line utility that replays recorded search tasks against the input they were recorded on.
//! Every task the input-to-state solver satisfies is written to the output directory as a new test case.

use std::{
    fs::{self, File},
    io::BufReader,
    path::PathBuf,
};

use clap::Parser;
use taintflip::{
    serialization_format::TaskFileReader,
    solvers::{I2sConfig, I2sSolver, SolversTuple},
    task::SearchTask,
};
use taintflip_bolts::{
    tuples::{tuple_list, NamedTuple},
    Error,
};

#[derive(Debug, Parser)]
#[command(
    name = "i2s_replay",
    about = "Replays recorded search tasks through the input-to-state solver."
)]
struct Opt {
    /// The input the tasks were recorded on
    #[arg(short, long)]
    input: PathBuf,

    /// A trace of tasks, as written by a `TaskFileWriter`
    #[arg(short, long, conflicts_with = "json")]
    tasks: Option<PathBuf>,

    /// A single task, encoded as JSON
    #[arg(short, long)]
    json: Option<PathBuf>,

    /// Directory for the solved inputs, "out" by default.
    #[arg(short, long, default_value = "out")]
    output: PathBuf,

    /// Longest ASCII numeral the solver rewrites
    #[arg(long, default_value_t = taintflip::solvers::i2s::DEFAULT_MAX_NUMERAL_LEN)]
    max_numeral_len: usize,

    /// Do not try big endian operands
    #[arg(long)]
    no_byteswap: bool,

    /// Do not invert binary operations
    #[arg(long)]
    no_binop: bool,
}

fn load_tasks(opt: &Opt) -> Result<Vec<SearchTask>, Error> {
    if let Some(path) = &opt.json {
        let task: SearchTask = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        return Ok(vec![task]);
    }
    let Some(path) = &opt.tasks else {
        return Err(Error::illegal_argument(
            "either --tasks or --json must be given",
        ));
    };
    let trace = fs::read(path)?;
    TaskFileReader::from_length_prefixed_buffer(&trace)?.collect()
}

fn main() -> Result<(), Error> {
    env_logger::init();
    let opt = Opt::parse();

    let input = fs::read(&opt.input)?;
    let tasks = load_tasks(&opt)?;
    log::info!(
        "replaying {} tasks against {} ({} bytes)",
        tasks.len(),
        opt.input.display(),
        input.len()
    );
    fs::create_dir_all(&opt.output)?;

    let config = I2sConfig::builder()
        .max_numeral_len(opt.max_numeral_len)
        .byteswap(!opt.no_byteswap)
        .binop_inversion(!opt.no_binop)
        .build();
    let solvers = tuple_list!(I2sSolver::with_config(config));

    let mut output = Vec::with_capacity(input.len());
    for (index, task) in tasks.iter().enumerate() {
        match solvers.solve_first(task, &input, &mut output) {
            Some(solver) => {
                let path = opt.output.join(format!("id-{index}"));
                fs::write(&path, &output)?;
                log::info!(
                    "task {index}: solved by {}, {} bytes written to {}",
                    solvers.name(solver).unwrap_or("?"),
                    output.len(),
                    path.display()
                );
            }
            None => log::debug!("task {index}: no solution"),
        }
    }

    let stats = solvers.0.stats();
    log::info!("solved: {}, failed: {}", stats.solved(), stats.failed());
    Ok(())
}
