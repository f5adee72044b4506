//! Command-line front end for the `preforkd` supervisor.
//!
//! Expects a ready descriptor on standard input (inetd `wait` style, or a
//! parent that binds and listens before exec), detaches its own standard
//! streams onto `/dev/null`, and supervises the given worker program.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use preforkd::{bootstrap, Config, GuardedFd, LogWriter, Subscriber, Supervisor};

#[derive(Debug, Parser)]
#[command(
    name = "preforkd",
    about = "Adaptive pre-forking process supervisor",
    trailing_var_arg = true
)]
struct Cli {
    /// Maximum number of simultaneous workers.
    #[arg(short = 'N', long = "max-workers", value_name = "COUNT", default_value_t = 10)]
    max_workers: usize,

    /// Minimum number of workers to keep alive.
    #[arg(short = 'n', long = "min-workers", value_name = "COUNT", default_value_t = 0)]
    min_workers: usize,

    /// Minimum microseconds between two spawns.
    #[arg(short = 'r', long = "rate-limit", value_name = "USEC", default_value_t = 32 * 1024)]
    rate_limit_us: u64,

    /// Initial rate-sampling interval in microseconds.
    #[arg(short = 's', long = "sample-time", value_name = "USEC", default_value_t = 16 * 1024)]
    sample_time_us: u64,

    /// Seconds of inactivity before an idle exit (0 disables).
    #[arg(short = 't', long = "idle-timeout", value_name = "SEC", default_value_t = 0)]
    idle_timeout_s: u64,

    /// Log every admission decision, not just lifecycle events.
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Worker program followed by its arguments.
    #[arg(value_name = "PROGRAM [ARGS...]", required = true, allow_hyphen_values = true)]
    worker: Vec<OsString>,
}

impl Cli {
    fn into_config(self) -> Config {
        let mut worker = self.worker.into_iter();
        let worker_program = worker.next().map(PathBuf::from).unwrap_or_default();

        Config {
            min_workers: self.min_workers,
            max_workers: self.max_workers,
            rate_limit: Duration::from_micros(self.rate_limit_us),
            sample_base: Duration::from_micros(self.sample_time_us),
            idle_timeout: Duration::from_secs(self.idle_timeout_s),
            worker_program,
            worker_args: worker.collect(),
            debug: self.debug,
            ..Config::default()
        }
    }
}

fn main() -> ExitCode {
    let cfg = Cli::parse().into_config();

    // Validate while stderr still points somewhere a human can see.
    let subs: Vec<Arc<dyn Subscriber>> = vec![Arc::new(LogWriter)];
    let sup = match Supervisor::new(cfg, subs) {
        Ok(sup) => sup,
        Err(err) => {
            eprintln!("preforkd: {err}");
            return ExitCode::FAILURE;
        }
    };

    // Claim the inherited descriptor off stdin and null the std streams.
    let inherited = match bootstrap::swizzle_stdio() {
        Ok(fd) => fd,
        Err(err) => {
            eprintln!("preforkd: cannot set up standard streams: {err}");
            return ExitCode::FAILURE;
        }
    };
    let fd = GuardedFd::new(inherited);

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("preforkd: cannot start runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(sup.run(fd)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("preforkd: {err}");
            ExitCode::FAILURE
        }
    }
}
