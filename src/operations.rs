//! External tool invocations
//!
//! Every transformation of the data is delegated to CDO, NCO or the vertical
//! regridder. This module fixes the argument grammar of each call and defines
//! the [`CommandRunner`] seam that actually executes them.

use crate::config::{PipelineConfig, RegridSpec};
use crate::errors::{PipelineError, Result};
use crate::interrupt;
use crate::tools::Toolchain;
use log::{debug, info, warn};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::thread;
use std::time::Duration;

/// Window of the annual mean, in monthly timesteps
pub const ANNUAL_WINDOW: usize = 12;

/// Pipeline stage an invocation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    SelectBottom,
    SqueezeLevel,
    RenameBottom,
    MergeBathymetry,
    Regrid,
    VerticalMean,
    MergeMonth,
    MergeYear,
    AnnualMean,
    ConcatenateYears,
}

impl Step {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SelectBottom => "bottom level selection",
            Self::SqueezeLevel => "level squeeze",
            Self::RenameBottom => "bottom variable rename",
            Self::MergeBathymetry => "bathymetry merge",
            Self::Regrid => "vertical regridding",
            Self::VerticalMean => "vertical mean",
            Self::MergeMonth => "monthly merge",
            Self::MergeYear => "yearly time merge",
            Self::AnnualMean => "annual mean",
            Self::ConcatenateYears => "final concatenation",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One blocking call of an external program
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub step: Step,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// File the call is expected to produce
    pub output: PathBuf,
}

impl Invocation {
    fn new(step: Step, program: &Path, output: &Path) -> Self {
        Self {
            step,
            program: program.to_path_buf(),
            args: Vec::new(),
            output: output.to_path_buf(),
        }
    }

    fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Arguments as lossy strings, mostly useful in tests and logs
    pub fn arg_strings(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// Shell-like rendering of the command line
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

impl Toolchain {
    /// `cdo -O selname,<var> -sellevidx,<idx> <in> <out>`
    pub fn select_bottom(
        &self,
        config: &PipelineConfig,
        input: &Path,
        output: &Path,
    ) -> Invocation {
        Invocation::new(Step::SelectBottom, &self.cdo, output)
            .arg("-O")
            .arg(format!("selname,{}", config.bottom_var))
            .arg(format!("-sellevidx,{}", config.bottom_level))
            .arg(input)
            .arg(output)
    }

    /// `ncwa -O -a <level> <in> <out>`, averaging away the length-1 level axis
    pub fn squeeze_level(&self, config: &PipelineConfig, input: &Path, output: &Path) -> Invocation {
        Invocation::new(Step::SqueezeLevel, &self.ncwa, output)
            .arg("-O")
            .arg("-a")
            .arg(&config.dimensions.level)
            .arg(input)
            .arg(output)
    }

    /// `ncrename -O -v <old>,<new> <in> <out>`
    pub fn rename_bottom(&self, config: &PipelineConfig, input: &Path, output: &Path) -> Invocation {
        Invocation::new(Step::RenameBottom, &self.ncrename, output)
            .arg("-O")
            .arg("-v")
            .arg(format!("{},{}", config.bottom_var, config.renamed_bottom_var()))
            .arg(input)
            .arg(output)
    }

    /// `cdo -O merge <bathymetry> <in> <out>`
    pub fn merge_bathymetry(
        &self,
        config: &PipelineConfig,
        input: &Path,
        output: &Path,
    ) -> Invocation {
        Invocation::new(Step::MergeBathymetry, &self.cdo, output)
            .arg("-O")
            .arg("merge")
            .arg(&config.bathymetry)
            .arg(input)
            .arg(output)
    }

    /// `<regridder> --depth <d> --step <s> --levels <n> <flags..> <in> <out>`
    pub fn regrid(&self, spec: &RegridSpec, input: &Path, output: &Path) -> Invocation {
        Invocation::new(Step::Regrid, &self.regridder, output)
            .arg("--depth")
            .arg(spec.depth.to_string())
            .arg("--step")
            .arg(spec.step.to_string())
            .arg("--levels")
            .arg(spec.levels.to_string())
            .args(&spec.flags)
            .arg(input)
            .arg(output)
    }

    /// `cdo -O vertmean -selname,<a,b,..> <in> <out>`
    pub fn vertical_mean(
        &self,
        config: &PipelineConfig,
        input: &Path,
        output: &Path,
    ) -> Invocation {
        Invocation::new(Step::VerticalMean, &self.cdo, output)
            .arg("-O")
            .arg("vertmean")
            .arg(format!("-selname,{}", config.surface_var_list()))
            .arg(input)
            .arg(output)
    }

    /// `cdo -O merge <bottom> <surface> <out>`
    pub fn merge_month(&self, bottom: &Path, surface: &Path, output: &Path) -> Invocation {
        Invocation::new(Step::MergeMonth, &self.cdo, output)
            .arg("-O")
            .arg("merge")
            .arg(bottom)
            .arg(surface)
            .arg(output)
    }

    /// `cdo -O mergetime <in..> <out>`
    pub fn merge_time<P: AsRef<Path>>(&self, step: Step, inputs: &[P], output: &Path) -> Invocation {
        Invocation::new(step, &self.cdo, output)
            .arg("-O")
            .arg("mergetime")
            .args(inputs.iter().map(|p| AsRef::<Path>::as_ref(p)))
            .arg(output)
    }

    /// `cdo -O --timestat_date middle timselmean,12 <in> <out>`
    pub fn annual_mean(&self, input: &Path, output: &Path) -> Invocation {
        Invocation::new(Step::AnnualMean, &self.cdo, output)
            .arg("-O")
            .arg("--timestat_date")
            .arg("middle")
            .arg(format!("timselmean,{}", ANNUAL_WINDOW))
            .arg(input)
            .arg(output)
    }
}

/// Executes invocations. Implementations must block until the call finishes.
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> Result<()>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, invocation: &Invocation) -> Result<()> {
        (**self).run(invocation)
    }
}

/// How often a running tool is checked for completion or an interrupt
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs the real program with inherited stdio
///
/// The child is polled rather than waited on so an interrupt raised through
/// [`interrupt`] stops it instead of leaving it running against a removed
/// workspace.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<()> {
        if interrupt::requested() {
            return Err(interrupted(invocation));
        }
        debug!("{}", invocation.command_line());

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .spawn()
            .map_err(|source| PipelineError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if interrupt::requested() {
                warn!("⚠ Stopping {}", invocation.step);
                // Fails only if the child already exited, which wait() reports
                let _ = child.kill();
                child.wait()?;
                return Err(interrupted(invocation));
            }
            thread::sleep(POLL_INTERVAL);
        };

        if status.success() {
            Ok(())
        } else {
            Err(failure(invocation, status, interrupt::requested()))
        }
    }
}

fn interrupted(invocation: &Invocation) -> PipelineError {
    PipelineError::Interrupted {
        step: Some(invocation.step.to_string()),
    }
}

/// Error for an unsuccessful exit. A tool killed by SIGINT or SIGTERM was
/// interrupted along with the driver's process group, not a failing tool.
fn failure(invocation: &Invocation, status: ExitStatus, interrupt_requested: bool) -> PipelineError {
    if interrupt_requested || stopped_by_signal(status) {
        interrupted(invocation)
    } else {
        PipelineError::ToolFailed {
            step: invocation.step.to_string(),
            command: invocation.command_line(),
            status,
        }
    }
}

#[cfg(unix)]
fn stopped_by_signal(status: ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;

    const SIGINT: i32 = 2;
    const SIGTERM: i32 = 15;
    matches!(status.signal(), Some(SIGINT | SIGTERM))
}

#[cfg(not(unix))]
fn stopped_by_signal(_status: ExitStatus) -> bool {
    false
}

/// Logs what would run without executing anything
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunRunner;

impl CommandRunner for DryRunRunner {
    fn run(&self, invocation: &Invocation) -> Result<()> {
        info!("[dry-run] {}", invocation.command_line());
        Ok(())
    }
}
