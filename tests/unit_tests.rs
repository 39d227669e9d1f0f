//! Unit tests for configuration, command-line parsing, tool discovery and
//! the argument grammar of each tool call.

use clap::Parser;
use ocean_timeseries::cli::{parse_var_list, parse_year_range, Args, VarList};
use ocean_timeseries::config::PipelineConfig;
use ocean_timeseries::errors::PipelineError;
use ocean_timeseries::operations::{Invocation, Step, ANNUAL_WINDOW};
use ocean_timeseries::tools::{find_program, Toolchain};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

fn toolchain() -> Toolchain {
    Toolchain {
        cdo: PathBuf::from("/opt/cdo/bin/cdo"),
        ncwa: PathBuf::from("/opt/nco/bin/ncwa"),
        ncrename: PathBuf::from("/opt/nco/bin/ncrename"),
        regridder: PathBuf::from("/opt/regrid/bin/vertregrid"),
    }
}

fn args_of(invocation: &Invocation) -> Vec<String> {
    invocation.arg_strings()
}

#[test]
fn test_error_display_and_exit_codes() {
    let missing = PipelineError::MissingTool {
        family: "CDO".to_string(),
        program: "cdo".to_string(),
    };
    assert_eq!(
        format!("{}", missing),
        "Required CDO program 'cdo' not found on PATH"
    );
    assert_eq!(missing.exit_code(), 2);

    let io = PipelineError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
    assert!(format!("{}", io).contains("disk full"));
    assert_eq!(io.exit_code(), 1);

    let dim = PipelineError::DimensionNotFound {
        file: PathBuf::from("a.nc"),
        dim: "time".to_string(),
    };
    assert!(format!("{}", dim).contains("Dimension 'time' not found"));

    let interrupted = PipelineError::Interrupted {
        step: Some("vertical regridding".to_string()),
    };
    assert_eq!(format!("{}", interrupted), "Interrupted during vertical regridding");
    assert_eq!(interrupted.exit_code(), 130);
    assert_eq!(PipelineError::Interrupted { step: None }.exit_code(), 130);
}

#[test]
fn test_parse_year_range() {
    assert_eq!(parse_year_range("2000-2001"), Ok((2000, 2001)));
    assert_eq!(parse_year_range("1993"), Ok((1993, 1993)));
    assert_eq!(parse_year_range(" 2000 - 2010 "), Ok((2000, 2010)));
    assert!(parse_year_range("2000-").is_err());
    assert!(parse_year_range("2000-2001-2002").is_err());
    assert!(parse_year_range("abc").is_err());
}

#[test]
fn test_parse_var_list() {
    assert_eq!(
        parse_var_list("temp,salt,chl"),
        Ok(VarList(vec![
            "temp".to_string(),
            "salt".to_string(),
            "chl".to_string()
        ]))
    );
    assert!(parse_var_list("temp,,chl").is_err());
    assert!(parse_var_list("temp,salt,temp").is_err());
}

#[test]
fn test_no_arguments_keeps_defaults() {
    let args = Args::try_parse_from(["ocean-timeseries"]).unwrap();
    let mut config = PipelineConfig::default();
    args.apply(&mut config);
    assert_eq!(config, PipelineConfig::default());
    assert!(!args.dry_run);
}

#[test]
fn test_flags_override_config() {
    let args = Args::try_parse_from([
        "ocean-timeseries",
        "--region",
        "bothnia",
        "--years",
        "2000-2001",
        "--surface-vars",
        "chl,temp",
        "--bottom-var",
        "oxy",
        "--temp-root",
        "/scratch",
        "--dry-run",
    ])
    .unwrap();

    let mut config = PipelineConfig::default();
    args.apply(&mut config);

    assert_eq!(config.region, "bothnia");
    assert_eq!((config.first_year, config.last_year), (2000, 2001));
    assert_eq!(config.surface_vars, vec!["chl", "temp"]);
    assert_eq!(config.bottom_var, "oxy");
    assert_eq!(config.temp_root, Some(PathBuf::from("/scratch")));
    assert_eq!(config.input_prefix, PipelineConfig::default().input_prefix);
    assert!(args.dry_run);
}

#[test]
fn test_bad_years_flag_is_rejected() {
    assert!(Args::try_parse_from(["ocean-timeseries", "--years", "twenty"]).is_err());
}

#[test]
fn test_find_program_rejects_missing_and_empty_path() {
    assert_eq!(find_program("cdo", &OsString::new()), None);

    let temp_dir = tempfile::tempdir().unwrap();
    let search_path = std::env::join_paths([temp_dir.path()]).unwrap();
    assert_eq!(find_program("cdo", &search_path), None);
}

#[cfg(unix)]
#[test]
fn test_toolchain_resolution() {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let install = |dir: &Path, name: &str, mode: u32| {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
    };

    install(first.path(), "cdo", 0o755);
    install(first.path(), "ncwa", 0o755);
    // Not executable, so the copy further down the path wins
    install(first.path(), "ncrename", 0o644);
    install(second.path(), "ncrename", 0o755);
    install(second.path(), "vertregrid", 0o755);

    let search_path = std::env::join_paths([first.path(), second.path()]).unwrap();
    let config = PipelineConfig::default();
    let tools = Toolchain::resolve_in(&config, &search_path).unwrap();

    assert_eq!(tools.cdo, first.path().join("cdo"));
    assert_eq!(tools.ncrename, second.path().join("ncrename"));
    assert_eq!(tools.regridder, second.path().join("vertregrid"));

    let mut renamed = config.clone();
    renamed.regrid.program = "zinterp".to_string();
    match Toolchain::resolve_in(&renamed, &search_path) {
        Err(PipelineError::MissingTool { family, program }) => {
            assert_eq!(family, "vertical regridding");
            assert_eq!(program, "zinterp");
        }
        other => panic!("Expected MissingTool, got {:?}", other),
    }
}

#[test]
fn test_select_and_squeeze_grammar() {
    let tools = toolchain();
    let config = PipelineConfig {
        bottom_var: "oxygen".to_string(),
        ..PipelineConfig::default()
    };

    let select = tools.select_bottom(&config, Path::new("in.nc"), Path::new("slice.nc"));
    assert_eq!(select.step, Step::SelectBottom);
    assert_eq!(
        args_of(&select),
        ["-O", "selname,oxygen", "-sellevidx,1", "in.nc", "slice.nc"]
    );
    assert_eq!(
        select.command_line(),
        "/opt/cdo/bin/cdo -O selname,oxygen -sellevidx,1 in.nc slice.nc"
    );

    let squeeze = tools.squeeze_level(&config, Path::new("slice.nc"), Path::new("flat.nc"));
    assert_eq!(squeeze.program, PathBuf::from("/opt/nco/bin/ncwa"));
    assert_eq!(args_of(&squeeze), ["-O", "-a", "depth", "slice.nc", "flat.nc"]);
    assert_eq!(squeeze.output, PathBuf::from("flat.nc"));
}

#[test]
fn test_rename_and_merge_grammar() {
    let tools = toolchain();
    let config = PipelineConfig {
        bathymetry: PathBuf::from("/grid/bathy.nc"),
        bottom_rename: Some("o2b".to_string()),
        ..PipelineConfig::default()
    };

    let rename = tools.rename_bottom(&config, Path::new("a.nc"), Path::new("b.nc"));
    assert_eq!(args_of(&rename), ["-O", "-v", "o2,o2b", "a.nc", "b.nc"]);

    let merge = tools.merge_bathymetry(&config, Path::new("in.nc"), Path::new("out.nc"));
    assert_eq!(
        args_of(&merge),
        ["-O", "merge", "/grid/bathy.nc", "in.nc", "out.nc"]
    );

    let month = tools.merge_month(Path::new("b.nc"), Path::new("s.nc"), Path::new("m.nc"));
    assert_eq!(args_of(&month), ["-O", "merge", "b.nc", "s.nc", "m.nc"]);
}

#[test]
fn test_regrid_and_vertical_mean_grammar() {
    let tools = toolchain();
    let mut config = PipelineConfig::default();
    config.regrid.depth = 30.0;
    config.regrid.step = 0.25;
    config.regrid.levels = 120;
    config.regrid.flags = vec!["--linear".to_string(), "--extrapolate".to_string()];
    config.surface_vars = vec!["chl".to_string(), "no3".to_string()];

    let regrid = tools.regrid(&config.regrid, Path::new("b.nc"), Path::new("r.nc"));
    assert_eq!(
        args_of(&regrid),
        [
            "--depth",
            "30",
            "--step",
            "0.25",
            "--levels",
            "120",
            "--linear",
            "--extrapolate",
            "b.nc",
            "r.nc"
        ]
    );

    let mean = tools.vertical_mean(&config, Path::new("r.nc"), Path::new("v.nc"));
    assert_eq!(args_of(&mean), ["-O", "vertmean", "-selname,chl,no3", "r.nc", "v.nc"]);
}

#[test]
fn test_time_aggregation_grammar() {
    let tools = toolchain();
    let inputs = [PathBuf::from("m01.nc"), PathBuf::from("m02.nc")];

    let merge = tools.merge_time(Step::MergeYear, &inputs[..], Path::new("y.nc"));
    assert_eq!(args_of(&merge), ["-O", "mergetime", "m01.nc", "m02.nc", "y.nc"]);

    let annual = tools.annual_mean(Path::new("y.nc"), Path::new("a.nc"));
    assert_eq!(ANNUAL_WINDOW, 12);
    assert_eq!(
        args_of(&annual),
        ["-O", "--timestat_date", "middle", "timselmean,12", "y.nc", "a.nc"]
    );
}
