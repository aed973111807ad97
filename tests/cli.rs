use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

const CMD_NAME: &str = "metgrid";

fn sample_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/llc.griddes")
}

#[test]
fn help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin(CMD_NAME)?;
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(
            predicate::str::contains("describe")
                .and(predicate::str::contains("inspect"))
                .and(predicate::str::contains("extract")),
        );

    Ok(())
}

#[test]
fn describe_sample() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin(CMD_NAME)?;
    cmd.arg("describe").arg(sample_path());
    cmd.assert()
        .success()
        .stdout(
            predicate::str::contains("projection grid (y=949, x=739, 701311 points)")
                .and(predicate::str::contains("gridsize     = 701311"))
                .and(predicate::str::contains("+proj=lcc"))
                .and(predicate::str::contains("first point [0, 0]: y=-1129322 x=-922442.2")),
        )
        .stderr(predicate::str::is_empty());

    Ok(())
}

#[test]
fn describe_missing_xfirst_fails() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "gridtype = lonlat\nxsize = 4\nysize = 3\nxinc = 1\nyfirst = 50\nyinc = 1")?;

    let mut cmd = Command::cargo_bin(CMD_NAME)?;
    cmd.arg("describe").arg(file.path());
    cmd.assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("missing key `xfirst` for gridtype `lonlat`"));

    Ok(())
}

#[test]
fn describe_writes_log_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let log = dir.path().join("metgrid.log");

    let mut cmd = Command::cargo_bin(CMD_NAME)?;
    cmd.arg("--log").arg(&log).arg("describe").arg(sample_path());
    cmd.assert().success();

    let contents = std::fs::read_to_string(&log)?;
    assert!(contents.contains("Starting metgrid"));

    Ok(())
}

#[test]
fn inspect_missing_file_fails() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin(CMD_NAME)?;
    cmd.arg("inspect").arg("no-such-file.nc");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open NetCDF file"));

    Ok(())
}

fn write_small_file(path: &std::path::Path) -> Result<(), netcdf::Error> {
    let mut file = netcdf::create(path)?;
    file.add_dimension("lat", 2)?;
    file.add_dimension("lon", 3)?;
    let mut lat = file.add_variable::<f64>("lat", &["lat"])?;
    lat.put_values(&[50.0, 51.0], ..)?;
    let mut lon = file.add_variable::<f64>("lon", &["lon"])?;
    lon.put_values(&[5.0, 6.0, 7.0], ..)?;
    let mut t2m = file.add_variable::<f64>("t2m", &["lat", "lon"])?;
    t2m.put_attribute("_FillValue", -1.0f64)?;
    t2m.put_values(&[280.0, -1.0, 282.0, 283.0, 284.0, 285.0], ..)?;
    Ok(())
}

#[test]
fn inspect_lists_variables() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("small.nc");
    write_small_file(&path)?;

    let mut cmd = Command::cargo_bin(CMD_NAME)?;
    cmd.arg("inspect").arg(&path);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("t2m (lat, lon) [2, 3] lonlat").and(predicate::str::contains("lat (").not()));

    Ok(())
}

#[test]
fn extract_counts_valid_values() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("small.nc");
    write_small_file(&path)?;

    let mut cmd = Command::cargo_bin(CMD_NAME)?;
    cmd.arg("extract").arg(&path).arg("t2m");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("grid bound: 6 points, 5 valid values"));

    Ok(())
}

#[test]
fn extract_with_mismatched_grid_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("small.nc");
    write_small_file(&path)?;

    let mut cmd = Command::cargo_bin(CMD_NAME)?;
    cmd.arg("extract").arg(&path).arg("t2m").arg("--grid").arg(sample_path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Grid does not fit t2m"));

    Ok(())
}
