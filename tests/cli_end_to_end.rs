#![cfg(unix)]

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

const FAKE_INKSCAPE: &str = r#"out=""
area=""
for arg in "$@"; do
  case "$arg" in
    --export-filename=*) out="${arg#--export-filename=}" ;;
    --export-area=*) area="${arg#--export-area=}" ;;
  esac
done
[ -n "$out" ] || { echo "missing --export-filename" >&2; exit 2; }
echo "$area" > "$out"
"#;

const FAKE_CONVERT: &str = r#"seen=""
out=""
files=""
for arg in "$@"; do
  if [ "$arg" = "-append" ]; then
    seen=1
  elif [ -n "$seen" ]; then
    out="$arg"
  else
    files="$files $arg"
  fi
done
cat $files > "$out"
"#;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\nset -eu\n{body}")).expect("write script");
    let mut perms = fs::metadata(&path).expect("script metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("chmod script");
    path
}

fn striprender(cwd: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("striprender"));
    cmd.current_dir(cwd.path())
        .env_remove("STRIPRENDER_CONFIG_FILE")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn render_stitches_strips_top_to_bottom() {
    let dir = TempDir::new().expect("temp dir");
    let inkscape = write_script(dir.path(), "fake-inkscape", FAKE_INKSCAPE);
    let convert = write_script(dir.path(), "fake-convert", FAKE_CONVERT);
    let scratch = dir.path().join("scratch");
    let output = dir.path().join("out.png");

    striprender(&dir)
        .arg("render")
        .args(["--threads", "2", "--units-per-thread", "5"])
        .args(["--region", "0:0:100:1007", "--split-mode", "independent"])
        .arg("--rasterizer")
        .arg(&inkscape)
        .arg("--stitcher")
        .arg(&convert)
        .arg("--work-dir")
        .arg(&scratch)
        .arg("doc.svg")
        .arg(&output)
        .assert()
        .success();

    let stitched = fs::read_to_string(&output).expect("stitched output");
    let expected: Vec<String> = (0..10)
        .map(|unit| {
            let y1 = if unit == 9 { 1007 } else { (unit + 1) * 100 };
            format!("0:{}:100:{}", unit * 100, y1)
        })
        .collect();
    assert_eq!(stitched.lines().collect::<Vec<_>>(), expected);

    // Nothing is left behind in the scratch root after success.
    assert_eq!(fs::read_dir(&scratch).expect("scratch root").count(), 0);
}

#[test]
fn rasterizer_failure_exits_with_dispatch_code() {
    let dir = TempDir::new().expect("temp dir");
    let inkscape = write_script(
        dir.path(),
        "broken-inkscape",
        "echo \"export failed\" >&2\nexit 3\n",
    );
    let convert = write_script(dir.path(), "fake-convert", FAKE_CONVERT);
    let output = dir.path().join("out.png");

    striprender(&dir)
        .arg("render")
        .args(["-t", "2", "-u", "2", "--region", "0:0:50:50"])
        .arg("--rasterizer")
        .arg(&inkscape)
        .arg("--stitcher")
        .arg(&convert)
        .arg("--work-dir")
        .arg(dir.path().join("scratch"))
        .arg("doc.svg")
        .arg(&output)
        .assert()
        .code(4)
        .stderr(contains("dispatch"));

    assert!(!output.exists());
}

#[test]
fn zero_threads_is_a_configuration_error() {
    let dir = TempDir::new().expect("temp dir");

    striprender(&dir)
        .args(["plan", "--threads", "0", "--region", "0:0:10:10", "doc.svg"])
        .assert()
        .code(2)
        .stderr(contains("pool.threads"));
}

#[test]
fn plan_prints_json_layout() {
    let dir = TempDir::new().expect("temp dir");

    let assert = striprender(&dir)
        .args(["plan", "--json", "-t", "3", "-u", "2"])
        .args(["--region", "0:0:600:1200", "--width", "300"])
        .arg("doc.svg")
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(stdout.contains("\"unit_count\": 6"), "{stdout}");
    assert!(stdout.contains("\"split_mode\": \"proportional\""), "{stdout}");
    assert!(stdout.contains("\"height\": 600"), "{stdout}");
}

#[test]
fn plan_probes_the_document_when_no_region_is_given() {
    let dir = TempDir::new().expect("temp dir");
    let probe = write_script(dir.path(), "fake-probe", "printf '0\\n0\\n120.4\\n60\\n'\n");

    striprender(&dir)
        .args(["plan", "-t", "1", "-u", "3"])
        .arg("--probe")
        .arg(&probe)
        .arg("doc.svg")
        .assert()
        .success()
        .stdout(contains("region 0:0:121:60 -> 121x60 px, 3 units"));
}

#[test]
fn config_file_supplies_tool_paths() {
    let dir = TempDir::new().expect("temp dir");
    let probe = write_script(dir.path(), "fake-probe", "printf '0,0,40,80\\n'\n");
    let config = dir.path().join("render.toml");
    fs::write(
        &config,
        format!(
            "[pool]\nthreads = 2\nunits_per_thread = 2\n\n[tools]\nprobe = \"{}\"\n",
            probe.display()
        ),
    )
    .expect("write config");

    striprender(&dir)
        .arg("--config-file")
        .arg(&config)
        .args(["plan", "doc.svg"])
        .assert()
        .success()
        .stdout(contains("0:0:40:80 -> 40x80 px, 4 units"));
}
