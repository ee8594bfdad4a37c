use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::{
    application::{DimensionProbe, ToolError},
    domain::Region,
};

use super::process::run_tool;

/// Queries a document's drawing bounds with `inkscape --query-*`.
#[derive(Debug, Clone)]
pub struct InkscapeProbe {
    program: PathBuf,
}

impl InkscapeProbe {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl DimensionProbe for InkscapeProbe {
    fn probe(&self, input: &Path) -> Result<Region, ToolError> {
        let args: [OsString; 5] = [
            "--query-x".into(),
            "--query-y".into(),
            "--query-width".into(),
            "--query-height".into(),
            input.as_os_str().to_os_string(),
        ];
        let stdout = run_tool("probe", &self.program, &args)?;
        parse_bounds(&String::from_utf8_lossy(&stdout))
    }
}

/// Parse `x`, `y`, `width` and `height`, one per line (or comma separated),
/// widening to whole document units so no part of the drawing is cropped.
fn parse_bounds(stdout: &str) -> Result<Region, ToolError> {
    let values = stdout
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| ToolError::output("probe", format!("not a number: `{token}`")))
        })
        .collect::<Result<Vec<f64>, ToolError>>()?;

    let [x, y, width, height] = values.as_slice() else {
        return Err(ToolError::output(
            "probe",
            format!("expected 4 values, got {}", values.len()),
        ));
    };
    if *width <= 0.0 || *height <= 0.0 {
        return Err(ToolError::output(
            "probe",
            format!("document has no drawable area ({width}x{height})"),
        ));
    }

    Ok(Region::new(
        x.floor() as i64,
        y.floor() as i64,
        (x + width).ceil() as i64,
        (y + height).ceil() as i64,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_one_value_per_line() {
        let region = parse_bounds("0\n0\n595.276\n841.89\n").expect("bounds");
        assert_eq!(region, Region::new(0, 0, 596, 842));
    }

    #[test]
    fn fractional_bounds_are_widened_not_cropped() {
        let region = parse_bounds("0\n0\n100.3\n200.4\n").expect("bounds");
        assert_eq!(region, Region::new(0, 0, 101, 201));
    }

    #[test]
    fn parses_comma_separated_values_with_offset() {
        let region = parse_bounds("10.4,-3.6,100,50").expect("bounds");
        assert_eq!(region, Region::new(10, -4, 111, 47));
    }

    #[test]
    fn rejects_wrong_value_count() {
        let err = parse_bounds("1\n2\n3\n").expect_err("three values");
        assert!(matches!(err, ToolError::Output { .. }));
    }

    #[test]
    fn rejects_garbage_and_empty_drawings() {
        assert!(parse_bounds("0\n0\nwide\n10\n").is_err());
        assert!(parse_bounds("0\n0\n0\n10\n").is_err());
        assert!(parse_bounds("0\n0\nNaN\n10\n").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn queries_through_fake_cli() {
        use tempfile::TempDir;

        use crate::infra::tools::test_support::write_script;

        let dir = TempDir::new().expect("temp dir");
        let script = write_script(
            dir.path(),
            "fake-inkscape",
            r#"[ "$1" = "--query-x" ] || { echo "unexpected $1" >&2; exit 3; }
printf '0\n0\n800\n6000\n'
"#,
        );
        let region = InkscapeProbe::new(&script)
            .probe(Path::new("/docs/map.svg"))
            .expect("probe");
        assert_eq!(region, Region::new(0, 0, 800, 6000));
    }
}
