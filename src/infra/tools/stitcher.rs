use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::application::{Stitcher, ToolError};

use super::process::run_tool;

/// Appends tiles vertically with ImageMagick (`convert t0 t1 … -append out`).
#[derive(Debug, Clone)]
pub struct ImageMagickStitcher {
    program: PathBuf,
}

impl ImageMagickStitcher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn arguments(tiles: &[PathBuf], output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = tiles
            .iter()
            .map(|tile| tile.clone().into_os_string())
            .collect();
        args.push("-append".into());
        args.push(output.as_os_str().to_os_string());
        args
    }
}

impl Stitcher for ImageMagickStitcher {
    fn stitch(&self, tiles: &[PathBuf], output: &Path) -> Result<(), ToolError> {
        if tiles.is_empty() {
            return Err(ToolError::output("stitcher", "no tiles to stitch"));
        }
        run_tool("stitcher", &self.program, &Self::arguments(tiles, output)).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_tile_order_and_appends_vertically() {
        let tiles = vec![
            PathBuf::from("/s/tile-00000.png"),
            PathBuf::from("/s/tile-00001.png"),
            PathBuf::from("/s/tile-00002.png"),
        ];
        let args = ImageMagickStitcher::arguments(&tiles, Path::new("/out/final.png"));
        assert_eq!(
            args,
            vec![
                OsString::from("/s/tile-00000.png"),
                OsString::from("/s/tile-00001.png"),
                OsString::from("/s/tile-00002.png"),
                OsString::from("-append"),
                OsString::from("/out/final.png"),
            ]
        );
    }

    #[test]
    fn refuses_empty_tile_list() {
        let err = ImageMagickStitcher::new("convert")
            .stitch(&[], Path::new("/out/final.png"))
            .expect_err("no tiles");
        assert!(matches!(err, ToolError::Output { tool: "stitcher", .. }));
    }

    #[cfg(unix)]
    #[test]
    fn concatenates_through_fake_cli() {
        use std::fs;

        use tempfile::TempDir;

        use crate::infra::tools::test_support::write_script;

        let dir = TempDir::new().expect("temp dir");
        // Fake `convert`: concatenates every input before `-append` into the last argument.
        let script = write_script(
            dir.path(),
            "fake-convert",
            r#"out=""
inputs=""
seen_append=0
for arg in "$@"; do
  if [ "$arg" = "-append" ]; then seen_append=1; continue; fi
  if [ "$seen_append" = 1 ]; then out="$arg"; else inputs="$inputs $arg"; fi
done
cat $inputs > "$out"
"#,
        );
        let tiles: Vec<PathBuf> = (0..3)
            .map(|unit| {
                let path = dir.path().join(format!("tile-{unit:05}.png"));
                fs::write(&path, format!("{unit}\n")).expect("tile");
                path
            })
            .collect();
        let output = dir.path().join("final.png");

        ImageMagickStitcher::new(&script)
            .stitch(&tiles, &output)
            .expect("stitched");

        assert_eq!(fs::read_to_string(&output).expect("output"), "0\n1\n2\n");
    }
}
