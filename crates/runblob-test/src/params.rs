//! Regression test parameters and operations

use crate::error::{TestError, TestResult};
use crate::pngio::{read_png, write_png};
use crate::{golden_dir, regout_dir};
use runblob_core::{HorizontalLine, Image};
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Regression test mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegTestMode {
    /// Generate golden files
    Generate,
    /// Compare with golden files (default)
    #[default]
    Compare,
    /// Display mode - run without comparison
    Display,
}

impl RegTestMode {
    /// Read `REGTEST_MODE`; anything but "generate" or "display" compares
    pub fn from_env() -> Self {
        match std::env::var("REGTEST_MODE")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "generate" => Self::Generate,
            "display" => Self::Display,
            _ => Self::Compare,
        }
    }
}

/// Regression test parameters
///
/// Tracks the test name, the running comparison index, the mode and
/// whether every comparison so far succeeded.
pub struct RegParams {
    /// Name of the test (e.g., "extract")
    pub test_name: String,
    /// Current test index (incremented before each test)
    index: usize,
    /// Test mode (generate, compare, or display)
    pub mode: RegTestMode,
    /// Overall success status
    success: bool,
    /// Recorded failures
    failures: Vec<String>,
}

impl RegParams {
    /// Start a regression test named `test_name`
    ///
    /// The mode comes from `REGTEST_MODE`. Output files are named
    /// `{test_name}.{index}.{ext}` in the regout directory.
    pub fn new(test_name: &str) -> Self {
        let mode = RegTestMode::from_env();

        // Ensure directories exist
        let _ = fs::create_dir_all(golden_dir());
        let _ = fs::create_dir_all(regout_dir());

        eprintln!();
        eprintln!("////////////////////////////////////////////////");
        eprintln!("////////////////   {}_reg   ///////////////", test_name);
        eprintln!("////////////////////////////////////////////////");
        eprintln!("Mode: {:?}", mode);

        Self {
            test_name: test_name.to_string(),
            index: 0,
            mode,
            success: true,
            failures: Vec::new(),
        }
    }

    /// Get the current test index
    pub fn index(&self) -> usize {
        self.index
    }

    /// Check if in display mode
    pub fn display(&self) -> bool {
        self.mode == RegTestMode::Display
    }

    fn next_index(&mut self) {
        self.index += 1;
    }

    fn fail(&mut self, what: &str, detail: String) -> bool {
        let msg = format!("{}_reg #{}: {} failed: {}", self.test_name, self.index, what, detail);
        eprintln!("{}", msg);
        self.failures.push(msg);
        self.success = false;
        false
    }

    fn local_path(&self, ext: &str) -> PathBuf {
        Path::new(&regout_dir()).join(format!("{}.{:02}.{}", self.test_name, self.index, ext))
    }

    fn golden_path(&self, ext: &str) -> PathBuf {
        Path::new(&golden_dir()).join(format!(
            "{}_golden.{:02}.{}",
            self.test_name, self.index, ext
        ))
    }

    /// Check that `actual` is within `delta` of `expected`
    pub fn compare_values(&mut self, expected: f64, actual: f64, delta: f64) -> bool {
        self.next_index();
        let diff = (expected - actual).abs();
        diff <= delta
            || self.fail(
                "value",
                format!("expected {expected}, got {actual} (|diff| {diff} > {delta})"),
            )
    }

    /// Check that two byte strings are identical
    pub fn compare_strings(&mut self, expected: &[u8], actual: &[u8]) -> bool {
        self.next_index();
        match expected.iter().zip(actual).position(|(a, b)| a != b) {
            None if expected.len() == actual.len() => true,
            at => self.fail(
                "bytes",
                format!(
                    "first difference at {} ({} vs {} bytes)",
                    at.unwrap_or(expected.len().min(actual.len())),
                    expected.len(),
                    actual.len()
                ),
            ),
        }
    }

    /// Check runs against `(y, x0, x1)` tuples, in order
    pub fn compare_lines(&mut self, expected: &[(u16, u16, u16)], actual: &[HorizontalLine]) -> bool {
        self.next_index();
        let got = |i: usize| actual.get(i).map(|l| (l.y, l.x0, l.x1));
        let first_bad = (0..expected.len().max(actual.len()))
            .find(|&i| expected.get(i).copied() != got(i));
        match first_bad {
            None => true,
            Some(i) => self.fail(
                "runs",
                format!("run {i}: expected {:?}, got {:?}", expected.get(i), got(i)),
            ),
        }
    }

    /// Check two images for identical geometry and pixels
    pub fn compare_images(&mut self, expected: &Image, actual: &Image) -> bool {
        self.next_index();
        let shape = |im: &Image| (im.width(), im.height(), im.channels());
        if shape(expected) != shape(actual) {
            return self.fail(
                "image",
                format!("shape {:?} vs {:?}", shape(expected), shape(actual)),
            );
        }
        match expected.data().iter().zip(actual.data()).position(|(a, b)| a != b) {
            None => true,
            Some(i) => {
                let px = (i / expected.channels().max(1)) as u32;
                let (x, y) = (px % expected.width(), px / expected.width());
                self.fail("image", format!("pixel ({x}, {y}) differs"))
            }
        }
    }

    /// Write `image` as PNG to the output directory and check it against
    /// its golden file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or encoded.
    pub fn write_image_and_check(&mut self, image: &Image) -> TestResult<()> {
        self.next_index();
        let path = self.local_path("png");
        let file = fs::File::create(&path)?;
        write_png(image, BufWriter::new(file)).map_err(|e| TestError::ImageWrite {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        self.check_file(&path, "png")
    }

    /// Write raw bytes with extension `ext` and check them against their
    /// golden file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_data_and_check(&mut self, data: &[u8], ext: &str) -> TestResult<()> {
        self.next_index();
        let path = self.local_path(ext);
        fs::write(&path, data)?;
        self.check_file(&path, ext)
    }

    /// Generate: copy to golden. Compare: byte-compare with golden, or
    /// pixel-compare for PNG. Display: nothing.
    fn check_file(&mut self, local: &Path, ext: &str) -> TestResult<()> {
        let golden = self.golden_path(ext);
        match self.mode {
            RegTestMode::Generate => {
                fs::copy(local, &golden)?;
                eprintln!("Generated: {}", golden.display());
            }
            RegTestMode::Compare if !golden.exists() => {
                self.fail("golden", format!("missing {}", golden.display()));
            }
            RegTestMode::Compare => {
                let same = fs::read(local)? == fs::read(&golden)?
                    || (ext == "png" && same_png_pixels(local, &golden));
                if !same {
                    self.fail(
                        "golden",
                        format!("{} differs from {}", local.display(), golden.display()),
                    );
                }
            }
            RegTestMode::Display => {}
        }
        Ok(())
    }

    /// Print the summary; `true` if every check passed
    pub fn cleanup(self) -> bool {
        if self.success {
            eprintln!("SUCCESS: {}_reg", self.test_name);
        } else {
            eprintln!("FAILURE: {}_reg", self.test_name);
            for failure in &self.failures {
                eprintln!("  {}", failure);
            }
        }
        eprintln!();

        self.success
    }

    /// Check if all tests have passed so far
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Get list of failures
    pub fn failures(&self) -> &[String] {
        &self.failures
    }
}

fn same_png_pixels(path1: &Path, path2: &Path) -> bool {
    let load = |path: &Path| {
        fs::File::open(path)
            .ok()
            .and_then(|f| read_png(BufReader::new(f)).ok())
    };
    match (load(path1), load(path2)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_env() {
        let mode = RegTestMode::from_env();
        assert!(matches!(
            mode,
            RegTestMode::Compare | RegTestMode::Generate | RegTestMode::Display
        ));
    }

    #[test]
    fn test_compare_values() {
        let mut rp = RegParams::new("params_values");
        assert!(rp.compare_values(100.0, 100.0, 0.0));
        assert!(rp.compare_values(100.0, 100.5, 1.0));
        assert!(rp.is_success());
        assert!(!rp.compare_values(100.0, 200.0, 0.0));
        assert!(!rp.is_success());
        assert_eq!(rp.index(), 3);
    }

    #[test]
    fn test_compare_strings() {
        let mut rp = RegParams::new("params_strings");
        assert!(rp.compare_strings(b"runs", b"runs"));
        assert!(!rp.compare_strings(b"runs", b"rung"));
        assert!(!rp.compare_strings(b"runs", b"run"));
        assert_eq!(rp.failures().len(), 2);
        assert!(rp.failures()[0].contains("params_strings_reg #2"));
    }

    #[test]
    fn test_compare_lines() {
        let mut rp = RegParams::new("params_lines");
        let lines = [HorizontalLine::new(0, 1, 2), HorizontalLine::new(1, 0, 3)];
        assert!(rp.compare_lines(&[(0, 1, 2), (1, 0, 3)], &lines));
        assert!(!rp.compare_lines(&[(0, 1, 2)], &lines));
        assert!(!rp.compare_lines(&[(0, 1, 2), (1, 0, 4)], &lines));
        assert_eq!(rp.failures().len(), 2);
    }

    #[test]
    fn test_compare_images() {
        let mut rp = RegParams::new("params_images");
        let a = Image::new(3, 2, 1).unwrap();
        let mut b = a.clone();
        assert!(rp.compare_images(&a, &b));
        b.data_mut()[4] = 1;
        assert!(!rp.compare_images(&a, &b));
        assert!(!rp.compare_images(&a, &Image::new(2, 3, 1).unwrap()));
    }
}
