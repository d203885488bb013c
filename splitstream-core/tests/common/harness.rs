//! Test harness for running the splitter over arbitrary chunkings

use crate::common::{Gen, TestCase};
use splitstream_core::{Format, SplitError, Splitter, SplitterConfig};

/// Everything a run produced: objects in order, then the error (if any)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub objects: Vec<Vec<u8>>,
    pub error: Option<String>,
}

impl Outcome {
    pub fn ok(objects: &[&[u8]]) -> Self {
        Self {
            objects: objects.iter().map(|o| o.to_vec()).collect(),
            error: None,
        }
    }
}

/// Short error name for comparison
pub fn describe(err: &SplitError) -> String {
    match err {
        SplitError::Syntax(e) => format!("{:?}", e.kind),
        SplitError::OutOfMemory { .. } => "OutOfMemory".to_string(),
        SplitError::ObjectTooLarge { .. } => "ObjectTooLarge".to_string(),
        SplitError::TruncatedStream { .. } => "TruncatedStream".to_string(),
        SplitError::Closed => "Closed".to_string(),
    }
}

/// Everything a run produced, with the error kept whole (sizes, offsets and
/// partial bytes included)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub objects: Vec<Vec<u8>>,
    pub error: Option<SplitError>,
}

/// Feed `input` cut at the given (ascending) positions, then close
pub fn split_chunked(config: &SplitterConfig, input: &[u8], cuts: &[usize]) -> Run {
    let mut splitter = Splitter::with_config(config.clone());
    let mut objects = Vec::new();
    let mut error = None;

    let mut prev = 0;
    for &cut in cuts.iter().chain(std::iter::once(&input.len())) {
        let cut = cut.clamp(prev, input.len());
        if let Err(e) = splitter.feed(&input[prev..cut]) {
            error = Some(e);
            break;
        }
        objects.extend(splitter.drain().map(|b| b.to_vec()));
        prev = cut;
    }
    if error.is_none() {
        error = splitter.close().err();
    }
    objects.extend(splitter.drain().map(|b| b.to_vec()));

    Run { objects, error }
}

/// Feed `input` in one call, then close
pub fn split_whole(config: &SplitterConfig, input: &[u8]) -> Run {
    split_chunked(config, input, &[])
}

/// Like [`split_chunked`], with the error reduced to its name
pub fn run_chunked(config: &SplitterConfig, input: &[u8], cuts: &[usize]) -> Outcome {
    let run = split_chunked(config, input, cuts);
    Outcome {
        objects: run.objects,
        error: run.error.as_ref().map(describe),
    }
}

/// Feed `input` in one call, then close
pub fn run_whole(config: &SplitterConfig, input: &[u8]) -> Outcome {
    run_chunked(config, input, &[])
}

/// Result of running a fixture case
#[derive(Debug)]
pub struct TestResult {
    pub passed: bool,
    pub input: Vec<u8>,
    pub cuts: Vec<usize>,
    pub expected: Outcome,
    pub actual: Outcome,
    pub seed: u64,
}

fn case_config(case: &TestCase, format: Format) -> SplitterConfig {
    let mut config = SplitterConfig::new(format).with_start_depth(case.start_depth);
    config.max_object_size = case.max_object_size;
    config
}

fn case_expected(case: &TestCase) -> Outcome {
    Outcome {
        objects: case.objects.iter().map(|o| o.as_bytes().to_vec()).collect(),
        error: case.error.clone(),
    }
}

/// Run a single test case (canonical, one chunk)
pub fn run_test(case: &TestCase, format: Format) -> TestResult {
    let input = case.input.as_bytes().to_vec();
    let expected = case_expected(case);
    let actual = run_whole(&case_config(case, format), &input);

    TestResult {
        passed: actual == expected,
        input,
        cuts: Vec::new(),
        expected,
        actual,
        seed: 0,
    }
}

/// Run test with stochastic variations
///
/// Applies independent variations:
/// - 40% chance of a generated object above
/// - Random whitespace before (and, without an expected error, after) the case input
/// - 40% chance of a generated object below (only when no error is expected)
/// - Random chunking of the whole input
pub fn run_with_variations(case: &TestCase, format: Format, gen: &mut Gen) -> TestResult {
    let mut expected = case_expected(case);
    let mut input = Vec::new();
    let wrap = case.start_depth == 0 && case.max_object_size.is_none();

    // 40% chance: add an object above
    if wrap && gen.chance(0.4) {
        let above = gen.document(format);
        input.extend(&above);
        expected.objects.insert(0, above);
        input.extend(gen.separator());
    }

    input.extend(gen.whitespace_run());
    input.extend(case.input.as_bytes());
    // Trailing bytes could turn a truncation into a different error
    if expected.error.is_none() {
        input.extend(gen.whitespace_run());
    }

    // 40% chance: add an object below
    if wrap && expected.error.is_none() && gen.chance(0.4) {
        input.push(b' ');
        let below = gen.document(format);
        input.extend(&below);
        expected.objects.push(below);
    }

    let cuts = gen.cuts(input.len());
    let actual = run_chunked(&case_config(case, format), &input, &cuts);

    TestResult {
        passed: actual == expected,
        input,
        cuts,
        expected,
        actual,
        seed: gen.seed,
    }
}

impl TestResult {
    /// Print detailed failure info
    pub fn print_failure(&self, case_id: &str) {
        eprintln!("\n=== FAILED: {} ===", case_id);
        eprintln!(
            "Seed: {} (set SPLITSTREAM_TEST_SEED={} to reproduce)",
            self.seed, self.seed
        );
        eprintln!("\nInput:");
        eprintln!("{}", String::from_utf8_lossy(&self.input));
        eprintln!("\nCuts: {:?}", self.cuts);
        eprintln!("\nExpected objects:");
        for (i, o) in self.expected.objects.iter().enumerate() {
            eprintln!("  {}: {}", i, String::from_utf8_lossy(o));
        }
        eprintln!("Expected error: {:?}", self.expected.error);
        eprintln!("\nActual objects:");
        for (i, o) in self.actual.objects.iter().enumerate() {
            eprintln!("  {}: {}", i, String::from_utf8_lossy(o));
        }
        eprintln!("Actual error: {:?}", self.actual.error);
    }
}
