use std::error::Error;

use tracing::level_filters::LevelFilter;

use ohscan::cli::LogLevel;
use ohscan::logging::build_filter;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn cli_level_wins_over_environment() -> TestResult {
    let filter = build_filter(Some(LogLevel::Debug), Some("error"))?;
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    Ok(())
}

#[test]
fn environment_directives_are_honoured() -> TestResult {
    let filter = build_filter(None, Some("ohscan=trace"))?;
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));

    let filter = build_filter(None, Some(" warn "))?;
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    Ok(())
}

#[test]
fn defaults_to_info() -> TestResult {
    assert_eq!(build_filter(None, None)?.max_level_hint(), Some(LevelFilter::INFO));
    assert_eq!(build_filter(None, Some(""))?.max_level_hint(), Some(LevelFilter::INFO));
    Ok(())
}

#[test]
fn malformed_directives_are_rejected() {
    let err = build_filter(None, Some("ohscan=loud")).unwrap_err();
    assert!(format!("{err:#}").contains("OHSCAN_LOG"), "{err:#}");
}
