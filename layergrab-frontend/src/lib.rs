pub mod cli;
pub mod errors;
pub mod loader;

use std::path::PathBuf;

use cli::OutputFormat;
use errors::FrontendError;
use layergrab_config::{ExtractionConfig, HostConfig, OutputMode};
use layergrab_engine::{Extraction, Extractor, PointMode, ResolverCache, RetryPolicy, RunConfig};
use loader::LoadedDrawing;
use tracing::info;

/// 一次命令行提取请求。
#[derive(Debug, Clone)]
pub struct ExtractRequest {
    pub input: Option<PathBuf>,
    pub run: RunConfig,
    pub retry: RetryPolicy,
    pub format: OutputFormat,
}

pub fn run_config_from(config: &ExtractionConfig) -> RunConfig {
    RunConfig {
        target_layers: config.layers.clone(),
        mode: match config.mode {
            OutputMode::Center => PointMode::Center,
            OutputMode::Corners => PointMode::Corners,
        },
        id_prefix: config.id_prefix.clone(),
        start_number: config.start_number,
        decimal_precision: config.decimal_precision,
        restrict_to_top_level_only: config.top_level_only,
        ..RunConfig::default()
    }
}

pub fn retry_policy_from(config: &HostConfig) -> RetryPolicy {
    RetryPolicy {
        max_attempts: config.max_attempts,
        initial_delay: config.initial_delay(),
        backoff_factor: config.backoff_factor,
        max_delay: config.max_delay(),
    }
}

/// 对已加载的图纸执行一次提取。
pub fn extract(loaded: &LoadedDrawing, request: &ExtractRequest) -> Result<Extraction, FrontendError> {
    let mut extractor = Extractor::new(&loaded.drawing, request.retry, ResolverCache::new());
    Ok(extractor.run(&request.run)?)
}

/// 加载图纸、执行提取并把结果打印到标准输出。
pub fn run_cli(request: &ExtractRequest) -> Result<Extraction, FrontendError> {
    let loaded = loader::load_drawing(request.input.as_deref())?;
    info!(source = %cli::describe_source(&loaded.source), "开始提取");
    let extraction = extract(&loaded, request)?;
    match request.format {
        OutputFormat::Table => {
            println!("{}", cli::describe_source(&loaded.source));
            print!(
                "{}",
                cli::render_table(&extraction, request.run.decimal_precision as usize)
            );
        }
        OutputFormat::Json => println!("{}", cli::render_json(&extraction)?),
    }
    Ok(extraction)
}

#[cfg(test)]
mod tests {
    use layergrab_core::geometry::Point3;
    use layergrab_engine::errors::ExtractError;

    use super::*;
    use crate::loader::{DocumentSource, demo_drawing};

    fn demo() -> LoadedDrawing {
        LoadedDrawing {
            drawing: demo_drawing(),
            source: DocumentSource::Demo,
        }
    }

    fn request(mode: OutputMode) -> ExtractRequest {
        let config = ExtractionConfig {
            layers: vec!["FOUND".into()],
            mode,
            ..ExtractionConfig::default()
        };
        ExtractRequest {
            input: None,
            run: run_config_from(&config),
            retry: RetryPolicy::immediate(1),
            format: OutputFormat::Table,
        }
    }

    #[test]
    fn demo_in_corner_mode_yields_instance_then_top_level_corners() {
        let extraction = extract(&demo(), &request(OutputMode::Corners)).unwrap();
        assert_eq!(extraction.points.len(), 12);
        assert_eq!(extraction.points[0].id, "P1_NW");
        assert_eq!(extraction.points[0].coordinates, Point3::new(100.0, 102.0, 0.0));
        assert_eq!(extraction.points[7].coordinates, Point3::new(112.0, 100.0, 0.0));
        assert_eq!(extraction.points[11].id, "P12_SE");
        assert_eq!(extraction.points[11].coordinates, Point3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn demo_in_center_mode_yields_one_point_per_group() {
        let extraction = extract(&demo(), &request(OutputMode::Center)).unwrap();
        let ids: Vec<_> = extraction.points.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["P1", "P2", "P3"]);
    }

    #[test]
    fn config_values_flow_into_the_run() {
        let host = HostConfig {
            max_attempts: 7,
            ..HostConfig::default()
        };
        let policy = retry_policy_from(&host);
        assert_eq!(policy.max_attempts, 7);
        assert_eq!(policy.max_delay, host.max_delay());

        let mut bad = request(OutputMode::Center);
        bad.run.target_layers.clear();
        assert!(matches!(
            extract(&demo(), &bad),
            Err(FrontendError::Extract(ExtractError::NoTargetLayers))
        ));
    }
}
