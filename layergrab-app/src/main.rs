use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use layergrab_config::{AppConfig, ConfigError, OutputMode};
use layergrab_core::document::EntityId;
use layergrab_frontend::cli::OutputFormat;
use layergrab_frontend::{ExtractRequest, retry_policy_from, run_config_from};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Center,
    Corners,
}

/// 按图层提取块参照与顶层图元的代表点。
#[derive(Debug, Parser)]
#[command(name = "layergrab", version)]
struct Args {
    /// DXF 文件；缺省时读取 `LAYERGRAB_SAMPLE_DXF`，再缺省则使用内置示例
    input: Option<PathBuf>,

    /// 配置文件路径，覆盖自动发现
    #[arg(long)]
    config: Option<PathBuf>,

    /// 目标图层，可重复
    #[arg(short, long = "layer")]
    layers: Vec<String>,

    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    /// 点编号前缀
    #[arg(long)]
    prefix: Option<String>,

    /// 起始编号
    #[arg(long)]
    start: Option<u64>,

    /// 输出坐标保留的小数位（0..=12）
    #[arg(long)]
    precision: Option<u32>,

    /// 只处理顶层图元，忽略块参照
    #[arg(long)]
    top_level_only: bool,

    /// 只处理这些顶层实体 ID，可重复
    #[arg(long = "select", value_name = "ID")]
    selection: Vec<u64>,

    /// 以 JSON 输出
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let mut config = load_configuration(args.config.clone());
    init_logging(&config);
    info!("启动 layergrab");

    apply_overrides(&mut config, &args);
    let mut run = run_config_from(&config.extraction);
    if !args.selection.is_empty() {
        run.restrict_to_selection_only = true;
        run.selection = args.selection.iter().copied().map(EntityId::new).collect();
    }
    let request = ExtractRequest {
        input: args.input,
        run,
        retry: retry_policy_from(&config.host),
        format: if args.json {
            OutputFormat::Json
        } else {
            OutputFormat::Table
        },
    };

    if let Err(err) = layergrab_frontend::run_cli(&request) {
        error!(error = %err, "提取失败");
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn apply_overrides(config: &mut AppConfig, args: &Args) {
    let extraction = &mut config.extraction;
    if !args.layers.is_empty() {
        extraction.layers = args.layers.clone();
    }
    if let Some(mode) = args.mode {
        extraction.mode = match mode {
            ModeArg::Center => OutputMode::Center,
            ModeArg::Corners => OutputMode::Corners,
        };
    }
    if let Some(prefix) = &args.prefix {
        extraction.id_prefix = prefix.clone();
    }
    if let Some(start) = args.start {
        extraction.start_number = start;
    }
    if let Some(precision) = args.precision {
        extraction.decimal_precision = precision;
    }
    if args.top_level_only {
        extraction.top_level_only = true;
    }
}

fn load_configuration(override_path: Option<PathBuf>) -> AppConfig {
    match override_path {
        Some(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "加载指定配置失败，使用默认配置");
            AppConfig::default()
        }),
        None => match AppConfig::discover() {
            Ok(cfg) => cfg,
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                        warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
                    }
                    ConfigError::Context { .. } => {
                        warn!(error = %err, "加载默认配置失败，使用内建默认值");
                    }
                }
                AppConfig::default()
            }
        },
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
