use anyhow::Result;
use camwatch::{CamwatchApp, CamwatchConfig};
use clap::Parser;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "camwatch")]
#[command(about = "Multi-camera MJPEG streaming with periodic remote image classification")]
#[command(version)]
#[command(long_about = "Detects attached cameras, serves a live MJPEG stream per camera on \
its own port and periodically classifies one frame per camera through a remote prediction \
API, rotating through a roster of models. A read-only JSON API exposes cameras, recent \
predictions and errors.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "camwatch.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting the system")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Detect cameras, print them and exit
    #[arg(long, help = "Run camera detection, print the detected cameras as JSON and exit")]
    list_cameras: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args);

    info!("Starting camwatch v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match CamwatchConfig::load_from_file(&args.config) {
        Ok(config) => {
            info!("Configuration loaded from: {}", args.config);
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    if args.validate_config {
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let mut app = CamwatchApp::new(config).map_err(|e| {
        error!("Failed to create application: {}", e);
        e
    })?;

    if args.list_cameras {
        let cameras = app.detect_cameras().await;
        println!("{}", serde_json::to_string_pretty(cameras.as_ref())?);
        return Ok(());
    }

    app.initialize().await.map_err(|e| {
        error!("Failed to initialize system: {}", e);
        e
    })?;

    if let Err(e) = app.start().await {
        error!("Failed to start system: {}", e);
        app.shutdown().await?;
        return Err(e.into());
    }

    let exit_code = app.run().await.map_err(|e| {
        error!("System error during execution: {}", e);
        e
    })?;

    info!("camwatch exited with code: {}", exit_code);

    std::process::exit(exit_code);
}

fn init_logging(args: &Args) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("camwatch={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# camwatch configuration file");
    println!("# Every key is optional; environment variables such as");
    println!("# CAMWATCH_INFERENCE__MODELS=resnet50,mobilenet_v3 override it");
    println!();
    println!("{}", toml::to_string_pretty(&CamwatchConfig::default())?);
    Ok(())
}
