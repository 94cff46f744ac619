use clap::Parser;
use flourish_core::config::EffectsConfig;
use flourish_core::utils::geometry::Extent;
use flourish_core::{RenderEventLoop, RenderLoopRunArgs};
use std::path::PathBuf;

const PROCESS_EXIT_CODE_ERROR: i32 = 1;

#[derive(Parser, Debug)]
#[command(version, about = "Decorative pointer effects in a transparent window")]
struct Args {
    /// Path of a JSON config file, defaults to <config dir>/flourish/config.json
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Disable all animation, only the static cursor is drawn
    #[arg(long)]
    reduced_motion: bool,

    /// Initial window width in logical pixels
    #[arg(long, default_value_t = 1024.0, value_parser = parse_window_dimension)]
    width: f64,

    /// Initial window height in logical pixels
    #[arg(long, default_value_t = 768.0, value_parser = parse_window_dimension)]
    height: f64,

    /// Seed for particle randomness
    #[arg(long)]
    seed: Option<u64>,
}

fn parse_window_dimension(value: &str) -> Result<f64, String> {
    let dimension: f64 = value
        .parse()
        .map_err(|e| format!("`{value}` is not a number: {e}"))?;
    if !dimension.is_finite() || dimension <= 0.0 {
        return Err(format!("`{value}` must be a finite positive size"));
    }
    Ok(dimension)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::info!("main: {args:?}");

    let config = EffectsConfig::load(args.config.as_deref()).unwrap_or_else(|e| {
        log::error!("main: failed to load config, using defaults: {e}");
        EffectsConfig::default()
    });
    let mut config = config.with_env_overrides();
    if args.reduced_motion {
        config.reduced_motion = true;
    }

    let input = RenderLoopRunArgs {
        config,
        extent: Extent::new(args.width, args.height),
        seed: args.seed,
    };

    let result = RenderEventLoop::new().and_then(|event_loop| event_loop.run(input));
    if let Err(e) = result {
        log::error!("main: {e}");
        std::process::exit(PROCESS_EXIT_CODE_ERROR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_dimension_must_be_finite_and_positive() {
        assert_eq!(parse_window_dimension("640"), Ok(640.0));
        assert_eq!(parse_window_dimension("1.5e3"), Ok(1500.0));
        for bad in ["NaN", "inf", "-200", "0", "wide"] {
            assert!(parse_window_dimension(bad).is_err(), "{bad} accepted");
        }
    }

    #[test]
    fn test_cli_rejects_nan_extent() {
        assert!(Args::try_parse_from(["flourish", "--width", "NaN"]).is_err());
        assert!(Args::try_parse_from(["flourish", "--height", "-1"]).is_err());

        let args = Args::try_parse_from(["flourish", "--width", "800"]).unwrap();
        assert_eq!(args.width, 800.0);
        assert_eq!(args.height, 768.0);
    }
}
