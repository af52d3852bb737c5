//! Entry point for Clipview.
//! Logging + command-line configuration, then hand over to the platform host.

use std::path::PathBuf;

use anyhow::Result;
use platform::{FeedMode, ViewerConfig};

fn parse_backend_arg(args: &[String]) -> wgpu::Backends {
    // Accept: --gpu-backend=auto|vulkan|dx12|metal|gl
    let mut backends = wgpu::Backends::all(); // default = auto
    for arg in args {
        if let Some(val) = arg.strip_prefix("--gpu-backend=") {
            backends = match val.to_ascii_lowercase().as_str() {
                "auto" => wgpu::Backends::all(),
                "vulkan" | "vk" => wgpu::Backends::VULKAN,
                "dx12" | "d3d12" => wgpu::Backends::DX12,
                "metal" | "mtl" => wgpu::Backends::METAL,
                "gl" | "opengl" | "gles" => wgpu::Backends::GL,
                other => {
                    log::warn!("Unknown backend '{}', falling back to auto.", other);
                    wgpu::Backends::all()
                }
            };
        }
    }
    backends
}

/// `--name`, `--name=on|off`; `default` when absent.
fn parse_switch(args: &[String], name: &str, default: bool) -> bool {
    let flag = format!("--{name}");
    let prefix = format!("--{name}=");
    let mut value = default;
    for arg in args {
        if *arg == flag {
            value = true;
        } else if let Some(val) = arg.strip_prefix(&prefix) {
            value = matches!(
                val.to_ascii_lowercase().as_str(),
                "1" | "true" | "on" | "yes"
            );
        }
    }
    value
}

fn parse_size_args(args: &[String]) -> (u32, u32) {
    let mut w: Option<u32> = None;
    let mut h: Option<u32> = None;

    for arg in args {
        if let Some(v) = arg.strip_prefix("--size=") {
            if let Some((sw, sh)) = v.split_once('x').or_else(|| v.split_once('X')) {
                if let (Ok(pw), Ok(ph)) = (sw.parse::<u32>(), sh.parse::<u32>()) {
                    w = Some(pw);
                    h = Some(ph);
                }
            }
        } else if let Some(v) = arg.strip_prefix("--width=") {
            if let Ok(pw) = v.parse::<u32>() {
                w = Some(pw);
            }
        } else if let Some(v) = arg.strip_prefix("--height=") {
            if let Ok(ph) = v.parse::<u32>() {
                h = Some(ph);
            }
        }
    }

    let ww = w.unwrap_or(1280).max(1);
    let hh = h.unwrap_or(720).max(1);
    (ww, hh)
}

fn parse_model_arg(args: &[String]) -> Option<PathBuf> {
    args.iter()
        .rev()
        .find_map(|arg| arg.strip_prefix("--model="))
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
}

fn parse_feed_arg(args: &[String]) -> FeedMode {
    // --orientation-feed=stdin|demo|off
    let Some(val) = args
        .iter()
        .rev()
        .find_map(|arg| arg.strip_prefix("--orientation-feed="))
    else {
        return FeedMode::default();
    };
    val.parse().unwrap_or_else(|e| {
        log::warn!("{e}, using stdin");
        FeedMode::Stdin
    })
}

fn build_config(args: &[String]) -> ViewerConfig {
    let (width, height) = parse_size_args(args);
    let mut config = ViewerConfig {
        width,
        height,
        model_path: parse_model_arg(args),
        feed: parse_feed_arg(args),
        ..ViewerConfig::default()
    };
    config.surface.backends = parse_backend_arg(args);
    config.surface.vsync = parse_switch(args, "vsync", true);
    config.surface.fit_model = !parse_switch(args, "no-fit", false);
    config
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = build_config(&args);
    log::info!(
        "Starting Clipview. Backend: {:?}, vsync={}, window_size={}x{}, model={}, feed={:?}",
        config.surface.backends,
        config.surface.vsync,
        config.width,
        config.height,
        config
            .model_path
            .as_ref()
            .map_or_else(|| "<built-in>".to_owned(), |p| p.display().to_string()),
        config.feed
    );

    platform::run_viewer(config)?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_without_arguments() {
        let cfg = build_config(&[]);
        assert_eq!((cfg.width, cfg.height), (1280, 720));
        assert_eq!(cfg.model_path, None);
        assert_eq!(cfg.feed, FeedMode::Stdin);
        assert_eq!(cfg.surface.backends, wgpu::Backends::all());
        assert!(cfg.surface.vsync);
        assert!(cfg.surface.fit_model);
    }

    #[test]
    fn parses_every_flag() {
        let cfg = build_config(&args(&[
            "--size=800x600",
            "--gpu-backend=vk",
            "--model=assets/clip.obj",
            "--orientation-feed=demo",
            "--vsync=off",
            "--no-fit",
        ]));
        assert_eq!((cfg.width, cfg.height), (800, 600));
        assert_eq!(cfg.surface.backends, wgpu::Backends::VULKAN);
        assert_eq!(cfg.model_path, Some(PathBuf::from("assets/clip.obj")));
        assert_eq!(cfg.feed, FeedMode::Demo);
        assert!(!cfg.surface.vsync);
        assert!(!cfg.surface.fit_model);
    }

    #[test]
    fn bad_values_fall_back() {
        let cfg = build_config(&args(&[
            "--size=wide",
            "--height=0",
            "--gpu-backend=glide",
            "--orientation-feed=serial",
        ]));
        assert_eq!((cfg.width, cfg.height), (1280, 1));
        assert_eq!(cfg.surface.backends, wgpu::Backends::all());
        assert_eq!(cfg.feed, FeedMode::Stdin);
    }
}
