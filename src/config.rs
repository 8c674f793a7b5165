// Config Module - Configuration management and command-line argument parsing
use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::types::Theme;

// Global storage for custom config path
static CUSTOM_CONFIG_PATH: OnceLock<Option<String>> = OnceLock::new();

const APP_DIR: &str = "glowgrid";

#[derive(Parser, Debug, Default)]
#[command(
    author,
    version,
    about = "Animated neon grid background with floating orbs and a cursor particle trail",
    long_about = "Renders a drifting grid, glowing orbs and a pointer-driven particle trail.\n\
                  Runs interactively in the terminal (mouse drives the trail) or headless,\n\
                  writing a PNG snapshot. Frames can also be streamed to a WLED matrix via DDP."
)]
pub struct Args {
    /// Host mode (terminal, headless)
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Color theme (dark, light)
    #[arg(short, long)]
    pub theme: Option<String>,

    /// Target framerate (frames per second)
    #[arg(long)]
    pub fps: Option<f64>,

    /// RNG seed for orbs and particles (0 = random)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Headless surface width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Headless surface height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Number of frames to render in headless mode
    #[arg(long)]
    pub frames: Option<u64>,

    /// PNG path written at the end of a headless run
    #[arg(long)]
    pub snapshot: Option<String>,

    /// WLED device address; enables LED matrix output
    #[arg(short, long)]
    pub wled_ip: Option<String>,

    /// Write logs to this file (terminal mode logs nowhere otherwise)
    #[arg(long)]
    pub log_file: Option<String>,

    /// Config file path or name (e.g., --cfg /full/path or --cfg myconf for ~/.config/glowgrid/myconf.conf)
    #[arg(long)]
    pub cfg: Option<String>,

    /// Quiet mode
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    pub mode: String,
    pub theme: String,
    pub fps: f64,
    pub seed: u64,
    pub pixels_per_cell: f64,
    pub show_cursor: bool,

    pub headless_width: u32,
    pub headless_height: u32,
    pub headless_frames: u64,
    pub snapshot_path: String,

    // Palette overrides, empty keeps the theme default
    pub dark_wash: String,
    pub dark_grid: String,
    pub dark_particle: String,
    pub dark_backdrop: String,
    pub light_wash: String,
    pub light_grid: String,
    pub light_particle: String,
    pub light_backdrop: String,

    pub wled_enabled: bool,
    pub wled_ip: String,
    pub matrix_width: usize,
    pub matrix_height: usize,
    pub matrix_serpentine: bool,
    pub global_brightness: f64,

    pub log_file: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            config_path: None,
            mode: "terminal".to_string(),
            theme: "dark".to_string(),
            fps: 60.0,
            seed: 0,
            pixels_per_cell: 8.0,
            show_cursor: true,
            headless_width: 800,
            headless_height: 600,
            headless_frames: 120,
            snapshot_path: "glowgrid.png".to_string(),
            dark_wash: String::new(),
            dark_grid: String::new(),
            dark_particle: String::new(),
            dark_backdrop: String::new(),
            light_wash: String::new(),
            light_grid: String::new(),
            light_particle: String::new(),
            light_backdrop: String::new(),
            wled_enabled: false,
            wled_ip: String::new(),
            matrix_width: 32,
            matrix_height: 16,
            matrix_serpentine: true,
            global_brightness: 1.0,
            log_file: String::new(),
        }
    }
}

impl AppConfig {
    pub fn merge_with_args(&mut self, args: &Args) -> bool {
        // Track if any args were actually provided
        let mut args_provided = false;

        if let Some(ref mode) = args.mode {
            self.mode = mode.clone();
            args_provided = true;
        }

        if let Some(ref theme) = args.theme {
            self.theme = theme.clone();
            args_provided = true;
        }

        if let Some(fps) = args.fps {
            self.fps = fps;
            args_provided = true;
        }

        if let Some(seed) = args.seed {
            self.seed = seed;
            args_provided = true;
        }

        if let Some(width) = args.width {
            self.headless_width = width;
            args_provided = true;
        }

        if let Some(height) = args.height {
            self.headless_height = height;
            args_provided = true;
        }

        if let Some(frames) = args.frames {
            self.headless_frames = frames;
            args_provided = true;
        }

        if let Some(ref snapshot) = args.snapshot {
            self.snapshot_path = snapshot.clone();
            args_provided = true;
        }

        // Giving an address implies the user wants the matrix fed
        if let Some(ref wled_ip) = args.wled_ip {
            self.wled_ip = wled_ip.clone();
            self.wled_enabled = true;
            args_provided = true;
        }

        if let Some(ref log_file) = args.log_file {
            self.log_file = log_file.clone();
            args_provided = true;
        }

        args_provided
    }

    /// Set the global config path (called once at startup)
    pub fn set_config_path(cfg: Option<String>) {
        let _ = CUSTOM_CONFIG_PATH.set(cfg);
    }

    fn get_config_path_arg() -> Option<&'static str> {
        CUSTOM_CONFIG_PATH.get().and_then(|opt| opt.as_deref())
    }

    pub fn config_path(cfg_arg: Option<&str>) -> Result<PathBuf> {
        // Priority: explicit arg > global > None
        let cfg = cfg_arg.or_else(|| Self::get_config_path_arg());

        if let Some(cfg) = cfg {
            let path = PathBuf::from(cfg);
            if path.is_absolute() || cfg.contains('/') || cfg.contains('\\') {
                return Ok(path);
            }

            // Bare name: lives in the config directory
            let filename = if cfg.ends_with(".conf") {
                cfg.to_string()
            } else {
                format!("{}.conf", cfg)
            };
            Ok(Self::config_dir()?.join(filename))
        } else {
            Ok(Self::config_dir()?.join("config.conf"))
        }
    }

    fn config_dir() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        let config_dir = PathBuf::from(home).join(".config").join(APP_DIR);
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("creating {}", config_dir.display()))?;
        Ok(config_dir)
    }

    pub fn load_with_path(cfg_arg: Option<&str>) -> Result<Self> {
        let path = Self::config_path(cfg_arg)?;
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let mut parsed = Self::from_toml_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        parsed.config_path = Some(path);
        Ok(parsed)
    }

    pub fn load() -> Result<Self> {
        Self::load_with_path(None)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut parsed: Self = toml::from_str(contents)?;
        parsed.sanitize();
        Ok(parsed)
    }

    /// Sanitize config values to handle common formatting issues
    pub fn sanitize(&mut self) {
        self.mode = self.mode.trim().to_lowercase();
        self.theme = self.theme.trim().to_lowercase();
        self.snapshot_path = self.snapshot_path.trim().to_string();
        self.wled_ip = self.wled_ip.trim().to_string();
        self.log_file = self.log_file.trim().to_string();

        for color in [
            &mut self.dark_wash,
            &mut self.dark_grid,
            &mut self.dark_particle,
            &mut self.dark_backdrop,
            &mut self.light_wash,
            &mut self.light_grid,
            &mut self.light_particle,
            &mut self.light_backdrop,
        ] {
            *color = color.trim().to_string();
        }

        // Unknown theme names fall back to dark rather than failing the reload
        if Theme::from_string(&self.theme).is_none() {
            self.theme = "dark".to_string();
        }

        // Clamp numeric values to reasonable ranges
        self.fps = if self.fps.is_finite() { self.fps.clamp(1.0, 240.0) } else { 60.0 };
        self.pixels_per_cell = if self.pixels_per_cell.is_finite() {
            self.pixels_per_cell.clamp(1.0, 64.0)
        } else {
            8.0
        };
        self.headless_width = self.headless_width.clamp(1, 8192);
        self.headless_height = self.headless_height.clamp(1, 8192);
        self.headless_frames = self.headless_frames.min(1_000_000);
        self.matrix_width = self.matrix_width.clamp(1, 1024);
        self.matrix_height = self.matrix_height.clamp(1, 1024);
        self.global_brightness = if self.global_brightness.is_finite() {
            self.global_brightness.clamp(0.0, 1.0)
        } else {
            1.0
        };
    }

    pub fn theme(&self) -> Theme {
        Theme::from_string(&self.theme).unwrap_or(Theme::Dark)
    }

    pub fn save(&self) -> Result<()> {
        let path = match self.config_path.clone() {
            Some(path) => path,
            None => Self::config_path(None)?,
        };

        std::fs::write(&path, self.to_toml_string())
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// Commented TOML document of the sanitized config
    pub fn to_toml_string(&self) -> String {
        let mut c = self.clone();
        c.sanitize();

        format!(
            r##"# Glowgrid Configuration File
# Edit this file while the program is running to change settings in real-time
# Theme and fps apply immediately; a mode change switches hosts

# Host mode
# Options: "terminal" (interactive, mouse drives the trail), "headless" (renders frames to a PNG)
mode = {}

# Color theme
# Options: "dark", "light"
theme = {}

# Target framerate (1-240)
fps = {:?}

# RNG seed for orbs and particles; 0 picks a random seed every run
seed = {}

# Terminal mode - surface pixels per terminal column (each row holds two pixel rows)
pixels_per_cell = {:?}

# Draw a ring at the pointer position
show_cursor = {}

# Headless mode - surface size in pixels
headless_width = {}
headless_height = {}

# Headless mode - frames rendered before the snapshot is written
headless_frames = {}

# Headless mode - PNG output path
snapshot_path = {}

# Palette overrides - any CSS color ("#0ff", "rgba(0, 255, 255, 0.15)", "hsla(...)")
# Leave empty to use the theme default. Backdrops are 6-digit hex ("0a0a0f").
dark_wash = {}
dark_grid = {}
dark_particle = {}
dark_backdrop = {}
light_wash = {}
light_grid = {}
light_particle = {}
light_backdrop = {}

# LED Matrix Output - stream frames to a WLED device over DDP (port 4048)
wled_enabled = {}
wled_ip = {}

# LED Matrix Output - matrix size in LEDs
matrix_width = {}
matrix_height = {}

# LED Matrix Output - odd rows run right-to-left
matrix_serpentine = {}

# LED Matrix Output - brightness multiplier (0.0 to 1.0)
global_brightness = {:?}

# Log file path; empty disables logging in terminal mode
log_file = {}
"##,
            toml_string(&c.mode),
            toml_string(&c.theme),
            c.fps,
            c.seed,
            c.pixels_per_cell,
            c.show_cursor,
            c.headless_width,
            c.headless_height,
            c.headless_frames,
            toml_string(&c.snapshot_path),
            toml_string(&c.dark_wash),
            toml_string(&c.dark_grid),
            toml_string(&c.dark_particle),
            toml_string(&c.dark_backdrop),
            toml_string(&c.light_wash),
            toml_string(&c.light_grid),
            toml_string(&c.light_particle),
            toml_string(&c.light_backdrop),
            c.wled_enabled,
            toml_string(&c.wled_ip),
            c.matrix_width,
            c.matrix_height,
            c.matrix_serpentine,
            c.global_brightness,
            toml_string(&c.log_file),
        )
    }
}

// Quoted and escaped TOML string literal
fn toml_string(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.mode, "terminal");
        assert_eq!(config.theme(), Theme::Dark);
        assert_eq!(config.fps, 60.0);
        assert!(!config.wled_enabled);
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let config = AppConfig::from_toml_str("theme = \"light\"\nfps = 30.0\n").unwrap();
        assert_eq!(config.theme(), Theme::Light);
        assert_eq!(config.fps, 30.0);
        assert_eq!(config.headless_width, 800);
        assert_eq!(config.matrix_height, 16);
    }

    #[test]
    fn test_sanitize_clamps_and_trims() {
        let config = AppConfig::from_toml_str(
            "mode = \" Headless \"\ntheme = \"sepia\"\nfps = 9000.0\nglobal_brightness = 3.5\nmatrix_width = 0\nwled_ip = \" 10.0.0.2 \"\n",
        )
        .unwrap();
        assert_eq!(config.mode, "headless");
        assert_eq!(config.theme, "dark");
        assert_eq!(config.fps, 240.0);
        assert_eq!(config.global_brightness, 1.0);
        assert_eq!(config.matrix_width, 1);
        assert_eq!(config.wled_ip, "10.0.0.2");
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!(AppConfig::from_toml_str("fps = \"fast\"").is_err());
    }

    #[test]
    fn test_saved_document_loads_back() {
        let mut config = AppConfig::default();
        config.theme = "light".to_string();
        config.seed = 1234;
        config.light_grid = "rgba(255, 0, 0, 0.5)".to_string();
        config.wled_ip = "192.168.1.50".to_string();

        let text = config.to_toml_string();
        assert!(text.starts_with("# Glowgrid Configuration File"));
        let loaded = AppConfig::from_toml_str(&text).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_saved_paths_with_backslashes_and_quotes_load_back() {
        let mut config = AppConfig::default();
        config.snapshot_path = r"C:\out\glow.png".to_string();
        config.log_file = r#"logs\"nightly"\glowgrid.log"#.to_string();

        let text = config.to_toml_string();
        let loaded = AppConfig::from_toml_str(&text).unwrap();
        assert_eq!(loaded.snapshot_path, r"C:\out\glow.png");
        assert_eq!(loaded.log_file, r#"logs\"nightly"\glowgrid.log"#);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = AppConfig::default();
        assert!(!config.merge_with_args(&Args::default()));

        let args = Args::parse_from(["glowgrid", "--theme", "light", "--fps", "30", "--wled-ip", "10.1.1.1"]);
        assert!(config.merge_with_args(&args));
        assert_eq!(config.theme, "light");
        assert_eq!(config.fps, 30.0);
        assert_eq!(config.wled_ip, "10.1.1.1");
        assert!(config.wled_enabled);
        // Untouched
        assert_eq!(config.mode, "terminal");
    }

    #[test]
    fn test_config_path_forms() {
        let absolute = AppConfig::config_path(Some("/tmp/glowgrid-test.conf")).unwrap();
        assert_eq!(absolute, PathBuf::from("/tmp/glowgrid-test.conf"));
        let relative = AppConfig::config_path(Some("conf/mine.conf")).unwrap();
        assert_eq!(relative, PathBuf::from("conf/mine.conf"));
    }
}
