use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context as _;
use kinesis::MotorParams;
use serde::{Deserialize, Serialize};
use utilities::motor_controller::SettleParams;

use crate::scan::{Direction, MeasurementRequest, ScanOptions, ScanRequest};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found at {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to read configuration file: {source}")]
    ReadError { source: std::io::Error },

    #[error("Failed to parse configuration: {source}")]
    ParseError { source: toml::de::Error },

    #[error("Failed to serialize configuration: {source}")]
    SerializeError { source: toml::ser::Error },

    #[error("Failed to write configuration file: {source}")]
    WriteError { source: std::io::Error },

    #[error("Configuration validation failed: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StageConfig {
    pub library_dir: PathBuf,
    pub library_name: String,
    pub serial: String,
    pub polling_interval_ms: u64,
    pub steps_per_rev: f64,
    pub gearbox_ratio: f64,
    pub pitch: f64,
    /// Use the Kinesis simulator instead of real hardware.
    pub simulation: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        let motor = MotorParams::default();
        Self {
            library_dir: PathBuf::from(kinesis::DEFAULT_LIBRARY_DIR),
            library_name: kinesis::DCSERVO_LIBRARY.to_string(),
            serial: "83859973".to_string(),
            polling_interval_ms: 200,
            steps_per_rev: motor.steps_per_rev,
            gearbox_ratio: motor.gearbox_ratio,
            pitch: motor.pitch,
            simulation: false,
        }
    }
}

impl StageConfig {
    pub fn motor_params(&self) -> MotorParams {
        MotorParams {
            steps_per_rev: self.steps_per_rev,
            gearbox_ratio: self.gearbox_ratio,
            pitch: self.pitch,
        }
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MeterConfig {
    pub resource_pattern: String,
    pub open_timeout_ms: u64,
    pub average_count: u32,
    pub auto_range: bool,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            resource_pattern: pm100d::RESOURCE_PATTERN.to_string(),
            open_timeout_ms: pm100d::OPEN_TIMEOUT.as_millis() as u64,
            average_count: 50,
            auto_range: true,
        }
    }
}

impl MeterConfig {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Wait between requesting and reading a polled value.
    pub request_delay_ms: u64,
    /// Wait between setting the absolute target and starting the move.
    pub arm_delay_ms: u64,
    pub settle_poll_ms: u64,
    pub settle_timeout_ms: u64,
    pub position_window_mm: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: 200,
            arm_delay_ms: 250,
            settle_poll_ms: 100,
            settle_timeout_ms: 30_000,
            position_window_mm: 0.01,
        }
    }
}

impl TimingConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn arm_delay(&self) -> Duration {
        Duration::from_millis(self.arm_delay_ms)
    }

    pub fn settle_params(&self) -> SettleParams {
        SettleParams {
            poll_interval: Duration::from_millis(self.settle_poll_ms),
            position_window: self.position_window_mm,
            time_limit: Duration::from_millis(self.settle_timeout_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobMode {
    /// Single absolute move.
    Move,
    #[default]
    Scan,
    /// Power reading only, the stage is not touched.
    Measure,
    ScanAndMeasure,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct JobConfig {
    pub mode: JobMode,
    pub target_mm: f64,
    pub steps: u32,
    pub direction: Option<Direction>,
    pub wavelength_nm: f64,
    pub samples: usize,
    pub output: PathBuf,
    pub tolerance_mm: f64,
    pub enforce_tolerance: bool,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            mode: JobMode::Scan,
            target_mm: 2.0,
            steps: 2,
            direction: None,
            wavelength_nm: 1064.0,
            samples: 5,
            output: PathBuf::from("power_scan.txt"),
            tolerance_mm: 0.1,
            enforce_tolerance: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Used when `RUST_LOG` is not set.
    pub level: String,
    pub json: bool,
    /// Daily rolling log files are written here when set.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            directory: None,
            file_prefix: "stage_scan.log".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub stage: StageConfig,
    pub meter: MeterConfig,
    pub timing: TimingConfig,
    pub job: JobConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |message: &str| {
            Err(ConfigError::ValidationError {
                message: message.to_string(),
            })
        };

        if self.stage.serial.trim().is_empty() {
            return fail("stage.serial must not be empty");
        }
        if self.stage.polling_interval_ms == 0 || self.stage.polling_interval_ms > i32::MAX as u64 {
            return fail("stage.polling_interval_ms must be between 1 and 2147483647");
        }
        let motor = self.stage.motor_params();
        if [motor.steps_per_rev, motor.gearbox_ratio, motor.pitch]
            .iter()
            .any(|v| !v.is_finite() || *v <= 0.0)
        {
            return fail("stage motor parameters must be positive");
        }
        if self.meter.average_count == 0 {
            return fail("meter.average_count must be at least 1");
        }
        if self.timing.settle_poll_ms == 0 || self.timing.settle_timeout_ms == 0 {
            return fail("timing.settle_poll_ms and timing.settle_timeout_ms must be positive");
        }
        if !(self.timing.position_window_mm > 0.0) {
            return fail("timing.position_window_mm must be positive");
        }
        if !self.job.target_mm.is_finite() {
            return fail("job.target_mm must be a finite number");
        }
        if self.job.steps == 0 {
            return fail("job.steps must be greater than zero");
        }
        if self.job.samples == 0 {
            return fail("job.samples must be at least 1");
        }
        if !(self.job.wavelength_nm > 0.0) || !self.job.wavelength_nm.is_finite() {
            return fail("job.wavelength_nm must be positive");
        }
        if !(self.job.tolerance_mm > 0.0) {
            return fail("job.tolerance_mm must be positive");
        }

        Ok(())
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            settle: self.timing.settle_params(),
            tolerance_mm: self.job.tolerance_mm,
            enforce_tolerance: self.job.enforce_tolerance,
            average_count: self.meter.average_count,
            auto_range: self.meter.auto_range,
        }
    }

    /// The configured job as a scan; `None` for `measure`.
    pub fn scan_request(&self) -> Option<ScanRequest> {
        let job = &self.job;
        let measurement = || MeasurementRequest {
            wavelength_nm: job.wavelength_nm,
            samples: job.samples,
            output: job.output.clone(),
        };

        match job.mode {
            JobMode::Move => Some(ScanRequest {
                target_mm: job.target_mm,
                steps: 1,
                direction: None,
                measurement: None,
            }),
            JobMode::Scan => Some(ScanRequest {
                target_mm: job.target_mm,
                steps: job.steps,
                direction: job.direction,
                measurement: None,
            }),
            JobMode::ScanAndMeasure => Some(ScanRequest {
                target_mm: job.target_mm,
                steps: job.steps,
                direction: job.direction,
                measurement: Some(measurement()),
            }),
            JobMode::Measure => None,
        }
    }
}

#[derive(Debug)]
pub struct ConfigOptions {
    pub config_path: PathBuf,
    pub create_if_missing: bool,
}

impl Default for ConfigOptions {
    fn default() -> Self {
        Self {
            config_path: Self::default_config_path(),
            create_if_missing: true,
        }
    }
}

impl ConfigOptions {
    pub fn default_config_path() -> PathBuf {
        std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("default_config.toml"))
    }
}

#[derive(Debug)]
pub struct ConfigManager {
    options: ConfigOptions,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            options: ConfigOptions::default(),
        }
    }

    pub fn with_options(options: ConfigOptions) -> Self {
        Self { options }
    }

    pub fn path(&self) -> &Path {
        &self.options.config_path
    }

    pub fn load(&self) -> anyhow::Result<AppConfig> {
        let config_path = &self.options.config_path;

        if !config_path.exists() {
            if self.options.create_if_missing {
                let default_config = AppConfig::default();
                self.save(&default_config)
                    .context("Failed to save default config")?;
                return Ok(default_config);
            } else {
                return Err(ConfigError::FileNotFound {
                    path: config_path.clone(),
                }
                .into());
            }
        }

        let content =
            fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError { source: e })?;

        let config: AppConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError { source: e })?;

        config.validate()?;

        Ok(config)
    }

    pub fn save(&self, config: &AppConfig) -> anyhow::Result<()> {
        let config_path = &self.options.config_path;

        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError { source: e })?;
            }
        }

        let content = toml::to_string_pretty(config)
            .map_err(|e| ConfigError::SerializeError { source: e })?;

        fs::write(config_path, content).map_err(|e| ConfigError::WriteError { source: e })?;

        Ok(())
    }
}

pub fn init_config() -> anyhow::Result<(ConfigManager, AppConfig)> {
    let manager = ConfigManager::new();
    let config = manager.load()?;
    Ok((manager, config))
}

pub fn create_default_config<P: AsRef<Path>>(path: Option<P>) -> anyhow::Result<()> {
    let config_path = path
        .map(|p| p.as_ref().to_path_buf())
        .unwrap_or_else(ConfigOptions::default_config_path);

    let manager = ConfigManager::with_options(ConfigOptions {
        config_path,
        create_if_missing: true,
    });
    manager.save(&AppConfig::default())
}
