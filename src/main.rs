//! # Appium-Runner 命令行入口
//!
//! 针对虚拟设备运行一个自动化脚本：打开 Appium 会话，按顺序执行步骤，最后关闭会话。
//!
//! ## 主要功能
//! - 解析命令行参数（设备服务 IP、脚本路径、配置文件路径）
//! - 从环境变量或 TOML 文件加载配置
//! - 执行脚本并以退出码报告结果（成功 0，失败 1）
//!
//! ## 用法
//! ```text
//! appium-runner [SERVICES_IP] --script <PATH> [--config <PATH>]
//! ```
//!
//! ## 环境变量
//! - `APPIUM_RUNNER_SCRIPT`: 脚本路径
//! - `APPIUM_RUNNER_CONFIG`: 配置文件路径
//! - `APPIUM_RUNNER_APP_PACKAGE` / `APPIUM_RUNNER_APP_ENTRY_POINT` / `APPIUM_RUNNER_RESET_POLICY`: 未提供配置文件时的必需能力
//! - `RUST_LOG`: 日志级别（默认: info）

use anyhow::Context;
use appium_runner::{
    config::RunnerConfig,
    logging,
    script::{RunResult, Script},
    session::SessionManager,
    webdriver::WebDriverClient,
};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "appium-runner", version, about = "Run an Appium automation script against a device")]
struct Cli {
    /// Services IP of the target device; the ADB port is appended
    services_ip: Option<String>,

    /// Script to run
    #[arg(long, env = "APPIUM_RUNNER_SCRIPT")]
    script: PathBuf,

    /// Configuration file; configuration comes from the environment when omitted
    #[arg(long, env = "APPIUM_RUNNER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(parse_error_code(&e));
        }
    };

    if let Err(e) = logging::init() {
        eprintln!("{}", e);
        return ExitCode::from(1);
    }

    match run(cli).await {
        Ok(result) => ExitCode::from(result.exit_code()),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

/// Help and version requests exit 0; usage errors exit 1
fn parse_error_code(error: &clap::Error) -> u8 {
    if error.use_stderr() {
        1
    } else {
        0
    }
}

/// Point the configuration at the device named on the command line, if any
fn apply_device(config: &mut RunnerConfig, services_ip: Option<&str>) -> anyhow::Result<()> {
    match services_ip {
        Some(ip) => {
            config.apply_services_ip(ip);
            config.validate().context("Invalid services IP")?;
            info!("Using device at {}", config.capabilities.device_address);
        }
        None => info!("Defaulting to device at {}", config.capabilities.device_address),
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<RunResult> {
    info!("Appium-Runner v{}", appium_runner::VERSION);

    let mut config = match &cli.config {
        Some(path) => RunnerConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => RunnerConfig::from_env().context("Failed to load configuration from environment")?,
    };

    apply_device(&mut config, cli.services_ip.as_deref())?;

    let script = Script::from_file(&cli.script)
        .with_context(|| format!("Failed to load script {}", cli.script.display()))?;
    info!(
        "Loaded script {} with {} step(s)",
        script.name.as_deref().unwrap_or("(unnamed)"),
        script.len()
    );

    let client = WebDriverClient::new(&config.server_url, config.request_timeout())?;
    let manager = SessionManager::from_config(Arc::new(client), &config)?;

    Ok(manager.run(&config.capabilities, &script).await)
}
