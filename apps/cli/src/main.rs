//! # Servo CLI
//!
//! 齿轮伺服电机 CAN 总线交互式菜单工具。
//!
//! ```bash
//! # 使用默认配置（can0，电机 1,2,3）
//! servo-cli
//!
//! # 指定接口与电机名单
//! servo-cli --interface vcan0 --motors 1,4 --timeout-ms 100
//!
//! # 查看合并后的配置
//! servo-cli config
//! ```
//!
//! 菜单：`1` 切换电机，`2` 设置参数，`3` 绝对位置，`4` 设置零点，`5` 增量位置，
//! `6` 读取角度，`7` 读取状态，`9` 切换电源，`q` 退出。

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod config;
mod menu;
mod modes;

use config::{EffectiveConfig, FileConfig, Overrides, default_config_path};

/// Servo CLI - 伺服电机命令行工具
#[derive(Parser, Debug)]
#[command(name = "servo-cli")]
#[command(about = "Interactive menu for geared servo motors on a CAN bus", long_about = None)]
#[command(version)]
struct Cli {
    /// SocketCAN 接口名（默认 can0）
    #[arg(short, long)]
    interface: Option<String>,

    /// CAN 波特率（默认 1000000）
    #[arg(short, long)]
    bitrate: Option<u32>,

    /// 电机名单，逗号分隔（默认 1,2,3）
    #[arg(short, long, value_delimiter = ',')]
    motors: Option<Vec<u8>>,

    /// 应答超时（毫秒，默认 200）
    #[arg(short, long = "timeout-ms")]
    timeout_ms: Option<u64>,

    /// 配置文件路径（默认 <config_dir>/servo/config.toml）
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 打印合并后的配置并退出
    Config,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            interface: self.interface.clone(),
            bitrate: self.bitrate,
            motors: self.motors.clone(),
            reply_timeout_ms: self.timeout_ms,
        }
    }
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("servo_cli=info")),
        )
        .init();

    let cli = Cli::parse();

    let file = FileConfig::load(cli.config.as_deref())?;
    let config = EffectiveConfig::resolve(cli.overrides(), file)?;

    if let Some(Commands::Config) = cli.command {
        print_config(&cli, &config);
        return Ok(());
    }

    run(&config)
}

fn print_config(cli: &Cli, config: &EffectiveConfig) {
    let path = cli.config.clone().or_else(default_config_path);
    match path {
        Some(path) => println!("配置文件: {}", path.display()),
        None => println!("配置文件: (无法确定配置目录)"),
    }
    println!("  接口: {}", config.interface);
    println!("  波特率: {}", config.bitrate);
    let roster: Vec<String> = config.session.roster.iter().map(|id| id.to_string()).collect();
    println!("  电机: {}", roster.join(","));
    println!("  应答超时: {:?}", config.session.reply_timeout);
}

#[cfg(target_os = "linux")]
fn run(config: &EffectiveConfig) -> Result<()> {
    tracing::info!(
        "Opening {} at {} bps, roster {:?}",
        config.interface,
        config.bitrate,
        config.session.roster
    );
    let mut session = config
        .builder()
        .build()
        .with_context(|| format!("无法打开 CAN 接口 {}", config.interface))?;
    modes::repl::run_repl(&mut session)
}

#[cfg(not(target_os = "linux"))]
fn run(_config: &EffectiveConfig) -> Result<()> {
    anyhow::bail!("SocketCAN 仅在 Linux 上可用")
}
