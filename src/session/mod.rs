//! # 会话管理层
//!
//! 管理自动化会话的生命周期，提供定位、等待和元素操作的高级抽象。
//!
//! ## 主要功能
//! - **会话生命周期**: 打开、使用、关闭，关闭操作幂等
//! - **元素定位**: 按定位器在当前屏幕查找第一个匹配元素
//! - **等待策略**: 在超时时间内轮询，直到元素存在且可见
//! - **运行管理**: 每次运行都保证执行清理，清理失败不会覆盖运行结果
//!
//! ## 核心概念
//! - **Session**: 一个设备/应用的自动化会话，状态为 `Uninitialized -> Active -> Closed`
//! - **ElementHandle**: 元素引用，借用其所属会话，不能超出会话的生命周期
//! - **WaitStrategy**: 有界轮询的元素解析
//!
//! ## 模块结构
//! - `remote`: 会话实现
//! - `element`: 元素引用实现
//! - `wait`: 等待策略实现
//! - `manager`: 会话管理器实现
//!
//! ## 使用示例
//! ```rust,no_run
//! use appium_runner::config::RunnerConfig;
//! use appium_runner::script::Script;
//! use appium_runner::session::SessionManager;
//! use appium_runner::webdriver::WebDriverClient;
//! use std::sync::Arc;
//!
//! # async fn example(config: RunnerConfig, script: Script) -> Result<(), Box<dyn std::error::Error>> {
//! let client = WebDriverClient::new(&config.server_url, config.request_timeout())?;
//! let manager = SessionManager::from_config(Arc::new(client), &config)?;
//!
//! let result = manager.run(&config.capabilities, &script).await;
//! println!("success: {}", result.success());
//! # Ok(())
//! # }
//! ```

pub mod element;
pub mod manager;
pub mod remote;
pub mod wait;


pub use element::{ElementAction, ElementHandle};
pub use manager::SessionManager;
pub use remote::{Session, SessionState};
pub use wait::{WaitOutcome, WaitStrategy, WaitTimeout, DEFAULT_POLL_INTERVAL};
