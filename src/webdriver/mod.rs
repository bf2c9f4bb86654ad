//! # WebDriver 协议层
//!
//! 通过 W3C WebDriver 协议（以及 Appium 扩展）与 Appium 服务器通信，驱动远程虚拟设备上的应用。
//!
//! ## 主要功能
//! - **会话创建与删除**: 根据能力集（capabilities）创建会话，结束时删除
//! - **元素查找**: 按 id、accessibility id 或平台原生查询定位元素
//! - **元素操作**: 点击、输入文本、检查可见性
//! - **整屏截图**: 获取 PNG 截图
//! - **应用控制**: 终止被测应用
//!
//! ## 模块结构
//! - `traits`: 自动化后端的核心 trait 定义
//! - `types`: WebDriver 协议相关的数据类型
//! - `client`: 基于 HTTP 的客户端实现
//! - `mock`: 用于测试的 Mock 实现
//!
//! ## 使用示例
//! ```rust,no_run
//! use appium_runner::config::{CapabilitySet, ResetPolicy};
//! use appium_runner::webdriver::{AutomationBackend, WebDriverClient};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = WebDriverClient::new("http://127.0.0.1:4723", Duration::from_secs(120))?;
//! let caps = CapabilitySet::android("com.corellium.cafe", ".ui.activities.MainActivity", ResetPolicy::Preserve);
//!
//! let session_id = client.new_session(&caps).await?;
//! let png = client.screenshot(&session_id).await?;
//! println!("Captured {} bytes", png.len());
//! client.delete_session(&session_id).await?;
//! # Ok(())
//! # }
//! ```

pub mod traits;
pub mod types;
pub mod client;
pub mod mock;

pub use traits::AutomationBackend;
pub use types::{ProtocolError, ELEMENT_KEY};

// Re-export implementation structs
pub use client::WebDriverClient;

// Re-export mock for development/testing
pub use mock::{MockBackend, MockElement};
