//! # 脚本层
//!
//! 以数据形式描述一次自动化运行：有序的步骤序列，每一步定位一个屏幕元素并对其操作，或在检查点截图。
//!
//! ## 主要功能
//! - **步骤模型**: 输入文本、点击、检查点截图三种步骤
//! - **脚本加载**: 从 TOML 文件加载脚本，拒绝未知字段
//! - **步骤执行**: 按顺序执行，遇到第一个致命错误即停止
//! - **运行结果**: 记录成功与否、分类后的错误以及生成的截图
//!
//! ## 模块结构
//! - `executor`: 步骤执行器
//! - `result`: 运行结果类型
//!
//! ## 脚本格式
//! ```toml
//! name = "login"
//!
//! [[steps]]
//! action = "type"
//! by = "id"
//! value = "com.corellium.cafe:id/emailEditText"
//! text = "Username123"
//! milestone = "Interact with login page."
//!
//! [[steps]]
//! action = "click"
//! by = "accessibility-id"
//! value = "Open"
//!
//! [[steps]]
//! action = "checkpoint"
//! name = "blog.png"
//! name_env = "CAFE_BLOG_SCREENSHOT"
//! ```

pub mod executor;
pub mod result;

use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::locator::{Locator, Strategy};
use crate::{Error, Result};

pub use executor::StepExecutor;
pub use result::{Artifact, RunFailure, RunResult};

/// What a step does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    /// Locate an element and type text into it
    Type { locator: Locator, text: String },
    /// Locate an element and click it
    Click { locator: Locator },
    /// Capture a screenshot under `name`
    Checkpoint { name: String },
}

/// One unit of script execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub kind: StepKind,

    /// Resolution timeout for this step; the runner default when unset
    pub timeout: Option<Duration>,

    /// Logged before the step runs, marking the start of a step group
    pub milestone: Option<String>,
}

impl Step {
    fn from_kind(kind: StepKind) -> Self {
        Self {
            kind,
            timeout: None,
            milestone: None,
        }
    }

    pub fn type_text(locator: Locator, text: impl Into<String>) -> Self {
        Self::from_kind(StepKind::Type {
            locator,
            text: text.into(),
        })
    }

    pub fn click(locator: Locator) -> Self {
        Self::from_kind(StepKind::Click { locator })
    }

    pub fn checkpoint(name: impl Into<String>) -> Self {
        Self::from_kind(StepKind::Checkpoint { name: name.into() })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_milestone(mut self, milestone: impl Into<String>) -> Self {
        self.milestone = Some(milestone.into());
        self
    }

    /// Locator of a locate-type step
    pub fn locator(&self) -> Option<&Locator> {
        match &self.kind {
            StepKind::Type { locator, .. } | StepKind::Click { locator } => Some(locator),
            StepKind::Checkpoint { .. } => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StepKind::Type { locator, text } => write!(f, "type {:?} into {}", text, locator),
            StepKind::Click { locator } => write!(f, "click {}", locator),
            StepKind::Checkpoint { name } => write!(f, "checkpoint {}", name),
        }
    }
}

/// An ordered sequence of steps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    pub name: Option<String>,
    pub steps: Vec<Step>,
}

impl Script {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { name: None, steps }
    }

    pub fn named(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: Some(name.into()),
            steps,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Load a script from a TOML file, resolving `name_env` from the environment
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::script(format!("Failed to read script {}: {}", path.display(), e))
        })?;

        Self::from_toml_str(&content, |key| std::env::var(key).ok())
    }

    /// Parse a script from TOML text
    ///
    /// `lookup` resolves the environment variables named by `name_env`.
    pub fn from_toml_str<F>(content: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: ScriptFile = toml::from_str(content)
            .map_err(|e| Error::script(format!("Failed to parse script: {}", e)))?;

        if file.steps.is_empty() {
            return Err(Error::script("Script has no steps"));
        }

        let steps = file
            .steps
            .into_iter()
            .enumerate()
            .map(|(index, entry)| entry.into_step(index, &lookup))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: file.name,
            steps,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    steps: Vec<StepEntry>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ActionName {
    Type,
    Click,
    Checkpoint,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StepEntry {
    action: ActionName,
    #[serde(default)]
    by: Option<Strategy>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    name_env: Option<String>,
    #[serde(default)]
    timeout_ms: Option<u64>,
    #[serde(default)]
    milestone: Option<String>,
}

impl StepEntry {
    fn into_step<F>(self, index: usize, lookup: &F) -> Result<Step>
    where
        F: Fn(&str) -> Option<String>,
    {
        let position = index + 1;
        let invalid = |msg: &str| Error::script(format!("Step {}: {}", position, msg));

        let kind = match self.action {
            ActionName::Type | ActionName::Click => {
                if self.name.is_some() || self.name_env.is_some() {
                    return Err(invalid("name/name_env only apply to checkpoints"));
                }
                let strategy = self.by.ok_or_else(|| invalid("missing `by`"))?;
                let value = self.value.ok_or_else(|| invalid("missing `value`"))?;
                let locator = Locator::new(strategy, value);

                match self.action {
                    ActionName::Type => StepKind::Type {
                        locator,
                        text: self.text.ok_or_else(|| invalid("missing `text`"))?,
                    },
                    _ => {
                        if self.text.is_some() {
                            return Err(invalid("`text` only applies to type steps"));
                        }
                        StepKind::Click { locator }
                    }
                }
            }
            ActionName::Checkpoint => {
                if self.by.is_some() || self.value.is_some() || self.text.is_some() {
                    return Err(invalid("checkpoints take no locator or text"));
                }
                if self.timeout_ms.is_some() {
                    return Err(invalid("checkpoints take no timeout"));
                }

                let from_env = self
                    .name_env
                    .as_deref()
                    .and_then(|key| lookup(key))
                    .filter(|v| !v.trim().is_empty());

                let name = match (from_env, self.name, self.name_env) {
                    (Some(name), _, _) => name,
                    (None, Some(name), _) => name,
                    (None, None, Some(key)) => {
                        warn!("{} is not set; naming checkpoint {} after it", key, position);
                        key
                    }
                    (None, None, None) => return Err(invalid("missing `name` or `name_env`")),
                };

                StepKind::Checkpoint { name }
            }
        };

        Ok(Step {
            kind,
            timeout: self.timeout_ms.map(Duration::from_millis),
            milestone: self.milestone,
        })
    }
}
