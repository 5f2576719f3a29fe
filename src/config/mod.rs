//! 配置管理
//!
//! 配置文件、环境变量按层叠加载，启动时初始化一次，之后通过 `AppConfig::get()` 全局读取。

mod loader;
mod structs;

pub use structs::*;
