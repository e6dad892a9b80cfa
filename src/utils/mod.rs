//! # 通用工具模块
//!
//! - `paths` - 应用数据目录解析

pub mod paths;
