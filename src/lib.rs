//! Site Localizer - 静态站点本地化工具库
//!
//! 扫描构建好的站点目录，翻译HTML文本与JavaScript字符串字面量，
//! 为每个目标语言生成一份完整的站点副本。翻译结果持久化缓存，重复运行不产生远程调用。

pub mod api_constants;
pub mod cache;
pub mod config;
pub mod error;
pub mod html_processor;
pub mod pipeline;
pub mod script_processor;
pub mod stats;
pub mod translator;
pub mod utils;
