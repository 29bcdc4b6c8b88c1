use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use site_localizer::cache::TranslationCache;
use site_localizer::config::{Cli, LocalizeConfig};
use site_localizer::pipeline;
use site_localizer::stats::{format_duration, print_run_summary};
use site_localizer::translator::{HttpBackend, Translator};
use site_localizer::utils::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志系统
    init_logging(cli.verbose, cli.quiet);

    let config = match LocalizeConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("❌ 配置无效: {}", e);
            std::process::exit(1);
        }
    };

    info!("📂 项目目录: {}", config.root().display());
    info!("📄 输出目录: {}", config.out_dir().display());

    match localize(&config).await {
        Ok(summary) => {
            if summary.failed_files() > 0 {
                warn!("⚠️  {} 个文件处理失败，详见日志", summary.failed_files());
            }

            if cli.stats || cli.verbose {
                print_run_summary(&summary);
            }

            info!("✅ 全部完成！总耗时: {}", format_duration(summary.elapsed));
        }
        Err(e) => {
            error!("❌ 本地化失败: {:#}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

/// 组装缓存、翻译客户端并执行流程
async fn localize(config: &LocalizeConfig) -> Result<site_localizer::stats::RunSummary> {
    let cache = TranslationCache::load(config.cache_file());
    info!("💾 已加载 {} 条缓存翻译", cache.len());

    let backend =
        HttpBackend::new(config.api_url(), config.api_key()).context("创建翻译客户端失败")?;
    let mut translator = Translator::new(backend, cache);

    let summary = pipeline::run(config, &mut translator).await?;
    info!(
        "💾 缓存文件: {} (共 {} 条)",
        translator.cache().path().display(),
        translator.cache().len()
    );
    Ok(summary)
}
