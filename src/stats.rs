use std::time::Duration;

use chrono::{DateTime, Local};

use crate::translator::TranslatorStats;

/// 单个目标语言的处理统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageReport {
    pub lang: String,
    pub html_files: usize,
    pub script_files: usize,
    pub copied_files: usize,
    /// 解析失败后原样复制的脚本
    pub parse_fallbacks: usize,
    pub failed_files: usize,
    /// 提取到的翻译单元（HTML单元 + 脚本字面量）
    pub units: usize,
    pub unique_texts: usize,
    pub failed_texts: usize,
}

impl LanguageReport {
    pub fn new(lang: &str) -> Self {
        Self {
            lang: lang.to_string(),
            ..Default::default()
        }
    }

    /// 成功写出的文件数
    pub fn written_files(&self) -> usize {
        self.html_files + self.script_files + self.copied_files + self.parse_fallbacks
    }
}

/// 一次运行的汇总
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub files_discovered: usize,
    pub languages: Vec<LanguageReport>,
    pub translator: TranslatorStats,
    pub elapsed: Duration,
    pub finished_at: DateTime<Local>,
}

impl RunSummary {
    pub fn empty() -> Self {
        Self {
            files_discovered: 0,
            languages: Vec::new(),
            translator: TranslatorStats::default(),
            elapsed: Duration::ZERO,
            finished_at: Local::now(),
        }
    }

    /// 所有语言中处理失败的文件总数
    pub fn failed_files(&self) -> usize {
        self.languages.iter().map(|l| l.failed_files).sum()
    }

    /// 查找某语言的统计
    pub fn language(&self, lang: &str) -> Option<&LanguageReport> {
        self.languages.iter().find(|l| l.lang == lang)
    }
}

/// 打印运行统计
pub fn print_run_summary(summary: &RunSummary) {
    println!("\n📊 本地化统计报告:");
    println!("═══════════════════════════════════════");

    println!("⏱️  总耗时: {}", format_duration(summary.elapsed));
    println!(
        "   完成时间: {}",
        summary.finished_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!("   发现文件: {} 个", summary.files_discovered);

    for report in &summary.languages {
        println!("\n🌐 语言 [{}]:", report.lang);
        println!("   HTML文件: {} 个", report.html_files);
        println!("   脚本文件: {} 个", report.script_files);
        println!("   原样复制: {} 个", report.copied_files);
        if report.parse_fallbacks > 0 {
            println!("   解析失败后复制: {} 个", report.parse_fallbacks);
        }
        if report.failed_files > 0 {
            println!("   ❌ 处理失败: {} 个", report.failed_files);
        }
        println!(
            "   翻译单元: {} 项 (去重后 {} 项, 失败 {} 项)",
            report.units, report.unique_texts, report.failed_texts
        );
    }

    let stats = &summary.translator;
    let lookups = stats.cache_hits + stats.remote_calls;
    if lookups > 0 {
        let cache_hit_rate = stats.cache_hits as f64 / lookups as f64;
        println!("\n💾 缓存统计:");
        println!("   缓存命中: {} 次", stats.cache_hits);
        println!("   远程调用: {} 次", stats.remote_calls);
        println!("   调用失败: {} 次", stats.failures);
        println!("   命中率: {:.1}%", cache_hit_rate * 100.0);
    }
}

/// 格式化持续时间
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.500s");
    }

    #[test]
    fn test_summary_totals() {
        let mut summary = RunSummary::empty();
        let mut lv = LanguageReport::new("lv");
        lv.html_files = 2;
        lv.parse_fallbacks = 1;
        lv.failed_files = 1;
        let mut ru = LanguageReport::new("ru");
        ru.failed_files = 2;
        summary.languages = vec![lv, ru];

        assert_eq!(summary.failed_files(), 3);
        assert_eq!(summary.language("lv").map(|l| l.written_files()), Some(3));
        assert!(summary.language("de").is_none());
    }
}
