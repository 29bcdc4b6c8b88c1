//! JavaScript处理模块
//!
//! 使用swc解析脚本源码，收集可翻译的字符串字面量和无插值模板字面量，
//! 翻译后按字面量在源码中的区间原位替换，其余源码（格式、注释）保持不变。
//!
//! 不收集的字面量：
//! - import / `export ... from` 声明中的模块路径
//! - `require(...)` 与动态 `import(...)` 的字符串参数
//! - 非计算属性名位置的字符串键（`{"key": 1}` 中的 `"key"`）
//! - 指令（`"use strict"`）与TypeScript字面量类型
//! - 带插值的模板和带标签的模板

use std::collections::{HashMap, HashSet};

use swc_common::{BytePos, FileName, SourceMap, Span};
use swc_ecma_ast::{
    Callee, CallExpr, ExportAll, Expr, ExprStmt, ImportDecl, JSXAttrValue, Lit, NamedExport,
    PropName, Str, TaggedTpl, Tpl, TsExternalModuleRef, TsImportType, TsLitType, TsModuleName,
};
use swc_ecma_parser::{EsSyntax, Parser, StringInput, Syntax, TsSyntax};
use swc_ecma_visit::{Visit, VisitWith};
use tracing::debug;

use crate::api_constants::pipeline_config::MODULE_LOADERS;
use crate::error::Result;
use crate::translation_error;
use crate::translator::{TranslationBackend, Translator};
use crate::utils::is_whitespace_only;

/// 解析器语法能力开关
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptDialect {
    /// 类型注解等TypeScript语法
    pub typescript: bool,
    /// 内嵌标记表达式（JSX）
    pub jsx: bool,
    /// 装饰器
    pub decorators: bool,
}

impl Default for ScriptDialect {
    fn default() -> Self {
        Self {
            typescript: true,
            jsx: true,
            decorators: true,
        }
    }
}

impl ScriptDialect {
    /// 转换为swc语法配置，可选链与空值合并始终可用
    pub fn syntax(&self) -> Syntax {
        if self.typescript {
            Syntax::Typescript(TsSyntax {
                tsx: self.jsx,
                decorators: self.decorators,
                ..Default::default()
            })
        } else {
            Syntax::Es(EsSyntax {
                jsx: self.jsx,
                decorators: self.decorators,
                ..Default::default()
            })
        }
    }
}

/// 字面量种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    /// 普通字符串字面量
    Str,
    /// JSX属性中的字符串
    JsxAttr,
    /// 无插值模板字面量
    Template,
}

/// 可翻译字面量及其在源码中的字节区间
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLiteral {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub kind: LiteralKind,
}

/// 单个脚本的本地化结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalizedScript {
    pub source: String,
    /// 收集到的字面量数
    pub literals: usize,
    /// 去重后的文本数
    pub unique_texts: usize,
    /// 实际替换的字面量数
    pub replaced: usize,
    /// 翻译失败、保留原文的文本数
    pub failed: usize,
}

struct LiteralCollector {
    base: BytePos,
    /// 解析前剥离的前缀（BOM）长度，区间需加回
    prefix_len: usize,
    literals: Vec<ScriptLiteral>,
}

impl LiteralCollector {
    fn push(&mut self, text: &str, span: Span, kind: LiteralKind) {
        if is_whitespace_only(text) {
            return;
        }
        self.literals.push(ScriptLiteral {
            text: text.to_string(),
            start: self.prefix_len + (span.lo.0 - self.base.0) as usize,
            end: self.prefix_len + (span.hi.0 - self.base.0) as usize,
            kind,
        });
    }
}

fn is_module_loader(callee: &Callee) -> bool {
    match callee {
        Callee::Import(_) => true,
        Callee::Expr(expr) => match &**expr {
            Expr::Ident(ident) => {
                let name: &str = &ident.sym;
                MODULE_LOADERS.contains(&name)
            }
            _ => false,
        },
        Callee::Super(_) => false,
    }
}

impl Visit for LiteralCollector {
    fn visit_import_decl(&mut self, _: &ImportDecl) {}

    fn visit_export_all(&mut self, _: &ExportAll) {}

    fn visit_named_export(&mut self, _: &NamedExport) {}

    fn visit_ts_external_module_ref(&mut self, _: &TsExternalModuleRef) {}

    fn visit_ts_import_type(&mut self, _: &TsImportType) {}

    fn visit_ts_module_name(&mut self, _: &TsModuleName) {}

    fn visit_ts_lit_type(&mut self, _: &TsLitType) {}

    fn visit_call_expr(&mut self, node: &CallExpr) {
        if is_module_loader(&node.callee) {
            node.callee.visit_with(self);
            for arg in &node.args {
                if !matches!(&*arg.expr, Expr::Lit(Lit::Str(_))) {
                    arg.visit_with(self);
                }
            }
            return;
        }
        node.visit_children_with(self);
    }

    fn visit_prop_name(&mut self, node: &PropName) {
        // 只有计算属性名里的表达式参与翻译
        if let PropName::Computed(computed) = node {
            computed.visit_with(self);
        }
    }

    fn visit_expr_stmt(&mut self, node: &ExprStmt) {
        if matches!(&*node.expr, Expr::Lit(Lit::Str(_))) {
            return;
        }
        node.visit_children_with(self);
    }

    fn visit_str(&mut self, node: &Str) {
        if let Some(value) = node.value.as_str() {
            self.push(value, node.span, LiteralKind::Str);
        }
    }

    fn visit_jsx_attr_value(&mut self, node: &JSXAttrValue) {
        match node {
            JSXAttrValue::Str(s) => {
                if let Some(value) = s.value.as_str() {
                    self.push(value, s.span, LiteralKind::JsxAttr);
                }
            }
            _ => node.visit_children_with(self),
        }
    }

    fn visit_tpl(&mut self, node: &Tpl) {
        if !node.exprs.is_empty() {
            node.visit_children_with(self);
            return;
        }

        let cooked: Option<String> = node
            .quasis
            .iter()
            .map(|quasi| quasi.cooked.as_ref().and_then(|c| c.as_str()))
            .collect();
        if let Some(text) = cooked {
            self.push(&text, node.span, LiteralKind::Template);
        }
    }

    fn visit_tagged_tpl(&mut self, node: &TaggedTpl) {
        node.tag.visit_with(self);
        for expr in &node.tpl.exprs {
            expr.visit_with(self);
        }
    }
}

/// 解析脚本并收集可翻译字面量
///
/// 区间是相对 `source` 的字节偏移（包括开头的BOM）。TypeScript语法解析失败时
/// 再用纯ES语法重试一次，以兼容TypeScript拒绝的宽松模式写法（八进制字面量、`with` 等）。
/// 两次都失败（包括可恢复的语法错误）返回 `ScriptParse` 错误。
pub fn extract_literals(
    source: &str,
    file_name: &str,
    dialect: ScriptDialect,
) -> Result<Vec<ScriptLiteral>> {
    match parse_literals(source, file_name, dialect) {
        Err(e) if dialect.typescript => {
            let plain = ScriptDialect {
                typescript: false,
                ..dialect
            };
            parse_literals(source, file_name, plain).map_err(|_| e)
        }
        result => result,
    }
}

fn parse_literals(
    source: &str,
    file_name: &str,
    dialect: ScriptDialect,
) -> Result<Vec<ScriptLiteral>> {
    // swc跳过BOM但不计入起始位置，剥离后再把偏移加回
    let body = source.strip_prefix('\u{feff}').unwrap_or(source);
    let prefix_len = source.len() - body.len();

    let source_map = SourceMap::default();
    let source_file =
        source_map.new_source_file(FileName::Real(file_name.into()).into(), body.to_string());

    let mut parser = Parser::new(dialect.syntax(), StringInput::from(&*source_file), None);
    let program = parser
        .parse_program()
        .map_err(|e| translation_error!(script_parse, file_name, format!("{:?}", e)))?;
    if let Some(e) = parser.take_errors().into_iter().next() {
        return Err(translation_error!(script_parse, file_name, format!("{:?}", e)));
    }

    let mut collector = LiteralCollector {
        base: source_file.start_pos,
        prefix_len,
        literals: Vec::new(),
    };
    program.visit_with(&mut collector);

    let mut literals = collector.literals;
    literals.sort_by_key(|lit| lit.start);
    Ok(literals)
}

/// 生成替换用的字面量源码
fn render_literal(kind: LiteralKind, translated: &str) -> Result<String> {
    let quoted = serde_json::to_string(translated)?;
    Ok(match kind {
        LiteralKind::Str | LiteralKind::Template => quoted,
        // JSX属性字符串不支持反斜杠转义
        LiteralKind::JsxAttr if translated.contains(['"', '&']) => format!("{{{}}}", quoted),
        LiteralKind::JsxAttr => format!("\"{}\"", translated),
    })
}

/// 按区间替换字面量，返回新源码和替换数量
///
/// 译文与原文相同的字面量保持原样。
pub fn rewrite_literals(
    source: &str,
    literals: &[ScriptLiteral],
    translations: &HashMap<String, String>,
) -> Result<(String, usize)> {
    let mut output = String::with_capacity(source.len());
    let mut cursor = 0;
    let mut replaced = 0;

    for lit in literals {
        let translated = match translations.get(&lit.text) {
            Some(t) if *t != lit.text => t,
            _ => continue,
        };
        if lit.start < cursor {
            continue;
        }
        let (Some(before), Some(_)) = (source.get(cursor..lit.start), source.get(lit.start..lit.end))
        else {
            continue;
        };

        output.push_str(before);
        output.push_str(&render_literal(lit.kind, translated)?);
        cursor = lit.end;
        replaced += 1;
    }

    output.push_str(&source[cursor..]);
    Ok((output, replaced))
}

/// 本地化一个脚本文件
///
/// 单条文本翻译失败时使用原文，不影响其他字面量。
pub async fn localize_script<B: TranslationBackend>(
    source: &str,
    file_name: &str,
    dialect: ScriptDialect,
    translator: &mut Translator<B>,
    lang: &str,
) -> Result<LocalizedScript> {
    let literals = extract_literals(source, file_name, dialect)?;

    let mut seen = HashSet::new();
    let texts: Vec<&str> = literals
        .iter()
        .map(|lit| lit.text.as_str())
        .filter(|text| seen.insert(*text))
        .collect();

    let mut translations = HashMap::new();
    let mut failed = 0;
    for text in &texts {
        let translated = match translator.translate(text, lang).await {
            Ok(translated) => translated,
            Err(_) => {
                failed += 1;
                text.to_string()
            }
        };
        translations.insert(text.to_string(), translated);
    }

    let (output, replaced) = rewrite_literals(source, &literals, &translations)?;
    debug!(
        "📝 JS {}: {} 个字面量, {} 个唯一文本, 替换 {} 处",
        file_name,
        literals.len(),
        texts.len(),
        replaced
    );

    Ok(LocalizedScript {
        source: output,
        literals: literals.len(),
        unique_texts: texts.len(),
        replaced,
        failed,
    })
}
