//! HTML处理模块
//!
//! 提供HTML解析、可翻译文本提取、译文回写和序列化功能。
//! 处理分两步：先纯提取得到不可变的翻译单元列表，再逐条翻译并回写到所有相同文本的位置。

// 标准库导入
use std::collections::{HashMap, HashSet, VecDeque};

// 第三方crate导入
use html5ever::driver::ParseOpts;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{parse_document, LocalName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use tracing::debug;

// 本地模块导入
use crate::api_constants::pipeline_config::{HTML_ATTRS_TO_TRANSLATE, SKIPPED_HTML_TAGS};
use crate::error::Result;
use crate::translation_error;
use crate::translator::{TranslationBackend, Translator};
use crate::utils::is_whitespace_only;

/// 翻译单元在文档中的位置
#[derive(Debug, Clone)]
pub enum UnitLocation {
    /// 文本节点
    Text(Handle),
    /// 元素上的白名单属性
    Attribute { element: Handle, name: LocalName },
}

/// 一个可翻译的文本单元
#[derive(Debug, Clone)]
pub struct TranslatableUnit {
    /// 原始文本（含首尾空白）
    pub text: String,
    pub location: UnitLocation,
}

impl TranslatableUnit {
    /// 将译文写回到该单元所在位置
    fn apply(&self, translated: &str) {
        match &self.location {
            UnitLocation::Text(node) => {
                if let NodeData::Text { ref contents } = node.data {
                    let mut content_ref = contents.borrow_mut();
                    content_ref.clear();
                    content_ref.push_slice(translated);
                }
            }
            UnitLocation::Attribute { element, name } => {
                if let NodeData::Element { ref attrs, .. } = element.data {
                    for attr in attrs.borrow_mut().iter_mut() {
                        if attr.name.local == *name {
                            attr.value = translated.into();
                        }
                    }
                }
            }
        }
    }
}

/// 单个HTML文档的本地化结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalizedDocument {
    pub html: String,
    /// 提取到的翻译单元数
    pub units: usize,
    /// 去重后的文本数
    pub unique_texts: usize,
    /// 翻译成功的文本数
    pub translated: usize,
    /// 翻译失败、保留原文的文本数
    pub failed: usize,
}

/// 解析HTML文档
pub fn parse_html(html: &str) -> Result<RcDom> {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            // 让noscript内容按标记解析，避免把整段HTML当作文本翻译
            scripting_enabled: false,
            ..Default::default()
        },
        ..Default::default()
    };

    parse_document(RcDom::default(), opts)
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .map_err(|e| translation_error!(html_parse, e))
}

fn is_skipped_tag(tag_name: &str) -> bool {
    SKIPPED_HTML_TAGS.contains(&tag_name)
}

fn is_translatable_attr(attr_name: &str) -> bool {
    HTML_ATTRS_TO_TRANSLATE.contains(&attr_name)
}

/// 提取DOM中的翻译单元
///
/// 跳过script/style元素（包括其属性与内容），以及仅含空白的文本。
pub fn extract_units(dom: &RcDom) -> Vec<TranslatableUnit> {
    let mut units = Vec::new();
    let mut queue = VecDeque::new();
    queue.push_back(dom.document.clone());

    while let Some(node) = queue.pop_front() {
        match node.data {
            NodeData::Element {
                ref name,
                ref attrs,
                ..
            } => {
                if is_skipped_tag(name.local.as_ref()) {
                    continue;
                }

                for attr in attrs.borrow().iter() {
                    if is_translatable_attr(attr.name.local.as_ref())
                        && !is_whitespace_only(&attr.value)
                    {
                        units.push(TranslatableUnit {
                            text: attr.value.to_string(),
                            location: UnitLocation::Attribute {
                                element: node.clone(),
                                name: attr.name.local.clone(),
                            },
                        });
                    }
                }
            }
            NodeData::Text { ref contents } => {
                let text = contents.borrow().to_string();
                if !is_whitespace_only(&text) {
                    units.push(TranslatableUnit {
                        text,
                        location: UnitLocation::Text(node.clone()),
                    });
                }
            }
            NodeData::Document
            | NodeData::Doctype { .. }
            | NodeData::Comment { .. }
            | NodeData::ProcessingInstruction { .. } => {}
        }

        for child in node.children.borrow().iter() {
            queue.push_back(child.clone());
        }
    }

    units
}

/// 按首次出现顺序对单元文本去重（逐字节比较）
pub fn unique_texts(units: &[TranslatableUnit]) -> Vec<String> {
    let mut seen = HashSet::new();
    units
        .iter()
        .filter(|unit| seen.insert(unit.text.as_str()))
        .map(|unit| unit.text.clone())
        .collect()
}

/// 本地化一个HTML文档
///
/// 单条文本翻译失败时，该文本的所有位置保留原值，不影响文档其余部分。
pub async fn localize_html<B: TranslationBackend>(
    html: &str,
    translator: &mut Translator<B>,
    lang: &str,
) -> Result<LocalizedDocument> {
    let dom = parse_html(html)?;
    let units = extract_units(&dom);
    let texts = unique_texts(&units);

    let mut translations: HashMap<&str, String> = HashMap::new();
    let mut failed = 0;
    for text in &texts {
        match translator.translate(text, lang).await {
            Ok(translated) => {
                translations.insert(text.as_str(), translated);
            }
            Err(_) => failed += 1,
        }
    }

    for unit in &units {
        if let Some(translated) = translations.get(unit.text.as_str()) {
            unit.apply(translated);
        }
    }

    debug!(
        "📝 HTML: {} 个单元, {} 个唯一文本, {} 个失败",
        units.len(),
        texts.len(),
        failed
    );

    Ok(LocalizedDocument {
        html: serialize_dom_to_html(&dom)?,
        units: units.len(),
        unique_texts: texts.len(),
        translated: translations.len(),
        failed,
    })
}

/// 序列化DOM为HTML字符串
pub fn serialize_dom_to_html(dom: &RcDom) -> Result<String> {
    use html5ever::serialize::{serialize, SerializeOpts};
    use markup5ever_rcdom::SerializableHandle;

    let mut buffer = Vec::new();

    serialize(
        &mut buffer,
        &SerializableHandle::from(dom.document.clone()),
        SerializeOpts::default(),
    )
    .map_err(|e| translation_error!(html_parse, format!("HTML序列化失败: {}", e)))?;

    String::from_utf8(buffer)
        .map_err(|e| translation_error!(html_parse, format!("UTF-8转换失败: {}", e)))
}
