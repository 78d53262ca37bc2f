//! crates/lesson_deck_core/src/placeholders.rs
//!
//! Fixed content served for a stage the user has not confirmed yet, and the
//! built-in template catalogue.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::domain::PptTemplate;
use crate::outline::OutlineNode;

const PLACEHOLDER_DESIGN: &str = include_str!("../assets/placeholder_design.md");

/// The teaching-target stage's placeholder: three objectives.
pub fn placeholder_target() -> Vec<String> {
    vec![
        "掌握双曲线的定义、标准方程和几何性质".to_string(),
        "理解双曲线的焦点、准线及其几何意义".to_string(),
        "能够利用双曲线的性质解决相关问题".to_string(),
    ]
}

/// The outline stage's placeholder: a three-level tree.
pub fn placeholder_outline() -> OutlineNode {
    OutlineNode::with_children(
        "AI大模型应用",
        vec![
            OutlineNode::with_children(
                "课程导学与职业发展",
                vec![
                    OutlineNode::leaf("你将收获哪些能力"),
                    OutlineNode::leaf("AI时代需要什么样的人才"),
                    OutlineNode::leaf("职业发展路径规划"),
                ],
            ),
            OutlineNode::with_children(
                "初识AI大模型与提示词工程",
                vec![OutlineNode::leaf("提示词工程最佳实践")],
            ),
            OutlineNode::with_children(
                "AI核心技术与模型",
                vec![OutlineNode::leaf("主流大模型(GPT/Claude)解析")],
            ),
        ],
    )
}

/// The teaching-design stage's placeholder narrative (Markdown).
pub fn placeholder_design() -> String {
    PLACEHOLDER_DESIGN.to_string()
}

/// Templates offered while the catalogue table is empty.
pub fn builtin_templates() -> Vec<PptTemplate> {
    let created_at: DateTime<Utc> = Utc.timestamp_opt(0, 0).single().unwrap_or_default();
    [
        (
            0xe9a3b2c1_8d7e_4f6a_9b8c_7d6e5f4a3b2c_u128,
            "商务简约蓝",
            "https://via.placeholder.com/800x600.png/007BFF/FFFFFF?text=Business",
        ),
        (
            0xf0c3d4e5_a6b7_4c8d_9e0f_1a2b3c4d5e6f_u128,
            "教育卡通风",
            "https://via.placeholder.com/800x600.png/28A745/FFFFFF?text=Education",
        ),
        (
            0x12345678_90ab_cdef_1234_567890abcdef_u128,
            "科技未来感",
            "https://via.placeholder.com/800x600.png/17A2B8/FFFFFF?text=Technology",
        ),
        (
            0x550e8400_e29b_41d4_a716_446655440000_u128,
            "清新文艺绿",
            "https://via.placeholder.com/800x600.png/4CAF50/FFFFFF?text=Fresh",
        ),
        (
            0xc4e2a1b3_6d5e_4f7a_8b9c_0d1e2f3a4b5c_u128,
            "中国风水墨",
            "https://via.placeholder.com/800x600.png/DC3545/FFFFFF?text=Tradition",
        ),
    ]
    .into_iter()
    .map(|(id, title, cover)| PptTemplate {
        id: Uuid::from_u128(id),
        title: title.to_string(),
        cover: cover.to_string(),
        created_at,
    })
    .collect()
}
