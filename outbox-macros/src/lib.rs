use proc_macro::TokenStream;

mod topic;
mod utils;

/// 主题目录宏
///
/// 用于无字段（单元）变体的枚举，将其变成一次部署内封闭的主题目录：
/// - 合并派生：Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize
/// - 实现 `::outbox_domain::event::Topic`（as_str/from_name/all）与 `Display`
/// - 主题名默认为变体名，可通过 `#[topic(name = "...")]` 覆写；
///   覆写时同步追加 `#[serde(rename = "...")]`，保证 serde 名称与主题名一致
///
/// ```ignore
/// #[topic]
/// pub enum AppTopic {
///     ConventionSubmitted,
///     #[topic(name = "agency.updated")]
///     AgencyUpdated,
/// }
/// ```
#[proc_macro_attribute]
pub fn topic(attr: TokenStream, item: TokenStream) -> TokenStream {
    topic::expand(attr, item)
}
