use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS, NON_ALPHANUMERIC};
use resty_http::Uri;
use std::collections::HashMap;
use thiserror::Error;
use url::Url;

/// 模版字面量中只编码 URI 中不允许出现的字符
const LITERAL_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// 变量值除 RFC 3986 非保留字符外全部编码
const VARIABLE_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// URI 模版变量
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UriVariables {
    /// 没有变量
    #[default]
    None,

    /// 按照出现顺序依次使用的变量值
    Positional(Vec<String>),

    /// 按照变量名查找的变量值
    Named(HashMap<String, String>),
}

impl UriVariables {
    /// 创建按顺序使用的变量
    pub fn positional(values: impl IntoIterator<Item = impl ToString>) -> Self {
        Self::Positional(values.into_iter().map(|value| value.to_string()).collect())
    }

    /// 创建按名称查找的变量
    pub fn named<K: Into<String>, V: ToString>(variables: impl IntoIterator<Item = (K, V)>) -> Self {
        Self::Named(
            variables
                .into_iter()
                .map(|(name, value)| (name.into(), value.to_string()))
                .collect(),
        )
    }
}

/// URI 模版展开错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UriExpansionError {
    /// 花括号不配对
    #[error("Unbalanced braces in URI template `{0}`")]
    UnbalancedBraces(String),

    /// 变量名为空
    #[error("Empty variable name in URI template `{0}`")]
    EmptyVariableName(String),

    /// 缺少变量值
    #[error("No value given for URI template variable `{0}`")]
    MissingVariable(String),

    /// 相对地址缺少基础 URL
    #[error("Relative URI `{0}` can not be resolved without base URL")]
    MissingBaseUrl(String),

    /// 展开结果不是合法的 URI
    #[error("Invalid URI `{uri}`: {reason}")]
    InvalidUri {
        /// 展开后的 URI
        uri: String,
        /// 解析失败原因
        reason: String,
    },
}

/// 展开 URI 模版
///
/// 模版字面量中已经存在的 `%XX` 将被保留，变量值将被严格编码，因此每个字符只会被编码一次
pub fn expand_uri_template(template: &str, variables: &UriVariables) -> Result<String, UriExpansionError> {
    let mut expanded = String::with_capacity(template.len());
    let mut next_positional = 0;
    let mut rest = template;
    while let Some(start) = rest.find(|c: char| c == '{' || c == '}') {
        if rest[start..].starts_with('}') {
            return Err(UriExpansionError::UnbalancedBraces(template.to_owned()));
        }
        encode_literal(&rest[..start], &mut expanded);
        let remains = &rest[start + 1..];
        let end = remains
            .find('}')
            .ok_or_else(|| UriExpansionError::UnbalancedBraces(template.to_owned()))?;
        let expression = &remains[..end];
        if expression.contains('{') {
            return Err(UriExpansionError::UnbalancedBraces(template.to_owned()));
        }
        let name = expression
            .split_once(':')
            .map_or(expression, |(name, _pattern)| name)
            .trim();
        if name.is_empty() {
            return Err(UriExpansionError::EmptyVariableName(template.to_owned()));
        }
        let value = match variables {
            UriVariables::None => None,
            UriVariables::Positional(values) => {
                next_positional += 1;
                values.get(next_positional - 1)
            }
            UriVariables::Named(values) => values.get(name),
        }
        .ok_or_else(|| UriExpansionError::MissingVariable(name.to_owned()))?;
        expanded.extend(utf8_percent_encode(value, VARIABLE_ENCODE_SET));
        rest = &remains[end + 1..];
    }
    encode_literal(rest, &mut expanded);
    Ok(expanded)
}

fn encode_literal(literal: &str, expanded: &mut String) {
    let mut start = 0;
    for (idx, _) in literal.match_indices('%') {
        expanded.extend(utf8_percent_encode(&literal[start..idx], LITERAL_ENCODE_SET));
        if is_percent_triplet(&literal.as_bytes()[idx..]) {
            expanded.push('%');
        } else {
            expanded.push_str("%25");
        }
        start = idx + 1;
    }
    expanded.extend(utf8_percent_encode(&literal[start..], LITERAL_ENCODE_SET));
}

fn is_percent_triplet(bytes: &[u8]) -> bool {
    bytes.len() >= 3 && bytes[1].is_ascii_hexdigit() && bytes[2].is_ascii_hexdigit()
}

/// 将展开后的 URI 解析为绝对地址
///
/// 相对地址以路径拼接的方式追加在基础 URL 之后，重复的 `/` 会被合并
pub fn resolve_uri(base_url: Option<&Url>, expanded: &str) -> Result<Uri, UriExpansionError> {
    let absolute = if has_scheme(expanded) {
        expanded.to_owned()
    } else if let Some(base_url) = base_url {
        join_path(base_url.as_str(), expanded)
    } else {
        return Err(UriExpansionError::MissingBaseUrl(expanded.to_owned()));
    };
    absolute.parse::<Uri>().map_err(|err| UriExpansionError::InvalidUri {
        reason: err.to_string(),
        uri: absolute,
    })
}

fn has_scheme(uri: &str) -> bool {
    uri.split_once("://").map_or(false, |(scheme, _)| {
        scheme.starts_with(|c: char| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

fn join_path(base: &str, relative: &str) -> String {
    if relative.is_empty() || relative.starts_with('?') || relative.starts_with('#') {
        format!("{base}{relative}")
    } else {
        format!("{}/{}", base.trim_end_matches('/'), relative.trim_start_matches('/'))
    }
}
