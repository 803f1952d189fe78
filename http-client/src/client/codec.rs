use super::Multipart;
use auto_impl::auto_impl;
use mime::{Mime, APPLICATION_JSON, APPLICATION_WWW_FORM_URLENCODED, MULTIPART_FORM_DATA, TEXT_PLAIN_UTF_8};
use resty_http::Extensions;
use serde_json::{Error as JsonError, Map, Value};
use std::{
    any::TypeId,
    fmt::{self, Debug},
    io::Error as IoError,
    string::FromUtf8Error,
    sync::Arc,
};
use thiserror::Error;

/// 请求体和响应体编解码器
///
/// 结构化数据在编解码器中统一以 [`serde_json::Value`] 的形式表示
#[auto_impl(&, Box, Arc)]
pub trait BodyCodec: Debug + Send + Sync {
    /// 是否能将指定 MIME 类型的响应体解码为目标类型
    fn can_read(&self, target: TypeId, content_type: &Mime) -> bool;

    /// 是否能将数据编码为指定 MIME 类型
    ///
    /// `content_type` 为 `None` 表示请求没有声明 MIME 类型
    fn can_write(&self, value: &Value, content_type: Option<&Mime>) -> bool;

    /// 解码响应体
    ///
    /// 没有内容时返回 `None`
    fn read(&self, body: &[u8], content_type: &Mime) -> Result<Option<Value>, CodecError>;

    /// 编码请求体
    fn write(&self, value: &Value, content_type: Option<&Mime>, hints: &Hints) -> Result<EncodedBody, CodecError>;
}

/// 编码后的请求体
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    body: Vec<u8>,
    content_type: Mime,
}

impl EncodedBody {
    /// 创建编码后的请求体
    #[inline]
    pub fn new(body: Vec<u8>, content_type: Mime) -> Self {
        Self { body, content_type }
    }

    /// 获取请求体
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// 获取编码器最终选择的 MIME 类型
    #[inline]
    pub fn content_type(&self) -> &Mime {
        &self.content_type
    }

    /// 转换为请求体和 MIME 类型
    #[inline]
    pub fn into_body_and_content_type(self) -> (Vec<u8>, Mime) {
        (self.body, self.content_type)
    }
}

/// 编解码错误
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CodecError {
    /// 没有编解码器能解码该响应体
    #[error("No body codec can read `{content_type}` into `{target}`")]
    NoReader {
        /// 目标类型名称
        target: &'static str,
        /// 响应体 MIME 类型
        content_type: String,
    },

    /// 没有编解码器能编码该请求体
    #[error("No body codec can write the value as `{0}`")]
    NoWriter(String),

    /// 数据结构不被编解码器支持
    #[error("Unsupported value for `{content_type}`: {reason}")]
    UnsupportedValue {
        /// MIME 类型
        content_type: String,
        /// 原因
        reason: String,
    },

    /// JSON 编解码错误
    #[error("JSON error: {0}")]
    Json(#[from] JsonError),

    /// 文本不是合法的 UTF-8
    #[error("Invalid UTF-8 text: {0}")]
    Utf8(#[from] FromUtf8Error),

    /// 读写错误
    #[error("IO error: {0}")]
    Io(#[from] IoError),
}

/// 编码提示
///
/// 原样传递给 [`BodyCodec::write`]，以类型作为键
#[derive(Default)]
pub struct Hints(Extensions);

impl Hints {
    /// 添加编码提示，返回同类型的旧值
    #[inline]
    pub fn insert<T: Send + Sync + 'static>(&mut self, hint: T) -> Option<T> {
        self.0.insert(hint)
    }

    /// 获取编码提示
    #[inline]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.0.get()
    }

    /// 删除编码提示
    #[inline]
    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.0.remove()
    }
}

impl Debug for Hints {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Hints").finish()
    }
}

/// JSON 视图
///
/// 作为编码提示时，JSON 对象只保留列出的顶层字段
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonView {
    fields: Vec<String>,
}

impl JsonView {
    /// 创建 JSON 视图
    pub fn new(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// 获取保留的字段
    #[inline]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    fn apply(&self, value: &Value) -> Value {
        match value {
            Value::Object(object) => Value::Object(
                object
                    .iter()
                    .filter(|(key, _)| self.fields.iter().any(|field| field == *key))
                    .map(|(key, value)| (key.to_owned(), value.to_owned()))
                    .collect(),
            ),
            Value::Array(values) => Value::Array(values.iter().map(|value| self.apply(value)).collect()),
            other => other.to_owned(),
        }
    }
}

/// 文本编解码器
///
/// 可以将任何 MIME 类型的响应体解码为字符串，编码字符串时默认使用 `text/plain; charset=utf-8`
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl BodyCodec for StringCodec {
    #[inline]
    fn can_read(&self, target: TypeId, _content_type: &Mime) -> bool {
        target == TypeId::of::<String>()
    }

    #[inline]
    fn can_write(&self, value: &Value, content_type: Option<&Mime>) -> bool {
        value.is_string() && !content_type.map_or(false, is_form)
    }

    fn read(&self, body: &[u8], _content_type: &Mime) -> Result<Option<Value>, CodecError> {
        Ok(Some(Value::String(String::from_utf8(body.to_vec())?)))
    }

    fn write(&self, value: &Value, content_type: Option<&Mime>, _hints: &Hints) -> Result<EncodedBody, CodecError> {
        let text = value.as_str().unwrap_or_default();
        Ok(EncodedBody::new(
            text.as_bytes().to_vec(),
            content_type.cloned().unwrap_or(TEXT_PLAIN_UTF_8),
        ))
    }
}

/// JSON 编解码器
///
/// 支持 `application/json` 和 `+json` 后缀的 MIME 类型，编码时遵循 [`JsonView`] 提示
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl BodyCodec for JsonCodec {
    #[inline]
    fn can_read(&self, _target: TypeId, content_type: &Mime) -> bool {
        is_json(content_type)
    }

    #[inline]
    fn can_write(&self, _value: &Value, content_type: Option<&Mime>) -> bool {
        content_type.map_or(true, is_json)
    }

    fn read(&self, body: &[u8], _content_type: &Mime) -> Result<Option<Value>, CodecError> {
        if body.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(None);
        }
        match serde_json::from_slice(body)? {
            Value::Null => Ok(None),
            value => Ok(Some(value)),
        }
    }

    fn write(&self, value: &Value, content_type: Option<&Mime>, hints: &Hints) -> Result<EncodedBody, CodecError> {
        let body = match hints.get::<JsonView>() {
            Some(view) => serde_json::to_vec(&view.apply(value))?,
            None => serde_json::to_vec(value)?,
        };
        Ok(EncodedBody::new(body, content_type.cloned().unwrap_or(APPLICATION_JSON)))
    }
}

/// 表单编解码器
///
/// 支持 `application/x-www-form-urlencoded` 和 `multipart/form-data`，
/// 编码时 JSON 对象的每个字段成为一个表单字段，数组字段展开为多个同名字段
#[derive(Debug, Clone, Copy, Default)]
pub struct FormCodec;

impl BodyCodec for FormCodec {
    #[inline]
    fn can_read(&self, _target: TypeId, content_type: &Mime) -> bool {
        content_type.essence_str() == APPLICATION_WWW_FORM_URLENCODED.essence_str()
    }

    #[inline]
    fn can_write(&self, value: &Value, content_type: Option<&Mime>) -> bool {
        value.is_object() && content_type.map_or(false, is_form)
    }

    fn read(&self, body: &[u8], _content_type: &Mime) -> Result<Option<Value>, CodecError> {
        let mut object = Map::new();
        for (name, value) in form_urlencoded::parse(body) {
            let value = Value::String(value.into_owned());
            match object.get_mut(name.as_ref()) {
                Some(Value::Array(values)) => values.push(value),
                Some(existed) => {
                    let first = existed.take();
                    *existed = Value::Array(vec![first, value]);
                }
                None => {
                    object.insert(name.into_owned(), value);
                }
            }
        }
        Ok(Some(Value::Object(object)))
    }

    fn write(&self, value: &Value, content_type: Option<&Mime>, _hints: &Hints) -> Result<EncodedBody, CodecError> {
        let content_type = content_type.cloned().unwrap_or(APPLICATION_WWW_FORM_URLENCODED);
        let fields = form_fields(value, &content_type)?;
        if content_type.essence_str() == MULTIPART_FORM_DATA.essence_str() {
            let multipart = fields
                .into_iter()
                .fold(Multipart::new(), |multipart, (name, value)| {
                    multipart.add_part(name, super::Part::text(value))
                });
            let content_type = multipart.content_type();
            Ok(EncodedBody::new(multipart.into_bytes()?, content_type))
        } else {
            let mut serializer = form_urlencoded::Serializer::new(String::new());
            for (name, value) in fields {
                serializer.append_pair(&name, &value);
            }
            Ok(EncodedBody::new(serializer.finish().into_bytes(), content_type))
        }
    }
}

fn form_fields(value: &Value, content_type: &Mime) -> Result<Vec<(String, String)>, CodecError> {
    let unsupported = |reason: &str| CodecError::UnsupportedValue {
        content_type: content_type.to_string(),
        reason: reason.to_owned(),
    };
    let object = value.as_object().ok_or_else(|| unsupported("form must be an object"))?;
    let mut fields = Vec::with_capacity(object.len());
    for (name, value) in object {
        match value {
            Value::Array(values) => {
                for value in values {
                    fields.push((
                        name.to_owned(),
                        form_scalar(value).ok_or_else(|| unsupported("nested field"))?,
                    ));
                }
            }
            Value::Null => {}
            value => fields.push((
                name.to_owned(),
                form_scalar(value).ok_or_else(|| unsupported("nested field"))?,
            )),
        }
    }
    Ok(fields)
}

fn form_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.to_owned()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_json(content_type: &Mime) -> bool {
    content_type.subtype() == mime::JSON || content_type.suffix() == Some(mime::JSON)
}

fn is_form(content_type: &Mime) -> bool {
    let essence = content_type.essence_str();
    essence == APPLICATION_WWW_FORM_URLENCODED.essence_str() || essence == MULTIPART_FORM_DATA.essence_str()
}

/// 默认编解码器列表
///
/// 依次为 [`StringCodec`]，[`FormCodec`] 和 [`JsonCodec`]
pub fn default_codecs() -> Vec<Arc<dyn BodyCodec>> {
    vec![Arc::new(StringCodec), Arc::new(FormCodec), Arc::new(JsonCodec)]
}

pub(super) fn find_reader<'c>(
    codecs: &'c [Arc<dyn BodyCodec>],
    target: TypeId,
    target_name: &'static str,
    content_type: &Mime,
) -> Result<&'c dyn BodyCodec, CodecError> {
    codecs
        .iter()
        .find(|codec| codec.can_read(target, content_type))
        .map(|codec| &**codec)
        .ok_or_else(|| CodecError::NoReader {
            target: target_name,
            content_type: content_type.to_string(),
        })
}

pub(super) fn write_body(
    codecs: &[Arc<dyn BodyCodec>],
    value: &Value,
    content_type: Option<&Mime>,
    hints: &Hints,
) -> Result<EncodedBody, CodecError> {
    codecs
        .iter()
        .find(|codec| codec.can_write(value, content_type))
        .ok_or_else(|| {
            CodecError::NoWriter(content_type.map_or_else(|| "<unspecified>".to_owned(), ToString::to_string))
        })?
        .write(value, content_type, hints)
}
