use assert_impl::assert_impl;
use mime::Mime;
use once_cell::sync::Lazy;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use rand::random;
use regex::Regex;
use resty_http::{
    header::{HeaderName, IntoHeaderName, CONTENT_TYPE},
    HeaderMap, HeaderValue, SyncRequestBody,
};
use smallvec::SmallVec;
use std::{
    collections::VecDeque,
    ffi::OsStr,
    fmt::{self, Debug, Write as _},
    fs::File,
    io::{copy, Cursor, Read, Result as IoResult},
    path::Path,
};

type HeaderBuffer = SmallVec<[u8; 256]>;

const TEXT_PLAIN_UTF_8: &str = "text/plain;charset=UTF-8";
const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";
const PREALLOCATED_LEN_LIMIT: u64 = 1 << 16;

/// Multipart 表单
///
/// ### 发送 Multipart 表单代码实例
///
/// ```no_run
/// # fn example() -> anyhow::Result<()> {
/// use resty_client::{Multipart, Part, PartMetadata, RestClientBuilder};
///
/// let client = RestClientBuilder::default()
///     .base_url("http://127.0.0.1:8080".parse()?)
///     .build();
/// client
///     .post()
///     .uri("/upload")
///     .multipart(
///         Multipart::new()
///             .add_part("key", Part::text("fake-key"))
///             .add_part("file", Part::bytes(vec![0u8; 1024]).metadata(PartMetadata::default().file_name("fake.bin"))),
///     )
///     .retrieve()
///     .to_bodiless_entity()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Multipart {
    boundary: String,
    fields: VecDeque<(String, Part)>,
}

impl Default for Multipart {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Multipart {
    /// 创建 Multipart 表单
    #[inline]
    pub fn new() -> Self {
        Self {
            boundary: gen_boundary(),
            fields: Default::default(),
        }
    }

    /// 获取分隔符
    #[inline]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// 获取 `multipart/form-data` 类型，包含分隔符参数
    pub fn content_type(&self) -> Mime {
        format!("multipart/form-data; boundary={}", self.boundary)
            .parse()
            .unwrap_or(mime::MULTIPART_FORM_DATA)
    }

    /// 添加 Multipart 表单组件
    #[inline]
    #[must_use]
    pub fn add_part(mut self, name: impl Into<String>, part: Part) -> Self {
        self.fields.push_back((name.into(), part));
        self
    }

    /// 表单组件数量
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// 是否没有任何表单组件
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 转换为阻塞 HTTP 请求体
    ///
    /// 所有组件长度都已知时，请求体长度也已知
    pub fn into_request_body(self) -> SyncRequestBody<'static> {
        let (reader, size) = self.into_read();
        SyncRequestBody::from_reader(reader, size)
    }

    /// 将整个表单读入内存
    pub fn into_bytes(self) -> IoResult<Vec<u8>> {
        let (mut reader, size) = self.into_read();
        let mut buf = Vec::with_capacity(size.map_or(0, |size| size.min(PREALLOCATED_LEN_LIMIT) as usize));
        copy(&mut reader, &mut buf)?;
        Ok(buf)
    }

    fn into_read(self) -> (Box<dyn Read + Send + Sync>, Option<u64>) {
        let mut size = Some(0u64);
        let mut chain: Box<dyn Read + Send + Sync> = Box::new(Cursor::new(Vec::new()));
        for (name, part) in self.fields {
            let mut head = Vec::with_capacity(64);
            head.extend_from_slice(b"--");
            head.extend_from_slice(self.boundary.as_bytes());
            head.extend_from_slice(b"\r\n");
            head.extend_from_slice(&encode_headers(&name, &part));
            head.extend_from_slice(b"\r\n\r\n");
            size = size.zip(part.body.size()).and_then(|(size, body_size)| {
                size.checked_add(head.len() as u64 + 2)?.checked_add(body_size)
            });
            chain = Box::new(chain.chain(Cursor::new(head)).chain(part.body).chain(Cursor::new(b"\r\n")));
        }
        let tail = format!("--{}--\r\n", self.boundary).into_bytes();
        size = size.and_then(|size| size.checked_add(tail.len() as u64));
        (Box::new(chain.chain(Cursor::new(tail))), size)
    }

    #[allow(dead_code)]
    fn ignore() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }
}

/// Multipart 表单组件元信息
#[derive(Default, Debug, Clone)]
pub struct PartMetadata {
    headers: HeaderMap,
    file_name: Option<String>,
}

impl PartMetadata {
    /// 设置表单组件的 MIME 类型
    #[inline]
    #[must_use]
    pub fn mime(self, mime: Mime) -> Self {
        match HeaderValue::from_str(mime.as_ref()) {
            Ok(value) => self.add_header(CONTENT_TYPE, value),
            Err(_) => self,
        }
    }

    /// 添加表单组件的 HTTP 头
    #[inline]
    #[must_use]
    pub fn add_header(mut self, name: impl IntoHeaderName, value: impl Into<HeaderValue>) -> Self {
        self.headers.insert(name, value.into());
        self
    }

    /// 设置表单组件的文件名
    #[inline]
    #[must_use]
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

impl Extend<(HeaderName, HeaderValue)> for PartMetadata {
    #[inline]
    fn extend<T: IntoIterator<Item = (HeaderName, HeaderValue)>>(&mut self, iter: T) {
        self.headers.extend(iter)
    }
}

/// Multipart 表单组件
#[derive(Debug)]
pub struct Part {
    meta: PartMetadata,
    default_content_type: &'static str,
    body: PartBody,
}

enum PartBody {
    Bytes(Cursor<Vec<u8>>),
    Stream {
        reader: Box<dyn Read + Send + Sync>,
        size: Option<u64>,
    },
}

impl PartBody {
    fn size(&self) -> Option<u64> {
        match self {
            Self::Bytes(bytes) => Some(bytes.get_ref().len() as u64),
            Self::Stream { size, .. } => *size,
        }
    }
}

impl Read for PartBody {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        match self {
            Self::Bytes(bytes) => bytes.read(buf),
            Self::Stream { reader, .. } => reader.read(buf),
        }
    }
}

impl Debug for PartBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.get_ref().len()).finish(),
            Self::Stream { size, .. } => f.debug_struct("Stream").field("size", size).finish(),
        }
    }
}

impl Part {
    /// 创建文本表单组件
    ///
    /// 默认 MIME 类型为 `text/plain;charset=UTF-8`
    #[inline]
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            meta: Default::default(),
            default_content_type: TEXT_PLAIN_UTF_8,
            body: PartBody::Bytes(Cursor::new(value.into().into_bytes())),
        }
    }

    /// 创建二进制表单组件
    ///
    /// 默认 MIME 类型为 `application/octet-stream`
    #[inline]
    #[must_use]
    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        Self {
            meta: Default::default(),
            default_content_type: APPLICATION_OCTET_STREAM,
            body: PartBody::Bytes(Cursor::new(value.into())),
        }
    }

    /// 创建输入流表单组件
    ///
    /// 长度未知时，该组件不会输出 `Content-Length`
    #[inline]
    #[must_use]
    pub fn stream(reader: impl Read + Send + Sync + 'static, size: Option<u64>) -> Self {
        Self {
            meta: Default::default(),
            default_content_type: APPLICATION_OCTET_STREAM,
            body: PartBody::Stream {
                reader: Box::new(reader),
                size,
            },
        }
    }

    /// 创建文件表单组件
    ///
    /// MIME 类型根据文件扩展名猜测，文件名取自路径
    pub fn file_path<S: AsRef<OsStr> + ?Sized>(path: &S) -> IoResult<Self> {
        let path = Path::new(path);
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        let mut metadata = PartMetadata::default().mime(mime_guess::from_path(path).first_or_octet_stream());
        if let Some(file_name) = path.file_name() {
            metadata = metadata.file_name(file_name.to_string_lossy());
        }
        Ok(Self::stream(file, Some(size)).metadata(metadata))
    }

    /// 设置表单组件元信息
    #[inline]
    #[must_use]
    pub fn metadata(mut self, metadata: PartMetadata) -> Self {
        self.meta = metadata;
        self
    }

    #[allow(dead_code)]
    fn ignore() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }
}

fn gen_boundary() -> String {
    let mut boundary = String::with_capacity(32);
    write!(boundary, "{:016x}{:016x}", random::<u64>(), random::<u64>()).ok();
    boundary
}

fn encode_headers(name: &str, part: &Part) -> HeaderBuffer {
    let mut buf = HeaderBuffer::from_slice(b"Content-Disposition: form-data; ");
    buf.extend_from_slice(&format_parameter("name", name));
    if let Some(file_name) = part.meta.file_name.as_ref() {
        buf.extend_from_slice(b"; ");
        buf.extend_from_slice(format_file_name(file_name).as_bytes());
    }
    buf.extend_from_slice(b"\r\nContent-Type: ");
    match part.meta.headers.get(CONTENT_TYPE) {
        Some(content_type) => buf.extend_from_slice(content_type.as_bytes()),
        None => buf.extend_from_slice(part.default_content_type.as_bytes()),
    }
    if let Some(size) = part.body.size() {
        buf.extend_from_slice(format!("\r\nContent-Length: {size}").as_bytes());
    }
    for (name, value) in part.meta.headers.iter().filter(|(name, _)| *name != CONTENT_TYPE) {
        buf.extend_from_slice(b"\r\n");
        buf.extend_from_slice(name.as_str().as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
    }
    buf
}

fn format_file_name(file_name: &str) -> String {
    static REGEX: Lazy<Option<Regex>> = Lazy::new(|| Regex::new("\\\\|\"|\r|\n").ok());
    let Some(regex) = REGEX.as_ref() else {
        return format!("filename=\"{file_name}\"");
    };
    let mut formatted = String::from("filename=\"");
    let mut last_match = 0;
    for m in regex.find_iter(file_name) {
        formatted.push_str(&file_name[last_match..m.start()]);
        match m.as_str() {
            "\\" => formatted.push_str("\\\\"),
            "\"" => formatted.push_str("\\\""),
            "\r" => formatted.push_str("\\\r"),
            _ => formatted.push_str("\\\n"),
        }
        last_match = m.end();
    }
    formatted.push_str(&file_name[last_match..]);
    formatted.push('"');
    formatted
}

const PARAMETER_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'%');

fn format_parameter(name: &str, value: &str) -> HeaderBuffer {
    let legal_value = {
        let mut buf = HeaderBuffer::new();
        for chunk in utf8_percent_encode(value, PARAMETER_ENCODE_SET) {
            buf.extend_from_slice(chunk.as_bytes());
        }
        buf
    };
    let mut formatted = HeaderBuffer::from_slice(name.as_bytes());
    if value.len() == legal_value.len() {
        formatted.extend_from_slice(b"=\"");
        formatted.extend_from_slice(value.as_bytes());
        formatted.extend_from_slice(b"\"");
    } else {
        formatted.extend_from_slice(b"*=utf-8''");
        formatted.extend_from_slice(&legal_value);
    };
    formatted
}
