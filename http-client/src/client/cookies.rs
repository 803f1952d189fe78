use smallvec::SmallVec;
use std::fmt::Write;

type CookieValues = SmallVec<[String; 1]>;

/// Cookie 集合
///
/// 同名 Cookie 可以有多个值，名称和值都保持插入顺序
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookies {
    entries: Vec<(String, CookieValues)>,
}

impl Cookies {
    /// 追加 Cookie，同名 Cookie 的已有值将被保留
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        match self.position(&name) {
            Some(idx) => self.entries[idx].1.push(value.into()),
            None => self.entries.push((name, smallvec::smallvec![value.into()])),
        }
        self
    }

    /// 设置 Cookie，同名 Cookie 的已有值将被替换
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        let values: CookieValues = smallvec::smallvec![value.into()];
        match self.position(&name) {
            Some(idx) => self.entries[idx].1 = values,
            None => self.entries.push((name, values)),
        }
        self
    }

    /// 删除 Cookie，返回被删除的所有值
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.position(name)
            .map(|idx| self.entries.remove(idx).1.into_vec())
    }

    /// 获取 Cookie 的所有值
    #[inline]
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.position(name).map(|idx| self.entries[idx].1.as_slice())
    }

    /// 获取 Cookie 的第一个值
    #[inline]
    pub fn get_first(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|values| values.first()).map(|value| value.as_str())
    }

    /// 是否包含指定名称的 Cookie
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// 获取所有 Cookie 名称
    #[inline]
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// 按顺序遍历所有 Cookie 名称和值
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |value| (name.as_str(), value.as_str())))
    }

    /// Cookie 名称数量
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 清空
    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear()
    }

    /// 以当前集合为默认值，与本次请求的 Cookie 合并
    ///
    /// 本次请求出现的名称将整体替换默认值中的同名 Cookie，并保持默认值中的位置，其他默认 Cookie 保持不变
    pub fn merged_with(&self, overrides: &Cookies) -> Cookies {
        let mut merged = self.to_owned();
        for (name, values) in overrides.entries.iter() {
            match merged.position(name) {
                Some(idx) => merged.entries[idx].1 = values.to_owned(),
                None => merged.entries.push((name.to_owned(), values.to_owned())),
            }
        }
        merged
    }

    /// 生成 `Cookie` 请求头的值
    ///
    /// 集合为空时返回 `None`
    pub fn to_header_value(&self) -> Option<String> {
        let mut header_value = String::new();
        for (name, value) in self.iter() {
            if !header_value.is_empty() {
                header_value.push_str("; ");
            }
            write!(header_value, "{name}={value}").ok();
        }
        if header_value.is_empty() {
            None
        } else {
            Some(header_value)
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Cookies {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut cookies = Self::default();
        cookies.extend(iter);
        cookies
    }
}

impl<N: Into<String>, V: Into<String>> Extend<(N, V)> for Cookies {
    fn extend<T: IntoIterator<Item = (N, V)>>(&mut self, iter: T) {
        for (name, value) in iter {
            self.add(name, value);
        }
    }
}
