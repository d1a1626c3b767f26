//! Path processing utility functions / 路径处理工具函数

/// Percent-encode every `/`-separated segment, keeping the separators / 路径编码
/// `dir/a b.txt` -> `dir/a%20b.txt`
pub fn escape_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Decode a percent-encoded request path / 路径解码
/// Returns None when the decoded bytes are not valid UTF-8
pub fn decode_path(path: &str) -> Option<String> {
    urlencoding::decode(path).ok().map(|p| p.into_owned())
}

/// Guess a content type from the object name / 根据文件名推断类型
pub fn guess_content_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .to_string()
}
