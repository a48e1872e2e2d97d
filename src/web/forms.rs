//! Request body decoding for urlencoded and multipart forms.

/// One decoded form field; files keep their raw bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: String,
    pub filename: Option<String>,
    pub data: Vec<u8>,
}

impl FormField {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// Decoded form: repeated names are kept in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Form {
    fields: Vec<FormField>,
}

impl Form {
    pub fn from_fields(fields: Vec<FormField>) -> Self {
        Self { fields }
    }

    pub fn urlencoded(body: &[u8]) -> Self {
        let fields = url::form_urlencoded::parse(body)
            .map(|(name, value)| FormField {
                name: name.into_owned(),
                filename: None,
                data: value.into_owned().into_bytes(),
            })
            .collect();
        Self { fields }
    }

    /// First text value for `name`, trimmed.
    pub fn value(&self, name: &str) -> Option<String> {
        self.field(name).map(|field| field.text().trim().to_string())
    }

    /// Every non-empty text value for `name`.
    pub fn values(&self, name: &str) -> Vec<String> {
        self.fields
            .iter()
            .filter(|field| field.name == name)
            .map(|field| field.text().trim().to_string())
            .filter(|value| !value.is_empty())
            .collect()
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Boundary parameter of a `multipart/form-data` content type.
pub fn multipart_boundary(content_type: &str) -> Option<String> {
    let mut parts = content_type.split(';');
    let mime = parts.next()?.trim();
    if !mime.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }
    parts.find_map(|param| {
        let (key, value) = param.trim().split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("boundary")
            .then(|| value.trim().trim_matches('"').to_string())
    })
    .filter(|boundary| !boundary.is_empty())
}

/// Split a multipart body into fields.
pub fn parse_multipart(body: &[u8], boundary: &str) -> Result<Form, String> {
    let delimiter = format!("--{boundary}").into_bytes();
    let mut pos = find(body, &delimiter, 0).ok_or("multipart body has no boundary")?;
    let mut fields = Vec::new();
    loop {
        pos += delimiter.len();
        if body[pos..].starts_with(b"--") {
            break;
        }
        let part_start = skip_crlf(body, pos);
        let next = find(body, &delimiter, part_start).ok_or("unterminated multipart body")?;
        let mut part_end = next;
        if part_end >= part_start + 2 && &body[part_end - 2..part_end] == b"\r\n" {
            part_end -= 2;
        }
        fields.push(parse_part(&body[part_start..part_end])?);
        pos = next;
    }
    Ok(Form { fields })
}

fn parse_part(part: &[u8]) -> Result<FormField, String> {
    let split = find(part, b"\r\n\r\n", 0).ok_or("multipart part without headers")?;
    let headers = String::from_utf8_lossy(&part[..split]);
    let data = part[split + 4..].to_vec();
    let mut name = None;
    let mut filename = None;
    for line in headers.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if !key.trim().eq_ignore_ascii_case("content-disposition") {
            continue;
        }
        for param in value.split(';').skip(1) {
            if let Some((key, value)) = param.trim().split_once('=') {
                let value = value.trim().trim_matches('"').to_string();
                match key.trim() {
                    "name" => name = Some(value),
                    "filename" => filename = Some(value),
                    _ => {}
                }
            }
        }
    }
    let name = name.ok_or("multipart part without a field name")?;
    Ok(FormField {
        name,
        filename,
        data,
    })
}

fn skip_crlf(body: &[u8], pos: usize) -> usize {
    if body[pos..].starts_with(b"\r\n") {
        pos + 2
    } else {
        pos
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|idx| idx + from)
}
