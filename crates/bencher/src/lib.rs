use std::fmt::Write;

#[derive(Debug, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    body: TestBody,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, body: TestBody) -> Self {
        Self { name, group, body }
    }

    pub fn small(name: &'static str, body: TestBody) -> Self {
        Self::new(name, TestGroup::Small, body)
    }

    pub fn normal(name: &'static str, body: TestBody) -> Self {
        Self::new(name, TestGroup::Normal, body)
    }

    pub fn large(name: &'static str, body: TestBody) -> Self {
        Self::new(name, TestGroup::Large, body)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn body(&self) -> &TestBody {
        &self.body
    }

    pub fn content_type(&self) -> &'static str {
        self.body().content_type
    }
}

/// A generated form body together with the `Content-Type` header it is sent with.
#[derive(Debug, Clone)]
pub struct TestBody {
    content_type: &'static str,
    content: Vec<u8>,
}

impl TestBody {
    pub const BOUNDARY: &'static str = "----bencherBoundary7MA4YWxkTrZu0gW";

    pub fn new(content_type: &'static str, content: Vec<u8>) -> Self {
        Self { content_type, content }
    }

    /// `field0=value+0&field1=value+1&...`
    pub fn urlencoded(fields: usize) -> Self {
        let mut body = String::new();
        for i in 0..fields {
            if i > 0 {
                body.push('&');
            }
            let _ = write!(body, "field{i}=value+{i}%21");
        }
        Self::new("application/x-www-form-urlencoded", body.into_bytes())
    }

    /// `fields` text parts followed by one file part of `file_size` bytes.
    pub fn multipart(fields: usize, file_size: usize) -> Self {
        let mut body = Vec::new();
        for i in 0..fields {
            body.extend_from_slice(
                format!("--{}\r\nContent-Disposition: form-data; name=\"field{i}\"\r\n\r\nvalue {i}\r\n", Self::BOUNDARY).as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"upload\"; filename=\"data.bin\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                Self::BOUNDARY
            )
            .as_bytes(),
        );
        body.extend((0..file_size).map(|i| b"abcdefghijklmnopqrstuvwxyz\r\n-"[i % 29]));
        body.extend_from_slice(format!("\r\n--{}--\r\n", Self::BOUNDARY).as_bytes());

        Self::new("multipart/form-data; boundary=----bencherBoundary7MA4YWxkTrZu0gW", body)
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Normal,
    Large,
}
