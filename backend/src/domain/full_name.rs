use unicode_segmentation::UnicodeSegmentation;

const MAX_GRAPHEMES: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullName(String);

impl FullName {
    pub fn parse(s: String) -> Result<FullName, String> {
        let trimmed = s.trim();

        let is_empty_or_whitespace = trimmed.is_empty();
        let is_too_long = trimmed.graphemes(true).count() > MAX_GRAPHEMES;

        if is_empty_or_whitespace || is_too_long {
            Err(format!("{} is not a valid full name", s))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    pub fn inner(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for FullName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
