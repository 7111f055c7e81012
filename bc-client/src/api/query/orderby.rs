//! `$orderby` option rendering

/// Sort direction for a single `$orderby` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// One field of an `$orderby` option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }

    pub fn render(&self) -> String {
        format!("{} {}", self.field, self.direction.as_str())
    }
}

/// A bare field name sorts ascending; `"field desc"` is also accepted.
impl From<&str> for OrderBy {
    fn from(value: &str) -> Self {
        match value.split_once(' ') {
            Some((field, "desc")) => OrderBy::desc(field),
            Some((field, _)) => OrderBy::asc(field),
            None => OrderBy::asc(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        assert_eq!(OrderBy::asc("number").render(), "number asc");
        assert_eq!(OrderBy::desc("postingDate").render(), "postingDate desc");
    }

    #[test]
    fn test_from_str_defaults_ascending() {
        assert_eq!(OrderBy::from("number"), OrderBy::asc("number"));
        assert_eq!(OrderBy::from("number desc"), OrderBy::desc("number"));
    }
}
