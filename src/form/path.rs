use std::fmt;
use std::str::FromStr;

/// One step from a node to its child: an array index or a tuple field key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathKey {
    Index(usize),
    Field(String),
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{index}"),
            Self::Field(key) => f.write_str(key),
        }
    }
}

impl From<usize> for PathKey {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for PathKey {
    fn from(key: &str) -> Self {
        Self::Field(key.to_string())
    }
}

/// Address of a node in an argument form, starting at the top-level argument.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ParamPath(Vec<PathKey>);

impl ParamPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> &[PathKey] {
        &self.0
    }

    pub fn child(&self, key: impl Into<PathKey>) -> Self {
        let mut keys = self.0.clone();
        keys.push(key.into());
        Self(keys)
    }
}

impl From<Vec<PathKey>> for ParamPath {
    fn from(keys: Vec<PathKey>) -> Self {
        Self(keys)
    }
}

impl fmt::Display for ParamPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

/// Parses dotted paths such as `0.orders.2.amount`. All-digit segments become indices.
impl FromStr for ParamPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::root());
        }
        s.split('.')
            .map(|segment| {
                let segment = segment.trim();
                if segment.is_empty() {
                    Err(format!("Empty segment in path '{s}'"))
                } else if segment.bytes().all(|b| b.is_ascii_digit()) {
                    segment
                        .parse()
                        .map(PathKey::Index)
                        .map_err(|_| format!("Index too large in path '{s}'"))
                } else {
                    Ok(PathKey::Field(segment.to_string()))
                }
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let path: ParamPath = "0.orders.2.amount".parse().unwrap();
        assert_eq!(
            path.keys(),
            &[
                PathKey::Index(0),
                PathKey::Field("orders".into()),
                PathKey::Index(2),
                PathKey::Field("amount".into()),
            ]
        );
        assert_eq!(path.to_string(), "0.orders.2.amount");
        assert_eq!(ParamPath::root().to_string(), "<root>");
    }

    #[test]
    fn test_parse_rejects_empty_segment() {
        assert!("0..1".parse::<ParamPath>().is_err());
        assert!("".parse::<ParamPath>().unwrap().keys().is_empty());
    }
}
