//! Parsing of individual GFA1 lines

use std::fmt::{self, Display};

/// Which end of a segment a link touches, as written in GFA
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Forward,
    Reverse,
}

impl TryFrom<&str> for Orientation {
    type Error = &'static str;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "+" => Ok(Orientation::Forward),
            "-" => Ok(Orientation::Reverse),
            _ => Err("Invalid orientation"),
        }
    }
}

impl Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Forward => write!(f, "+"),
            Orientation::Reverse => write!(f, "-"),
        }
    }
}

/// Optional `TAG:TYPE:VALUE` field
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub name: String,
    pub value: TagValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Char(char),
    Integer(i64),
    Float(f64),
    String(String),
    Json(String),
    Bytes(Vec<u8>),
}

impl TryFrom<&str> for Tag {
    type Error = &'static str;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let mut parts = value.trim().splitn(3, ':');

        let name = parts.next().ok_or("No tag")?;
        let kind = parts.next().ok_or("No type")?;
        let raw = parts.next().ok_or("No value")?;

        let value = match kind {
            "A" => TagValue::Char(raw.chars().next().ok_or("Empty character")?),
            "i" => TagValue::Integer(raw.parse().map_err(|_| "Could not parse integer")?),
            "f" => TagValue::Float(raw.parse().map_err(|_| "Could not parse float")?),
            "Z" => TagValue::String(raw.to_string()),
            "J" => TagValue::Json(raw.to_string()),
            "H" => TagValue::Bytes(
                raw.as_bytes()
                    .chunks(2)
                    .map(|pair| {
                        std::str::from_utf8(pair).ok()
                            .and_then(|s| u8::from_str_radix(s, 16).ok())
                            .ok_or("Could not parse hex")
                    })
                    .collect::<Result<Vec<_>, _>>()?
            ),
            _ => return Err("Unsupported tag type"),
        };

        Ok(Tag { name: name.to_string(), value })
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            TagValue::Char(c) => write!(f, "{}:A:{}", self.name, c),
            TagValue::Integer(v) => write!(f, "{}:i:{}", self.name, v),
            TagValue::Float(v) => write!(f, "{}:f:{}", self.name, v),
            TagValue::String(v) => write!(f, "{}:Z:{}", self.name, v),
            TagValue::Json(v) => write!(f, "{}:J:{}", self.name, v),
            TagValue::Bytes(v) => {
                write!(f, "{}:H:", self.name)?;
                v.iter().try_for_each(|b| write!(f, "{:02X}", b))
            },
        }
    }
}

fn parse_tags(fields: Option<&str>) -> Vec<Tag> {
    fields
        .map(|rest| rest.split('\t').filter_map(|v| Tag::try_from(v).ok()).collect())
        .unwrap_or_default()
}

fn find_tag<'a>(tags: &'a [Tag], name: &str) -> Option<&'a TagValue> {
    tags.iter().find(|t| t.name == name).map(|t| &t.value)
}

#[derive(Debug)]
pub struct Header {
    pub version: Option<String>,
    pub tags: Vec<Tag>,
}

impl TryFrom<&str> for Header {
    type Error = &'static str;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let mut parts = value.trim_end().splitn(2, '\t');
        if parts.next() != Some("H") {
            return Err("Not a header line");
        }

        let tags = parse_tags(parts.next());
        let version = match find_tag(&tags, "VN") {
            Some(TagValue::String(v)) => Some(v.clone()),
            _ => None,
        };

        Ok(Header { version, tags })
    }
}

#[derive(Debug)]
pub struct Segment {
    pub name: String,
    pub sequence: Option<String>,
    pub tags: Vec<Tag>,
}

impl Segment {
    /// Length declared with the `LN` tag
    pub fn length(&self) -> Option<usize> {
        match find_tag(&self.tags, "LN") {
            Some(&TagValue::Integer(v)) => usize::try_from(v).ok(),
            _ => None,
        }
    }
}

impl TryFrom<&str> for Segment {
    type Error = &'static str;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let mut parts = value.trim_end().splitn(4, '\t');
        if parts.next() != Some("S") {
            return Err("Not a segment line");
        }

        let name = parts.next().filter(|v| !v.is_empty()).ok_or("No segment name")?;
        let sequence = match parts.next().ok_or("No sequence")? {
            "*" => None,
            seq => Some(seq.to_string()),
        };

        Ok(Segment { name: name.to_string(), sequence, tags: parse_tags(parts.next()) })
    }
}

#[derive(Debug)]
pub struct GfaLink {
    pub from: String,
    pub from_orient: Orientation,
    pub to: String,
    pub to_orient: Orientation,
    pub overlap: Option<String>,
    pub tags: Vec<Tag>,
}

impl GfaLink {
    /// Overlap in bp if the CIGAR ends in `M`. Only the leading count is considered.
    pub fn overlap_bp(&self) -> Option<i32> {
        let cigar = self.overlap.as_deref()?;
        if cigar.len() < 2 || !cigar.ends_with('M') {
            return None;
        }

        let digits: String = cigar.chars().take_while(char::is_ascii_digit).collect();
        Some(digits.parse().unwrap_or(0))
    }
}

impl TryFrom<&str> for GfaLink {
    type Error = &'static str;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let mut parts = value.trim_end().splitn(7, '\t');
        if parts.next() != Some("L") {
            return Err("Not a link line");
        }

        let from = parts.next().ok_or("Missing first segment name")?;
        let from_orient = Orientation::try_from(parts.next().ok_or("Missing first orientation")?)?;
        let to = parts.next().ok_or("Missing second segment name")?;
        let to_orient = Orientation::try_from(parts.next().ok_or("Missing second orientation")?)?;
        let overlap = match parts.next().ok_or("Missing overlap")? {
            "*" => None,
            cigar => Some(cigar.to_string()),
        };

        Ok(GfaLink {
            from: from.to_string(),
            from_orient,
            to: to.to_string(),
            to_orient,
            overlap,
            tags: parse_tags(parts.next()),
        })
    }
}

/// A GFA1 line. Record types the loader does not use are kept as [`GfaLine::Other`].
#[derive(Debug)]
pub enum GfaLine {
    Header(Header),
    Segment(Segment),
    Link(GfaLink),
    Comment,
    Other(char),
}

impl TryFrom<&str> for GfaLine {
    type Error = &'static str;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.chars().next().ok_or("Empty line")? {
            'H' => Ok(GfaLine::Header(Header::try_from(value)?)),
            'S' => Ok(GfaLine::Segment(Segment::try_from(value)?)),
            'L' => Ok(GfaLine::Link(GfaLink::try_from(value)?)),
            '#' => Ok(GfaLine::Comment),
            c => Ok(GfaLine::Other(c)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        let header = Header::try_from("H\tVN:Z:1.0").unwrap();
        assert_eq!(header.version.as_deref(), Some("1.0"));
        assert_eq!(header.tags.len(), 1);

        assert!(Header::try_from("H").unwrap().version.is_none());
        assert!(Header::try_from("S\tVN:Z:1.0").is_err());
    }

    #[test]
    fn test_parse_segment() {
        let segment = Segment::try_from("S\tctg1\t*\tLN:i:400\tRC:i:12\n").unwrap();
        assert_eq!(segment.name, "ctg1");
        assert_eq!(segment.sequence, None);
        assert_eq!(segment.length(), Some(400));
        assert_eq!(segment.tags[1], Tag { name: String::from("RC"), value: TagValue::Integer(12) });

        let inline = Segment::try_from("S\tctg2\tACGT").unwrap();
        assert_eq!(inline.sequence.as_deref(), Some("ACGT"));
        assert_eq!(inline.length(), None);

        assert!(Segment::try_from("S").is_err());
    }

    #[test]
    fn test_parse_link() {
        let link = GfaLink::try_from("L\tctg1\t+\tctg2\t-\t55M").unwrap();
        assert_eq!(link.from, "ctg1");
        assert_eq!(link.from_orient, Orientation::Forward);
        assert_eq!(link.to, "ctg2");
        assert_eq!(link.to_orient, Orientation::Reverse);
        assert_eq!(link.overlap_bp(), Some(55));

        let no_overlap = GfaLink::try_from("L\tctg1\t-\tctg2\t+\t*").unwrap();
        assert_eq!(no_overlap.overlap_bp(), None);

        assert!(GfaLink::try_from("L\tctg1\tx\tctg2\t+\t0M").is_err());
        assert!(GfaLink::try_from("L\tctg1\t+\tctg2").is_err());
    }

    #[test]
    fn test_tags() {
        let tag = Tag::try_from("XB:H:1AFF").unwrap();
        assert_eq!(tag.value, TagValue::Bytes(vec![0x1a, 0xff]));
        assert_eq!(tag.to_string(), "XB:H:1AFF");

        assert_eq!(Tag::try_from("DP:f:2.5").unwrap().to_string(), "DP:f:2.5");
        assert!(Tag::try_from("LN:i:abc").is_err());
        assert!(Tag::try_from("LN").is_err());
    }

    #[test]
    fn test_line_types() {
        assert!(matches!(GfaLine::try_from("# comment"), Ok(GfaLine::Comment)));
        assert!(matches!(GfaLine::try_from("P\tp1\tctg1+\t*"), Ok(GfaLine::Other('P'))));
        assert!(GfaLine::try_from("").is_err());
    }
}
