use std::cmp::Ordering;

/// A dotted version string ordered segment by segment, numerically where both
/// segments are numbers. A `-suffix` marks a pre-release of the base version.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Version {
    base: Vec<Segment>,
    tag: Option<Vec<Segment>>,
}

#[derive(Debug, PartialEq, Eq, Clone, PartialOrd, Ord)]
enum Segment {
    Numeric(u64),
    Text(String),
}

impl Version {
    pub fn new(v: &str) -> Self {
        let (base, tag) = match v.split_once('-') {
            Some((base, tag)) => (base, Some(tag)),
            None => (v, None),
        };
        Version {
            base: segments(base),
            tag: tag.map(segments),
        }
    }
}

/// Split on `.`/`-`/`_`/`+` and on every digit/non-digit boundary
fn segments(s: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut current = String::new();

    let flush = |current: &mut String, out: &mut Vec<Segment>| {
        if current.is_empty() {
            return;
        }
        let seg = match current.parse::<u64>() {
            Ok(n) => Segment::Numeric(n),
            Err(_) => Segment::Text(current.to_ascii_lowercase()),
        };
        out.push(seg);
        current.clear();
    };

    for c in s.chars() {
        if matches!(c, '.' | '-' | '_' | '+') {
            flush(&mut current, &mut out);
            continue;
        }
        if let Some(last) = current.chars().last() {
            if last.is_ascii_digit() != c.is_ascii_digit() {
                flush(&mut current, &mut out);
            }
        }
        current.push(c);
    }
    flush(&mut current, &mut out);
    out
}

fn cmp_segments(a: &[Segment], b: &[Segment]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        match x.cmp(y) {
            Ordering::Equal => continue,
            ord => return ord,
        }
    }
    a.len().cmp(&b.len())
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match cmp_segments(&self.base, &other.base) {
            Ordering::Equal => {}
            ord => return ord,
        }
        match (&self.tag, &other.tag) {
            (None, None) => Ordering::Equal,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(a), Some(b)) => cmp_segments(a, b),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub fn compare_versions(a: &str, b: &str) -> Ordering {
    Version::new(a).cmp(&Version::new(b))
}
