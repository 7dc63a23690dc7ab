/// A contiguous byte range with inclusive bounds, as produced from
/// `bytes=` range specs.
///
/// `first` and `last` are both positions within the resource, so a range
/// covering the first ten bytes is `ByteRange { first: 0, last: 9 }`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteRange {
    pub first: u64,
    pub last: u64,
}

impl ByteRange {
    pub fn new(first: u64, last: u64) -> Self {
        Self { first, last }
    }

    /// Number of bytes covered by the range.
    pub fn size(&self) -> u64 {
        self.last - self.first + 1
    }

    /// Header value for a satisfied range: `bytes first-last/total`.
    pub fn to_header_range_string(&self, total_len: u64) -> String {
        format!("bytes {}-{}/{}", self.first, self.last, total_len)
    }

    fn touches(&self, other: &ByteRange) -> bool {
        self.first <= other.last.saturating_add(1) && other.first <= self.last.saturating_add(1)
    }

    fn merge(&mut self, other: &ByteRange) {
        self.first = self.first.min(other.first);
        self.last = self.last.max(other.last);
    }
}

/// Header value reporting that no range was satisfiable: `bytes */total`.
pub fn unsatisfiable_range_string(total_len: u64) -> String {
    format!("bytes */{total_len}")
}

/// Parse `bytes=` range specs against a resource of `total_len` bytes and
/// return the satisfiable ranges.
///
/// Accepts any number of header values, each carrying comma-separated
/// specs in the `a-b`, `a-` and `-n` forms. Specs that lie past the end of
/// the resource or are syntactically broken are dropped; bounds are
/// clamped to the resource length; overlapping and adjacent ranges are
/// coalesced. An empty result means the request as a whole was not
/// satisfiable.
pub fn satisfiable_ranges<'a, I>(specs: I, total_len: u64) -> Vec<ByteRange>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut ranges: Vec<ByteRange> = Vec::new();

    for header in specs {
        let Some(list) = header.trim().strip_prefix("bytes=") else {
            log::debug!("ignoring range spec without bytes unit: {header:?}");
            continue;
        };

        for spec in list.split(',') {
            let spec = spec.trim();
            if spec.is_empty() {
                continue;
            }

            match parse_spec(spec, total_len) {
                Some(range) => ranges.push(range),
                None => log::debug!("dropping range spec {spec:?} for length {total_len}"),
            }
        }
    }

    coalesce(ranges)
}

fn parse_spec(spec: &str, total_len: u64) -> Option<ByteRange> {
    if total_len == 0 {
        return None;
    }

    if let Some(suffix) = spec.strip_prefix('-') {
        // `-n`: the final n bytes
        let count: u64 = suffix.parse().ok()?;
        if count == 0 {
            return None;
        }
        return Some(ByteRange::new(
            total_len.saturating_sub(count),
            total_len - 1,
        ));
    }

    let (first, last) = spec.split_once('-')?;
    let first: u64 = first.parse().ok()?;
    if first >= total_len {
        return None;
    }

    let last = if last.is_empty() {
        // `a-`: everything from a
        total_len - 1
    } else {
        let last: u64 = last.parse().ok()?;
        if last < first {
            return None;
        }
        last.min(total_len - 1)
    };

    Some(ByteRange::new(first, last))
}

fn coalesce(mut ranges: Vec<ByteRange>) -> Vec<ByteRange> {
    let mut i = 0;
    while i < ranges.len() {
        let mut merged_any = false;
        let mut j = i + 1;
        while j < ranges.len() {
            if ranges[i].touches(&ranges[j]) {
                let other = ranges.remove(j);
                ranges[i].merge(&other);
                merged_any = true;
            } else {
                j += 1;
            }
        }
        // a widened range can reach specs it previously missed
        if !merged_any {
            i += 1;
        }
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_simple_range() {
        assert_eq!(
            satisfiable_ranges(["bytes=0-9"], 83),
            vec![ByteRange::new(0, 9)]
        );
    }

    #[test]
    fn parses_open_ended_and_suffix_forms() {
        assert_eq!(
            satisfiable_ranges(["bytes=60-"], 83),
            vec![ByteRange::new(60, 82)]
        );
        assert_eq!(
            satisfiable_ranges(["bytes=-10"], 83),
            vec![ByteRange::new(73, 82)]
        );
        // a suffix longer than the resource covers all of it
        assert_eq!(
            satisfiable_ranges(["bytes=-1000"], 83),
            vec![ByteRange::new(0, 82)]
        );
    }

    #[test]
    fn clamps_last_to_resource_length() {
        assert_eq!(
            satisfiable_ranges(["bytes=10-500"], 83),
            vec![ByteRange::new(10, 82)]
        );
    }

    #[test]
    fn parses_multiple_specs_and_headers() {
        assert_eq!(
            satisfiable_ranges(["bytes=0-9,20-29", "bytes=40-49"], 83),
            vec![
                ByteRange::new(0, 9),
                ByteRange::new(20, 29),
                ByteRange::new(40, 49),
            ]
        );
    }

    #[test]
    fn coalesces_overlapping_and_adjacent_ranges() {
        assert_eq!(
            satisfiable_ranges(["bytes=0-10,5-15"], 83),
            vec![ByteRange::new(0, 15)]
        );
        assert_eq!(
            satisfiable_ranges(["bytes=0-9,10-19"], 83),
            vec![ByteRange::new(0, 19)]
        );
        // merging can cascade through earlier disjoint specs
        assert_eq!(
            satisfiable_ranges(["bytes=0-4,10-14,4-11"], 83),
            vec![ByteRange::new(0, 14)]
        );
    }

    #[test]
    fn drops_unsatisfiable_and_malformed_specs() {
        assert!(satisfiable_ranges(["bytes=100-200"], 83).is_empty());
        assert!(satisfiable_ranges(["bytes=50-40"], 83).is_empty());
        assert!(satisfiable_ranges(["bytes=abc"], 83).is_empty());
        assert!(satisfiable_ranges(["bytes=-0"], 83).is_empty());
        assert!(satisfiable_ranges(["items=0-9"], 83).is_empty());
        assert!(satisfiable_ranges(["bytes=0-9"], 0).is_empty());
    }

    #[test]
    fn keeps_valid_specs_next_to_broken_ones() {
        assert_eq!(
            satisfiable_ranges(["bytes=0-9,oops,200-300,20-29"], 83),
            vec![ByteRange::new(0, 9), ByteRange::new(20, 29)]
        );
    }

    #[test]
    fn header_strings() {
        let range = ByteRange::new(10, 59);
        assert_eq!(range.size(), 50);
        assert_eq!(range.to_header_range_string(83), "bytes 10-59/83");
        assert_eq!(unsatisfiable_range_string(83), "bytes */83");
    }
}
